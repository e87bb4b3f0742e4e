use worker::{Headers, Response};

use crate::network;
use crate::types;

pub fn add_security_headers(headers: &mut Headers) -> std::result::Result<(), worker::Error> {
    headers.set("X-Content-Type-Options", "nosniff")?;
    headers.set("X-Frame-Options", "DENY")?;
    headers.set("X-XSS-Protection", "1; mode=block")?;
    headers.set(
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains",
    )?;
    headers.set(
        "Content-Security-Policy",
        "default-src 'none'; frame-ancestors 'none'",
    )?;
    Ok(())
}

pub fn handle_health() -> worker::Result<Response> {
    Response::from_json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": types::now_ms(),
    }))
}

pub fn handle_networks(trace_id: &str, start_ms: i64) -> worker::Result<Response> {
    Response::from_json(&serde_json::json!({
        "networks": network::list(),
        "meta": meta(trace_id, start_ms),
    }))
}

fn meta(trace_id: &str, start_ms: i64) -> serde_json::Value {
    let now = types::now_ms();
    serde_json::json!({
        "trace_id": trace_id,
        "timestamp": now,
        "latency_ms": now.saturating_sub(start_ms),
    })
}
