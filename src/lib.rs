use worker::{console_warn, Context, Env, Method, Request, Response};

pub mod abi;
pub mod domain;
pub mod error;
mod http;
pub mod infra;
pub mod jsonrpc;
pub mod network;
pub mod types;

use crate::error::ScoreError;
use crate::infra::config::ApiConfig;
use crate::jsonrpc::protocol::{JsonRpcRequest, JsonRpcResponse};

const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

#[worker::event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> worker::Result<Response> {
    console_error_panic_hook::set_once();

    let trace_id = types::get_trace_id(&req);
    let start_ms = types::now_ms();
    let origin = types::get_header(&req, "Origin");
    let config = ApiConfig::from_env(&env);

    let mut resp = match (req.method(), req.path().as_str()) {
        (Method::Options, _) => Response::ok("")?.with_status(204),
        (Method::Get, "/health") => http::handle_health()?,
        (Method::Get, "/networks") => http::handle_networks(&trace_id, start_ms)?,
        (Method::Post, "/") => handle_json_rpc(req, config.clone(), &trace_id, start_ms).await?,
        _ => Response::error("Not Found", 404)?,
    };

    http::add_security_headers(resp.headers_mut())?;
    apply_cors(resp, &config, &trace_id, origin.as_deref())
}

async fn handle_json_rpc(
    mut req: Request,
    config: ApiConfig,
    trace_id: &str,
    start_ms: i64,
) -> worker::Result<Response> {
    let client_ip = types::get_client_ip(&req);

    let body_bytes = match req.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            crate::log_error!(trace_id, "request_body_unreadable", with_client_ip = &client_ip);
            let resp = JsonRpcResponse::error(
                serde_json::Value::Null,
                ScoreError::invalid_request(format!("Failed to read request body: {err}")),
            );
            return Response::from_json(&resp).map(|r| r.with_status(400));
        }
    };
    if body_bytes.len() > MAX_REQUEST_BODY_BYTES {
        crate::log_warn!(
            trace_id,
            "request_body_too_large",
            with_client_ip = &client_ip,
            with_request_size = body_bytes.len(),
        );
        let resp = JsonRpcResponse::error(
            serde_json::Value::Null,
            ScoreError::invalid_request("Request body too large".to_string()),
        );
        return Response::from_json(&resp).map(|r| r.with_status(413));
    }

    let json_rpc_req: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
        Ok(v) => v,
        Err(err) => {
            let resp = JsonRpcResponse::error(
                serde_json::Value::Null,
                ScoreError::invalid_request(format!("Invalid JSON-RPC payload: {err}")),
            );
            return Response::from_json(&resp).map(|r| r.with_status(400));
        }
    };

    let resp = jsonrpc::router::handle(
        json_rpc_req,
        config,
        trace_id,
        start_ms,
        &client_ip,
        body_bytes.len(),
    )
    .await;

    let status = resp.http_status();
    Response::from_json(&resp).map(|r| r.with_status(status))
}

fn apply_cors(
    mut resp: Response,
    config: &ApiConfig,
    trace_id: &str,
    origin: Option<&str>,
) -> worker::Result<Response> {
    let headers = resp.headers_mut();
    let configured = config.cors_allow_origin.trim();

    if configured.is_empty() {
        if let Some(origin) = origin {
            console_warn!("[WARN] [{}] CORS rejected for origin {}", trace_id, origin);
            return Response::error("CORS forbidden", 403);
        }
        return Ok(resp);
    }

    if configured == "*" {
        headers.set("Access-Control-Allow-Origin", "*")?;
    } else {
        let allowed = configured
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if allowed.is_empty() {
            return Ok(resp);
        }

        if let Some(origin) = origin {
            if allowed.iter().any(|v| v.eq_ignore_ascii_case(origin)) {
                headers.set("Access-Control-Allow-Origin", origin)?;
                headers.set("Vary", "Origin")?;
            } else {
                console_warn!("[WARN] [{}] CORS rejected for origin {}", trace_id, origin);
                return Response::error("CORS forbidden", 403);
            }
        }
    }

    headers.set("Access-Control-Allow-Methods", "GET,POST,OPTIONS")?;
    headers.set("Access-Control-Allow-Headers", "Content-Type,x-request-id")?;
    headers.set("Access-Control-Max-Age", "86400")?;
    Ok(resp)
}
