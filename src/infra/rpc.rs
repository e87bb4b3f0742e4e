use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use futures_util::future::{select, Either, FutureExt};
use futures_util::pin_mut;
use serde_json::Value;
use std::time::Duration;
use worker::{console_warn, Delay};
use worker::{Fetch, Headers, Method, Request, RequestInit};

use crate::error::{Result, ScoreError};
use crate::infra::multicall::{BlockTag, ReadProvider, StarknetCall};
use crate::types;

pub const RPC_DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const RPC_DEFAULT_MAX_RETRIES: u8 = 1;

/// JSON-RPC 2.0 client for one network endpoint.
#[derive(Clone, Debug)]
pub struct RpcClient {
    url: String,
    timeout_ms: u64,
    max_retries: u8,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout_ms: u64, max_retries: u8) -> Self {
        Self {
            url: url.into(),
            timeout_ms: if timeout_ms == 0 {
                RPC_DEFAULT_TIMEOUT_MS
            } else {
                timeout_ms
            },
            max_retries,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends `method` and returns its `result`. Transport failures are retried
    /// up to `max_retries` times; JSON-RPC errors are returned as is.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = serde_json::to_string(&request_payload(method, params))
            .map_err(|err| ScoreError::RpcError(err.to_string()))?;

        let mut attempt = 0;
        loop {
            match self.send_with_timeout(&body).await {
                Ok(value) => return parse_response(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    console_warn!(
                        "[WARN] {} to {} failed ({}), retry {}/{}",
                        method,
                        self.url,
                        err,
                        attempt,
                        self.max_retries
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_with_timeout(&self, body: &str) -> Result<Value> {
        let fut = self.send(body).fuse();
        let timeout = Delay::from(Duration::from_millis(self.timeout_ms)).fuse();
        pin_mut!(fut, timeout);
        match select(fut, timeout).await {
            Either::Left((out, _)) => out,
            Either::Right((_elapsed, _)) => Err(ScoreError::Transport(format!(
                "RPC timeout after {}ms",
                self.timeout_ms
            ))),
        }
    }

    async fn send(&self, body: &str) -> Result<Value> {
        let headers = Headers::new();
        headers
            .set("Content-Type", "application/json")
            .map_err(|err| ScoreError::Transport(err.to_string()))?;

        let mut init = RequestInit::new();
        init.with_method(Method::Post);
        init.with_headers(headers);
        init.with_body(Some(body.into()));

        let request = Request::new_with_init(&self.url, &init)
            .map_err(|err| ScoreError::Transport(err.to_string()))?;
        let mut resp = Fetch::Request(request)
            .send()
            .await
            .map_err(|err| ScoreError::Transport(err.to_string()))?;

        let status = resp.status_code();
        if !(200..300).contains(&status) {
            return Err(ScoreError::Transport(format!(
                "RPC endpoint returned HTTP {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|err| ScoreError::Transport(format!("Invalid RPC response body: {err}")))
    }
}

#[async_trait(?Send)]
impl ReadProvider for RpcClient {
    async fn eth_call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes> {
        let result = self.call("eth_call", eth_call_params(to, &data, block)).await?;
        let output = result
            .as_str()
            .ok_or_else(|| ScoreError::Decode("eth_call result is not a string".to_string()))?;
        types::hex0x_to_bytes(output)
            .map(Bytes::from)
            .map_err(|err| ScoreError::Decode(err.to_string()))
    }

    async fn starknet_call(&self, call: &StarknetCall, block: BlockTag) -> Result<Vec<String>> {
        let result = self
            .call("starknet_call", starknet_call_params(call, block))
            .await?;
        serde_json::from_value(result)
            .map_err(|err| ScoreError::Decode(format!("starknet_call result: {err}")))
    }
}

pub fn request_payload(method: &str, params: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    })
}

pub fn eth_call_params(to: Address, data: &Bytes, block: BlockTag) -> Value {
    serde_json::json!([
        { "to": to.to_string().to_lowercase(), "data": types::bytes_to_hex0x(data) },
        block.to_eth_param()
    ])
}

pub fn starknet_call_params(call: &StarknetCall, block: BlockTag) -> Value {
    serde_json::json!({
        "request": call,
        "block_id": block.to_starknet_param()
    })
}

/// Unwraps a JSON-RPC envelope into its `result`.
pub fn parse_response(value: Value) -> Result<Value> {
    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown RPC error");
        return Err(ScoreError::RpcError(message.to_string()));
    }

    value
        .get("result")
        .cloned()
        .ok_or_else(|| ScoreError::RpcError("Missing RPC result".to_string()))
}
