use serde_json::Value;

use crate::error::{Result, ScoreError};
use crate::infra::config::ApiConfig;
use crate::infra::structured_log::RequestContext;
use crate::infra::{ProviderFactory, Services};
use crate::jsonrpc::methods;
use crate::jsonrpc::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Serves one JSON-RPC call against live providers and logs its outcome.
pub async fn handle(
    req: JsonRpcRequest,
    config: ApiConfig,
    trace_id: &str,
    start_ms: i64,
    client_ip: &str,
    request_size: usize,
) -> JsonRpcResponse {
    let services = Services::new(config);
    let method = req.method.clone();
    let network = req
        .params
        .get("network")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let log_ctx =
        RequestContext::new(trace_id, client_ip, start_ms).with_network(network.as_deref());
    log_ctx.log_request_start(&method, request_size);

    let id = req.id.clone();
    let outcome = execute(req, &services, &services.config).await;

    match outcome {
        Ok(value) => {
            log_ctx.log_request_complete(&method);
            JsonRpcResponse::success(id, value)
        }
        Err(err) => {
            let (code, message, _) = err.to_json_rpc_error();
            log_ctx.log_request_error(&method, code, &message);
            JsonRpcResponse::error(id, err)
        }
    }
}

/// Validates the envelope and runs the method.
pub async fn execute<F>(req: JsonRpcRequest, factory: &F, config: &ApiConfig) -> Result<Value>
where
    F: ProviderFactory + ?Sized,
{
    if req.jsonrpc != "2.0" {
        return Err(ScoreError::invalid_request(
            "jsonrpc must be '2.0'".to_string(),
        ));
    }
    methods::dispatch(&req.method, req.params, factory, config).await
}

/// [`execute`] wrapped into a response envelope.
pub async fn respond<F>(req: JsonRpcRequest, factory: &F, config: &ApiConfig) -> JsonRpcResponse
where
    F: ProviderFactory + ?Sized,
{
    let id = req.id.clone();
    match execute(req, factory, config).await {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::error(id, err),
    }
}
