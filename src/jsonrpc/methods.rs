use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{scores, strategies};
use crate::error::{Result, ScoreError};
use crate::infra::config::ApiConfig;
use crate::infra::multicall::{self, Abi, BatchOptions, Call};
use crate::infra::ProviderFactory;
use crate::network;

#[derive(Debug, Deserialize)]
struct MulticallParams {
    network: String,
    abi: Value,
    calls: Vec<Value>,
    #[serde(default)]
    options: Value,
}

pub async fn dispatch<F>(method: &str, params: Value, factory: &F, config: &ApiConfig) -> Result<Value>
where
    F: ProviderFactory + ?Sized,
{
    match method {
        "get_scores" => {
            let request: scores::ScoresRequest = parse_params(method, params)?;
            let scores = scores::get_scores(factory, config, &request).await?;
            Ok(serde_json::json!({ "scores": scores }))
        }
        "get_vp" => {
            let request: scores::VpRequest = parse_params(method, params)?;
            let vp = scores::get_vp(factory, config, &request).await?;
            to_value(&vp)
        }
        "multicall" => {
            let params: MulticallParams = parse_params(method, params)?;
            run_multicall(params, factory, config).await
        }
        "get_strategies" => Ok(strategies::list()),
        "get_networks" => Ok(serde_json::json!({ "networks": network::list() })),
        _ => Err(ScoreError::method_not_found(method.to_string())),
    }
}

async fn run_multicall<F>(params: MulticallParams, factory: &F, config: &ApiConfig) -> Result<Value>
where
    F: ProviderFactory + ?Sized,
{
    let abi = Abi::from_json(network::protocol(&params.network), &params.abi)?;
    let calls = params
        .calls
        .iter()
        .map(parse_call)
        .collect::<Result<Vec<_>>>()?;
    let options = batch_options(params.options, config)?;

    let provider = factory.provider(&params.network)?;
    let results =
        multicall::multicall(&params.network, provider.as_ref(), &abi, &calls, options).await?;
    to_value(&results)
}

/// `[target, function, args?]`
fn parse_call(value: &Value) -> Result<Call> {
    let items = value
        .as_array()
        .filter(|items| (2..=3).contains(&items.len()))
        .ok_or_else(|| {
            ScoreError::invalid_params(format!(
                "call must be [target, function, args?], got {value}"
            ))
        })?;
    let text = |i: usize, what: &str| {
        items[i]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScoreError::invalid_params(format!("call {what} must be a string")))
    };

    let args = match items.get(2) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(args)) => args.clone(),
        Some(other) => {
            return Err(ScoreError::invalid_params(format!(
                "call args must be an array, got {other}"
            )))
        }
    };
    Ok(Call::new(text(0, "target")?, text(1, "function")?, args))
}

/// Fills in the configured page size when the caller gave none.
fn batch_options(raw: Value, config: &ApiConfig) -> Result<BatchOptions> {
    if raw.is_null() {
        return Ok(BatchOptions::default().with_limit(config.multicall_limit));
    }
    let has_limit = raw.get("limit").is_some();
    let mut options: BatchOptions = serde_json::from_value(raw)
        .map_err(|err| ScoreError::invalid_params(format!("Invalid multicall options: {err}")))?;
    if !has_limit {
        options.limit = config.multicall_limit;
    }
    Ok(options)
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|err| ScoreError::invalid_params(format!("Invalid {method} params: {err}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| ScoreError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::multicall::BlockTag;
    use serde_json::json;

    #[test]
    fn parses_call_triples() {
        let call = parse_call(&json!(["0xabc", "balanceOf", ["0xdef"]])).unwrap();
        assert_eq!(call.target, "0xabc");
        assert_eq!(call.function, "balanceOf");
        assert_eq!(call.args, vec![json!("0xdef")]);

        let call = parse_call(&json!(["0xabc", "totalSupply"])).unwrap();
        assert!(call.args.is_empty());
    }

    #[test]
    fn rejects_malformed_calls() {
        assert!(parse_call(&json!(["0xabc"])).is_err());
        assert!(parse_call(&json!([1, "balanceOf"])).is_err());
        assert!(parse_call(&json!(["0xabc", "balanceOf", "0xdef"])).is_err());
    }

    #[test]
    fn options_default_to_configured_limit() {
        let config = ApiConfig::from_lookup(|key| (key == "MULTICALL_LIMIT").then(|| "50".to_string()));

        let options = batch_options(Value::Null, &config).unwrap();
        assert_eq!(options.limit, 50);

        let options = batch_options(json!({ "blockTag": 123 }), &config).unwrap();
        assert_eq!(options.limit, 50);
        assert_eq!(options.block_tag, BlockTag::Number(123));

        let options = batch_options(json!({ "limit": 7 }), &config).unwrap();
        assert_eq!(options.limit, 7);
    }
}
