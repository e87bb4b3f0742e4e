use serde::Serialize;
use serde_json::Value;

use crate::domain::{erc20_balance_of, eth_balance, ticket, Scores, StrategyContext};
use crate::error::{Result, ScoreError};

#[derive(Debug, Serialize)]
pub struct StrategyDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "paramsSchema")]
    pub params_schema: Value,
}

pub fn exists(name: &str) -> bool {
    matches!(name, erc20_balance_of::NAME | eth_balance::NAME | ticket::NAME)
}

pub fn ensure_known(name: &str) -> Result<()> {
    if exists(name) {
        Ok(())
    } else {
        Err(ScoreError::UnknownStrategy(name.to_string()))
    }
}

pub async fn run(name: &str, ctx: &StrategyContext<'_>, options: Value) -> Result<Scores> {
    match name {
        erc20_balance_of::NAME => erc20_balance_of::strategy(ctx, options).await,
        eth_balance::NAME => eth_balance::strategy(ctx, options).await,
        ticket::NAME => ticket::strategy(ctx, options).await,
        _ => Err(ScoreError::UnknownStrategy(name.to_string())),
    }
}

pub fn list() -> Value {
    serde_json::json!({ "strategies": definitions() })
}

fn definitions() -> Vec<StrategyDefinition> {
    vec![
        StrategyDefinition {
            name: erc20_balance_of::NAME,
            description: "Token balance of each address (balanceOf / balance_of).",
            params_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "address": { "type": "string" },
                    "decimals": { "type": "integer" },
                    "symbol": { "type": "string" }
                },
                "required": ["address"]
            }),
        },
        StrategyDefinition {
            name: eth_balance::NAME,
            description: "Native balance of each address, read through the network's multicall contract.",
            params_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "decimals": { "type": "integer" }
                }
            }),
        },
        StrategyDefinition {
            name: ticket::NAME,
            description: "One fixed score per address.",
            params_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "value": { "type": "number" }
                }
            }),
        },
    ]
}
