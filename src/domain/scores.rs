use std::collections::HashSet;
use std::rc::Rc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{strategies, Scores, StrategyContext};
use crate::error::{Result, ScoreError};
use crate::infra::config::ApiConfig;
use crate::infra::multicall::{BlockTag, ReadProvider};
use crate::infra::ProviderFactory;

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoresRequest {
    #[serde(default)]
    pub space: String,
    pub network: String,
    #[serde(default)]
    pub snapshot: BlockTag,
    pub addresses: Vec<String>,
    pub strategies: Vec<StrategySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VpRequest {
    pub address: String,
    #[serde(default)]
    pub space: String,
    pub network: String,
    #[serde(default)]
    pub snapshot: BlockTag,
    pub strategies: Vec<StrategySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VotingPower {
    pub vp: f64,
    pub vp_by_strategy: Vec<f64>,
    pub vp_state: &'static str,
}

/// One `Scores` per strategy, in strategy order.
///
/// Strategies run concurrently. Names and providers are checked before any
/// chain read, and the first failing strategy fails the whole request.
pub async fn get_scores<F>(
    factory: &F,
    config: &ApiConfig,
    request: &ScoresRequest,
) -> Result<Vec<Scores>>
where
    F: ProviderFactory + ?Sized,
{
    let addresses = normalize_addresses(&request.addresses, config.max_addresses)?;

    let mut prepared: Vec<(&StrategySpec, &str, Rc<dyn ReadProvider>)> =
        Vec::with_capacity(request.strategies.len());
    for spec in &request.strategies {
        strategies::ensure_known(&spec.name)?;
        let network = spec.network.as_deref().unwrap_or(&request.network);
        prepared.push((spec, network, factory.provider(network)?));
    }

    let runs = prepared.iter().map(|(spec, network, provider)| {
        let ctx = StrategyContext {
            space: &request.space,
            network,
            snapshot: request.snapshot,
            addresses: &addresses,
            provider: provider.as_ref(),
            multicall_limit: config.multicall_limit,
        };
        async move { strategies::run(&spec.name, &ctx, spec.params.clone()).await }
    });

    try_join_all(runs).await
}

pub async fn get_vp<F>(factory: &F, config: &ApiConfig, request: &VpRequest) -> Result<VotingPower>
where
    F: ProviderFactory + ?Sized,
{
    let address = request.address.trim().to_string();
    let scores = get_scores(
        factory,
        config,
        &ScoresRequest {
            space: request.space.clone(),
            network: request.network.clone(),
            snapshot: request.snapshot,
            addresses: vec![address.clone()],
            strategies: request.strategies.clone(),
        },
    )
    .await?;

    let vp_by_strategy = scores
        .iter()
        .map(|s| s.get(&address).copied().unwrap_or(0.0))
        .collect::<Vec<_>>();
    Ok(VotingPower {
        vp: vp_by_strategy.iter().sum(),
        vp_by_strategy,
        vp_state: if request.snapshot.is_latest() {
            "pending"
        } else {
            "final"
        },
    })
}

/// Trims, drops case-insensitive duplicates keeping the first spelling, and
/// enforces `1..=max` entries.
pub fn normalize_addresses(addresses: &[String], max: usize) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(addresses.len());
    let mut out = Vec::with_capacity(addresses.len());
    for address in addresses {
        let address = address.trim();
        if address.is_empty() {
            return Err(ScoreError::InvalidAddress(String::new()));
        }
        if seen.insert(address.to_ascii_lowercase()) {
            out.push(address.to_string());
        }
    }

    if out.is_empty() {
        return Err(ScoreError::invalid_params(
            "addresses must not be empty".to_string(),
        ));
    }
    if out.len() > max {
        return Err(ScoreError::invalid_params(format!(
            "too many addresses: {} (max {max})",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn dedupes_preserving_first_spelling() {
        let out = normalize_addresses(&strings(&["0xAbC", " 0xdef ", "0xabc"]), 10).unwrap();
        assert_eq!(out, strings(&["0xAbC", "0xdef"]));
    }

    #[test]
    fn rejects_empty_and_oversized_lists() {
        assert!(normalize_addresses(&[], 10).is_err());
        assert!(normalize_addresses(&strings(&["0x1", "0x2", "0x3"]), 2).is_err());
        assert!(normalize_addresses(&strings(&["0x1", "0x1", "0x1"]), 2).is_ok());
    }

    #[test]
    fn parses_requests_with_defaults() {
        let req: ScoresRequest = serde_json::from_value(serde_json::json!({
            "network": "1",
            "addresses": ["0x1"],
            "strategies": [{ "name": "ticket" }]
        }))
        .unwrap();
        assert_eq!(req.snapshot, BlockTag::Latest);
        assert!(req.strategies[0].params.is_null());
        assert!(req.strategies[0].network.is_none());
    }
}
