use std::collections::HashMap;

use worker::Env;

use crate::infra::multicall::DEFAULT_LIMIT;
use crate::infra::rpc::{RPC_DEFAULT_MAX_RETRIES, RPC_DEFAULT_TIMEOUT_MS};

pub const DEFAULT_BROVIDER_URL: &str = "https://rpc.snapshot.org";
pub const DEFAULT_MAX_ADDRESSES: usize = 1000;

const ENV_KEYS: [&str; 7] = [
    "BROVIDER_URL",
    "RPC_URLS",
    "RPC_TIMEOUT_MS",
    "RPC_MAX_RETRIES",
    "MULTICALL_LIMIT",
    "MAX_ADDRESSES",
    "CORS_ALLOW_ORIGIN",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub brovider_url: String,
    pub rpc_urls: HashMap<String, String>,
    pub rpc_timeout_ms: u64,
    pub rpc_max_retries: u8,
    pub multicall_limit: usize,
    pub max_addresses: usize,
    pub cors_allow_origin: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ApiConfig {
    pub fn from_env(env: &Env) -> Self {
        let vars = ENV_KEYS
            .iter()
            .filter_map(|key| env.var(key).ok().map(|v| (*key, v.to_string())))
            .collect::<HashMap<_, _>>();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Builds the config from any key lookup; blank or unparsable values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let brovider_url = get("BROVIDER_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BROVIDER_URL.to_string());
        let rpc_urls = get("RPC_URLS")
            .map(|v| parse_rpc_urls(&v))
            .unwrap_or_default();
        let rpc_timeout_ms = get("RPC_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(RPC_DEFAULT_TIMEOUT_MS);
        let rpc_max_retries = get("RPC_MAX_RETRIES")
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(RPC_DEFAULT_MAX_RETRIES);
        let multicall_limit = get("MULTICALL_LIMIT")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let max_addresses = get("MAX_ADDRESSES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_ADDRESSES);
        let cors_allow_origin = get("CORS_ALLOW_ORIGIN").unwrap_or_default();

        Self {
            brovider_url,
            rpc_urls,
            rpc_timeout_ms,
            rpc_max_retries,
            multicall_limit,
            max_addresses,
            cors_allow_origin,
        }
    }

    /// Endpoint for `network`: an explicit `RPC_URLS` entry, else the brovider.
    pub fn rpc_url(&self, network: &str) -> String {
        let network = network.trim();
        self.rpc_urls
            .get(network)
            .cloned()
            .unwrap_or_else(|| format!("{}/{}", self.brovider_url, network))
    }
}

/// `net=url,net=url`; malformed entries are skipped.
fn parse_rpc_urls(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|entry| {
            let (network, url) = entry.split_once('=')?;
            let (network, url) = (network.trim(), url.trim());
            (!network.is_empty() && !url.is_empty())
                .then(|| (network.to_string(), url.to_string()))
        })
        .collect()
}
