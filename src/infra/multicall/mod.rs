//! Batched on-chain reads.
//!
//! [`multicall`] picks the adapter for a network (EVM or Starknet), resolves the
//! aggregator contract and pages the batch through it. [`Multicaller`] sits on
//! top and writes decoded results into a nested [`Decoded`] tree by path.

pub mod evm;
pub mod interface;
pub mod multicaller;
pub mod starknet;
pub mod value;

use std::fmt;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, ScoreError};
use crate::network::{self, Protocol};

pub use interface::{Abi, StarknetAbi};
pub use multicaller::Multicaller;
pub use value::{Decoded, Path, PathSegment};

pub const DEFAULT_LIMIT: usize = 500;

/// Decoded outputs of one call, one entry per declared return value.
pub type Outputs = Vec<Decoded>;

/// One logical read: `function(args)` on `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: String,
    pub function: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(target: impl Into<String>, function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            function: function.into(),
            args,
        }
    }
}

/// Block a batch is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Number(u64),
}

impl BlockTag {
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    pub fn to_eth_param(&self) -> Value {
        match self {
            Self::Latest => Value::String("latest".to_string()),
            Self::Number(n) => Value::String(format!("0x{n:x}")),
        }
    }

    pub fn to_starknet_param(&self) -> Value {
        match self {
            Self::Latest => Value::String("latest".to_string()),
            Self::Number(n) => serde_json::json!({ "block_number": n }),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        let parsed = match trimmed.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(Self::Number)
            .map_err(|_| ScoreError::invalid_params(format!("Invalid block tag: {trimmed}")))
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Number(n) => serializer.serialize_u64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for BlockTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self::Number(n)),
            Raw::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    #[serde(default)]
    pub block_tag: BlockTag,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub multicall_address: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            block_tag: BlockTag::Latest,
            limit: DEFAULT_LIMIT,
            multicall_address: None,
        }
    }
}

impl BatchOptions {
    pub fn at(block_tag: BlockTag) -> Self {
        Self {
            block_tag,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_multicall_address(mut self, address: impl Into<String>) -> Self {
        self.multicall_address = Some(address.into());
        self
    }
}

/// What the adapters forward with each aggregate call once `limit` and the
/// aggregator address have been taken out of [`BatchOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallOptions {
    pub block_tag: BlockTag,
}

/// A Starknet `call` request, felts as `0x` hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StarknetCall {
    pub contract_address: String,
    pub entry_point_selector: String,
    pub calldata: Vec<String>,
}

/// Read-only chain access used by the adapters.
#[async_trait(?Send)]
pub trait ReadProvider {
    async fn eth_call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes>;

    async fn starknet_call(&self, call: &StarknetCall, block: BlockTag) -> Result<Vec<String>>;
}

/// Runs `calls` through the aggregator of `network`; `result[i]` answers `calls[i]`.
///
/// The aggregator address is resolved before any I/O. The whole batch fails if
/// any page fails.
pub async fn multicall<P>(
    network: &str,
    provider: &P,
    abi: &Abi,
    calls: &[Call],
    options: BatchOptions,
) -> Result<Vec<Outputs>>
where
    P: ReadProvider + ?Sized,
{
    let BatchOptions {
        block_tag,
        limit,
        multicall_address,
    } = options;

    let address = match multicall_address {
        Some(address) => address,
        None => network::multicall_address(network)
            .map(str::to_string)
            .ok_or_else(|| ScoreError::missing_multicall_address(network))?,
    };
    let limit = limit.max(1);
    let call_options = CallOptions { block_tag };

    match network::protocol(network) {
        Protocol::Evm => {
            evm::multicall(&address, provider, abi.as_evm()?, calls, limit, call_options).await
        }
        Protocol::Starknet => {
            starknet::multicall(
                &address,
                provider,
                abi.as_starknet()?,
                calls,
                limit,
                call_options,
            )
            .await
        }
    }
}
