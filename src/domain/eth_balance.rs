use serde::Deserialize;
use serde_json::Value;

use crate::abi;
use crate::domain::{Scores, StrategyContext};
use crate::error::{Result, ScoreError};
use crate::infra::multicall::{Abi, Decoded, Multicaller, Path};
use crate::network::{self, Protocol};
use crate::types;

pub const NAME: &str = "eth-balance";

#[derive(Debug, Deserialize)]
struct EthBalanceOptions {
    #[serde(default = "default_decimals")]
    decimals: u8,
}

impl Default for EthBalanceOptions {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
        }
    }
}

fn default_decimals() -> u8 {
    18
}

/// Native balance read through the aggregator's own `getEthBalance`.
pub async fn strategy(ctx: &StrategyContext<'_>, options: Value) -> Result<Scores> {
    let input: EthBalanceOptions = if options.is_null() {
        EthBalanceOptions::default()
    } else {
        serde_json::from_value(options)
            .map_err(|err| ScoreError::invalid_params(format!("Invalid {NAME} options: {err}")))?
    };

    if network::protocol(ctx.network) != Protocol::Evm {
        return Err(ScoreError::invalid_params(format!(
            "{NAME} is not available on network {}",
            ctx.network
        )));
    }
    let aggregator = network::multicall_address(ctx.network)
        .ok_or_else(|| ScoreError::missing_multicall_address(ctx.network))?;

    let abi = Abi::human_readable([abi::GET_ETH_BALANCE])?;
    let mut multi = Multicaller::new(ctx.network, ctx.provider, &abi, ctx.batch_options());
    for address in ctx.addresses {
        multi.call(
            Path::from([address.as_str()]),
            aggregator,
            "getEthBalance",
            vec![Value::String(address.clone())],
        );
    }
    let balances = multi.execute(None).await?;

    Ok(ctx
        .addresses
        .iter()
        .map(|address| {
            let raw = balances
                .get(address)
                .and_then(Decoded::as_uint)
                .unwrap_or_default();
            (address.clone(), types::units_to_f64(&raw, input.decimals))
        })
        .collect())
}
