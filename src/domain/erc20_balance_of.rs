use serde::Deserialize;
use serde_json::Value;

use crate::abi;
use crate::domain::{Scores, StrategyContext};
use crate::error::{Result, ScoreError};
use crate::infra::multicall::interface::{StarknetFunction, StarknetOutput};
use crate::infra::multicall::{Abi, Decoded, Multicaller, Path, StarknetAbi};
use crate::network::{self, Protocol};
use crate::types;

pub const NAME: &str = "erc20-balance-of";

#[derive(Debug, Deserialize)]
struct Erc20BalanceOfOptions {
    address: String,
    #[serde(default = "default_decimals")]
    decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// Token balance of every address, scaled by `decimals`. A `symbol` option is
/// accepted for display and ignored here.
pub async fn strategy(ctx: &StrategyContext<'_>, options: Value) -> Result<Scores> {
    let input: Erc20BalanceOfOptions = serde_json::from_value(options)
        .map_err(|err| ScoreError::invalid_params(format!("Invalid {NAME} options: {err}")))?;
    if input.address.trim().is_empty() {
        return Err(ScoreError::invalid_params(
            "token address must not be empty".to_string(),
        ));
    }

    let (abi, function) = match network::protocol(ctx.network) {
        Protocol::Evm => (Abi::human_readable([abi::ERC20_BALANCE_OF])?, "balanceOf"),
        Protocol::Starknet => (Abi::Starknet(starknet_abi()), "balance_of"),
    };

    let mut multi = Multicaller::new(ctx.network, ctx.provider, &abi, ctx.batch_options());
    for address in ctx.addresses {
        multi.call(
            Path::from([address.as_str()]),
            input.address.trim(),
            function,
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

fn starknet_abi() -> StarknetAbi {
    StarknetAbi::new(vec![StarknetFunction {
        name: "balance_of".to_string(),
        outputs: vec![StarknetOutput {
            ty: "core::integer::u256".to_string(),
        }],
    }])
}
