use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use futures_util::future::try_join_all;
use serde_json::Value;

use super::interface::find_function;
use super::{Call, CallOptions, Decoded, Outputs, ReadProvider};
use crate::abi;
use crate::error::{Result, ScoreError};
use crate::types;

#[derive(Debug, Clone)]
struct EncodedCall<'a> {
    target: Address,
    data: Bytes,
    function: &'a Function,
}

/// Batches `calls` through the Multicall `aggregate` contract at `address`.
///
/// Every call is encoded up front so a bad argument fails before any request
/// goes out. Pages run concurrently and results come back in input order.
pub async fn multicall<P>(
    address: &str,
    provider: &P,
    abi: &JsonAbi,
    calls: &[Call],
    limit: usize,
    options: CallOptions,
) -> Result<Vec<Outputs>>
where
    P: ReadProvider + ?Sized,
{
    let aggregator = types::parse_address(address)?;
    let encoded = calls
        .iter()
        .map(|call| encode_call(abi, call))
        .collect::<Result<Vec<_>>>()?;

    let pages = encoded
        .chunks(limit.max(1))
        .enumerate()
        .map(|(page, chunk)| async move {
            run_page(provider, aggregator, chunk, options)
                .await
                .map_err(|err| ScoreError::batch_execution(page, err))
        });

    let results = try_join_all(pages).await?;
    Ok(results.into_iter().flatten().collect())
}

async fn run_page<P>(
    provider: &P,
    aggregator: Address,
    chunk: &[EncodedCall<'_>],
    options: CallOptions,
) -> Result<Vec<Outputs>>
where
    P: ReadProvider + ?Sized,
{
    let request = abi::aggregateCall {
        calls: chunk
            .iter()
            .map(|call| abi::Call {
                target: call.target,
                callData: call.data.clone(),
            })
            .collect(),
    };

    let response = provider
        .eth_call(aggregator, Bytes::from(request.abi_encode()), options.block_tag)
        .await?;
    let decoded = abi::aggregateCall::abi_decode_returns(&response, true)
        .map_err(|err| ScoreError::Decode(format!("Multicall decode failed: {err}")))?;

    if decoded.returnData.len() != chunk.len() {
        return Err(ScoreError::Decode(format!(
            "Multicall returned {} results for {} calls",
            decoded.returnData.len(),
            chunk.len()
        )));
    }

    chunk
        .iter()
        .zip(decoded.returnData.iter())
        .map(|(call, data)| decode_output(call.function, data))
        .collect()
}

fn encode_call<'a>(abi: &'a JsonAbi, call: &Call) -> Result<EncodedCall<'a>> {
    let target = types::parse_address(&call.target)?;
    let function = find_function(abi, &call.function, call.args.len())?;
    let data = encode_input(function, &call.args)?;
    Ok(EncodedCall {
        target,
        data: Bytes::from(data),
        function,
    })
}

/// Selector followed by the ABI-encoded arguments.
pub fn encode_input(function: &Function, args: &[Value]) -> Result<Vec<u8>> {
    if function.inputs.len() != args.len() {
        return Err(ScoreError::Abi(format!(
            "`{}` expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (param, arg) in function.inputs.iter().zip(args) {
        let ty = param
            .resolve()
            .map_err(|err| ScoreError::Abi(format!("Unsupported type `{}`: {err}", param.ty)))?;
        values.push(coerce(&ty, arg)?);
    }

    function
        .abi_encode_input(&values)
        .map_err(|err| ScoreError::Abi(format!("Failed to encode `{}`: {err}", function.name)))
}

/// Decodes return data against the declared outputs, one entry per output.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Outputs> {
    let values = function
        .abi_decode_output(data, true)
        .map_err(|err| ScoreError::Decode(format!("Failed to decode `{}`: {err}", function.name)))?;
    values.iter().map(to_decoded).collect()
}

fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => Ok(DynSolValue::Array(
            items
                .iter()
                .map(|item| coerce(inner, item))
                .collect::<Result<_>>()?,
        )),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(ScoreError::Abi(format!(
                    "Expected {len} elements for `{ty}`, got {}",
                    items.len()
                )));
            }
            Ok(DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| coerce(inner, item))
                    .collect::<Result<_>>()?,
            ))
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(ScoreError::Abi(format!(
                    "Expected {} fields for `{ty}`, got {}",
                    types.len(),
                    items.len()
                )));
            }
            Ok(DynSolValue::Tuple(
                types
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| coerce(ty, item))
                    .collect::<Result<_>>()?,
            ))
        }
        (_, Value::String(s)) => coerce_text(ty, s),
        (_, Value::Number(n)) => coerce_text(ty, &n.to_string()),
        (_, Value::Bool(b)) => coerce_text(ty, if *b { "true" } else { "false" }),
        _ => Err(ScoreError::Abi(format!("Cannot use {value} as `{ty}`"))),
    }
}

fn coerce_text(ty: &DynSolType, text: &str) -> Result<DynSolValue> {
    let text = text.trim();
    // Checksum casing is not enforced for address arguments.
    let text = match ty {
        DynSolType::Address => text.to_ascii_lowercase(),
        _ => text.to_string(),
    };
    ty.coerce_str(&text)
        .map_err(|err| ScoreError::Abi(format!("Cannot use `{text}` as `{ty}`: {err}")))
}

fn to_decoded(value: &DynSolValue) -> Result<Decoded> {
    Ok(match value {
        DynSolValue::Bool(v) => Decoded::Bool(*v),
        DynSolValue::Int(v, _) => Decoded::Int(*v),
        DynSolValue::Uint(v, _) => Decoded::Uint(*v),
        DynSolValue::FixedBytes(word, size) => Decoded::Bytes(Bytes::copy_from_slice(&word[..*size])),
        DynSolValue::Address(v) => Decoded::Address(*v),
        DynSolValue::Function(v) => Decoded::Bytes(Bytes::copy_from_slice(v.as_slice())),
        DynSolValue::Bytes(v) => Decoded::Bytes(Bytes::copy_from_slice(v)),
        DynSolValue::String(v) => Decoded::String(v.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Decoded::List(items.iter().map(to_decoded).collect::<Result<_>>()?)
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(ScoreError::Decode(format!("Unsupported return value {other:?}")));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::multicall::Abi;
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;
    use serde_json::json;

    fn erc20() -> JsonAbi {
        match Abi::human_readable([
            "function balanceOf(address account) view returns (uint256)",
            "function symbol() view returns (string)",
            "function getReserves() view returns (uint112, uint112, uint32)",
        ])
        .unwrap()
        {
            Abi::Evm(abi) => abi,
            Abi::Starknet(_) => unreachable!(),
        }
    }

    #[test]
    fn address_casing_does_not_change_calldata() {
        let abi = erc20();
        let f = find_function(&abi, "balanceOf", 1).unwrap();
        let lower = encode_input(f, &[json!("0xd8da6bf26964af9d7eed9e03e53415d37aa96045")]).unwrap();
        let mixed = encode_input(f, &[json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")]).unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(&lower[..4], &abi::balanceOfCall::SELECTOR);
        assert_eq!(lower.len(), 4 + 32);
    }

    #[test]
    fn arity_mismatch_is_abi_error() {
        let abi = erc20();
        let f = find_function(&abi, "balanceOf", 1).unwrap();
        let err = encode_input(f, &[]).unwrap_err();
        assert!(matches!(err, ScoreError::Abi(_)));
    }

    #[test]
    fn bad_argument_is_abi_error() {
        let abi = erc20();
        let f = find_function(&abi, "balanceOf", 1).unwrap();
        let err = encode_input(f, &[json!("not-an-address")]).unwrap_err();
        assert!(matches!(err, ScoreError::Abi(_)));
    }

    #[test]
    fn decodes_single_and_multiple_outputs() {
        let abi = erc20();

        let balance = find_function(&abi, "balanceOf", 1).unwrap();
        let data = U256::from(42u64).abi_encode();
        assert_eq!(
            decode_output(balance, &data).unwrap(),
            vec![Decoded::Uint(U256::from(42u64))]
        );

        let symbol = find_function(&abi, "symbol", 0).unwrap();
        let data = String::from("VOTE").abi_encode();
        assert_eq!(
            decode_output(symbol, &data).unwrap(),
            vec![Decoded::String("VOTE".to_string())]
        );

        let reserves = find_function(&abi, "getReserves", 0).unwrap();
        let data = (U256::from(1u64), U256::from(2u64), U256::from(3u64)).abi_encode_params();
        let out = decode_output(reserves, &data).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], Decoded::Uint(U256::from(3u64)));
    }

    #[test]
    fn truncated_return_data_is_decode_error() {
        let abi = erc20();
        let f = find_function(&abi, "balanceOf", 1).unwrap();
        let err = decode_output(f, &[0u8; 7]).unwrap_err();
        assert!(matches!(err, ScoreError::Decode(_)));
    }

    #[test]
    fn coerces_numbers_and_nested_arrays() {
        let ty: DynSolType = "uint256[]".parse().unwrap();
        let value = coerce(&ty, &json!([1, "2", 3])).unwrap();
        assert_eq!(
            value,
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(1u64), 256),
                DynSolValue::Uint(U256::from(2u64), 256),
                DynSolValue::Uint(U256::from(3u64), 256),
            ])
        );
    }
}
