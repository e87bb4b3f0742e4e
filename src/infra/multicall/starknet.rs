use alloy_primitives::{keccak256, U256};
use futures_util::future::try_join_all;
use serde_json::Value;

use super::interface::StarknetAbi;
use super::{Call, CallOptions, Decoded, Outputs, ReadProvider, StarknetCall};
use crate::error::{Result, ScoreError};
use crate::types;

const AGGREGATE: &str = "aggregate";
const SHORT_STRING_MAX: usize = 31;
/// Felts in a response ahead of the first result segment: block number and result count.
const RESPONSE_HEADER: usize = 2;

/// Stark field prime, 2^251 + 17 * 2^192 + 1.
const FIELD_PRIME: U256 = U256::from_limbs([1, 0, 0, 0x0800_0000_0000_0011]);

#[derive(Debug, Clone)]
struct EncodedCall<'a> {
    to: U256,
    selector: U256,
    calldata: Vec<U256>,
    output: Option<&'a str>,
}

/// Batches `calls` through the Starknet multicall contract at `address`.
///
/// Results are one-element vectors so they line up with the EVM adapter's
/// shape. Only the first declared output type of a function is decoded.
pub async fn multicall<P>(
    address: &str,
    provider: &P,
    abi: &StarknetAbi,
    calls: &[Call],
    limit: usize,
    options: CallOptions,
) -> Result<Vec<Outputs>>
where
    P: ReadProvider + ?Sized,
{
    let aggregator = parse_felt(address).map_err(|_| ScoreError::InvalidAddress(address.to_string()))?;
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
    aggregator: U256,
    chunk: &[EncodedCall<'_>],
    options: CallOptions,
) -> Result<Vec<Outputs>>
where
    P: ReadProvider + ?Sized,
{
    let request = StarknetCall {
        contract_address: felt_hex(&aggregator),
        entry_point_selector: felt_hex(&selector(AGGREGATE)),
        calldata: aggregate_calldata(chunk),
    };

    let response = provider.starknet_call(&request, options.block_tag).await?;
    let felts = response
        .iter()
        .map(|felt| parse_felt(felt))
        .collect::<Result<Vec<_>>>()
        .map_err(|err| ScoreError::Decode(format!("Malformed Starknet response: {err}")))?;

    let body = felts.get(RESPONSE_HEADER..).ok_or_else(|| {
        ScoreError::Decode(format!(
            "Starknet response has {} felts, expected at least {RESPONSE_HEADER}",
            felts.len()
        ))
    })?;
    let segments = partition(body, chunk.len())?;

    Ok(chunk
        .iter()
        .zip(segments)
        .map(|(call, raw)| vec![decode_result(call.output, raw)])
        .collect())
}

fn encode_call<'a>(abi: &'a StarknetAbi, call: &Call) -> Result<EncodedCall<'a>> {
    let to = parse_felt(&call.target).map_err(|_| ScoreError::InvalidAddress(call.target.clone()))?;
    let function = abi
        .function(&call.function)
        .ok_or_else(|| ScoreError::Abi(format!("Function `{}` not found in ABI", call.function)))?;

    let mut calldata = Vec::new();
    for arg in &call.args {
        push_felts(arg, &mut calldata)?;
    }

    Ok(EncodedCall {
        to,
        selector: selector(&call.function),
        calldata,
        output: function.output_type(),
    })
}

/// `[n, (to, selector, len, ...calldata) * n]`, the `Array<Call>` argument of `aggregate`.
fn aggregate_calldata(chunk: &[EncodedCall<'_>]) -> Vec<String> {
    let mut out = Vec::with_capacity(1 + chunk.iter().map(|c| 3 + c.calldata.len()).sum::<usize>());
    out.push(felt_hex(&U256::from(chunk.len())));
    for call in chunk {
        out.push(felt_hex(&call.to));
        out.push(felt_hex(&call.selector));
        out.push(felt_hex(&U256::from(call.calldata.len())));
        out.extend(call.calldata.iter().map(felt_hex));
    }
    out
}

/// Splits the flat body into one segment per call, each prefixed by its own length.
pub fn partition(felts: &[U256], expected: usize) -> Result<Vec<&[U256]>> {
    let mut segments = Vec::with_capacity(expected);
    let mut cursor = 0;
    while cursor < felts.len() {
        let len = felt_to_usize(&felts[cursor])
            .ok_or_else(|| ScoreError::Decode("Segment length out of range".to_string()))?;
        cursor += 1;
        let end = cursor
            .checked_add(len)
            .filter(|end| *end <= felts.len())
            .ok_or_else(|| {
                ScoreError::Decode(format!(
                    "Segment of {len} felts at offset {cursor} overruns response of {}",
                    felts.len()
                ))
            })?;
        segments.push(&felts[cursor..end]);
        cursor = end;
    }

    if segments.len() != expected {
        return Err(ScoreError::Decode(format!(
            "Starknet multicall returned {} results for {expected} calls",
            segments.len()
        )));
    }
    Ok(segments)
}

/// Decodes `raw` by its declared Cairo type.
///
/// Only the leading felts the type needs are read, so outputs declared after
/// the first one are ignored. Unknown types and segments too short for their
/// type come back undecoded.
pub fn decode_result(output: Option<&str>, raw: &[U256]) -> Decoded {
    output
        .and_then(|ty| decode_typed(ty, raw))
        .unwrap_or_else(|| raw_value(raw))
}

fn decode_typed(ty: &str, raw: &[U256]) -> Option<Decoded> {
    let name = ty.rsplit("::").next().unwrap_or(ty);
    match name {
        "felt252" | "felt" => {
            let felt = raw.first()?;
            Some(Decoded::String(
                decode_short_string(felt).unwrap_or_else(|| felt_hex(felt)),
            ))
        }
        "u8" | "u16" | "u32" | "u64" | "u128" => raw.first().map(|v| Decoded::Uint(*v)),
        "u256" => {
            let [low, high, ..] = raw else { return None };
            if low.bit_len() > 128 || high.bit_len() > 128 {
                return None;
            }
            Some(Decoded::Uint(*low | (*high << 128)))
        }
        _ => None,
    }
}

fn raw_value(raw: &[U256]) -> Decoded {
    match raw {
        [felt] => Decoded::String(felt_hex(felt)),
        _ => Decoded::List(raw.iter().map(|f| Decoded::String(felt_hex(f))).collect()),
    }
}

/// `starknet_keccak`: keccak256 of the name truncated to 250 bits.
pub fn selector(name: &str) -> U256 {
    let mut hash = keccak256(name.as_bytes()).0;
    hash[0] &= 0x03;
    U256::from_be_bytes(hash)
}

pub fn encode_short_string(text: &str) -> Option<U256> {
    if text.len() > SHORT_STRING_MAX || !text.is_ascii() {
        return None;
    }
    Some(U256::from_be_slice(text.as_bytes()))
}

pub fn decode_short_string(felt: &U256) -> Option<String> {
    let bytes = felt.to_be_bytes::<32>();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let text = &bytes[start..];
    if text.len() > SHORT_STRING_MAX || !text.iter().all(|b| (0x20..0x7f).contains(b)) {
        return None;
    }
    String::from_utf8(text.to_vec()).ok()
}

fn push_felts(value: &Value, out: &mut Vec<U256>) -> Result<()> {
    match value {
        Value::Array(items) => {
            out.push(U256::from(items.len()));
            for item in items {
                push_felts(item, out)?;
            }
        }
        Value::Bool(b) => out.push(U256::from(u8::from(*b))),
        Value::Number(n) => {
            let n = n
                .as_u64()
                .ok_or_else(|| ScoreError::Abi(format!("Felt argument must be unsigned: {n}")))?;
            out.push(U256::from(n));
        }
        Value::String(s) => {
            let s = s.trim();
            let felt = if s.starts_with("0x") || s.starts_with("0X") || is_decimal(s) {
                parse_felt(s)
            } else {
                encode_short_string(s).ok_or_else(|| {
                    ScoreError::Abi(format!("`{s}` is not a felt or a short string"))
                })
            }?;
            out.push(felt);
        }
        other => {
            return Err(ScoreError::Abi(format!("Unsupported Starknet argument: {other}")));
        }
    }
    Ok(())
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a hex or decimal felt and checks it lies inside the field.
pub fn parse_felt(value: &str) -> Result<U256> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ScoreError::Abi(format!("Empty felt: `{value}`")));
    }
    let felt = types::parse_u256(trimmed)
        .map_err(|_| ScoreError::Abi(format!("Invalid felt: {value}")))?;
    if felt >= FIELD_PRIME {
        return Err(ScoreError::Abi(format!("Felt out of range: {value}")));
    }
    Ok(felt)
}

pub fn felt_hex(felt: &U256) -> String {
    types::u256_to_hex0x(felt)
}

fn felt_to_usize(felt: &U256) -> Option<usize> {
    let limbs = felt.as_limbs();
    if limbs[1..].iter().any(|l| *l != 0) {
        return None;
    }
    usize::try_from(limbs[0]).ok()
}
