use std::str::FromStr;

use alloy_primitives::{Address, U256};
use uuid::Uuid;
use worker::Request;

use crate::error::{Result, ScoreError};

pub fn now_ms() -> i64 {
    worker::Date::now().as_millis() as i64
}

pub fn get_trace_id(req: &Request) -> String {
    req.headers()
        .get("x-request-id")
        .ok()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn get_header(req: &Request, name: &str) -> Option<String> {
    req.headers().get(name).ok().flatten()
}

pub fn get_client_ip(req: &Request) -> String {
    if let Some(ip) = get_header(req, "CF-Connecting-IP") {
        let trimmed = ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    if let Some(ip) = get_header(req, "x-forwarded-for") {
        let first = ip.split(',').next().map(|v| v.trim()).unwrap_or_default();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    "unknown".to_string()
}

/// Parses an EVM address without enforcing EIP-55 checksum casing.
pub fn parse_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    Address::from_str(&trimmed.to_lowercase())
        .map_err(|_| ScoreError::InvalidAddress(trimmed.to_string()))
}

pub fn parse_u256_hex(value: &str) -> Result<U256> {
    let trimmed = value.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(trimmed, 16)
        .map_err(|_| ScoreError::invalid_params(format!("Invalid hex U256: {value}")))
}

/// Accepts `0x`-prefixed hex or plain decimal.
pub fn parse_u256(value: &str) -> Result<U256> {
    let trimmed = value.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return parse_u256_hex(&trimmed[2..]);
    }
    U256::from_str_radix(trimmed, 10)
        .map_err(|_| ScoreError::invalid_params(format!("Invalid U256: {trimmed}")))
}

pub fn u256_to_hex0x(value: &U256) -> String {
    format!("0x{value:x}")
}

pub fn bytes_to_hex0x<B: AsRef<[u8]>>(bytes: B) -> String {
    format!("0x{}", hex::encode(bytes.as_ref()))
}

pub fn hex0x_to_bytes(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(trimmed).map_err(|err| ScoreError::invalid_params(format!("Invalid hex: {err}")))
}

pub fn format_units(value: &U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let raw = value.to_string();
    let decimals_usize = decimals as usize;
    if raw == "0" {
        return "0".to_string();
    }

    if raw.len() <= decimals_usize {
        let mut padded = String::with_capacity(decimals_usize + 2);
        padded.push_str("0.");
        for _ in 0..(decimals_usize - raw.len()) {
            padded.push('0');
        }
        padded.push_str(&raw);
        return trim_trailing_zeros(&padded);
    }

    let split = raw.len() - decimals_usize;
    let (int_part, frac_part) = raw.split_at(split);
    let formatted = format!("{int_part}.{frac_part}");
    trim_trailing_zeros(&formatted)
}

/// Scales a raw integer amount into a float score.
pub fn units_to_f64(value: &U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse::<f64>().unwrap_or(0.0)
}

fn trim_trailing_zeros(value: &str) -> String {
    if let Some((int_part, frac_part)) = value.split_once('.') {
        let trimmed_frac = frac_part.trim_end_matches('0');
        if trimmed_frac.is_empty() {
            return int_part.to_string();
        }
        return format!("{int_part}.{trimmed_frac}");
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_units_with_decimals() {
        let value = U256::from(1234500u64);
        assert_eq!(format_units(&value, 6), "1.2345");
    }

    #[test]
    fn formats_units_small_values() {
        let value = U256::from(1u64);
        assert_eq!(format_units(&value, 18), "0.000000000000000001");
    }

    #[test]
    fn scales_units_to_float() {
        let value = U256::from(2_500_000_000_000_000_000u128);
        assert_eq!(units_to_f64(&value, 18), 2.5);
        assert_eq!(units_to_f64(&U256::ZERO, 18), 0.0);
    }

    #[test]
    fn parses_mixed_case_address() {
        let addr = parse_address("0x5C7F8A570d578ED84E63fdFA7b1eE72dEae1AE23").unwrap();
        assert_ne!(addr, Address::ZERO);
        let lower = parse_address("0x5c7f8a570d578ed84e63fdfa7b1ee72deae1ae23").unwrap();
        assert_eq!(addr, lower);
    }

    #[test]
    fn rejects_invalid_address() {
        let err = parse_address("0x1234").unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid address"));
    }

    #[test]
    fn parses_u256_decimal_and_hex() {
        assert_eq!(parse_u256("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_u256("0x2a").unwrap(), U256::from(42u64));
    }

    #[test]
    fn rejects_invalid_u256() {
        let err = parse_u256("not-a-number").unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid u256"));
        let err = parse_u256_hex("0xzz").unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid hex"));
    }

    #[test]
    fn hex_roundtrip() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef];
        let encoded = bytes_to_hex0x(&bytes);
        assert_eq!(encoded, "0xdeadbeef");
        let decoded = hex0x_to_bytes(&encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn formats_u256_as_hex() {
        assert_eq!(u256_to_hex0x(&U256::from(255u64)), "0xff");
        assert_eq!(u256_to_hex0x(&U256::ZERO), "0x0");
    }
}
