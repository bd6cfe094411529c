//! Conversions between field elements and their wire encodings.
//!
//! Field elements exceed every native integer width, so they travel as
//! decimal strings (commitments, witness values) or as `0x` hex strings
//! (block hashes). Both are reduced modulo the BN254 scalar field order.

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use super::CodecError;

pub use ark_bn254::Fr;

/// Reduces an arbitrary unsigned integer into the field.
pub fn reduce(value: &BigUint) -> Fr {
    Fr::from_be_bytes_mod_order(&value.to_bytes_be())
}

/// Canonical integer representative of a field element.
pub fn to_biguint(value: &Fr) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Decimal string encoding used for commitments and witness values.
pub fn to_decimal(value: &Fr) -> String {
    to_biguint(value).to_str_radix(10)
}

/// Parses a decimal string, reducing it modulo the field order.
pub fn parse_decimal(input: &str) -> Result<Fr, CodecError> {
    let trimmed = input.trim();
    let value: BigUint = trimmed
        .parse()
        .map_err(|_| CodecError::InvalidDecimal(trimmed.to_string()))?;
    Ok(reduce(&value))
}

/// Parses a `0x`-prefixed 256-bit block hash and reduces it into the field.
pub fn parse_blockhash(hash: &str) -> Result<Fr, CodecError> {
    let trimmed = hash.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(CodecError::InvalidBlockhash(trimmed.to_string()));
    }

    let value = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| CodecError::InvalidBlockhash(trimmed.to_string()))?;
    Ok(reduce(&value))
}

/// Serde adapter for fields holding a bare [`Fr`] as a decimal string.
pub mod fr_decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Fr, parse_decimal, to_decimal};

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_decimal(&raw).map_err(serde::de::Error::custom)
    }
}
