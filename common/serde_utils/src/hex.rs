//! Utilities for `0x`-prefixed hex strings.

use serde::de::{self, Visitor};
use std::fmt;

/// Encode `data` as a `0x`-prefixed, lower-case hex string.
pub fn encode<T: AsRef<[u8]>>(data: T) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode a `0x`-prefixed hex string.
pub fn decode(s: &str) -> Result<Vec<u8>, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(stripped) => hex::decode(stripped).map_err(|e| format!("invalid hex: {:?}", e)),
        None => Err(format!("hex must have 0x prefix: {}", s)),
    }
}

/// Decode a hex string which may or may not carry the `0x` prefix.
///
/// Genesis files in the wild use both forms for account addresses.
pub fn decode_lenient(s: &str) -> Result<Vec<u8>, String> {
    let stripped = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(stripped).map_err(|e| format!("invalid hex: {:?}", e))
}

pub struct PrefixedHexVisitor;

impl<'de> Visitor<'de> for PrefixedHexVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a hex string with 0x prefix")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        decode(value).map_err(de::Error::custom)
    }
}
