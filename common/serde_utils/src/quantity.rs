//! Integer "quantities" as found in genesis files and JSON-RPC responses.
//!
//! Serialization always emits the compact `0x`-prefixed hex form used by JSON-RPC. Deserialization
//! is lenient in the same way geth's `HexOrDecimal` types are: a JSON number, a `0x` hex string or
//! a decimal string are all accepted.

use ethers_core::types::U256;
use serde::de::{self, Visitor};
use std::fmt;

fn parse_u64(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Err("empty hex quantity".to_string()),
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex u64: {}", e)),
        None => s.parse().map_err(|e| format!("invalid decimal u64: {}", e)),
    }
}

fn parse_u256(s: &str) -> Result<U256, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Err("empty hex quantity".to_string()),
        Some(hex) => {
            U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex u256: {:?}", e))
        }
        None => U256::from_dec_str(s).map_err(|e| format!("invalid decimal u256: {:?}", e)),
    }
}

struct U64QuantityVisitor;

impl<'de> Visitor<'de> for U64QuantityVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an unsigned integer, hex string or decimal string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value).map_err(|_| E::custom(format!("negative quantity {}", value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        parse_u64(value).map_err(E::custom)
    }
}

struct U256QuantityVisitor;

impl<'de> Visitor<'de> for U256QuantityVisitor {
    type Value = U256;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an unsigned integer, hex string or decimal string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<U256, E> {
        Ok(value.into())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<U256, E> {
        u64::try_from(value)
            .map(Into::into)
            .map_err(|_| E::custom(format!("negative quantity {}", value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<U256, E> {
        parse_u256(value).map_err(E::custom)
    }
}

pub mod u64_quantity {
    use super::U64QuantityVisitor;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(num: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", num))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(U64QuantityVisitor)
    }
}

pub mod u64_quantity_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(transparent)]
    struct Wrapper(#[serde(with = "super::u64_quantity")] u64);

    pub fn serialize<S: Serializer>(num: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match num {
            Some(num) => super::u64_quantity::serialize(num, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

pub mod u256_quantity {
    use super::U256QuantityVisitor;
    use ethers_core::types::U256;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(num: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", num))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(U256QuantityVisitor)
    }
}

pub mod u256_quantity_opt {
    use ethers_core::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(transparent)]
    struct Wrapper(#[serde(with = "super::u256_quantity")] U256);

    pub fn serialize<S: Serializer>(num: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match num {
            Some(num) => super::u256_quantity::serialize(num, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Quantities {
        #[serde(with = "u64_quantity")]
        small: u64,
        #[serde(with = "u256_quantity")]
        big: U256,
        #[serde(default, with = "u64_quantity_opt")]
        maybe: Option<u64>,
    }

    #[test]
    fn accepts_every_geth_form() {
        let hex: Quantities =
            serde_json::from_str(r#"{"small":"0x10","big":"0x400","maybe":"0x1"}"#).unwrap();
        let dec: Quantities =
            serde_json::from_str(r#"{"small":"16","big":"1024","maybe":1}"#).unwrap();
        let num: Quantities = serde_json::from_str(r#"{"small":16,"big":1024,"maybe":1}"#).unwrap();

        assert_eq!(hex, dec);
        assert_eq!(dec, num);
        assert_eq!(num.big, U256::from(1024));
    }

    #[test]
    fn absent_optional_is_none() {
        let q: Quantities = serde_json::from_str(r#"{"small":0,"big":0}"#).unwrap();
        assert_eq!(q.maybe, None);
    }

    #[test]
    fn rejects_garbage() {
        serde_json::from_str::<Quantities>(r#"{"small":"0x","big":0}"#).unwrap_err();
        serde_json::from_str::<Quantities>(r#"{"small":-1,"big":0}"#).unwrap_err();
        serde_json::from_str::<Quantities>(r#"{"small":0,"big":"0xzz"}"#).unwrap_err();
    }

    #[test]
    fn serializes_as_compact_hex() {
        let q = Quantities {
            small: 0,
            big: U256::from(1_000_000_000u64),
            maybe: None,
        };
        assert_eq!(
            serde_json::to_string(&q).unwrap(),
            r#"{"small":"0x0","big":"0x3b9aca00","maybe":null}"#
        );
    }
}
