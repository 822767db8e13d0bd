//! Serde helpers for the JSON shapes used by execution clients: `0x`-prefixed hex byte strings
//! and "quantities" which geth accepts as JSON numbers, hex strings or decimal strings.

pub mod hex;
pub mod hex_vec;
mod quantity;

pub use quantity::{u256_quantity, u256_quantity_opt, u64_quantity, u64_quantity_opt};
