use ethers_core::types::H256;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Hash of block 1 of the chain which captures the flag,
/// `0x31553f1bb856b900a24d456f51ac4372fa57e08c5a16812db3ff87e63320bf26`.
pub const FLAG_BLOCK_HASH: H256 = H256([
    0x31, 0x55, 0x3f, 0x1b, 0xb8, 0x56, 0xb9, 0x00, 0xa2, 0x4d, 0x45, 0x6f, 0x51, 0xac, 0x43, 0x72,
    0xfa, 0x57, 0xe0, 0x8c, 0x5a, 0x16, 0x81, 0x2d, 0xb3, 0xff, 0x87, 0xe6, 0x33, 0x20, 0xbf, 0x26,
]);
pub const DEFAULT_READY_TIMEOUT_MILLIS: u64 = 3_000;

/// What the client must report once it is serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// `eth_blockNumber` returns `number`.
    HeadNumber { number: u64 },
    /// `eth_getBlockByNumber(number)` returns a block with `hash`.
    BlockHash { number: u64, hash: H256 },
}

impl Default for Expectation {
    fn default() -> Self {
        Expectation::BlockHash {
            number: 1,
            hash: FLAG_BLOCK_HASH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub harness: client_harness::Config,
    /// Use an existing binary instead of building the client.
    pub skip_build: bool,
    pub ready_timeout_millis: u64,
    pub expectation: Expectation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            harness: client_harness::Config::default(),
            skip_build: false,
            ready_timeout_millis: DEFAULT_READY_TIMEOUT_MILLIS,
            expectation: Expectation::default(),
        }
    }
}

impl Config {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_millis)
    }

    /// Read a TOML config file.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Unable to read {}: {}", path.display(), e))?;
        toml::from_str(&contents).map_err(|e| format!("Unable to parse {}: {}", path.display(), e))
    }
}
