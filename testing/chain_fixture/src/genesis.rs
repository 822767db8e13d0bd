//! The genesis file format understood by geth, and derivation of the genesis block from it.

use crate::block::Block;
use crate::error::Error;
use crate::header::Header;
use crate::trie::{empty_ommers_hash, empty_trie_root, sec_trie_root};
use eth_serde_utils::{hex_vec, u256_quantity, u256_quantity_opt, u64_quantity, u64_quantity_opt};
use ethers_core::types::{Address, Bloom, H256, H64, U256};
use ethers_core::utils::keccak256;
use ethers_core::utils::rlp::RlpStream;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Used when the genesis file specifies a gas limit of zero.
pub const DEFAULT_GAS_LIMIT: u64 = 4_712_388;
/// Base fee of a London genesis block which does not specify one.
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Fork activation points. Unknown keys (consensus engine sections, TTD, ...) are preserved so a
/// parsed genesis can be written back without loss.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homestead_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dao_fork_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip150_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip155_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip158_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byzantium_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constantinople_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub petersburg_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub istanbul_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muir_glacier_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub berlin_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub london_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow_glacier_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gray_glacier_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_netsplit_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shanghai_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancun_time: Option<u64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl ChainConfig {
    pub fn is_london(&self, number: u64) -> bool {
        is_forked(self.london_block, number)
    }

    pub fn is_shanghai(&self, number: u64, timestamp: u64) -> bool {
        self.is_london(number) && is_forked(self.shanghai_time, timestamp)
    }

    pub fn is_cancun(&self, number: u64, timestamp: u64) -> bool {
        self.is_london(number) && is_forked(self.cancun_time, timestamp)
    }
}

fn is_forked(activation: Option<u64>, at: u64) -> bool {
    activation.map_or(false, |activation| activation <= at)
}

/// A pre-funded account in the genesis allocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenesisAccount {
    #[serde(default, with = "hex_vec", skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<H256, H256>,
    #[serde(with = "u256_quantity")]
    pub balance: U256,
    #[serde(default, with = "u64_quantity", skip_serializing_if = "is_zero")]
    pub nonce: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl GenesisAccount {
    fn storage_root(&self) -> H256 {
        sec_trie_root(
            self.storage
                .iter()
                .filter(|(_, value)| !value.is_zero())
                .map(|(slot, value)| {
                    let trimmed = U256::from_big_endian(value.as_bytes());
                    (*slot, ethers_core::utils::rlp::encode(&trimmed))
                }),
        )
    }

    /// The account as stored in the state trie: `[nonce, balance, storage_root, code_hash]`.
    fn rlp_state_entry(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(4);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.storage_root());
        s.append(&H256::from(keccak256(&self.code)));
        s.out().to_vec()
    }
}

/// Account allocation keyed by address.
///
/// geth writes the keys without a `0x` prefix, so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenesisAlloc(pub BTreeMap<Address, GenesisAccount>);

impl Serialize for GenesisAlloc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GenesisAlloc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let raw = BTreeMap::<String, GenesisAccount>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, account)| -> Result<(Address, GenesisAccount), D::Error> {
                let bytes = eth_serde_utils::hex::decode_lenient(&key).map_err(D::Error::custom)?;
                if bytes.len() != Address::len_bytes() {
                    return Err(D::Error::custom(format!(
                        "alloc key {} is not a 20-byte address",
                        key
                    )));
                }
                Ok((Address::from_slice(&bytes), account))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(GenesisAlloc)
    }
}

/// A parsed genesis file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSpec {
    pub config: ChainConfig,
    #[serde(default, with = "u64_quantity")]
    pub nonce: u64,
    #[serde(default, with = "u64_quantity")]
    pub timestamp: u64,
    #[serde(default, with = "hex_vec")]
    pub extra_data: Vec<u8>,
    #[serde(with = "u64_quantity")]
    pub gas_limit: u64,
    #[serde(with = "u256_quantity")]
    pub difficulty: U256,
    #[serde(default)]
    pub mix_hash: H256,
    #[serde(default)]
    pub coinbase: Address,
    pub alloc: GenesisAlloc,
    #[serde(default, with = "u64_quantity")]
    pub number: u64,
    #[serde(default, with = "u64_quantity")]
    pub gas_used: u64,
    #[serde(default)]
    pub parent_hash: H256,
    #[serde(
        default,
        with = "u256_quantity_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_fee_per_gas: Option<U256>,
    #[serde(
        default,
        with = "u64_quantity_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub excess_blob_gas: Option<u64>,
    #[serde(
        default,
        with = "u64_quantity_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub blob_gas_used: Option<u64>,
}

impl GenesisSpec {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|error| Error::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedGenesis(e.to_string()))
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Root of the state trie holding every allocated account.
    pub fn state_root(&self) -> H256 {
        sec_trie_root(
            self.alloc
                .0
                .iter()
                .map(|(address, account)| (*address, account.rlp_state_entry())),
        )
    }

    /// The header a client derives when initialised with this genesis.
    pub fn to_header(&self) -> Header {
        // The base fee depends on London being active at block zero, not at `number`.
        let london = self.config.is_london(0);
        let shanghai = self.config.is_shanghai(self.number, self.timestamp);
        let cancun = self.config.is_cancun(self.number, self.timestamp);

        Header {
            parent_hash: self.parent_hash,
            ommers_hash: empty_ommers_hash(),
            beneficiary: self.coinbase,
            state_root: self.state_root(),
            transactions_root: empty_trie_root(),
            receipts_root: empty_trie_root(),
            logs_bloom: Bloom::zero(),
            difficulty: self.difficulty,
            number: self.number,
            gas_limit: if self.gas_limit == 0 {
                DEFAULT_GAS_LIMIT
            } else {
                self.gas_limit
            },
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            mix_hash: self.mix_hash,
            nonce: H64::from_low_u64_be(self.nonce),
            base_fee_per_gas: london
                .then(|| self.base_fee_per_gas.unwrap_or_else(|| INITIAL_BASE_FEE.into())),
            withdrawals_root: shanghai.then(empty_trie_root),
            blob_gas_used: cancun.then(|| self.blob_gas_used.unwrap_or(0)),
            excess_blob_gas: cancun.then(|| self.excess_blob_gas.unwrap_or(0)),
            parent_beacon_block_root: cancun.then(H256::zero),
            requests_hash: None,
        }
    }

    /// The genesis block: the derived header with empty bodies.
    pub fn to_block(&self) -> Block {
        let withdrawals = self
            .config
            .is_shanghai(self.number, self.timestamp)
            .then(Vec::new);
        Block::new(self.to_header(), vec![], vec![], withdrawals)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = r#"{
        "config": { "chainId": 1337, "homesteadBlock": 0, "ethash": {} },
        "gasLimit": "0x47e7c4",
        "difficulty": "0x20000",
        "alloc": {}
    }"#;

    #[test]
    fn minimal_genesis() {
        let spec = GenesisSpec::from_json(MINIMAL.as_bytes()).unwrap();
        assert_eq!(spec.chain_id(), 1337);
        assert_eq!(spec.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(spec.difficulty, U256::from(0x20000));
        assert!(spec.config.other.contains_key("ethash"));
        assert_eq!(spec.state_root(), empty_trie_root());

        let header = spec.to_header();
        assert_eq!(header.base_fee_per_gas, None);
        assert_eq!(header.withdrawals_root, None);
        assert_eq!(header.number, 0);
    }

    #[test]
    fn missing_required_fields() {
        for field in ["config", "gasLimit", "difficulty", "alloc"] {
            let mut json: Value = serde_json::from_str(MINIMAL).unwrap();
            json.as_object_mut().unwrap().remove(field);
            let bytes = serde_json::to_vec(&json).unwrap();
            assert!(
                matches!(GenesisSpec::from_json(&bytes), Err(Error::MalformedGenesis(_))),
                "{}",
                field
            );
        }
    }

    #[test]
    fn missing_chain_id() {
        let json = r#"{"config":{},"gasLimit":"0x1","difficulty":"0x1","alloc":{}}"#;
        assert!(matches!(
            GenesisSpec::from_json(json.as_bytes()),
            Err(Error::MalformedGenesis(_))
        ));
    }

    #[test]
    fn alloc_keys_with_and_without_prefix() {
        let json = r#"{
            "config": { "chainId": 1 },
            "gasLimit": "0x1",
            "difficulty": "0x1",
            "alloc": {
                "00000000000000000000000000000000000000aa": { "balance": "0x1" },
                "0x00000000000000000000000000000000000000bb": { "balance": "1", "nonce": "0x2" }
            }
        }"#;
        let spec = GenesisSpec::from_json(json.as_bytes()).unwrap();
        let bb = spec.alloc.0[&Address::from_low_u64_be(0xbb)].clone();
        assert_eq!(bb.nonce, 2);
        assert_eq!(bb.balance, U256::one());
        assert!(spec.alloc.0.contains_key(&Address::from_low_u64_be(0xaa)));

        let bad = json.replace("00000000000000000000000000000000000000aa", "aa");
        assert!(GenesisSpec::from_json(bad.as_bytes()).is_err());
    }

    #[test]
    fn zero_storage_does_not_change_root() {
        let mut account = GenesisAccount {
            balance: U256::from(7),
            ..Default::default()
        };
        let without = account.storage_root();
        account
            .storage
            .insert(H256::from_low_u64_be(1), H256::zero());
        assert_eq!(account.storage_root(), without);
        assert_eq!(without, empty_trie_root());

        account
            .storage
            .insert(H256::from_low_u64_be(2), H256::from_low_u64_be(5));
        assert_ne!(account.storage_root(), without);
    }

    #[test]
    fn london_shanghai_cancun_fields() {
        let mut spec = GenesisSpec::from_json(MINIMAL.as_bytes()).unwrap();
        spec.config.london_block = Some(0);
        assert_eq!(
            spec.to_header().base_fee_per_gas,
            Some(U256::from(INITIAL_BASE_FEE))
        );
        assert_eq!(spec.to_block().withdrawals(), None);

        spec.base_fee_per_gas = Some(U256::from(7));
        spec.config.shanghai_time = Some(0);
        let header = spec.to_header();
        assert_eq!(header.base_fee_per_gas, Some(U256::from(7)));
        assert_eq!(header.withdrawals_root, Some(empty_trie_root()));
        assert_eq!(header.blob_gas_used, None);
        assert_eq!(spec.to_block().withdrawals(), Some(&[][..]));

        spec.config.cancun_time = Some(0);
        let header = spec.to_header();
        assert_eq!(header.blob_gas_used, Some(0));
        assert_eq!(header.excess_blob_gas, Some(0));
        assert_eq!(header.parent_beacon_block_root, Some(H256::zero()));
    }

    #[test]
    fn base_fee_requires_london_at_block_zero() {
        let mut spec = GenesisSpec::from_json(MINIMAL.as_bytes()).unwrap();
        spec.number = 5;
        spec.config.london_block = Some(3);
        assert_eq!(spec.to_header().base_fee_per_gas, None);

        spec.config.london_block = Some(0);
        assert_eq!(
            spec.to_header().base_fee_per_gas,
            Some(U256::from(INITIAL_BASE_FEE))
        );
    }

    #[test]
    fn shanghai_requires_london() {
        let mut spec = GenesisSpec::from_json(MINIMAL.as_bytes()).unwrap();
        spec.config.shanghai_time = Some(0);
        assert_eq!(spec.to_header().withdrawals_root, None);
    }

    #[test]
    fn write_back_round_trips() {
        let spec = GenesisSpec::from_json(MINIMAL.as_bytes()).unwrap();
        let json = serde_json::to_vec(&spec).unwrap();
        assert_eq!(GenesisSpec::from_json(&json).unwrap(), spec);
    }
}
