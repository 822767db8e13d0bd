//! Helpers for producing small, valid chain fixtures in tests.

use crate::block::Block;
use crate::error::Error;
use crate::genesis::{ChainConfig, GenesisAccount, GenesisAlloc, GenesisSpec};
use crate::header::Header;
use crate::trie::{empty_ommers_hash, empty_trie_root};
use crate::writer::{write_chain, write_genesis};
use ethers_core::types::{Address, Bloom, H256, H64, U256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const TEST_CHAIN_ID: u64 = 1337;
pub const FUNDED_ADDRESS: u64 = 0xaa;

/// A pre-London genesis with a single funded account.
pub fn test_genesis() -> GenesisSpec {
    let mut alloc = BTreeMap::new();
    alloc.insert(
        Address::from_low_u64_be(FUNDED_ADDRESS),
        GenesisAccount {
            balance: U256::exp10(18),
            ..Default::default()
        },
    );

    GenesisSpec {
        config: ChainConfig {
            chain_id: TEST_CHAIN_ID,
            homestead_block: Some(0),
            eip150_block: Some(0),
            eip155_block: Some(0),
            eip158_block: Some(0),
            byzantium_block: Some(0),
            ..Default::default()
        },
        nonce: 0,
        timestamp: 0,
        extra_data: vec![],
        gas_limit: 4_712_388,
        difficulty: U256::from(131_072),
        mix_hash: H256::zero(),
        coinbase: Address::zero(),
        alloc: GenesisAlloc(alloc),
        number: 0,
        gas_used: 0,
        parent_hash: H256::zero(),
        base_fee_per_gas: None,
        excess_blob_gas: None,
        blob_gas_used: None,
    }
}

/// An empty block extending `parent`, with the same state root.
pub fn child_block(parent: &Block) -> Block {
    block_with_number(parent, parent.number() + 1)
}

/// An empty block whose parent is `parent` but which claims to be block `number`.
pub fn block_with_number(parent: &Block, number: u64) -> Block {
    let parent_header = parent.header();
    let header = Header {
        parent_hash: parent.hash(),
        ommers_hash: empty_ommers_hash(),
        beneficiary: Address::zero(),
        state_root: parent_header.state_root,
        transactions_root: empty_trie_root(),
        receipts_root: empty_trie_root(),
        logs_bloom: Bloom::zero(),
        difficulty: parent_header.difficulty,
        number,
        gas_limit: parent_header.gas_limit,
        gas_used: 0,
        timestamp: parent_header.timestamp + 10,
        extra_data: vec![],
        mix_hash: H256::zero(),
        nonce: H64::zero(),
        base_fee_per_gas: parent_header.base_fee_per_gas,
        withdrawals_root: parent_header.withdrawals_root.map(|_| empty_trie_root()),
        blob_gas_used: None,
        excess_blob_gas: None,
        parent_beacon_block_root: None,
        requests_hash: None,
    };
    let withdrawals = parent.withdrawals().map(|_| vec![]);
    Block::new(header, vec![], vec![], withdrawals)
}

/// `length` consecutive blocks on top of the genesis block of `genesis`, genesis excluded.
pub fn build_chain(genesis: &GenesisSpec, length: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(length);
    let mut parent = genesis.to_block();
    for _ in 0..length {
        let block = child_block(&parent);
        blocks.push(block.clone());
        parent = block;
    }
    blocks
}

/// Write a genesis file and a chain file named `chain_file` into `dir`.
///
/// Returns `(chain_path, genesis_path)`.
pub fn write_fixture(
    dir: &Path,
    chain_file: &str,
    genesis: &GenesisSpec,
    blocks: &[Block],
) -> Result<(PathBuf, PathBuf), Error> {
    let chain_path = dir.join(chain_file);
    let genesis_path = dir.join("genesis.json");
    write_genesis(&genesis_path, genesis)?;
    write_chain(&chain_path, blocks)?;
    Ok((chain_path, genesis_path))
}
