//! Loading of chain fixtures: a geth-style `genesis.json` plus a (possibly compressed) stream of
//! RLP-encoded blocks.
//!
//! ```no_run
//! let chain = chain_fixture::load_chain("chain.rlp.gz", "genesis.json").unwrap();
//! println!("head is block {}", chain.head().number());
//! ```

mod block;
mod chain;
pub mod compression;
mod error;
mod genesis;
mod header;
pub mod stream;
pub mod test_utils;
pub mod trie;
mod writer;

pub use block::Block;
pub use chain::{blocks_from_file, blocks_from_reader, load_chain, Chain};
pub use error::{DecodeCause, Error};
pub use genesis::{
    ChainConfig, GenesisAccount, GenesisAlloc, GenesisSpec, DEFAULT_GAS_LIMIT, INITIAL_BASE_FEE,
};
pub use header::Header;
pub use writer::{write_chain, write_genesis};
