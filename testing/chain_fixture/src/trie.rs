//! Keccak-based Merkle-Patricia roots, as used for state, storage and empty-list roots.

use ethers_core::types::H256;
use ethers_core::utils::keccak256;
use hash256_std_hasher::Hash256StdHasher;
use hash_db::Hasher;

/// Keccak hasher for the `triehash` crate.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct KeccakHasher;

impl Hasher for KeccakHasher {
    type Out = H256;
    type StdHasher = Hash256StdHasher;
    const LENGTH: usize = 32;

    fn hash(x: &[u8]) -> Self::Out {
        keccak256(x).into()
    }
}

/// Root of a trie with no entries: `keccak256(rlp(""))`.
pub fn empty_trie_root() -> H256 {
    keccak256([0x80]).into()
}

/// Hash of an empty ommers list: `keccak256(rlp([]))`.
pub fn empty_ommers_hash() -> H256 {
    keccak256([0xc0]).into()
}

/// Root of a "secure" trie, where every key is hashed before insertion.
pub fn sec_trie_root<I, A, B>(entries: I) -> H256
where
    I: IntoIterator<Item = (A, B)>,
    A: AsRef<[u8]>,
    B: AsRef<[u8]>,
{
    triehash::sec_trie_root::<KeccakHasher, _, _, _>(entries)
}
