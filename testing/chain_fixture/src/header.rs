use ethers_core::types::{Address, Bloom, H256, H64, U256};
use ethers_core::utils::keccak256;
use ethers_core::utils::rlp::{self, Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Number of fields every header carries, from `parent_hash` through `nonce`.
const BASE_FIELDS: usize = 15;
/// Number of trailing fields introduced by later forks, in the order they were added.
const OPTIONAL_FIELDS: usize = 6;

/// An execution-layer block header.
///
/// Fields added by forks after Berlin are optional. Their presence is determined by the number of
/// items in the encoded list and, when encoding, only the leading run of `Some` values is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub parent_hash: H256,
    pub ommers_hash: H256,
    pub beneficiary: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: H256,
    pub nonce: H64,
    /// London.
    pub base_fee_per_gas: Option<U256>,
    /// Shanghai.
    pub withdrawals_root: Option<H256>,
    /// Cancun.
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<H256>,
    /// Prague.
    pub requests_hash: Option<H256>,
}

impl Header {
    /// `keccak256` of the RLP encoding, i.e. the block hash.
    pub fn hash(&self) -> H256 {
        keccak256(rlp::encode(self)).into()
    }

    fn optional_count(&self) -> usize {
        [
            self.base_fee_per_gas.is_some(),
            self.withdrawals_root.is_some(),
            self.blob_gas_used.is_some(),
            self.excess_blob_gas.is_some(),
            self.parent_beacon_block_root.is_some(),
            self.requests_hash.is_some(),
        ]
        .iter()
        .take_while(|present| **present)
        .count()
    }
}

impl Encodable for Header {
    fn rlp_append(&self, s: &mut RlpStream) {
        let optional = self.optional_count();
        s.begin_list(BASE_FIELDS + optional);
        s.append(&self.parent_hash);
        s.append(&self.ommers_hash);
        s.append(&self.beneficiary);
        s.append(&self.state_root);
        s.append(&self.transactions_root);
        s.append(&self.receipts_root);
        s.append(&self.logs_bloom);
        s.append(&self.difficulty);
        s.append(&self.number);
        s.append(&self.gas_limit);
        s.append(&self.gas_used);
        s.append(&self.timestamp);
        s.append(&self.extra_data);
        s.append(&self.mix_hash);
        s.append(&self.nonce);

        // `optional_count` guarantees each of these is `Some` when reached.
        if let (true, Some(v)) = (optional > 0, &self.base_fee_per_gas) {
            s.append(v);
        }
        if let (true, Some(v)) = (optional > 1, &self.withdrawals_root) {
            s.append(v);
        }
        if let (true, Some(v)) = (optional > 2, &self.blob_gas_used) {
            s.append(v);
        }
        if let (true, Some(v)) = (optional > 3, &self.excess_blob_gas) {
            s.append(v);
        }
        if let (true, Some(v)) = (optional > 4, &self.parent_beacon_block_root) {
            s.append(v);
        }
        if let (true, Some(v)) = (optional > 5, &self.requests_hash) {
            s.append(v);
        }
    }
}

impl Decodable for Header {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if !rlp.is_list() {
            return Err(DecoderError::RlpExpectedToBeList);
        }
        let count = rlp.item_count()?;
        if !(BASE_FIELDS..=BASE_FIELDS + OPTIONAL_FIELDS).contains(&count) {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        let optional = |index: usize| -> Option<usize> { (index < count).then_some(index) };

        Ok(Header {
            parent_hash: rlp.val_at(0)?,
            ommers_hash: rlp.val_at(1)?,
            beneficiary: rlp.val_at(2)?,
            state_root: rlp.val_at(3)?,
            transactions_root: rlp.val_at(4)?,
            receipts_root: rlp.val_at(5)?,
            logs_bloom: rlp.val_at(6)?,
            difficulty: rlp.val_at(7)?,
            number: rlp.val_at(8)?,
            gas_limit: rlp.val_at(9)?,
            gas_used: rlp.val_at(10)?,
            timestamp: rlp.val_at(11)?,
            extra_data: rlp.val_at(12)?,
            mix_hash: rlp.val_at(13)?,
            nonce: rlp.val_at(14)?,
            base_fee_per_gas: optional(15).map(|i| rlp.val_at(i)).transpose()?,
            withdrawals_root: optional(16).map(|i| rlp.val_at(i)).transpose()?,
            blob_gas_used: optional(17).map(|i| rlp.val_at(i)).transpose()?,
            excess_blob_gas: optional(18).map(|i| rlp.val_at(i)).transpose()?,
            parent_beacon_block_root: optional(19).map(|i| rlp.val_at(i)).transpose()?,
            requests_hash: optional(20).map(|i| rlp.val_at(i)).transpose()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_header() -> Header {
        Header {
            parent_hash: H256::repeat_byte(1),
            ommers_hash: H256::repeat_byte(2),
            beneficiary: Address::repeat_byte(3),
            state_root: H256::repeat_byte(4),
            transactions_root: H256::repeat_byte(5),
            receipts_root: H256::repeat_byte(6),
            logs_bloom: Bloom::zero(),
            difficulty: U256::from(131_072),
            number: 7,
            gas_limit: 4_712_388,
            gas_used: 21_000,
            timestamp: 1_234,
            extra_data: vec![0xde, 0xad],
            mix_hash: H256::zero(),
            nonce: H64::from_low_u64_be(66),
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            requests_hash: None,
        }
    }

    #[test]
    fn mainnet_genesis_hash() {
        let header = Header {
            parent_hash: H256::zero(),
            ommers_hash: crate::trie::empty_ommers_hash(),
            beneficiary: Address::zero(),
            state_root: "0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"
                .parse()
                .unwrap(),
            transactions_root: crate::trie::empty_trie_root(),
            receipts_root: crate::trie::empty_trie_root(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::from(0x4_0000_0000u64),
            number: 0,
            gas_limit: 5000,
            gas_used: 0,
            timestamp: 0,
            extra_data: hex::decode(
                "11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa",
            )
            .unwrap(),
            mix_hash: H256::zero(),
            nonce: H64::from_low_u64_be(0x42),
            ..base_header()
        };
        assert_eq!(
            header.hash(),
            "0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3"
                .parse()
                .unwrap()
        );
    }

    #[test]
    fn legacy_header_has_fifteen_fields() {
        let header = base_header();
        let encoded = rlp::encode(&header);
        assert_eq!(Rlp::new(&encoded).item_count().unwrap(), 15);
        assert_eq!(rlp::decode::<Header>(&encoded).unwrap(), header);
    }

    #[test]
    fn fork_fields_extend_the_list() {
        let header = Header {
            base_fee_per_gas: Some(1_000_000_000u64.into()),
            withdrawals_root: Some(H256::repeat_byte(9)),
            ..base_header()
        };
        let encoded = rlp::encode(&header);
        assert_eq!(Rlp::new(&encoded).item_count().unwrap(), 17);
        assert_eq!(rlp::decode::<Header>(&encoded).unwrap(), header);
    }

    #[test]
    fn gap_in_fork_fields_is_not_encoded() {
        let header = Header {
            withdrawals_root: Some(H256::repeat_byte(9)),
            ..base_header()
        };
        let decoded = rlp::decode::<Header>(&rlp::encode(&header)).unwrap();
        assert_eq!(decoded, base_header());
    }

    #[test]
    fn hash_covers_every_field() {
        let a = base_header();
        let b = Header {
            timestamp: a.timestamp + 1,
            ..a.clone()
        };
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn rejects_short_list() {
        let mut s = RlpStream::new_list(2);
        s.append(&1u64).append(&2u64);
        assert_eq!(
            rlp::decode::<Header>(&s.out()),
            Err(DecoderError::RlpIncorrectListLen)
        );
    }
}
