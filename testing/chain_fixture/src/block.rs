use crate::header::Header;
use ethers_core::types::H256;
use ethers_core::utils::keccak256;
use ethers_core::utils::rlp::{DecoderError, Rlp, RlpStream};

/// A decoded block together with the exact bytes it was decoded from.
///
/// Transactions and withdrawals are kept as opaque RLP items; the harness never needs their
/// contents, only the ability to hand them back to a client byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: Header,
    hash: H256,
    transactions: Vec<Vec<u8>>,
    ommers: Vec<Header>,
    withdrawals: Option<Vec<Vec<u8>>>,
    rlp: Vec<u8>,
}

impl Block {
    /// Assemble a block from its parts and compute its encoding.
    ///
    /// Each transaction and withdrawal must already be a single, complete RLP item.
    pub fn new(
        header: Header,
        transactions: Vec<Vec<u8>>,
        ommers: Vec<Header>,
        withdrawals: Option<Vec<Vec<u8>>>,
    ) -> Self {
        let mut s = RlpStream::new_list(if withdrawals.is_some() { 4 } else { 3 });
        s.append(&header);
        s.begin_list(transactions.len());
        for tx in &transactions {
            s.append_raw(tx, 1);
        }
        s.begin_list(ommers.len());
        for ommer in &ommers {
            s.append(ommer);
        }
        if let Some(withdrawals) = &withdrawals {
            s.begin_list(withdrawals.len());
            for withdrawal in withdrawals {
                s.append_raw(withdrawal, 1);
            }
        }

        Self {
            hash: header.hash(),
            header,
            transactions,
            ommers,
            withdrawals,
            rlp: s.out().to_vec(),
        }
    }

    /// Decode a block from exactly one complete RLP item.
    ///
    /// The hash is taken over the header bytes as they appear in `bytes`, so it matches what the
    /// producer of the fixture computed even if the header were not re-encoded identically.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() {
            return Err(DecoderError::RlpExpectedToBeList);
        }
        if rlp.payload_info()?.total() != bytes.len() {
            return Err(DecoderError::RlpInconsistentLengthAndData);
        }
        if !(3..=4).contains(&rlp.item_count()?) {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        let header_rlp = rlp.at(0)?;
        let header: Header = header_rlp.as_val()?;
        let hash = keccak256(header_rlp.as_raw()).into();

        let transactions = raw_items(&rlp.at(1)?)?;
        let ommers = rlp.list_at(2)?;
        let withdrawals = if rlp.item_count()? == 4 {
            Some(raw_items(&rlp.at(3)?)?)
        } else {
            None
        };

        Ok(Self {
            header,
            hash,
            transactions,
            ommers,
            withdrawals,
            rlp: bytes.to_vec(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> H256 {
        self.header.parent_hash
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    pub fn ommers(&self) -> &[Header] {
        &self.ommers
    }

    pub fn withdrawals(&self) -> Option<&[Vec<u8>]> {
        self.withdrawals.as_deref()
    }

    /// The canonical encoding of the block, exactly as read from (or written to) a fixture.
    pub fn rlp_bytes(&self) -> &[u8] {
        &self.rlp
    }
}

fn raw_items(list: &Rlp) -> Result<Vec<Vec<u8>>, DecoderError> {
    if !list.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    Ok(list.iter().map(|item| item.as_raw().to_vec()).collect())
}
