//! Framing of a concatenated RLP block stream into individual items.
//!
//! The stream is read one top-level item at a time so that a fixture with thousands of blocks is
//! never held in memory as a single buffer, and so that the failing item can be reported by index.

use crate::block::Block;
use crate::error::{DecodeCause, Error};
use ethers_core::utils::rlp::{DecoderError, PayloadInfo};
use std::io::{self, Read};

/// Upper bound on the size of a single encoded block.
pub const DEFAULT_MAX_ITEM_SIZE: usize = 32 * 1024 * 1024;

/// Splits a byte stream into complete top-level RLP items.
pub struct RlpItemReader<R> {
    reader: R,
    max_item_size: usize,
}

impl<R: Read> RlpItemReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_item_size(reader, DEFAULT_MAX_ITEM_SIZE)
    }

    pub fn with_max_item_size(reader: R, max_item_size: usize) -> Self {
        Self {
            reader,
            max_item_size,
        }
    }

    /// Read the next item, prefix included.
    ///
    /// Returns `Ok(None)` only when the stream ends cleanly on an item boundary.
    pub fn next_item(&mut self) -> Result<Option<Vec<u8>>, DecodeCause> {
        let prefix = match self.read_prefix()? {
            Some(prefix) => prefix,
            None => return Ok(None),
        };

        let mut item = vec![prefix];
        item.resize(1 + long_size_len(prefix), 0);
        self.reader.read_exact(&mut item[1..]).map_err(truncated)?;

        let info = PayloadInfo::from(&item).map_err(|e| match e {
            DecoderError::RlpDataLenWithZeroPrefix | DecoderError::RlpInvalidIndirection => {
                DecodeCause::NonCanonicalSize
            }
            e => DecodeCause::Rlp(e),
        })?;
        if info.value_len > self.max_item_size {
            return Err(DecodeCause::Oversized {
                size: info.value_len as u64,
                limit: self.max_item_size,
            });
        }

        let payload_len = info.total() - item.len();
        let read = (&mut self.reader)
            .take(payload_len as u64)
            .read_to_end(&mut item)
            .map_err(DecodeCause::Io)?;
        if read < payload_len {
            return Err(DecodeCause::Truncated);
        }

        Ok(Some(item))
    }

    fn read_prefix(&mut self) -> Result<Option<u8>, DecodeCause> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeCause::Io(e)),
            }
        }
    }
}

/// Number of big-endian size bytes following a long-form prefix.
fn long_size_len(prefix: u8) -> usize {
    match prefix {
        0xb8..=0xbf => (prefix - 0xb7) as usize,
        0xf8..=0xff => (prefix - 0xf7) as usize,
        _ => 0,
    }
}

fn truncated(e: io::Error) -> DecodeCause {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeCause::Truncated
    } else {
        DecodeCause::Io(e)
    }
}

/// Iterator over the blocks of a stream.
///
/// Yields `Error::Decode` with the zero-based position of the failing item and then stops.
pub struct BlockStream<R> {
    items: RlpItemReader<R>,
    index: usize,
    done: bool,
}

impl<R: Read> BlockStream<R> {
    pub fn new(reader: R) -> Self {
        Self::from_items(RlpItemReader::new(reader))
    }

    pub fn from_items(items: RlpItemReader<R>) -> Self {
        Self {
            items,
            index: 0,
            done: false,
        }
    }

    fn next_block(&mut self) -> Result<Option<Block>, DecodeCause> {
        match self.items.next_item()? {
            Some(item) => Ok(Some(Block::decode(&item)?)),
            None => Ok(None),
        }
    }
}

impl<R: Read> Iterator for BlockStream<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(cause) => Some(Err(Error::Decode {
                index: self.index,
                cause,
            })),
        };

        match &result {
            Some(Ok(_)) => self.index += 1,
            _ => self.done = true,
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn items(bytes: &[u8]) -> RlpItemReader<&[u8]> {
        RlpItemReader::new(bytes)
    }

    #[test]
    fn splits_concatenated_items() {
        let mut reader = items(&[0x05, 0x82, 0xaa, 0xbb, 0xc1, 0x01]);
        assert_eq!(reader.next_item().unwrap(), Some(vec![0x05]));
        assert_eq!(reader.next_item().unwrap(), Some(vec![0x82, 0xaa, 0xbb]));
        assert_eq!(reader.next_item().unwrap(), Some(vec![0xc1, 0x01]));
        assert_eq!(reader.next_item().unwrap(), None);
    }

    #[test]
    fn long_list() {
        let mut bytes = vec![0xf8, 60];
        bytes.extend(std::iter::repeat(0x01).take(60));
        let mut reader = items(&bytes);
        assert_eq!(reader.next_item().unwrap(), Some(bytes.clone()));
        assert_eq!(reader.next_item().unwrap(), None);
    }

    #[test]
    fn truncated_payload() {
        let mut reader = items(&[0xc3, 0x01, 0x02]);
        assert!(matches!(reader.next_item(), Err(DecodeCause::Truncated)));
    }

    #[test]
    fn truncated_size() {
        let mut reader = items(&[0xf9, 0x01]);
        assert!(matches!(reader.next_item(), Err(DecodeCause::Truncated)));
    }

    #[test]
    fn non_canonical_sizes() {
        assert!(matches!(
            items(&[0xf8, 0x05]).next_item(),
            Err(DecodeCause::NonCanonicalSize)
        ));
        assert!(matches!(
            items(&[0xb8, 0x05]).next_item(),
            Err(DecodeCause::NonCanonicalSize)
        ));
        assert!(matches!(
            items(&[0xf9, 0x00, 0x40]).next_item(),
            Err(DecodeCause::NonCanonicalSize)
        ));
    }

    #[test]
    fn long_string() {
        let mut bytes = vec![0xb8, 56];
        bytes.extend(std::iter::repeat(0xaa).take(56));
        bytes.push(0x80);
        let mut reader = items(&bytes);
        assert_eq!(reader.next_item().unwrap(), Some(bytes[..58].to_vec()));
        assert_eq!(reader.next_item().unwrap(), Some(vec![0x80]));
        assert_eq!(reader.next_item().unwrap(), None);
    }

    #[test]
    fn oversized() {
        let mut reader = RlpItemReader::with_max_item_size(&[0xf9, 0x01, 0x00][..], 128);
        assert!(matches!(
            reader.next_item(),
            Err(DecodeCause::Oversized {
                size: 256,
                limit: 128
            })
        ));
    }

    #[test]
    fn block_stream_stops_after_error() {
        let mut blocks = BlockStream::new(&[0x01, 0x02][..]);
        assert!(matches!(
            blocks.next(),
            Some(Err(Error::Decode {
                index: 0,
                cause: DecodeCause::Rlp(_)
            }))
        ));
        assert!(blocks.next().is_none());
    }

    #[test]
    fn empty_stream_has_no_blocks() {
        assert_eq!(BlockStream::new(&[][..]).count(), 0);
    }
}
