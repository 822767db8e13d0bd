use ethers_core::utils::rlp::DecoderError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while loading (or writing) a chain fixture.
///
/// Every variant is fatal: a fixture which fails to load is never partially handed to a client.
#[derive(Debug)]
pub enum Error {
    /// A fixture file could not be opened, read or written.
    Io { path: PathBuf, error: io::Error },
    /// The genesis file is not valid JSON or lacks a required field.
    MalformedGenesis(String),
    /// The block at zero-based stream position `index` could not be decoded.
    Decode { index: usize, cause: DecodeCause },
    /// The block at stream position `index` carries number `got` instead of `expected`.
    Sequence {
        index: usize,
        expected: u64,
        got: u64,
    },
}

/// Why a single block in the stream failed to decode.
#[derive(Debug)]
pub enum DecodeCause {
    Io(io::Error),
    /// The stream ended part-way through an item.
    Truncated,
    /// The item's length prefix is not in its shortest form.
    NonCanonicalSize,
    /// The item declares a payload larger than the configured limit.
    Oversized { size: u64, limit: usize },
    /// The item was framed correctly but is not a valid block.
    Rlp(DecoderError),
}

impl From<DecoderError> for DecodeCause {
    fn from(e: DecoderError) -> Self {
        DecodeCause::Rlp(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            Error::MalformedGenesis(e) => write!(f, "malformed genesis: {}", e),
            Error::Decode { index, cause } => write!(f, "at block index {}: {}", index, cause),
            Error::Sequence {
                index,
                expected,
                got,
            } => write!(
                f,
                "block at index {} has wrong number {} (expected {})",
                index, got, expected
            ),
        }
    }
}

impl fmt::Display for DecodeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeCause::Io(e) => write!(f, "read failed: {}", e),
            DecodeCause::Truncated => write!(f, "unexpected end of stream"),
            DecodeCause::NonCanonicalSize => write!(f, "non-canonical size information"),
            DecodeCause::Oversized { size, limit } => {
                write!(f, "item of {} bytes exceeds the {} byte limit", size, limit)
            }
            DecodeCause::Rlp(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
