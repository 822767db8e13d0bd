//! Writing fixtures, for producing test chains and re-packing existing ones.

use crate::block::Block;
use crate::compression::FixtureWriter;
use crate::error::Error;
use crate::genesis::GenesisSpec;
use std::io::{self, Write};
use std::path::Path;

/// Write `blocks` as a concatenated RLP stream, compressed according to the suffix of `path`.
///
/// The genesis block is not part of a chain file; pass only the blocks after it.
pub fn write_chain<P: AsRef<Path>>(path: P, blocks: &[Block]) -> Result<(), Error> {
    let path = path.as_ref();
    let write = || -> io::Result<()> {
        let mut writer = FixtureWriter::create(path)?;
        for block in blocks {
            writer.write_all(block.rlp_bytes())?;
        }
        writer.finish()
    };
    write().map_err(|error| Error::Io {
        path: path.to_path_buf(),
        error,
    })
}

/// Write `spec` as pretty-printed JSON.
pub fn write_genesis<P: AsRef<Path>>(path: P, spec: &GenesisSpec) -> Result<(), Error> {
    let path = path.as_ref();
    let write = || -> io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, spec)?;
        file.flush()
    };
    write().map_err(|error| Error::Io {
        path: path.to_path_buf(),
        error,
    })
}
