use crate::block::Block;
use crate::compression::open_reader;
use crate::error::Error;
use crate::genesis::GenesisSpec;
use crate::stream::BlockStream;
use std::io::Read;
use std::path::Path;

/// A genesis description and the ordered blocks built on top of it.
///
/// `blocks()[0]` is always the block derived from the genesis and `blocks()[i].number() == i`.
#[derive(Debug, Clone)]
pub struct Chain {
    genesis: GenesisSpec,
    blocks: Vec<Block>,
}

impl Chain {
    pub fn genesis(&self) -> &GenesisSpec {
        &self.genesis
    }

    pub fn genesis_block(&self) -> &Block {
        &self.blocks[0]
    }

    /// Every block, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The blocks which were read from the chain file.
    pub fn imported_blocks(&self) -> &[Block] {
        &self.blocks[1..]
    }

    pub fn head(&self) -> &Block {
        // `blocks` always holds at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block(&self, number: u64) -> Option<&Block> {
        usize::try_from(number)
            .ok()
            .and_then(|number| self.blocks.get(number))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Load a chain fixture.
///
/// The genesis is parsed first; a malformed genesis means the chain file is never opened. The chain
/// file may be `.gz` or `.sz`/`.snappy` compressed.
pub fn load_chain<P: AsRef<Path>, Q: AsRef<Path>>(
    chain_path: P,
    genesis_path: Q,
) -> Result<Chain, Error> {
    let genesis = GenesisSpec::from_file(genesis_path)?;
    let blocks = blocks_from_file(chain_path, genesis.to_block())?;
    Ok(Chain { genesis, blocks })
}

/// Read the blocks in `path`, prefixed by `genesis`.
pub fn blocks_from_file<P: AsRef<Path>>(path: P, genesis: Block) -> Result<Vec<Block>, Error> {
    let path = path.as_ref();
    let reader = open_reader(path).map_err(|error| Error::Io {
        path: path.to_path_buf(),
        error,
    })?;
    blocks_from_reader(reader, genesis)
}

/// Decode a block stream, checking that stream position `i` holds block number `i + 1`.
pub fn blocks_from_reader<R: Read>(reader: R, genesis: Block) -> Result<Vec<Block>, Error> {
    let mut blocks = vec![genesis];
    for (index, block) in BlockStream::new(reader).enumerate() {
        let block = block?;
        let expected = index as u64 + 1;
        if block.number() != expected {
            return Err(Error::Sequence {
                index,
                expected,
                got: block.number(),
            });
        }
        blocks.push(block);
    }
    Ok(blocks)
}
