//! Transparent (de)compression of fixture files, selected by file name suffix.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// `.gz`
    Gzip,
    /// `.sz` or `.snappy`, using the snappy framing format.
    Snappy,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("sz") | Some("snappy") => Compression::Snappy,
            _ => Compression::None,
        }
    }
}

/// Open `path` for reading, decompressing according to its suffix.
pub fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    Ok(match Compression::from_path(path) {
        Compression::None => Box::new(file),
        Compression::Gzip => Box::new(MultiGzDecoder::new(file)),
        Compression::Snappy => Box::new(snap::read::FrameDecoder::new(file)),
    })
}

/// A file writer which compresses according to the suffix it was created with.
///
/// `finish` must be called to flush any trailing compressed frames.
pub enum FixtureWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Snappy(snap::write::FrameEncoder<BufWriter<File>>),
}

impl FixtureWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        Ok(match Compression::from_path(path) {
            Compression::None => FixtureWriter::Plain(file),
            Compression::Gzip => {
                FixtureWriter::Gzip(GzEncoder::new(file, flate2::Compression::default()))
            }
            Compression::Snappy => FixtureWriter::Snappy(snap::write::FrameEncoder::new(file)),
        })
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            FixtureWriter::Plain(mut w) => w.flush(),
            FixtureWriter::Gzip(w) => w.finish()?.flush(),
            FixtureWriter::Snappy(mut w) => w.flush(),
        }
    }
}

impl Write for FixtureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FixtureWriter::Plain(w) => w.write(buf),
            FixtureWriter::Gzip(w) => w.write(buf),
            FixtureWriter::Snappy(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FixtureWriter::Plain(w) => w.flush(),
            FixtureWriter::Gzip(w) => w.flush(),
            FixtureWriter::Snappy(w) => w.flush(),
        }
    }
}
