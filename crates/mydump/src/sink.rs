//! Output sinks for dump text.
//!
//! A sink is a sequential byte destination that is opened once, written in
//! order, and closed once. The compressed variant wraps the same writer in a
//! gzip encoder; `Compression::None` writes bytes through unchanged.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use serde::Deserialize;

use crate::error::Result;

/// Sink compression variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

enum SinkWriter {
    Plain(Box<dyn Write + Send>),
    Gzip(GzEncoder<Box<dyn Write + Send>>),
    /// Taken by `close`; any later write is a logic error surfaced as io::Error.
    Closed,
}

/// A sequential byte sink, plain or gzip-compressed.
pub struct Sink {
    writer: SinkWriter,
}

impl Sink {
    /// Open a sink at `path`, or standard output when `path` is empty.
    pub fn open(path: &str, compression: Compression) -> Result<Self> {
        let raw: Box<dyn Write + Send> = if path.is_empty() {
            Box::new(io::stdout())
        } else {
            Box::new(BufWriter::new(File::create(Path::new(path))?))
        };
        Ok(Self::from_writer(raw, compression))
    }

    /// Wrap an arbitrary writer. Used by `open` and by embedders/tests that
    /// want to capture dump output in memory.
    pub fn from_writer(raw: Box<dyn Write + Send>, compression: Compression) -> Self {
        let writer = match compression {
            Compression::None => SinkWriter::Plain(raw),
            Compression::Gzip => SinkWriter::Gzip(GzEncoder::new(raw, flate2::Compression::default())),
        };
        Self { writer }
    }

    /// Write a chunk of bytes.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.writer {
            SinkWriter::Plain(w) => w.write_all(bytes)?,
            SinkWriter::Gzip(w) => w.write_all(bytes)?,
            SinkWriter::Closed => {
                return Err(io::Error::new(io::ErrorKind::Other, "sink already closed").into())
            }
        }
        Ok(())
    }

    /// Write a UTF-8 string.
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write(s.as_bytes())
    }

    /// Finish compression (if any) and flush the underlying writer.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.writer, SinkWriter::Closed) {
            SinkWriter::Plain(mut w) => w.flush()?,
            SinkWriter::Gzip(gz) => gz.finish()?.flush()?,
            SinkWriter::Closed => {}
        }
        Ok(())
    }
}
