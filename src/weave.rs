//! Line streams backing the delta store.
//!
//! The engine drives an append-only store of line-oriented stream
//! versions through the reader/writer contract here; the container format
//! and delta addressing live with the store itself. A backing file is
//! either plaintext or gzip, selected by a boolean at open time.
//!
//! # Invariants
//! - Line separators are `\n`; the trailing newline is stripped on read.
//! - Data at EOF without a trailing newline means a truncated stream and
//!   is fatal.
//! - gzip members are written at compression level 3 with the original
//!   filename recorded in the header and the OS field set to 3 (Unix).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

use crate::errors::WeaveError;

/// gzip compression level used for stream files.
const GZIP_LEVEL: u32 = 3;
/// gzip header OS field: Unix.
const GZIP_OS_UNIX: u8 = 3;

/// Write side of a line stream.
pub trait LineWriter {
    /// Appends each line followed by `\n`.
    fn write_lines(&mut self, lines: &[String]) -> Result<(), WeaveError>;

    /// Flushes and finalizes the stream (gzip trailer included).
    fn close(&mut self) -> Result<(), WeaveError>;

    /// Path of the backing file.
    fn name(&self) -> &Path;
}

/// Read side of a line stream.
pub trait LineReader {
    /// Returns the next line without its newline, or `None` at EOF.
    fn read_line(&mut self) -> Result<Option<String>, WeaveError>;

    /// Path of the backing file.
    fn name(&self) -> &Path;
}

/// Opens a line writer over a new file at `path`.
pub fn open_line_writer(
    path: &Path,
    compressed: bool,
) -> Result<Box<dyn LineWriter>, WeaveError> {
    if compressed {
        Ok(Box::new(GzipLineWriter::create(path)?))
    } else {
        Ok(Box::new(PlainLineWriter::create(path)?))
    }
}

/// Opens a line reader over the file at `path`.
pub fn open_line_reader(
    path: &Path,
    compressed: bool,
) -> Result<Box<dyn LineReader>, WeaveError> {
    if compressed {
        Ok(Box::new(GzipLineReader::open(path)?))
    } else {
        Ok(Box::new(PlainLineReader::open(path)?))
    }
}

/// Plaintext line writer.
pub struct PlainLineWriter {
    out: BufWriter<File>,
    path: PathBuf,
}

impl PlainLineWriter {
    pub fn create(path: &Path) -> Result<Self, WeaveError> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            path: path.to_path_buf(),
        })
    }
}

impl LineWriter for PlainLineWriter {
    fn write_lines(&mut self, lines: &[String]) -> Result<(), WeaveError> {
        for line in lines {
            self.out.write_all(line.as_bytes())?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), WeaveError> {
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &Path {
        &self.path
    }
}

/// gzip line writer.
///
/// The encoder lives in an `Option` so `close` can take it by value to
/// write the member trailer exactly once; writes after close are bugs.
pub struct GzipLineWriter {
    encoder: Option<GzEncoder<BufWriter<File>>>,
    path: PathBuf,
}

impl GzipLineWriter {
    pub fn create(path: &Path) -> Result<Self, WeaveError> {
        let file = BufWriter::new(File::create(path)?);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let encoder = GzBuilder::new()
            .filename(file_name.as_bytes())
            .operating_system(GZIP_OS_UNIX)
            .write(file, Compression::new(GZIP_LEVEL));
        Ok(Self {
            encoder: Some(encoder),
            path: path.to_path_buf(),
        })
    }
}

impl LineWriter for GzipLineWriter {
    fn write_lines(&mut self, lines: &[String]) -> Result<(), WeaveError> {
        let encoder = self.encoder.as_mut().expect("write after close");
        for line in lines {
            encoder.write_all(line.as_bytes())?;
            encoder.write_all(b"\n")?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), WeaveError> {
        if let Some(encoder) = self.encoder.take() {
            let mut inner = encoder.finish()?;
            inner.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &Path {
        &self.path
    }
}

/// Plaintext line reader.
pub struct PlainLineReader {
    input: BufReader<File>,
    path: PathBuf,
}

impl PlainLineReader {
    pub fn open(path: &Path) -> Result<Self, WeaveError> {
        Ok(Self {
            input: BufReader::new(File::open(path)?),
            path: path.to_path_buf(),
        })
    }
}

impl LineReader for PlainLineReader {
    fn read_line(&mut self) -> Result<Option<String>, WeaveError> {
        read_one_line(&mut self.input, &self.path)
    }

    fn name(&self) -> &Path {
        &self.path
    }
}

/// gzip line reader.
pub struct GzipLineReader {
    input: BufReader<GzDecoder<BufReader<File>>>,
    path: PathBuf,
}

impl GzipLineReader {
    pub fn open(path: &Path) -> Result<Self, WeaveError> {
        let file = BufReader::new(File::open(path)?);
        Ok(Self {
            input: BufReader::new(GzDecoder::new(file)),
            path: path.to_path_buf(),
        })
    }
}

impl LineReader for GzipLineReader {
    fn read_line(&mut self) -> Result<Option<String>, WeaveError> {
        read_one_line(&mut self.input, &self.path)
    }

    fn name(&self) -> &Path {
        &self.path
    }
}

fn read_one_line<R: BufRead>(input: &mut R, path: &Path) -> Result<Option<String>, WeaveError> {
    let mut buf = Vec::new();
    let n = input.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        return Err(WeaveError::MissingFinalNewline {
            path: path.to_path_buf(),
        });
    }
    buf.pop();
    String::from_utf8(buf).map(Some).map_err(|_| WeaveError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}
