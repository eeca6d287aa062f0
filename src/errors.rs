//! Error types for the snapshot hashing stages.
//!
//! Each pipeline stage owns its own enum: a corrupt tree stream, a merge
//! that hit an illegal head combination, a failed store write, and a
//! truncated line stream are different failures with different blast
//! radii, and lumping them together would blur which stage gave up. The
//! enums stay `#[non_exhaustive]` so a stage can grow failure modes
//! without breaking downstream matches.
//!
//! # Design Notes
//! - Per-file hash failures are *not* represented here: they are logged and
//!   dropped inside the update pipeline. Everything in this module is fatal
//!   for the run that produced it.
//! - Wrapped `io::Error` and `rusqlite::Error` values stay reachable
//!   through `source()`, so callers can still get at the OS-level cause.
//! - The `Display` form of each error is the single-line diagnostic an
//!   embedding binary prints before exiting non-zero.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors from node streams and the path tracker.
///
/// A prior tree that violates the traversal grammar is corrupt input;
/// there is no recovery path.
#[derive(Debug)]
#[non_exhaustive]
pub enum TreeError {
    /// A `Leave` event arrived with no enclosing directory on the stack.
    UnbalancedLeave,
    /// The external node reader failed mid-stream.
    Source { detail: String },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedLeave => write!(f, "unbalanced Leave: path stack is empty"),
            Self::Source { detail } => write!(f, "tree source error: {detail}"),
        }
    }
}

impl std::error::Error for TreeError {}

/// Errors from the generational tree merge.
///
/// The co-walk assumes both inputs obey the traversal grammar; any head
/// combination outside the legal set means one input is corrupt.
#[derive(Debug)]
#[non_exhaustive]
pub enum MergeError {
    /// The two roots carry different names.
    RootNameMismatch,
    /// Illegal head combination while merging directory children.
    InvalidNode,
    /// Illegal head combination while merging the file section.
    InvalidFileNode,
    /// A stream ended inside the co-walk.
    UnexpectedEof,
    /// One of the input streams failed.
    Tree(TreeError),
    /// The output sink rejected a node.
    Sink { detail: String },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNameMismatch => write!(f, "Root directories have differing names"),
            Self::InvalidNode => write!(f, "Invalid node in tree"),
            Self::InvalidFileNode => write!(f, "Invalid node in file part of tree"),
            Self::UnexpectedEof => write!(f, "unexpected end of stream in tree merge"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::Sink { detail } => write!(f, "merge sink error: {detail}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for MergeError {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

/// Errors from the hash store backend.
#[derive(Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// SQL execution or statement preparation failed.
    Sql(rusqlite::Error),
    /// I/O error while opening or creating the backing database.
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "hash store SQL error: {err}"),
            Self::Io(err) => write!(f, "hash store I/O error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sql(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err)
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Errors from the hash-update driver.
///
/// Any variant aborts the open transaction; partial rows are discarded by
/// the store on drop.
#[derive(Debug)]
#[non_exhaustive]
pub enum UpdateError {
    /// The prior tree stream is corrupt.
    Tree(TreeError),
    /// The hash store failed; the transaction is abandoned.
    Store(StoreError),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TreeError> for UpdateError {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

impl From<StoreError> for UpdateError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Errors from line-stream readers and writers.
#[derive(Debug)]
#[non_exhaustive]
pub enum WeaveError {
    /// I/O error on the backing file or compressor.
    Io(io::Error),
    /// The stream ended without a trailing newline.
    MissingFinalNewline { path: PathBuf },
    /// A line is not valid UTF-8.
    InvalidUtf8 { path: PathBuf },
}

impl fmt::Display for WeaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "line stream I/O error: {err}"),
            Self::MissingFinalNewline { path } => {
                write!(f, "missing final newline in {}", path.display())
            }
            Self::InvalidUtf8 { path } => {
                write!(f, "invalid UTF-8 in line stream {}", path.display())
            }
        }
    }
}

impl std::error::Error for WeaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for WeaveError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
