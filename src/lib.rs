//! Incremental file-integrity snapshot engine.
//!
//! Walks a previously captured tree of filesystem metadata, augments each
//! regular file with a SHA-1 of its current contents, persists the hashes
//! in a side database, and merges hashes across generations so unchanged
//! files are never rehashed.
//!
//! The engine is built around two passes:
//! - A hashing pipeline that streams tree events, selects files needing a
//!   hash, fans file reads out to a worker pool, and commits results to an
//!   embedded SQL store inside one exclusive transaction, all while
//!   preserving scan order through an explicit index.
//! - A generational merge that co-walks an older and a newer snapshot,
//!   emits the newer shape, and forwards each `sha1` whose inode + ctime
//!   evidence shows the file unchanged.
//!
//! Pipeline flow (hashing):
//! prior tree -> replay (prescan + rewind) -> path tracker -> dispatch ->
//! work queue -> workers -> finish queue -> collector -> SQL store.
//!
//! The snapshot format parser, the delta container, terminal rendering,
//! and the CLI are external collaborators; this crate consumes them
//! through the [`stream::NodeSource`], [`weave`], and
//! [`progress::Meter`] seams.

pub mod errors;
pub mod hashing;
pub mod merge;
pub mod node;
pub mod progress;
pub mod stdx;
pub mod store;
pub mod stream;
pub mod track;
pub mod update;
pub mod weave;

#[cfg(test)]
pub mod test_utils;

pub use errors::{MergeError, StoreError, TreeError, UpdateError, WeaveError};
pub use merge::{merge_trees, migrate_atts, NodeSink};
pub use node::{needs_hash, Atts, Node};
pub use progress::{Meter, Progress};
pub use store::{HashStore, MemoryStore, SqliteStore};
pub use stream::{NodeCursor, NodeSource, ReplaySource, VecSource};
pub use track::{PathTracked, PathTracker};
pub use update::{default_workers, update_hashes, UpdateStats};
