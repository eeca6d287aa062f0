//! Tree snapshot events and attribute access.
//!
//! A prior snapshot is consumed as a flat stream of [`Node`] events
//! describing a depth-first walk. The grammar per directory is:
//! sub-`Enter`/`Leave` blocks, then `Sep`, then `File` events, with all
//! names in ascending byte order.
//!
//! # Invariants
//! - `Enter` and `Leave` counts balance over a complete tree, and no
//!   prefix closes more directories than it opened.
//! - The outermost `Enter` carries the sentinel name [`ROOT_NAME`];
//!   consumers replace it with a caller-supplied logical root.
//! - Attribute maps are ordered (`BTreeMap`) so serialized forms and
//!   comparisons are deterministic.

use std::collections::BTreeMap;

/// Attribute map attached to `Enter` and `File` events.
pub type Atts = BTreeMap<String, String>;

/// Sentinel name carried by the outermost `Enter`.
pub const ROOT_NAME: &str = "__root__";

/// Attribute key marking the entry kind (`"file"` for regular files).
pub const ATT_KIND: &str = "kind";
/// Attribute key holding the decimal byte count.
pub const ATT_SIZE: &str = "size";
/// Attribute key holding the inode number.
pub const ATT_INO: &str = "ino";
/// Attribute key holding the inode change time.
pub const ATT_CTIME: &str = "ctime";
/// Attribute key holding the lowercase-hex SHA-1 of the file contents.
pub const ATT_SHA1: &str = "sha1";

/// Kind value for regular files.
pub const KIND_FILE: &str = "file";

/// One event in a depth-first walk of a tree snapshot.
///
/// Exactly these cases exist; extending the set would disturb the
/// traversal grammar every consumer relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Open a directory.
    Enter { name: String, atts: Atts },
    /// Close the most recently opened directory.
    Leave,
    /// Separator between the child-directory and file sections.
    Sep,
    /// A non-directory entry.
    File { name: String, atts: Atts },
}

impl Node {
    /// Returns the entry name for `Enter` and `File` events.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Enter { name, .. } | Self::File { name, .. } => Some(name),
            Self::Leave | Self::Sep => None,
        }
    }

    /// Returns the attribute map for `Enter` and `File` events.
    pub fn atts(&self) -> Option<&Atts> {
        match self {
            Self::Enter { atts, .. } | Self::File { atts, .. } => Some(atts),
            Self::Leave | Self::Sep => None,
        }
    }

    /// Returns the decimal `size` attribute, treating absence as 0.
    pub fn size(&self) -> u64 {
        self.atts()
            .and_then(|atts| atts.get(ATT_SIZE))
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }
}

/// Returns true for attribute maps describing a regular file.
pub fn is_file_kind(atts: &Atts) -> bool {
    atts.get(ATT_KIND).map(String::as_str) == Some(KIND_FILE)
}

/// Decides whether a node requires a content hash.
///
/// True iff the node is a `File`, its `kind` is `"file"`, and no `sha1`
/// attribute is present. Directory events, separators, and non-file
/// entries (symlinks, devices) never need hashing, so a stream whose
/// files already carry hashes produces zero work.
pub fn needs_hash(node: &Node) -> bool {
    match node {
        Node::File { atts, .. } => is_file_kind(atts) && !atts.contains_key(ATT_SHA1),
        Node::Enter { .. } | Node::Leave | Node::Sep => false,
    }
}
