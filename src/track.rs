//! Path tracking over a node stream.
//!
//! Augments each tree event with the absolute logical path reached at
//! that event: the directory's path for `Enter`/`Leave`, the containing
//! directory for `Sep`, and the full file path for `File`.
//!
//! The caller supplies the logical root; the stream's own root sentinel
//! name is replaced by it, and the root prefix is preserved verbatim while
//! deeper components join with the platform separator.

use std::path::{Path, PathBuf};

use crate::errors::TreeError;
use crate::node::{Node, ROOT_NAME};
use crate::stream::NodeSource;

/// Tracks the absolute path through a depth-first event stream.
///
/// # Invariants
/// - The stack is seeded with the root and never empty while the stream
///   is balanced; the final `Leave` pops the root itself.
/// - A `Leave` on an empty stack is corrupt input and fatal.
pub struct PathTracker {
    stack: Vec<PathBuf>,
}

impl PathTracker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            stack: vec![root.as_ref().to_path_buf()],
        }
    }

    /// Depth of the directory stack, including the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the path reached at `node`, updating tracker state.
    pub fn track(&mut self, node: &Node) -> Result<PathBuf, TreeError> {
        match node {
            Node::Enter { name, .. } => {
                // The outermost Enter carries a sentinel name that stands
                // in for the caller-supplied root; it does not nest.
                if self.stack.len() == 1 && name == ROOT_NAME {
                    return Ok(self.stack[0].clone());
                }
                let dir = self
                    .stack
                    .last()
                    .ok_or(TreeError::UnbalancedLeave)?
                    .join(name);
                self.stack.push(dir.clone());
                Ok(dir)
            }
            Node::Leave => self.stack.pop().ok_or(TreeError::UnbalancedLeave),
            Node::Sep => self
                .stack
                .last()
                .cloned()
                .ok_or(TreeError::UnbalancedLeave),
            Node::File { name, .. } => {
                let dir = self.stack.last().ok_or(TreeError::UnbalancedLeave)?;
                Ok(dir.join(name))
            }
        }
    }
}

/// Stream adapter yielding `(node, path)` pairs.
pub struct PathTracked<S> {
    source: S,
    tracker: PathTracker,
}

impl<S: NodeSource> PathTracked<S> {
    pub fn new(source: S, root: impl AsRef<Path>) -> Self {
        Self {
            source,
            tracker: PathTracker::new(root),
        }
    }

    /// Returns the next event with the path reached at it.
    pub fn next_tracked(&mut self) -> Result<Option<(Node, PathBuf)>, TreeError> {
        match self.source.next_node()? {
            Some(node) => {
                let path = self.tracker.track(&node)?;
                Ok(Some((node, path)))
            }
            None => Ok(None),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::node::Atts;
    use crate::stream::VecSource;
    use proptest::prelude::*;

    const PROPTEST_CASES: u32 = 32;

    /// Directory shape: named subtrees plus named files, matching the
    /// children-then-Sep-then-files grammar.
    #[derive(Debug, Clone)]
    struct Dir {
        dirs: Vec<(String, Dir)>,
        files: Vec<String>,
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    fn dir_strategy() -> impl Strategy<Value = Dir> {
        let leaf = proptest::collection::vec(name_strategy(), 0..4)
            .prop_map(|files| Dir { dirs: Vec::new(), files });
        leaf.prop_recursive(3, 24, 4, |inner| {
            (
                proptest::collection::vec((name_strategy(), inner), 0..3),
                proptest::collection::vec(name_strategy(), 0..4),
            )
                .prop_map(|(dirs, files)| Dir { dirs, files })
        })
    }

    fn emit(dir: &Dir, name: &str, out: &mut Vec<Node>) {
        out.push(Node::Enter {
            name: name.into(),
            atts: Atts::new(),
        });
        let mut subs = dir.dirs.clone();
        subs.sort_by(|a, b| a.0.cmp(&b.0));
        subs.dedup_by(|a, b| a.0 == b.0);
        for (sub_name, sub) in &subs {
            emit(sub, sub_name, out);
        }
        out.push(Node::Sep);
        let mut files = dir.files.clone();
        files.sort();
        files.dedup();
        for file in files {
            out.push(Node::File {
                name: file,
                atts: Atts::new(),
            });
        }
        out.push(Node::Leave);
    }

    /// Expected file paths: the supplied root joined with every live Enter
    /// name above the file, computed directly from the shape.
    fn expected_files(dir: &Dir, prefix: &PathBuf, out: &mut Vec<PathBuf>) {
        let mut subs = dir.dirs.clone();
        subs.sort_by(|a, b| a.0.cmp(&b.0));
        subs.dedup_by(|a, b| a.0 == b.0);
        for (sub_name, sub) in &subs {
            expected_files(sub, &prefix.join(sub_name), out);
        }
        let mut files = dir.files.clone();
        files.sort();
        files.dedup();
        for file in files {
            out.push(prefix.join(file));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(
            crate::test_utils::proptest_cases(PROPTEST_CASES)
        ))]

        /// The path at every File event equals the concatenation of the
        /// live Enter names above it, prefixed with the supplied root.
        #[test]
        fn file_paths_match_live_enters(root in dir_strategy()) {
            let mut nodes = Vec::new();
            emit(&root, ROOT_NAME, &mut nodes);

            let mut stream = PathTracked::new(VecSource::new(nodes), "base");
            let mut got = Vec::new();
            while let Some((node, path)) = stream.next_tracked().unwrap() {
                if matches!(node, Node::File { .. }) {
                    got.push(path);
                }
            }

            let mut want = Vec::new();
            expected_files(&root, &PathBuf::from("base"), &mut want);
            prop_assert_eq!(got, want);
        }

        /// A balanced stream leaves the tracker with an empty stack.
        #[test]
        fn balanced_stream_unwinds_fully(root in dir_strategy()) {
            let mut nodes = Vec::new();
            emit(&root, ROOT_NAME, &mut nodes);

            let mut tracker = PathTracker::new("base");
            for node in &nodes {
                tracker.track(node).unwrap();
            }
            prop_assert_eq!(tracker.depth(), 0);
        }
    }
}
