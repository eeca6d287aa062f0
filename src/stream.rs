//! Lazy node streams: sources, replay memoization, and lookahead cursors.
//!
//! A [`NodeSource`] is single-pass by construction: iteration consumes.
//! The update pipeline needs two traversals (prescan for totals, then
//! dispatch), so [`ReplaySource`] buffers the first pass and replays it.
//! Memoization is caller-controlled: an unwrapped source may only be
//! iterated once.
//!
//! [`NodeCursor`] adds one-token lookahead over any source; the merge
//! co-walk drives two of them.

use crate::errors::TreeError;
use crate::node::Node;

/// A finite stream of tree events.
///
/// `Ok(None)` is end-of-stream. Errors are fatal: a source that fails
/// mid-stream has produced a corrupt prefix nothing downstream can use.
pub trait NodeSource {
    fn next_node(&mut self) -> Result<Option<Node>, TreeError>;
}

impl<F> NodeSource for F
where
    F: FnMut() -> Result<Option<Node>, TreeError>,
{
    fn next_node(&mut self) -> Result<Option<Node>, TreeError> {
        self()
    }
}

/// Owned-vector source, used by tests and for merged-tree output.
#[derive(Debug)]
pub struct VecSource {
    nodes: std::vec::IntoIter<Node>,
}

impl VecSource {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: nodes.into_iter(),
        }
    }
}

impl NodeSource for VecSource {
    fn next_node(&mut self) -> Result<Option<Node>, TreeError> {
        Ok(self.nodes.next())
    }
}

/// Replayable wrapper over a single-pass source.
///
/// The first traversal pulls from the inner source and records every node;
/// after [`rewind`](Self::rewind), subsequent traversals are served from
/// the buffer. The buffer holds the whole stream, which is acceptable for
/// the two-pass prescan/dispatch pattern this exists for.
///
/// # Invariants
/// - `pos <= buf.len()`
/// - Once `exhausted` is set the inner source is never polled again.
pub struct ReplaySource<S> {
    inner: S,
    buf: Vec<Node>,
    pos: usize,
    exhausted: bool,
}

impl<S: NodeSource> ReplaySource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
            exhausted: false,
        }
    }

    /// Restart the stream from the beginning.
    ///
    /// Only nodes already pulled are replayed; a rewind mid-stream resumes
    /// pulling from the inner source once the buffer is drained.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl<S: NodeSource> NodeSource for ReplaySource<S> {
    fn next_node(&mut self) -> Result<Option<Node>, TreeError> {
        assert!(self.pos <= self.buf.len());

        if self.pos < self.buf.len() {
            let node = self.buf[self.pos].clone();
            self.pos += 1;
            return Ok(Some(node));
        }

        if self.exhausted {
            return Ok(None);
        }

        match self.inner.next_node()? {
            Some(node) => {
                self.buf.push(node.clone());
                self.pos += 1;
                Ok(Some(node))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

/// One-token lookahead over a node source.
///
/// `peek` fills the head lazily; `advance` consumes it. The head is only
/// pulled when asked for, so a cursor over a partially consumed stream
/// never reads further than the caller has looked.
pub struct NodeCursor<S> {
    source: S,
    head: Option<Node>,
    filled: bool,
}

impl<S: NodeSource> NodeCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            head: None,
            filled: false,
        }
    }

    /// Returns the next node without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Node>, TreeError> {
        if !self.filled {
            self.head = self.source.next_node()?;
            self.filled = true;
        }
        Ok(self.head.as_ref())
    }

    /// Consumes and returns the next node.
    pub fn advance(&mut self) -> Result<Option<Node>, TreeError> {
        if !self.filled {
            self.head = self.source.next_node()?;
            self.filled = true;
        }
        let node = self.head.take();
        self.filled = node.is_none();
        Ok(node)
    }
}
