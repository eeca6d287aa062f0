//! Generational tree merge: forward hashes from an older snapshot.
//!
//! Co-walks two snapshot streams (older, latest) and emits a stream
//! shaped exactly like the latest one, copying the `sha1` attribute from
//! the older node wherever inode and ctime say the file is unchanged.
//!
//! # Algorithm
//!
//! A two-finger merge over the traversal grammar, not a flat sequence.
//! Each open directory is merged in two sub-states:
//!
//! - *children* (between `Enter` and `Sep`): subtrees are matched by
//!   name. An older-only subtree is skipped wholesale; a newer-only
//!   subtree is emitted wholesale; a shared name descends.
//! - *files* (between `Sep` and `Leave`): files are matched by name.
//!   Older-only files are dropped, newer-only files pass through, and a
//!   shared name runs the migration predicate over both attribute maps.
//!
//! The walk uses an explicit state stack (no recursion), so auxiliary
//! memory is proportional to tree depth and the pass is
//! O(|older| + |latest|).
//!
//! # Invariants
//! - Both inputs obey the traversal grammar (balanced nesting, children
//!   then `Sep` then files, ascending names). Any head combination
//!   outside the legal set is fatal.
//! - The first event of each stream is its root `Enter`; differing root
//!   names are fatal.
//! - A stream ending inside the co-walk is fatal.

use crate::errors::MergeError;
use crate::node::{is_file_kind, Atts, Node, ATT_CTIME, ATT_INO, ATT_SHA1};
use crate::stream::{NodeCursor, NodeSource};

/// Receiver for merged output nodes.
pub trait NodeSink {
    fn push_node(&mut self, node: Node) -> Result<(), MergeError>;
}

impl NodeSink for Vec<Node> {
    fn push_node(&mut self, node: Node) -> Result<(), MergeError> {
        self.push(node);
        Ok(())
    }
}

/// Sub-state of one open directory level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    Children,
    Files,
}

/// Head classification for one cursor.
///
/// Computed before any mutation so the merge decision never holds a
/// borrow into either cursor while it advances them.
#[derive(Clone, Debug)]
enum Head {
    Enter(String),
    File(String),
    Sep,
    Leave,
    End,
}

fn classify<S: NodeSource>(cursor: &mut NodeCursor<S>) -> Result<Head, MergeError> {
    Ok(match cursor.peek()? {
        None => Head::End,
        Some(Node::Enter { name, .. }) => Head::Enter(name.clone()),
        Some(Node::File { name, .. }) => Head::File(name.clone()),
        Some(Node::Sep) => Head::Sep,
        Some(Node::Leave) => Head::Leave,
    })
}

/// Applies the hash-migration predicate to one matched file pair.
///
/// The newer attributes win unless all evidence lines up: the newer node
/// has no `sha1` yet, both sides are regular files, the older node has a
/// `sha1`, and inode + ctime match exactly. Only then is the older hash
/// copied over; nothing else in the newer map changes.
pub fn migrate_atts(older: &Atts, newer: &Atts) -> Atts {
    if newer.contains_key(ATT_SHA1) {
        return newer.clone();
    }
    if !is_file_kind(older) || !is_file_kind(newer) {
        return newer.clone();
    }
    let Some(sha) = older.get(ATT_SHA1) else {
        return newer.clone();
    };

    let same_identity = matches!(
        (
            older.get(ATT_INO),
            newer.get(ATT_INO),
            older.get(ATT_CTIME),
            newer.get(ATT_CTIME),
        ),
        (Some(oi), Some(ni), Some(oc), Some(nc)) if oi == ni && oc == nc
    );

    let mut out = newer.clone();
    if same_identity {
        out.insert(ATT_SHA1.to_string(), sha.clone());
    }
    out
}

/// Merges `latest` against `older`, emitting into `sink`.
///
/// The emitted stream has exactly the shape of `latest` (variants, names,
/// order); the only attribute that can differ is a forwarded `sha1`.
pub fn merge_trees<A, B, K>(older: A, latest: B, sink: &mut K) -> Result<(), MergeError>
where
    A: NodeSource,
    B: NodeSource,
    K: NodeSink,
{
    let mut older = NodeCursor::new(older);
    let mut latest = NodeCursor::new(latest);

    // Root handling: both streams open with their root Enter, and the
    // names must agree; the newer root is the one emitted.
    let old_root = older.advance()?.ok_or(MergeError::UnexpectedEof)?;
    let new_root = latest.advance()?.ok_or(MergeError::UnexpectedEof)?;
    match (&old_root, &new_root) {
        (Node::Enter { name: a, .. }, Node::Enter { name: b, .. }) => {
            if a != b {
                return Err(MergeError::RootNameMismatch);
            }
        }
        _ => return Err(MergeError::InvalidNode),
    }
    sink.push_node(new_root)?;

    let mut stack = vec![Walk::Children];

    while let Some(state) = stack.last().copied() {
        let old_head = classify(&mut older)?;
        let new_head = classify(&mut latest)?;

        match state {
            Walk::Children => match (old_head, new_head) {
                (Head::Sep, Head::Sep) => {
                    older.advance()?;
                    latest.advance()?;
                    sink.push_node(Node::Sep)?;
                    *stack.last_mut().expect("state present") = Walk::Files;
                }
                (Head::Enter(_), Head::Sep) => skip_subtree(&mut older)?,
                (Head::Sep, Head::Enter(_)) => copy_subtree(&mut latest, sink)?,
                (Head::Enter(a), Head::Enter(b)) => {
                    if a < b {
                        skip_subtree(&mut older)?;
                    } else if a > b {
                        copy_subtree(&mut latest, sink)?;
                    } else {
                        older.advance()?;
                        let enter = latest.advance()?.expect("peeked Enter present");
                        sink.push_node(enter)?;
                        stack.push(Walk::Children);
                    }
                }
                (Head::End, _) | (_, Head::End) => return Err(MergeError::UnexpectedEof),
                _ => return Err(MergeError::InvalidNode),
            },

            Walk::Files => match (old_head, new_head) {
                (Head::Leave, Head::Leave) => {
                    older.advance()?;
                    latest.advance()?;
                    sink.push_node(Node::Leave)?;
                    stack.pop();
                }
                (Head::File(_), Head::Leave) => {
                    // Older has an extra file; nothing to forward.
                    older.advance()?;
                }
                (Head::Leave, Head::File(_)) => {
                    let file = latest.advance()?.expect("peeked File present");
                    sink.push_node(file)?;
                }
                (Head::File(a), Head::File(b)) => {
                    if a < b {
                        older.advance()?;
                    } else if a > b {
                        let file = latest.advance()?.expect("peeked File present");
                        sink.push_node(file)?;
                    } else {
                        let old_file = older.advance()?.expect("peeked File present");
                        let new_file = latest.advance()?.expect("peeked File present");
                        let (Node::File { atts: old_atts, .. }, Node::File { name, atts }) =
                            (old_file, new_file)
                        else {
                            unreachable!("files state heads are File events");
                        };
                        sink.push_node(Node::File {
                            name,
                            atts: migrate_atts(&old_atts, &atts),
                        })?;
                    }
                }
                (Head::End, _) | (_, Head::End) => return Err(MergeError::UnexpectedEof),
                _ => return Err(MergeError::InvalidFileNode),
            },
        }
    }

    // Both trees are balanced, so the final Leave exhausts them together.
    if older.peek()?.is_some() || latest.peek()?.is_some() {
        return Err(MergeError::InvalidNode);
    }
    Ok(())
}

/// Reads and discards one whole subtree from `cursor`, counting nesting
/// from its `Enter` to the matching `Leave`.
fn skip_subtree<S: NodeSource>(cursor: &mut NodeCursor<S>) -> Result<(), MergeError> {
    let first = cursor.advance()?.ok_or(MergeError::UnexpectedEof)?;
    debug_assert!(matches!(first, Node::Enter { .. }));

    let mut depth = 1usize;
    while depth > 0 {
        match cursor.advance()?.ok_or(MergeError::UnexpectedEof)? {
            Node::Enter { .. } => depth += 1,
            Node::Leave => depth -= 1,
            Node::Sep | Node::File { .. } => {}
        }
    }
    Ok(())
}

/// Emits one whole subtree from `cursor` into `sink`, unchanged.
fn copy_subtree<S: NodeSource, K: NodeSink>(
    cursor: &mut NodeCursor<S>,
    sink: &mut K,
) -> Result<(), MergeError> {
    let first = cursor.advance()?.ok_or(MergeError::UnexpectedEof)?;
    debug_assert!(matches!(first, Node::Enter { .. }));
    sink.push_node(first)?;

    let mut depth = 1usize;
    while depth > 0 {
        let node = cursor.advance()?.ok_or(MergeError::UnexpectedEof)?;
        match &node {
            Node::Enter { .. } => depth += 1,
            Node::Leave => depth -= 1,
            Node::Sep | Node::File { .. } => {}
        }
        sink.push_node(node)?;
    }
    Ok(())
}
