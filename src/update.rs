//! Hash-update driver: prescan, dispatch, and commit.
//!
//! Walks a prior tree snapshot, hashes every file that needs it, and
//! persists `(index, sha1)` rows inside one exclusive transaction.
//!
//! Pipeline flow:
//! prior tree -> replay (prescan + rewind) -> path tracker -> dispatch ->
//! direct sink, or work queue -> worker pool -> finish queue -> collector.
//!
//! # Design
//! - Hashing is CPU-bound per file and holds no shared lock, so a worker
//!   pool is the only way past single-core throughput. The direct sink
//!   remains as the single-threaded fallback and the reference behavior.
//! - Both queues are bounded at `2 * workers`: the work queue stops the
//!   dispatcher from buffering the whole scan, the finish queue stops
//!   workers from racing ahead of the single DB writer.
//! - Shutdown is sentinel-counted: the dispatcher enqueues one `None` per
//!   worker, each worker forwards one `None` when it exits, and the
//!   collector returns after seeing all of them. The scoped join then
//!   guarantees no thread outlives the run.
//!
//! # Ordering
//! - Work is dispatched in scan order; `index` carries that order.
//! - Workers complete out of order; insert order is collector-arrival
//!   order. The row *set* equals the direct sink's for any input.
//!
//! # Errors
//! - A per-file I/O failure is a warning; the row is omitted and the run
//!   continues.
//! - Stream or store failures are fatal: the shutdown protocol still runs
//!   so every thread exits, then the error propagates and the transaction
//!   is abandoned uncommitted. A panicked worker or collector propagates
//!   out of the scoped join and aborts the process.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, warn};

use crate::errors::{StoreError, UpdateError};
use crate::hashing::{hash_file, SHA1_LEN};
use crate::node::needs_hash;
use crate::progress::{Meter, Progress};
use crate::stdx::sync_queue::SyncQueue;
use crate::store::HashStore;
use crate::stream::{NodeSource, ReplaySource};
use crate::track::PathTracked;

/// Summary counters for one update run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Files hashed and inserted.
    pub hashed: u64,
    /// Files that failed to hash (warned and omitted).
    pub failed: u64,
    /// Bytes hashed, summed from the `size` attribute.
    pub octets: u64,
}

/// Unit of work handed to the pool: scan position, file path, size.
struct WorkItem {
    index: u64,
    path: PathBuf,
    size: u64,
}

/// Completed hash returning from a worker.
struct DoneItem {
    index: u64,
    size: u64,
    sha1: [u8; SHA1_LEN],
}

/// Worker count matching the machine's available parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Hashes every file the prior tree marks as needing it.
///
/// Prescans `source` for progress totals, opens the store's exclusive
/// transaction, walks the path-tracked stream with a zero-based `index`
/// counting every tracked event, dispatches nodes passing the needs-hash
/// predicate, and commits on success.
///
/// `workers == 1` runs the direct single-threaded sink; larger counts run
/// the worker pool. Row sets are identical either way.
///
/// # Errors
/// Corrupt prior trees and store failures are fatal; the transaction is
/// never committed on an error path.
pub fn update_hashes<S, Src, M>(
    store: &mut S,
    source: Src,
    root: impl AsRef<Path>,
    meter: &mut M,
    workers: usize,
) -> Result<UpdateStats, UpdateError>
where
    S: HashStore + Send,
    Src: NodeSource,
    M: Meter + Send,
{
    assert!(workers >= 1, "at least one worker required");

    let mut replay = ReplaySource::new(source);
    let mut progress = Progress::prescan(&mut replay)?;
    replay.rewind();

    let (total_files, total_octets) = progress.totals();
    debug!(total_files, total_octets, workers, "hash update prescan complete");

    store.begin()?;
    let mut stream = PathTracked::new(replay, root.as_ref());

    let stats = if workers == 1 {
        run_direct(store, &mut stream, &mut progress, meter)?
    } else {
        run_threaded(store, &mut stream, &mut progress, meter, workers)?
    };

    store.commit()?;
    progress.done(meter);
    Ok(stats)
}

/// Single-threaded sink: hash and insert inline, in scan order.
fn run_direct<S, Src, M>(
    store: &mut S,
    stream: &mut PathTracked<Src>,
    progress: &mut Progress,
    meter: &mut M,
) -> Result<UpdateStats, UpdateError>
where
    S: HashStore,
    Src: NodeSource,
    M: Meter,
{
    let mut stats = UpdateStats::default();
    let mut index = 0u64;

    while let Some((node, path)) = stream.next_tracked()? {
        let this_index = index;
        index += 1;

        if !needs_hash(&node) {
            continue;
        }

        let size = node.size();
        match hash_file(&path) {
            Ok(sha1) => {
                progress.update(size, meter);
                store.insert(this_index, &sha1)?;
                stats.hashed += 1;
                stats.octets += size;
            }
            Err(err) => {
                warn!("error hashing {}: {}", path.display(), err);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

/// Worker pool sink: `workers` hashers plus one collector.
fn run_threaded<S, Src, M>(
    store: &mut S,
    stream: &mut PathTracked<Src>,
    progress: &mut Progress,
    meter: &mut M,
    workers: usize,
) -> Result<UpdateStats, UpdateError>
where
    S: HashStore + Send,
    Src: NodeSource,
    M: Meter + Send,
{
    assert!(workers >= 2);

    let work: SyncQueue<Option<WorkItem>> = SyncQueue::new(2 * workers);
    let finish: SyncQueue<Option<DoneItem>> = SyncQueue::new(2 * workers);

    thread::scope(|scope| {
        let work = &work;
        let finish = &finish;

        let collector = {
            let store = &mut *store;
            let progress = &mut *progress;
            let meter = &mut *meter;
            scope.spawn(move || collect(store, progress, meter, finish, workers))
        };

        for _ in 0..workers {
            scope.spawn(move || worker_loop(work, finish));
        }

        // Dispatch in scan order. On a stream error the shutdown protocol
        // still runs so every thread exits before the error propagates.
        let mut index = 0u64;
        let mut dispatched = 0u64;
        let mut dispatched_octets = 0u64;
        let dispatch_result: Result<(), UpdateError> = loop {
            match stream.next_tracked() {
                Ok(Some((node, path))) => {
                    let this_index = index;
                    index += 1;
                    if !needs_hash(&node) {
                        continue;
                    }
                    let size = node.size();
                    work.push(Some(WorkItem {
                        index: this_index,
                        path,
                        size,
                    }));
                    dispatched += 1;
                    dispatched_octets += size;
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err.into()),
            }
        };

        for _ in 0..workers {
            work.push(None);
        }

        let (hashed, octets, store_failure) =
            collector.join().expect("collector thread panicked");

        dispatch_result?;
        if let Some(err) = store_failure {
            return Err(err.into());
        }

        assert!(hashed <= dispatched);
        assert!(octets <= dispatched_octets);

        Ok(UpdateStats {
            hashed,
            failed: dispatched - hashed,
            octets,
        })
    })
}

/// Worker loop: pop, hash, push; forward the sentinel and exit on `None`.
fn worker_loop(work: &SyncQueue<Option<WorkItem>>, finish: &SyncQueue<Option<DoneItem>>) {
    loop {
        match work.pop() {
            None => {
                finish.push(None);
                return;
            }
            Some(item) => match hash_file(&item.path) {
                Ok(sha1) => finish.push(Some(DoneItem {
                    index: item.index,
                    size: item.size,
                    sha1,
                })),
                Err(err) => {
                    warn!("error hashing {}: {}", item.path.display(), err);
                }
            },
        }
    }
}

/// Collector loop: the only store writer while the pool runs.
///
/// Counts one sentinel per worker. A store failure stops inserting but
/// keeps draining, so blocked workers can finish the shutdown protocol;
/// the failure is reported to the driver afterwards.
fn collect<S, M>(
    store: &mut S,
    progress: &mut Progress,
    meter: &mut M,
    finish: &SyncQueue<Option<DoneItem>>,
    workers: usize,
) -> (u64, u64, Option<StoreError>)
where
    S: HashStore,
    M: Meter,
{
    let mut remaining = workers;
    let mut hashed = 0u64;
    let mut octets = 0u64;
    let mut failure: Option<StoreError> = None;

    while remaining > 0 {
        match finish.pop() {
            None => remaining -= 1,
            Some(done) => {
                if failure.is_some() {
                    continue;
                }
                progress.update(done.size, meter);
                match store.insert(done.index, &done.sha1) {
                    Ok(()) => {
                        hashed += 1;
                        octets += done.size;
                    }
                    Err(err) => failure = Some(err),
                }
            }
        }
    }

    (hashed, octets, failure)
}
