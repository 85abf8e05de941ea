//! Per-thread scheduling state and the three scheduler algorithms.
//!
//! One [`WorkerCursor`] exists per participating thread. The scheduling
//! fields are written only by the owning thread; `working_index` is published
//! through a relaxed atomic so an external supervisor can watch progress
//! (and, above this layer, implement cancellation) without any locking.

use core::cmp;

use tracing::trace;
use tracing::trace_span;

use crate::body::LoopBody;
use crate::body::invoke_range;
use crate::platform::*;
use crate::schedule::ScheduleKind;
use crate::schedule::SharedSchedule;

// -----------------------------------------------------------------------------
// Per-thread cursor

/// One worker thread's private scheduling bookkeeping, plus its externally
/// observable progress index.
pub struct WorkerCursor {
    /// This worker's 0-based id, `< num_threads`.
    thread_id: usize,
    /// The static schedule's next chunk start. Written only by the owning
    /// thread; derivable from `thread_id`, the chunk size and the stride.
    next_start: AtomicUsize,
    /// The index currently being processed. Updated before every loop-body
    /// invocation; never read by the scheduling logic itself.
    working_index: AtomicUsize,
}

impl WorkerCursor {
    /// Creates the cursor record for the given worker thread.
    pub fn new(thread_id: usize) -> WorkerCursor {
        WorkerCursor {
            thread_id,
            next_start: AtomicUsize::new(0),
            working_index: AtomicUsize::new(0),
        }
    }

    /// This worker's 0-based thread id.
    #[inline(always)]
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    /// The index this worker most recently started processing. Racy by
    /// design; use only for progress introspection.
    #[inline(always)]
    pub fn working_index(&self) -> usize {
        self.working_index.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) fn set_working_index(&self, index: usize) {
        self.working_index.store(index, Ordering::Relaxed);
    }

    #[inline(always)]
    fn set_next_start(&self, next_start: usize) {
        self.next_start.store(next_start, Ordering::Relaxed);
    }
}

// -----------------------------------------------------------------------------
// Worker entry point

/// Drives one worker thread's share of a parallel-for call to completion.
///
/// This is the entry point a fork-join supervisor calls once per
/// participating thread, concurrently with every other worker of the same
/// call. It runs the schedule selected in `shared` until the iteration space
/// is exhausted, then folds this thread's local reduction value into the
/// shared accumulator, exactly once.
pub fn run_worker<B>(shared: &SharedSchedule<B::Acc>, cursor: &WorkerCursor, body: &B)
where
    B: LoopBody,
{
    let span = trace_span!("worker", thread = cursor.thread_id());
    let _enter = span.enter();

    debug_assert!(cursor.thread_id() < shared.num_threads().get());

    let mut local = body.identity();

    match shared.kind() {
        ScheduleKind::Static => run_static(shared, cursor, body, &mut local),
        ScheduleKind::Dynamic => run_dynamic(shared, cursor, body, &mut local),
        ScheduleKind::Guided => run_guided(shared, cursor, body, &mut local),
    }

    shared.fold_reduction(local, |into, from| body.merge(into, from));

    trace!("worker share complete");
}

// -----------------------------------------------------------------------------
// Scheduler algorithms

/// Round-robin block distribution: thread `t` processes blocks `t`,
/// `t + num_threads`, `t + 2 * num_threads`, … of `chunk` indices each. Every
/// value read from `shared` is immutable for the call's duration and
/// `next_start` belongs to this thread alone, so no synchronization is
/// involved.
fn run_static<B>(
    shared: &SharedSchedule<B::Acc>,
    cursor: &WorkerCursor,
    body: &B,
    local: &mut B::Acc,
) where
    B: LoopBody,
{
    let bounds = shared.bounds();
    let chunk = shared.chunk();
    let stride = shared.num_threads().get().saturating_mul(chunk);

    // Threads whose first block already lies past the end never run the body.
    let mut next_start = bounds
        .start
        .saturating_add(cursor.thread_id().saturating_mul(chunk));
    cursor.set_next_start(next_start);

    while next_start < bounds.end {
        let chunk_end = cmp::min(next_start.saturating_add(chunk), bounds.end);
        invoke_range(body, cursor, next_start..chunk_end, local);

        next_start = next_start.saturating_add(stride);
        cursor.set_next_start(next_start);
    }
}

/// Fixed-size chunks claimed from the shared cursor. Losing the race for the
/// final chunk yields `None`, which simply ends this thread's participation.
fn run_dynamic<B>(
    shared: &SharedSchedule<B::Acc>,
    cursor: &WorkerCursor,
    body: &B,
    local: &mut B::Acc,
) where
    B: LoopBody,
{
    while let Some(claimed) = shared.claim_dynamic() {
        invoke_range(body, cursor, claimed, local);
    }
}

/// Shrinking chunks claimed under the schedule's claim lock. The lock is
/// released before the body runs; only the claim itself is serialized.
fn run_guided<B>(
    shared: &SharedSchedule<B::Acc>,
    cursor: &WorkerCursor,
    body: &B,
    local: &mut B::Acc,
) where
    B: LoopBody,
{
    while let Some(claimed) = shared.claim_guided() {
        invoke_range(body, cursor, claimed, local);
    }
}
