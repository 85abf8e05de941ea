//! Shared schedule state and schedule selection.
//!
//! A [`SharedSchedule`] is the single piece of state shared by every worker
//! participating in one parallel-for call: the iteration bounds, the chunk
//! size, the shared claim cursor and the reduction accumulator. It is
//! constructed once by the supervisor, handed to each worker by reference,
//! and consumed when the call returns.

use core::cmp;
use core::num::NonZeroUsize;
use core::ops::Range;

use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::platform::*;

// -----------------------------------------------------------------------------
// Schedule requests

/// How the iteration space of a parallel-for call should be distributed
/// across the participating threads.
///
/// Each concrete variant carries an optional chunk-size override. When no
/// override is given, the chunk size defaults to
/// `ceil((end - start) / num_threads)` (at least 1), which for the static
/// schedule hands every thread one contiguous block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Round-robin block distribution, fixed at the start of the call. The
    /// chunks a thread receives depend only on its thread id, so no
    /// synchronization on shared state is needed.
    Static {
        /// Chunk-size override. `Some(0)` is rejected at construction.
        chunk: Option<usize>,
    },
    /// Threads repeatedly claim fixed-size chunks from a shared cursor.
    Dynamic {
        /// Chunk-size override. `Some(0)` is rejected at construction.
        chunk: Option<usize>,
    },
    /// Like [`Schedule::Dynamic`], but chunks start large and shrink toward
    /// the configured minimum as the loop drains.
    Guided {
        /// Minimum chunk size. `Some(0)` is rejected at construction.
        chunk: Option<usize>,
    },
    /// Defer the choice to the [`SCHEDULE_ENV`](crate::SCHEDULE_ENV)
    /// configuration string, resolved once when the call starts.
    Runtime,
}

impl Schedule {
    /// Parses a schedule from a configuration string of the form
    /// `"<name>[,<chunk>]"`, where `<name>` is one of `static`, `dynamic` or
    /// `guided` (ASCII case-insensitive) and `<chunk>` is a positive integer.
    ///
    /// A malformed string is not an error: it falls back to the default
    /// static schedule and emits a `tracing` warning, so a bad environment
    /// setting degrades the distribution rather than failing the whole
    /// parallel region.
    pub fn from_config_str(raw: &str) -> Schedule {
        match config::parse_schedule(raw) {
            Some(schedule) => schedule,
            None => {
                tracing::warn!(
                    "unrecognized schedule config {raw:?}, falling back to the default static schedule"
                );
                Schedule::Static { chunk: None }
            }
        }
    }

    /// Resolves the request down to a concrete kind and chunk override,
    /// reading the runtime configuration if necessary.
    fn resolve(self) -> Result<(ScheduleKind, Option<usize>), ScheduleError> {
        let (kind, chunk) = match self {
            Schedule::Static { chunk } => (ScheduleKind::Static, chunk),
            Schedule::Dynamic { chunk } => (ScheduleKind::Dynamic, chunk),
            Schedule::Guided { chunk } => (ScheduleKind::Guided, chunk),
            // The parser never produces `Runtime`, so this recurses at most
            // once.
            Schedule::Runtime => return config::schedule_from_env().resolve(),
        };
        if chunk == Some(0) {
            return Err(ScheduleError::ZeroChunk);
        }
        Ok((kind, chunk))
    }
}

/// The concrete schedule algorithm selected for one parallel-for call, after
/// any [`Schedule::Runtime`] resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleKind {
    /// See [`Schedule::Static`].
    Static,
    /// See [`Schedule::Dynamic`].
    Dynamic,
    /// See [`Schedule::Guided`].
    Guided,
}

// -----------------------------------------------------------------------------
// Errors

/// A configuration error detected before any worker begins scheduling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The iteration range ran backwards (`end < start`).
    #[error("iteration bounds are reversed ({start} > {end})")]
    ReversedBounds {
        /// Start of the requested range.
        start: usize,
        /// End of the requested range.
        end: usize,
    },
    /// A chunk size of zero was requested.
    #[error("chunk size must be at least 1")]
    ZeroChunk,
}

// -----------------------------------------------------------------------------
// Shared schedule state

/// The scheduling state shared by every worker of one parallel-for call.
///
/// The only mutable fields are the claim cursor and the reduction
/// accumulator. The cursor is advanced with a clamped compare-exchange by the
/// dynamic schedule and under the claim lock by the guided schedule, so at
/// every observation point `start <= cursor <= end` holds and the cursor is
/// monotonically non-decreasing. The static schedule never touches it.
pub struct SharedSchedule<A> {
    /// Iteration space `[start, end)`.
    start: usize,
    end: usize,
    /// Chunk size, at least 1. The minimum chunk size for the guided
    /// schedule.
    chunk: usize,
    /// Number of participating threads, fixed for the call's lifetime.
    num_threads: NonZeroUsize,
    /// The algorithm driving this call.
    kind: ScheduleKind,
    /// Next unclaimed index. Meaningful only for the dynamic and guided
    /// schedules.
    cursor: AtomicUsize,
    /// Guards the guided read-compute-advance sequence, which must be atomic
    /// as a unit because the chunk length depends on the current cursor.
    claim: Mutex<()>,
    /// The shared reduction accumulator. Each worker folds its local value in
    /// exactly once, when its share of the loop is exhausted.
    reduction: Mutex<A>,
}

impl<A> SharedSchedule<A> {
    /// Creates the shared state for one parallel-for call over `range`,
    /// seeding the reduction accumulator with `identity`.
    ///
    /// This is where all preconditions are checked and where a
    /// [`Schedule::Runtime`] request is resolved, so workers can start
    /// scheduling without ever having to fail.
    pub fn new(
        range: Range<usize>,
        schedule: Schedule,
        num_threads: NonZeroUsize,
        identity: A,
    ) -> Result<SharedSchedule<A>, ScheduleError> {
        if range.end < range.start {
            return Err(ScheduleError::ReversedBounds {
                start: range.start,
                end: range.end,
            });
        }

        let (kind, chunk) = schedule.resolve()?;
        let chunk = chunk.unwrap_or_else(|| default_chunk(range.end - range.start, num_threads));

        debug!(
            ?kind,
            chunk,
            num_threads = num_threads.get(),
            start = range.start,
            end = range.end,
            "created shared schedule"
        );

        Ok(SharedSchedule {
            start: range.start,
            end: range.end,
            chunk,
            num_threads,
            kind,
            cursor: AtomicUsize::new(range.start),
            claim: Mutex::new(()),
            reduction: Mutex::new(identity),
        })
    }

    /// The iteration space `[start, end)` of this call.
    #[inline(always)]
    pub fn bounds(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The chunk size in effect for this call.
    #[inline(always)]
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// The number of threads participating in this call.
    #[inline(always)]
    pub fn num_threads(&self) -> NonZeroUsize {
        self.num_threads
    }

    /// The concrete schedule algorithm driving this call.
    #[inline(always)]
    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// The next unclaimed index. Always within `start..=end`. This is an
    /// observation hook; the schedulers never base decisions on a bare load.
    #[inline(always)]
    pub fn cursor_position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Claims the next fixed-size chunk for the dynamic schedule, or `None`
    /// once the iteration space is exhausted.
    ///
    /// The advance is a compare-exchange clamped to `end`, so the fetch and
    /// the advance commit as one indivisible step: two threads can never
    /// observe overlapping claims, and the cursor never moves past `end`. A
    /// thread that loses the race for the final chunk simply gets `None`.
    pub fn claim_dynamic(&self) -> Option<Range<usize>> {
        let mut claimed = self.cursor.load(Ordering::Relaxed);
        loop {
            if claimed == self.end {
                return None;
            }
            let next = cmp::min(claimed.saturating_add(self.chunk), self.end);
            match self
                .cursor
                .compare_exchange_weak(claimed, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Some(claimed..next),
                Err(observed) => claimed = observed,
            }
        }
    }

    /// Claims the next chunk for the guided schedule, or `None` once the
    /// iteration space is exhausted.
    ///
    /// The chunk length is `max(chunk, remaining / (num_threads * 2))`, so
    /// chunks are large while plenty of work remains (few claims, little
    /// contention) and shrink toward the configured minimum near the end
    /// (little final imbalance). The read-compute-advance sequence runs under
    /// the claim lock because the length depends on the cursor value read.
    pub fn claim_guided(&self) -> Option<Range<usize>> {
        let _guard = self.claim.lock().unwrap();
        let claimed = self.cursor.load(Ordering::Relaxed);
        if claimed == self.end {
            return None;
        }
        let remaining = self.end - claimed;
        let len = cmp::max(self.chunk, remaining / self.num_threads.get().saturating_mul(2));
        let next = cmp::min(claimed.saturating_add(len), self.end);
        self.cursor.store(next, Ordering::Relaxed);
        Some(claimed..next)
    }

    /// Folds one worker's local reduction value into the shared accumulator.
    /// Called exactly once per worker, after its share of the loop is
    /// exhausted.
    pub(crate) fn fold_reduction(&self, local: A, merge: impl FnOnce(&mut A, A)) {
        let mut shared = self.reduction.lock().unwrap();
        merge(&mut shared, local);
    }

    /// Consumes the schedule and returns the final reduction value. Only
    /// meaningful after every worker has returned from
    /// [`run_worker`](crate::run_worker).
    pub fn into_reduction(self) -> A {
        self.reduction.into_inner().unwrap()
    }
}

/// The documented default chunk size: the range split evenly across the
/// threads, rounded up, and never below 1.
fn default_chunk(len: usize, num_threads: NonZeroUsize) -> usize {
    cmp::max(1, len.div_ceil(num_threads.get()))
}
