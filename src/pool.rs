//! A minimal fork-join dispatcher for the scheduler entry point.
//!
//! The scheduler core assumes some outer supervisor spawns one
//! [`run_worker`] call per participating thread and joins them all before
//! the parallel-for call returns. [`parallel_for`] is that supervisor in its
//! simplest form: scoped threads, spawned per call, with the calling thread
//! participating as worker 0. Callers with their own pool can drive
//! [`run_worker`] directly instead.

use alloc::format;
use alloc::vec::Vec;
use core::num::NonZeroUsize;
use core::ops::Range;

use tracing::debug;

use crate::body::LoopBody;
use crate::platform::*;
use crate::schedule::Schedule;
use crate::schedule::ScheduleError;
use crate::schedule::SharedSchedule;
use crate::worker::WorkerCursor;
use crate::worker::run_worker;

/// Runs `body` over every index in `range`, distributed across `num_threads`
/// threads according to `schedule`, and returns the merged reduction value.
///
/// The calling thread participates as worker 0 and `num_threads - 1` scoped
/// worker threads are spawned alongside it, so `num_threads == 1` runs the
/// whole loop inline. The call returns only once every worker has finished
/// its share and merged its reduction contribution.
///
/// Configuration errors (reversed bounds, an explicit chunk size of zero)
/// are reported before any worker starts. A panic in the loop body is not
/// swallowed: it propagates out of this call once the remaining workers have
/// drained their claims.
pub fn parallel_for<B>(
    num_threads: NonZeroUsize,
    range: Range<usize>,
    schedule: Schedule,
    body: &B,
) -> Result<B::Acc, ScheduleError>
where
    B: LoopBody,
{
    let shared = SharedSchedule::new(range, schedule, num_threads, body.identity())?;
    let cursors: Vec<WorkerCursor> = (0..num_threads.get()).map(WorkerCursor::new).collect();

    debug!(num_threads = num_threads.get(), "forking parallel-for region");

    scope(|scope| {
        let shared = &shared;
        let (lead, rest) = cursors.split_first().expect("num_threads is non-zero");

        for cursor in rest {
            ThreadBuilder::new()
                .name(format!("loopshare worker {}", cursor.thread_id()))
                .spawn_scoped(scope, move || run_worker(shared, cursor, body))
                .unwrap();
        }

        run_worker(shared, lead, body);
    });

    debug!("joined parallel-for region");

    Ok(shared.into_reduction())
}
