//! A work-sharing scheduler core for data-parallel for-loops.
//!
//! Loopshare distributes a half-open index range `[start, end)` across a
//! fixed set of worker threads using one of three classic work-sharing
//! schedules: *static* (round-robin blocks, no synchronization), *dynamic*
//! (threads claim fixed-size chunks from a shared cursor) and *guided*
//! (chunks shrink toward a configured minimum as the loop drains). A fourth
//! pseudo-schedule, *runtime*, defers the choice to a configuration string.
//!
//! Whatever the schedule, every index in the range is executed by exactly one
//! thread, exactly once: the non-empty chunks handed out across all threads
//! form a gap-free, overlap-free partition of the iteration space, even when
//! threads race for the final chunks. Per-thread reduction values are folded
//! into a shared accumulator exactly once per thread.
//!
//! The crate deliberately does not own a persistent thread pool. The
//! scheduler entry point ([`run_worker`]) is designed to be called once per
//! participating thread by an outer fork-join dispatcher; [`parallel_for`]
//! provides a minimal such dispatcher built on scoped threads for callers
//! that do not bring their own.

#![no_std]

// -----------------------------------------------------------------------------
// Boilerplate for building without the standard library

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod body;
mod config;
mod pool;
mod schedule;
mod worker;

// -----------------------------------------------------------------------------
// Top-level exports

pub use body::ForEach;
pub use body::LoopBody;
pub use body::Reduce;
pub use body::invoke_range;
pub use config::SCHEDULE_ENV;
pub use pool::parallel_for;
pub use schedule::Schedule;
pub use schedule::ScheduleError;
pub use schedule::ScheduleKind;
pub use schedule::SharedSchedule;
pub use worker::WorkerCursor;
pub use worker::run_worker;

// -----------------------------------------------------------------------------
// Platform Support

// All threading primitives are pulled in through this module, so the rest of
// the crate has a single import point for them.
mod platform {

    // Core exports

    pub use core::sync::atomic::AtomicUsize;
    pub use core::sync::atomic::Ordering;
    pub use std::sync::Mutex;
    pub use std::thread::Builder as ThreadBuilder;
    pub use std::thread::scope;
}
