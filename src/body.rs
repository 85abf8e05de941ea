//! The loop-body invoker: the contract through which claimed chunks are
//! handed to user code.

use core::ops::Range;

use crate::worker::WorkerCursor;

// -----------------------------------------------------------------------------
// Loop body contract

/// A user-supplied loop body, with an optional reduction.
///
/// The scheduler invokes the body once for every index in `[start, end)`,
/// each index exactly once, in increasing order within each chunk. Bodies
/// must not touch any shared scheduling state; the accumulator passed to
/// [`invoke`](LoopBody::invoke) is private to the calling thread.
///
/// For plain loops with no reduction, use the [`ForEach`] adapter, which
/// fixes the accumulator to `()`. For reductions, use [`Reduce`] or implement
/// the trait directly: `identity` must be the identity element of `merge`,
/// and `merge` must be associative, since partial values are combined in an
/// unspecified thread order.
pub trait LoopBody: Sync {
    /// The per-thread reduction accumulator.
    type Acc: Send;

    /// Returns the identity element each thread's accumulator is seeded with.
    fn identity(&self) -> Self::Acc;

    /// Executes the body for a single index, folding any contribution into
    /// the thread-local accumulator.
    fn invoke(&self, index: usize, acc: &mut Self::Acc);

    /// Merges a finished accumulator into another.
    fn merge(&self, into: &mut Self::Acc, from: Self::Acc);
}

// -----------------------------------------------------------------------------
// Adapters

/// Wraps a plain per-index closure as a [`LoopBody`] with no reduction.
pub struct ForEach<F>(pub F);

impl<F> LoopBody for ForEach<F>
where
    F: Fn(usize) + Sync,
{
    type Acc = ();

    #[inline(always)]
    fn identity(&self) {}

    #[inline(always)]
    fn invoke(&self, index: usize, _acc: &mut ()) {
        (self.0)(index);
    }

    #[inline(always)]
    fn merge(&self, _into: &mut (), _from: ()) {}
}

/// Bundles an identity, a per-index fold and an associative merge into a
/// reducing [`LoopBody`].
pub struct Reduce<I, F, M> {
    /// Produces the identity element of `merge`.
    pub identity: I,
    /// Folds one index's contribution into the thread-local accumulator.
    pub fold: F,
    /// Combines two partial accumulators. Must be associative.
    pub merge: M,
}

impl<A, I, F, M> LoopBody for Reduce<I, F, M>
where
    A: Send,
    I: Fn() -> A + Sync,
    F: Fn(usize, &mut A) + Sync,
    M: Fn(&mut A, A) + Sync,
{
    type Acc = A;

    #[inline(always)]
    fn identity(&self) -> A {
        (self.identity)()
    }

    #[inline(always)]
    fn invoke(&self, index: usize, acc: &mut A) {
        (self.fold)(index, acc);
    }

    #[inline(always)]
    fn merge(&self, into: &mut A, from: A) {
        (self.merge)(into, from);
    }
}

// -----------------------------------------------------------------------------
// Chunk invocation

/// Runs `body` over every index of a claimed chunk, in increasing order,
/// publishing each index through the worker's cursor before executing it so
/// an external supervisor can observe progress.
///
/// The claim for this chunk has already committed by the time this runs, so a
/// panic unwinding out of the body leaves the shared cursor consistent: other
/// threads neither repeat nor skip indices.
#[inline]
pub fn invoke_range<B>(body: &B, cursor: &WorkerCursor, range: Range<usize>, acc: &mut B::Acc)
where
    B: LoopBody,
{
    for index in range {
        cursor.set_working_index(index);
        body.invoke(index, acc);
    }
}
