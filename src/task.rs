//! Deferred, cancellable computations.
//!
//! A [`Task`] is a description of a computation that, given a [`Context`],
//! produces a [`Sum`] outcome. Construction performs no effect; nothing runs
//! until [`Task::run`]. Tasks are cheap to clone (the underlying thunk is
//! shared) and compose by deferred function composition: `map`, `bind` and
//! friends build a new description, they never execute anything.
//!
//! Cancellation is observed at `run` entry and at bind boundaries; a
//! signaled token short-circuits to the designated cancellation failure
//! without executing the thunk.

use std::future::Future;
use std::ops::BitOr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::Failure;
use crate::sum::Sum;

type Thunk<E, A> = Arc<dyn Fn(Context) -> BoxFuture<'static, Sum<E, A>> + Send + Sync>;

/// A reusable, cancellable, deferred computation yielding `Sum<E, A>`.
pub struct Task<E: 'static, A: 'static> {
    thunk: Thunk<E, A>,
}

impl<E: 'static, A: 'static> Clone for Task<E, A> {
    fn clone(&self) -> Self {
        Task {
            thunk: Arc::clone(&self.thunk),
        }
    }
}

impl<E, A> Task<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    fn from_thunk<F>(f: F) -> Self
    where
        F: Fn(Context) -> BoxFuture<'static, Sum<E, A>> + Send + Sync + 'static,
    {
        Task { thunk: Arc::new(f) }
    }

    /// Run the raw thunk, without the cancellation/fault boundary of
    /// [`run`](Self::run). Composition internals only.
    pub(crate) fn invoke(&self, ctx: Context) -> BoxFuture<'static, Sum<E, A>> {
        (self.thunk)(ctx)
    }

    /// An already-succeeded task.
    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Task::from_thunk(move |_| futures::future::ready(Sum::Right(value.clone())).boxed())
    }

    /// An already-failed task.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Task::from_thunk(move |_| futures::future::ready(Sum::Left(error.clone())).boxed())
    }

    /// Lift a synchronous effect. `f` runs once per invocation, when the
    /// task is run.
    pub fn lift<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Sum<E, A> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let f = Arc::clone(&f);
            async move { f(&ctx) }.boxed()
        })
    }

    /// Lift an asynchronous producer. The future's output becomes the
    /// success value.
    pub fn lift_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let f = Arc::clone(&f);
            async move { Sum::Right(f(ctx).await) }.boxed()
        })
    }

    /// Lift an asynchronous effect that already reports its own outcome.
    pub fn lift_async_sum<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sum<E, A>> + Send + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let f = Arc::clone(&f);
            async move { f(ctx).await }.boxed()
        })
    }

    /// Invoke the task.
    ///
    /// A pre-signaled token returns the cancellation failure without
    /// executing the thunk. A panic escaping the thunk is caught and
    /// converted to the bottom failure rather than unwinding past the task
    /// boundary.
    pub async fn run(&self, ctx: &Context) -> Sum<E, A>
    where
        E: Failure,
    {
        if ctx.is_cancelled() {
            debug!("task: cancellation observed before start");
            return Sum::Left(E::cancelled());
        }
        match AssertUnwindSafe(self.invoke(ctx.clone())).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("task: panic escaped a thunk, converting to bottom");
                Sum::Left(E::bottom())
            }
        }
    }

    /// Invoke the task, discard the success value, and panic on failure.
    ///
    /// This is the single opt-in point where a failed outcome becomes an
    /// unwinding fault, for call sites that use unwinding as their error
    /// channel. Everywhere else failures travel as `Sum::Left`.
    pub async fn run_unit(&self, ctx: &Context)
    where
        E: Failure + std::fmt::Display,
    {
        if let Sum::Left(e) = self.run(ctx).await {
            panic!("task failed: {e}");
        }
    }

    /// Map the success value.
    pub fn map<B, F>(self, f: F) -> Task<E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let fut = self.invoke(ctx);
            let f = Arc::clone(&f);
            async move { fut.await.map(|a| f(a)) }.boxed()
        })
    }

    /// Map the failure value.
    pub fn map_fail<F>(self, f: F) -> Task<E, A>
    where
        F: Fn(E) -> E + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let fut = self.invoke(ctx);
            let f = Arc::clone(&f);
            async move { fut.await.map_left(|e| f(e)) }.boxed()
        })
    }

    /// Map whichever side the outcome lands on.
    pub fn bi_map<B, FS, FF>(self, succ: FS, fail: FF) -> Task<E, B>
    where
        B: Send + 'static,
        FS: Fn(A) -> B + Send + Sync + 'static,
        FF: Fn(E) -> E + Send + Sync + 'static,
    {
        self.map(succ).map_fail(fail)
    }

    /// Collapse both sides to a success value.
    pub fn match_sum<B, FS, FF>(self, succ: FS, fail: FF) -> Task<E, B>
    where
        B: Send + 'static,
        FS: Fn(A) -> B + Send + Sync + 'static,
        FF: Fn(E) -> B + Send + Sync + 'static,
    {
        let succ = Arc::new(succ);
        let fail = Arc::new(fail);
        Task::from_thunk(move |ctx| {
            let fut = self.invoke(ctx);
            let succ = Arc::clone(&succ);
            let fail = Arc::clone(&fail);
            async move {
                match fut.await {
                    Sum::Right(a) => Sum::Right(succ(a)),
                    Sum::Left(e) => Sum::Right(fail(e)),
                }
            }
            .boxed()
        })
    }

    /// Recover a failure into a success value.
    pub fn if_fail<F>(self, recover: F) -> Task<E, A>
    where
        F: Fn(E) -> A + Send + Sync + 'static,
    {
        let recover = Arc::new(recover);
        Task::from_thunk(move |ctx| {
            let fut = self.invoke(ctx);
            let recover = Arc::clone(&recover);
            async move {
                match fut.await {
                    Sum::Right(a) => Sum::Right(a),
                    Sum::Left(e) => Sum::Right(recover(e)),
                }
            }
            .boxed()
        })
    }

    /// Run the effect and discard its result.
    pub fn iter<F>(self, f: F) -> Task<E, ()>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.map(move |a| f(a))
    }

    /// Turn a non-matching success into the designated predicate failure.
    pub fn filter<P>(self, predicate: P) -> Task<E, A>
    where
        E: Failure,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Task::from_thunk(move |ctx| {
            let fut = self.invoke(ctx);
            let predicate = Arc::clone(&predicate);
            async move {
                match fut.await {
                    Sum::Right(a) if predicate(&a) => Sum::Right(a),
                    Sum::Right(_) => Sum::Left(E::predicate_failed()),
                    Sum::Left(e) => Sum::Left(e),
                }
            }
            .boxed()
        })
    }

    /// Chain a dependent task off the success value.
    ///
    /// The bind boundary is a suspension point: a token signaled while the
    /// first task ran fails the chain before the second starts.
    pub fn bind<B, F>(self, f: F) -> Task<E, B>
    where
        E: Failure,
        B: Send + 'static,
        F: Fn(A) -> Task<E, B> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Task::from_thunk(move |ctx| {
            let first = self.invoke(ctx.clone());
            let f = Arc::clone(&f);
            async move {
                match first.await {
                    Sum::Right(a) => {
                        if ctx.is_cancelled() {
                            debug!("task: cancellation observed at bind boundary");
                            return Sum::Left(E::cancelled());
                        }
                        f(a).invoke(ctx).await
                    }
                    Sum::Left(e) => Sum::Left(e),
                }
            }
            .boxed()
        })
    }

    /// Cache the first outcome and replay it on subsequent invocations.
    ///
    /// The underlying effect runs at most once, no matter how many times
    /// the memoized task (or its clones) are invoked; concurrent first
    /// invocations collapse to a single execution and all callers observe
    /// the same cached outcome.
    pub fn memo(self) -> Task<E, A>
    where
        E: Clone + Sync,
        A: Clone + Sync,
    {
        let cell: Arc<OnceCell<Sum<E, A>>> = Arc::new(OnceCell::new());
        Task::from_thunk(move |ctx| {
            let cell = Arc::clone(&cell);
            let inner = self.clone();
            async move {
                cell.get_or_init(|| async move { inner.invoke(ctx).await })
                    .await
                    .clone()
            }
            .boxed()
        })
    }

    /// Run `self`; if it fails, run `other` with the same context.
    ///
    /// First success wins. If both fail, the **right** failure surfaces;
    /// the left one is discarded, matching the last-failure-wins convention
    /// of alternative composition.
    pub fn or_else(self, other: Task<E, A>) -> Task<E, A> {
        Task::from_thunk(move |ctx| {
            let left = self.clone();
            let right = other.clone();
            async move {
                match left.invoke(ctx.clone()).await {
                    outcome @ Sum::Right(_) => outcome,
                    Sum::Left(_) => right.invoke(ctx).await,
                }
            }
            .boxed()
        })
    }
}

/// Choice: `a | b` runs `a` and falls back to `b` on failure.
impl<E, A> BitOr for Task<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    type Output = Task<E, A>;

    fn bitor(self, rhs: Task<E, A>) -> Task<E, A> {
        self.or_else(rhs)
    }
}

/// The uninitialized task. Observing it yields the bottom failure.
impl<E, A> Default for Task<E, A>
where
    E: Failure,
    A: Send + 'static,
{
    fn default() -> Self {
        Task::from_thunk(|_| futures::future::ready(Sum::Left(E::bottom())).boxed())
    }
}
