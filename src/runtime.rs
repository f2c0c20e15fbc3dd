//! The abstract effect runtime the proxy algebra is layered on.
//!
//! The algebra asks four things of whatever effect system hosts it: lift a
//! pure value, sequence two effects, and choose between two effects with
//! first-success-wins. [`EffectRuntime`] is that contract and nothing more.
//!
//! [`TaskRuntime`] is the shipped instance: its effects are [`Deferred`]
//! values, one-shot invocations of the [`Task`](crate::task::Task)
//! substrate. A multi-shot, memoizable `Task` enters the algebra by
//! conversion to its one-shot form at the lift boundary.

use std::marker::PhantomData;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::Context;
use crate::error::Failure;
use crate::sum::Sum;
use crate::task::Task;

/// Minimal capability surface a pipeline requires from its effect runtime.
pub trait EffectRuntime: Send + Sync + 'static {
    /// Failure type carried by every effect of this runtime.
    type Error: Send + 'static;

    /// The effect type constructor.
    type Eff<T: Send + 'static>: Send + 'static;

    /// Lift a pure value.
    fn pure<T>(value: T) -> Self::Eff<T>
    where
        T: Send + 'static;

    /// Lift a failure.
    fn fail<T>(error: Self::Error) -> Self::Eff<T>
    where
        T: Send + 'static;

    /// Map over the effect's success value.
    fn map<T, U, F>(eff: Self::Eff<T>, f: F) -> Self::Eff<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static;

    /// Sequence a dependent effect off the success value.
    fn bind<T, U, F>(eff: Self::Eff<T>, f: F) -> Self::Eff<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Self::Eff<U> + Send + 'static;

    /// Run `left`; on failure run `right` with the same context. First
    /// success wins; if both fail, the right failure surfaces.
    fn first_ok<T>(left: Self::Eff<T>, right: Self::Eff<T>) -> Self::Eff<T>
    where
        T: Send + 'static;
}

type Go<E, T> = Box<dyn FnOnce(Context) -> BoxFuture<'static, Sum<E, T>> + Send>;

/// A one-shot deferred computation: given a context, produce an outcome.
///
/// Unlike [`Task`](crate::task::Task) this is consumed by invocation, which
/// is exactly the lifecycle of an effect embedded in a proxy: forced once
/// by the interpreter, never revisited.
pub struct Deferred<E: 'static, T: 'static> {
    go: Go<E, T>,
}

impl<E, T> Deferred<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    /// Wrap a one-shot invocation function.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Context) -> BoxFuture<'static, Sum<E, T>> + Send + 'static,
    {
        Deferred { go: Box::new(f) }
    }

    /// An already-resolved success.
    pub fn pure(value: T) -> Self {
        Deferred::new(move |_| futures::future::ready(Sum::Right(value)).boxed())
    }

    /// An already-resolved failure.
    pub fn fail(error: E) -> Self {
        Deferred::new(move |_| futures::future::ready(Sum::Left(error)).boxed())
    }

    /// The one-shot invocation form of a task.
    ///
    /// Runs with the full task boundary: cancellation is observed on entry
    /// and faults are converted rather than propagated.
    pub fn from_task(task: Task<E, T>) -> Self
    where
        E: Failure,
    {
        Deferred::new(move |ctx| async move { task.run(&ctx).await }.boxed())
    }

    /// Force the computation. Consumes the value.
    pub fn invoke(self, ctx: Context) -> BoxFuture<'static, Sum<E, T>> {
        (self.go)(ctx)
    }

    /// Map over the success value.
    pub fn map<U, F>(self, f: F) -> Deferred<E, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred::new(move |ctx| {
            let fut = self.invoke(ctx);
            async move { fut.await.map(f) }.boxed()
        })
    }

    /// Sequence a dependent deferred computation off the success value.
    pub fn bind<U, F>(self, f: F) -> Deferred<E, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<E, U> + Send + 'static,
    {
        Deferred::new(move |ctx| {
            let first = self.invoke(ctx.clone());
            async move {
                match first.await {
                    Sum::Right(t) => f(t).invoke(ctx).await,
                    Sum::Left(e) => Sum::Left(e),
                }
            }
            .boxed()
        })
    }

    /// First success wins; the right failure surfaces if both fail.
    pub fn first_ok(self, other: Deferred<E, T>) -> Deferred<E, T> {
        Deferred::new(move |ctx| {
            let left = self.invoke(ctx.clone());
            async move {
                match left.await {
                    outcome @ Sum::Right(_) => outcome,
                    Sum::Left(_) => other.invoke(ctx).await,
                }
            }
            .boxed()
        })
    }
}

/// The runtime tying the proxy algebra to the [`Task`](crate::task::Task)
/// substrate.
pub struct TaskRuntime<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> EffectRuntime for TaskRuntime<E>
where
    E: Send + 'static,
{
    type Error = E;
    type Eff<T: Send + 'static> = Deferred<E, T>;

    fn pure<T>(value: T) -> Deferred<E, T>
    where
        T: Send + 'static,
    {
        Deferred::pure(value)
    }

    fn fail<T>(error: E) -> Deferred<E, T>
    where
        T: Send + 'static,
    {
        Deferred::fail(error)
    }

    fn map<T, U, F>(eff: Deferred<E, T>, f: F) -> Deferred<E, U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        eff.map(f)
    }

    fn bind<T, U, F>(eff: Deferred<E, T>, f: F) -> Deferred<E, U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<E, U> + Send + 'static,
    {
        eff.bind(f)
    }

    fn first_ok<T>(left: Deferred<E, T>, right: Deferred<E, T>) -> Deferred<E, T>
    where
        T: Send + 'static,
    {
        left.first_ok(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[tokio::test]
    async fn deferred_sequencing() {
        let ctx = Context::new();
        let eff: Deferred<PipelineError, i32> = Deferred::pure(1)
            .map(|n| n + 1)
            .bind(|n| Deferred::pure(n * 3));
        assert_eq!(eff.invoke(ctx).await, Sum::Right(6));
    }

    #[tokio::test]
    async fn first_ok_keeps_the_right_failure() {
        let ctx = Context::new();
        let eff: Deferred<PipelineError, i32> = Deferred::fail(PipelineError::msg("first"))
            .first_ok(Deferred::fail(PipelineError::msg("second")));
        assert_eq!(
            eff.invoke(ctx).await,
            Sum::Left(PipelineError::msg("second"))
        );
    }

    #[tokio::test]
    async fn from_task_observes_cancellation() {
        let ctx = Context::new();
        ctx.cancel();
        let eff: Deferred<PipelineError, i32> =
            Deferred::from_task(Task::lift(|_| Sum::Right(1)));
        assert_eq!(eff.invoke(ctx).await, Sum::Left(PipelineError::Cancelled));
    }
}
