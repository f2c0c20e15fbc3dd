//! Driving a proxy to completion or failure.
//!
//! The interpreter is a sequential reduction over the proxy structure: at
//! each step it is requesting, responding, effecting, done, or failed.
//! Suspension happens only while forcing a `Lift` step, where control
//! passes to the underlying effect. A failing lifted effect short-circuits
//! the whole pipeline; no further request/respond steps occur.
//!
//! There is no implicit retry anywhere; retries are composed explicitly
//! with [`or_else`](Proxy::or_else).

use tracing::{debug, trace};

use super::{Never, Proxy};
use crate::context::Context;
use crate::error::Failure;
use crate::runtime::{EffectRuntime, TaskRuntime};
use crate::sum::Sum;

impl<UO, UI, DI, DO, E, A> Proxy<UO, UI, DI, DO, TaskRuntime<E>, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    E: Failure,
    A: Send + 'static,
{
    /// Drive an open proxy with the two inputs of the state machine:
    /// `source` answers every `Request`, `sink` answers every `Respond`.
    ///
    /// Either input may fail, which fails the pipeline. A token signaled
    /// before the first step yields the cancellation failure without
    /// touching any stage.
    pub async fn run_with<S, K>(self, ctx: &Context, mut source: S, mut sink: K) -> Sum<E, A>
    where
        S: FnMut(UO) -> Sum<E, UI>,
        K: FnMut(DO) -> Sum<E, DI>,
    {
        if ctx.is_cancelled() {
            debug!("pipeline: cancellation observed before start");
            return Sum::Left(E::cancelled());
        }
        let mut current = self;
        loop {
            match current {
                Proxy::Pure(a) => {
                    trace!("pipeline: done");
                    return Sum::Right(a);
                }
                Proxy::Request(value, resume) => {
                    trace!("pipeline: requesting");
                    match source(value) {
                        Sum::Right(input) => current = resume(input),
                        Sum::Left(e) => {
                            debug!("pipeline: upstream source failed");
                            return Sum::Left(e);
                        }
                    }
                }
                Proxy::Respond(value, resume) => {
                    trace!("pipeline: responding");
                    match sink(value) {
                        Sum::Right(reply) => current = resume(reply),
                        Sum::Left(e) => {
                            debug!("pipeline: downstream sink failed");
                            return Sum::Left(e);
                        }
                    }
                }
                Proxy::Lift(eff) => {
                    trace!("pipeline: effecting");
                    match eff.invoke(ctx.clone()).await {
                        Sum::Right(next) => current = next,
                        Sum::Left(e) => {
                            debug!("pipeline: lifted effect failed, short-circuiting");
                            return Sum::Left(e);
                        }
                    }
                }
            }
        }
    }
}

impl<E, A> Proxy<Never, (), (), Never, TaskRuntime<E>, A>
where
    E: Failure,
    A: Send + 'static,
{
    /// Run a closed pipeline to completion or failure.
    ///
    /// Both directions are closed by construction, so the state machine
    /// only ever effects; `Request`/`Respond` states are unreachable.
    pub async fn run(self, ctx: &Context) -> Sum<E, A> {
        self.run_with(ctx, |value| match value {}, |value| match value {})
            .await
    }

    /// Run a closed pipeline, discard the success value, and panic on
    /// failure: the explicit opt-in conversion of a failed outcome into
    /// an unwinding fault.
    pub async fn run_unit(self, ctx: &Context)
    where
        E: std::fmt::Display,
    {
        if let Sum::Left(e) = self.run(ctx).await {
            panic!("pipeline failed: {e}");
        }
    }
}

impl<M, A> Proxy<Never, (), (), Never, M, A>
where
    M: EffectRuntime,
    A: Send + 'static,
{
    /// Fold a closed pipeline into a single effect of its runtime.
    ///
    /// This is the generic interpretation: request/respond states are
    /// unreachable, so the proxy is exactly a chain of effect steps ending
    /// in a pure result.
    pub fn into_eff(self) -> M::Eff<A> {
        match self {
            Proxy::Pure(a) => M::pure(a),
            Proxy::Lift(eff) => M::bind(eff, |next| next.into_eff()),
            Proxy::Request(value, _) => match value {},
            Proxy::Respond(value, _) => match value {},
        }
    }

    /// First-success choice between two closed pipelines.
    ///
    /// Runs `self`; on failure runs `other` with the same context. If both
    /// fail, the right failure surfaces. This is the composition point for
    /// explicit retries.
    pub fn or_else(self, other: Self) -> Self {
        Proxy::Lift(M::map(
            M::first_ok(self.into_eff(), other.into_eff()),
            Proxy::Pure,
        ))
    }

    /// Extract the lifted effect from a fully-reduced pipeline.
    ///
    /// A pipeline that terminates purely without ever lifting an effect has
    /// nothing to hand to the runtime; that is the designated
    /// no-lifted-effect failure.
    pub fn unlift(self) -> Sum<M::Error, M::Eff<A>>
    where
        M::Error: Failure,
    {
        match self {
            Proxy::Lift(eff) => Sum::Right(M::bind(eff, |next| next.into_eff())),
            Proxy::Pure(_) => Sum::Left(M::Error::no_lifted_effect()),
            Proxy::Request(value, _) => match value {},
            Proxy::Respond(value, _) => match value {},
        }
    }
}
