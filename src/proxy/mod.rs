//! The bidirectional streaming-effect algebra.
//!
//! A [`Proxy`] value is the state of one pipeline stage. Information flows
//! in exactly two directions: a stage may ask upstream ([`Proxy::Request`])
//! or send downstream ([`Proxy::Respond`]), and the only channel through
//! which real side effects enter is [`Proxy::Lift`]. The bound result
//! `A` never flows up or down stream; it is the stage's terminal value.
//!
//! Values are immutable descriptions: composition and binding always build
//! new proxies, and a proxy is consumed exactly once by interpretation
//! (see [`compose`] and [`run`]).

pub mod compose;
pub mod run;

use crate::error::Failure;
use crate::runtime::{Deferred, EffectRuntime, TaskRuntime};
use crate::task::Task;

/// Uninhabited placeholder closing one end of a pipeline.
pub type Never = std::convert::Infallible;

/// A one-shot continuation from a received value to the next proxy state.
pub type Resume<I, P> = Box<dyn FnOnce(I) -> P + Send>;

/// One stage of a bidirectional streaming pipeline.
///
/// Type parameters describe the two contracts of the stage: `UO`/`UI` are
/// the upstream-facing pair (what it sends up with a request, what it gets
/// back), `DI`/`DO` the downstream-facing pair. `M` is the effect runtime
/// and `A` the bound result once the stage terminates.
pub enum Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    /// Ask the upstream stage for a value; resume with what it sends back.
    Request(UO, Resume<UI, Proxy<UO, UI, DI, DO, M, A>>),

    /// Send a value downstream; resume with what downstream sends back.
    Respond(DO, Resume<DI, Proxy<UO, UI, DI, DO, M, A>>),

    /// One step of the underlying effect; forcing it yields the next state.
    Lift(M::Eff<Proxy<UO, UI, DI, DO, M, A>>),

    /// Terminal success carrying the bound result.
    Pure(A),
}

impl<UO, UI, DI, DO, M, A> Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    /// Sequential composition: run this proxy, then continue with a proxy
    /// built from its result.
    ///
    /// Binding is realized by substitution into the continuations; nothing
    /// executes until a lifted effect is forced by the interpreter, and
    /// `(p.bind(f)).bind(g)` and `p.bind(|a| f(a).bind(g))` describe the
    /// same pipeline.
    pub fn bind<B, F>(self, f: F) -> Proxy<UO, UI, DI, DO, M, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Proxy<UO, UI, DI, DO, M, B> + Send + 'static,
    {
        match self {
            Proxy::Pure(a) => f(a),
            Proxy::Request(value, resume) => {
                Proxy::Request(value, Box::new(move |input| resume(input).bind(f)))
            }
            Proxy::Respond(value, resume) => {
                Proxy::Respond(value, Box::new(move |input| resume(input).bind(f)))
            }
            Proxy::Lift(eff) => Proxy::Lift(M::map(eff, move |next| next.bind(f))),
        }
    }

    /// Map the bound result.
    pub fn map<B, F>(self, f: F) -> Proxy<UO, UI, DI, DO, M, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.bind(move |a| Proxy::Pure(f(a)))
    }

    /// Applicative action: run this proxy, then `next`, keeping `next`'s
    /// result.
    pub fn then<B>(self, next: Proxy<UO, UI, DI, DO, M, B>) -> Proxy<UO, UI, DI, DO, M, B>
    where
        B: Send + 'static,
    {
        self.bind(move |_| next)
    }
}

impl<UO, UI, DI, DO, M, A> std::fmt::Debug for Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            Proxy::Request(..) => "Proxy::Request",
            Proxy::Respond(..) => "Proxy::Respond",
            Proxy::Lift(..) => "Proxy::Lift",
            Proxy::Pure(..) => "Proxy::Pure",
        };
        f.write_str(state)
    }
}

/// A proxy that terminates immediately with `value`.
pub fn pure<UO, UI, DI, DO, M, A>(value: A) -> Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    Proxy::Pure(value)
}

/// A proxy whose lifted effect fails immediately with `error`.
pub fn fail<UO, UI, DI, DO, M, A>(error: M::Error) -> Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    Proxy::Lift(M::fail(error))
}

/// Ask upstream for a value; the proxy's result is upstream's answer.
pub fn request<UO, UI, DI, DO, M>(value: UO) -> Proxy<UO, UI, DI, DO, M, UI>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
{
    Proxy::Request(value, Box::new(Proxy::Pure))
}

/// Send a value downstream; the proxy's result is downstream's reply.
pub fn respond<UO, UI, DI, DO, M>(value: DO) -> Proxy<UO, UI, DI, DO, M, DI>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
{
    Proxy::Respond(value, Box::new(Proxy::Pure))
}

/// Embed a task into a pipeline stage.
///
/// The task runs with its full boundary (cancellation observed on entry,
/// faults converted) each time the interpreter forces this step.
pub fn lift<UO, UI, DI, DO, E, A>(task: Task<E, A>) -> Proxy<UO, UI, DI, DO, TaskRuntime<E>, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    E: Failure,
    A: Send + 'static,
{
    Proxy::Lift(Deferred::from_task(task).map(Proxy::Pure))
}

/// Embed one effect of an arbitrary runtime into a pipeline stage.
pub fn lift_eff<UO, UI, DI, DO, M, A>(eff: M::Eff<A>) -> Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    Proxy::Lift(M::map(eff, Proxy::Pure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    type Rt = TaskRuntime<PipelineError>;

    #[test]
    fn debug_names_the_active_state() {
        let done: Proxy<Never, (), (), Never, Rt, i32> = pure(1);
        let lifted: Proxy<Never, (), (), Never, Rt, i32> = lift(Task::pure(1));
        let asking: Proxy<i32, (), (), Never, Rt, ()> = request(1);
        let sending: Proxy<Never, (), (), i32, Rt, ()> = respond(1);
        assert_eq!(format!("{done:?}"), "Proxy::Pure");
        assert_eq!(format!("{lifted:?}"), "Proxy::Lift");
        assert_eq!(format!("{asking:?}"), "Proxy::Request");
        assert_eq!(format!("{sending:?}"), "Proxy::Respond");
    }

    #[tokio::test]
    async fn bind_substitutes_through_every_variant() {
        let ctx = crate::context::Context::new();
        let effect: Proxy<Never, (), (), Never, Rt, i32> =
            lift(Task::pure(1)).bind(|n| pure(n + 1)).map(|n| n * 10);
        assert_eq!(effect.run(&ctx).await, crate::sum::Sum::Right(20));
    }
}
