//! Pipeline stage specializations and constructors.
//!
//! Producers, consumers, pipes and effects are not separate runtime
//! representations; they are [`Proxy`] with one or both directions closed
//! by the uninhabited [`Never`] placeholder, so the type system rules the
//! forbidden primitive out of each stage.

use std::sync::Arc;

use crate::proxy::{request, respond, Never, Proxy};
use crate::runtime::EffectRuntime;

/// A stage that only sends downstream; it never issues a request.
pub type Producer<B, M, A> = Proxy<Never, (), (), B, M, A>;

/// A stage that only receives from upstream; it never issues a respond.
pub type Consumer<B, M, A> = Proxy<(), B, (), Never, M, A>;

/// A stage with both directions active: receives `B`, sends `C`.
pub type Pipe<B, C, M, A> = Proxy<(), B, (), C, M, A>;

/// A fully closed pipeline: pure computation plus lifted effects, no
/// outstanding requests or responses.
pub type Effect<M, A> = Proxy<Never, (), (), Never, M, A>;

/// Send one value downstream.
///
/// Usable in producer position (`UO = Never`) or pipe position (`UO = ()`).
pub fn emit<UO, UI, B, M>(value: B) -> Proxy<UO, UI, (), B, M, ()>
where
    UO: Send + 'static,
    UI: Send + 'static,
    B: Send + 'static,
    M: EffectRuntime,
{
    respond(value)
}

/// Await one value from upstream.
///
/// Usable in consumer position (`DO = Never`) or pipe position.
pub fn awaiting<B, DI, DO, M>() -> Proxy<(), B, DI, DO, M, B>
where
    B: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
{
    request(())
}

/// A producer sending every item of an iterator downstream, in iterator
/// order, terminating with `Pure(())`.
pub fn each<B, M, I>(items: I) -> Producer<B, M, ()>
where
    B: Send + 'static,
    M: EffectRuntime,
    I: IntoIterator<Item = B>,
{
    let mut items: Vec<B> = items.into_iter().collect();
    items.reverse();
    items.into_iter().fold(Proxy::Pure(()), |rest, item| {
        Proxy::Respond(item, Box::new(move |()| rest))
    })
}

/// A pipe applying `f` to every value passing through.
///
/// The pipe itself never terminates; a composed pipeline ends when its
/// upstream does.
pub fn map<B, C, M, A, F>(f: F) -> Pipe<B, C, M, A>
where
    B: Send + 'static,
    C: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
    F: Fn(B) -> C + Send + Sync + 'static,
{
    fn go<B, C, M, A>(f: Arc<dyn Fn(B) -> C + Send + Sync>) -> Pipe<B, C, M, A>
    where
        B: Send + 'static,
        C: Send + 'static,
        M: EffectRuntime,
        A: Send + 'static,
    {
        Proxy::Request(
            (),
            Box::new(move |input: B| {
                let output = f(input);
                Proxy::Respond(output, Box::new(move |()| go(f)))
            }),
        )
    }
    go(Arc::new(f))
}

/// A pipe passing through only the values matching `predicate`.
pub fn filter<B, M, A, P>(predicate: P) -> Pipe<B, B, M, A>
where
    B: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    fn go<B, M, A>(predicate: Arc<dyn Fn(&B) -> bool + Send + Sync>) -> Pipe<B, B, M, A>
    where
        B: Send + 'static,
        M: EffectRuntime,
        A: Send + 'static,
    {
        Proxy::Request(
            (),
            Box::new(move |input: B| {
                if predicate(&input) {
                    Proxy::Respond(input, Box::new(move |()| go(predicate)))
                } else {
                    go(predicate)
                }
            }),
        )
    }
    go(Arc::new(predicate))
}
