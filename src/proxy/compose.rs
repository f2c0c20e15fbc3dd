//! Composition operators fusing two proxies along their shared boundary.
//!
//! Two substitution operators (`for_each`, `replace_request`) splice a body
//! proxy in place of every respond/request node, and two mutually recursive
//! pairing operators connect a requester to a responder step by step. Pipe
//! composition (`|`) is built from the pairing pair; `reflect` swaps the
//! upstream and downstream roles.
//!
//! All of them walk the proxy structure and rebuild it; no effect is forced
//! except by passing through `Lift` nodes unchanged.

use std::ops::BitOr;
use std::sync::Arc;

use super::Proxy;
use crate::runtime::EffectRuntime;

type Body<I, O> = Arc<dyn Fn(I) -> O + Send + Sync>;

impl<UO, UI, DI, DO, M, A> Proxy<UO, UI, DI, DO, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    DI: Send + 'static,
    DO: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    /// Loop-body substitution: replace every `Respond(value, k)` with
    /// `body(value)` bound to `k`, recursively. `Request` nodes are left
    /// untouched; `Pure` is identity; the substitution is carried through
    /// `Lift` to the proxy produced after each effect step.
    ///
    /// This is how a downstream body is run inside an upstream producer's
    /// yields.
    pub fn for_each<NDI, NDO, F>(self, body: F) -> Proxy<UO, UI, NDI, NDO, M, A>
    where
        NDI: Send + 'static,
        NDO: Send + 'static,
        F: Fn(DO) -> Proxy<UO, UI, NDI, NDO, M, DI> + Send + Sync + 'static,
    {
        self.replace_respond(Arc::new(body))
    }

    fn replace_respond<NDI, NDO>(
        self,
        body: Body<DO, Proxy<UO, UI, NDI, NDO, M, DI>>,
    ) -> Proxy<UO, UI, NDI, NDO, M, A>
    where
        NDI: Send + 'static,
        NDO: Send + 'static,
    {
        match self {
            Proxy::Request(value, resume) => Proxy::Request(
                value,
                Box::new(move |input| resume(input).replace_respond(body)),
            ),
            Proxy::Respond(value, resume) => {
                let rest = Arc::clone(&body);
                body(value).bind(move |reply| resume(reply).replace_respond(rest))
            }
            Proxy::Lift(eff) => Proxy::Lift(M::map(eff, move |next| next.replace_respond(body))),
            Proxy::Pure(a) => Proxy::Pure(a),
        }
    }

    /// The dual substitution: replace every `Request(value, k)` with
    /// `body(value)` bound to `k`, recursively, leaving `Respond` nodes
    /// untouched.
    pub fn replace_request<NUO, NUI, F>(self, body: F) -> Proxy<NUO, NUI, DI, DO, M, A>
    where
        NUO: Send + 'static,
        NUI: Send + 'static,
        F: Fn(UO) -> Proxy<NUO, NUI, DI, DO, M, UI> + Send + Sync + 'static,
    {
        self.replace_request_shared(Arc::new(body))
    }

    fn replace_request_shared<NUO, NUI>(
        self,
        body: Body<UO, Proxy<NUO, NUI, DI, DO, M, UI>>,
    ) -> Proxy<NUO, NUI, DI, DO, M, A>
    where
        NUO: Send + 'static,
        NUI: Send + 'static,
    {
        match self {
            Proxy::Request(value, resume) => {
                let rest = Arc::clone(&body);
                body(value).bind(move |input| resume(input).replace_request_shared(rest))
            }
            Proxy::Respond(value, resume) => Proxy::Respond(
                value,
                Box::new(move |reply| resume(reply).replace_request_shared(body)),
            ),
            Proxy::Lift(eff) => {
                Proxy::Lift(M::map(eff, move |next| next.replace_request_shared(body)))
            }
            Proxy::Pure(a) => Proxy::Pure(a),
        }
    }

    /// Pair each `Request` in this proxy with a `Respond` produced by
    /// `handler`.
    ///
    /// The handler supplies the upstream stage for the first outstanding
    /// request; from then on the two sides advance each other through the
    /// mutually recursive pairing with
    /// [`pair_each_respond_with_request`](Self::pair_each_respond_with_request).
    pub fn pair_each_request_with_respond<NUO, NUI, F>(
        self,
        handler: F,
    ) -> Proxy<NUO, NUI, DI, DO, M, A>
    where
        NUO: Send + 'static,
        NUI: Send + 'static,
        F: FnOnce(UO) -> Proxy<NUO, NUI, UO, UI, M, A> + Send + 'static,
    {
        match self {
            Proxy::Request(value, resume) => {
                handler(value).pair_each_respond_with_request(resume)
            }
            Proxy::Respond(value, resume) => Proxy::Respond(
                value,
                Box::new(move |reply| {
                    resume(reply).pair_each_request_with_respond(handler)
                }),
            ),
            Proxy::Lift(eff) => Proxy::Lift(M::map(eff, move |next| {
                next.pair_each_request_with_respond(handler)
            })),
            Proxy::Pure(a) => Proxy::Pure(a),
        }
    }

    /// Pair each `Respond` in this proxy with a `Request` consumed by
    /// `handler`, the other half of the pairing recursion.
    pub fn pair_each_respond_with_request<NDI, NDO, F>(
        self,
        handler: F,
    ) -> Proxy<UO, UI, NDI, NDO, M, A>
    where
        NDI: Send + 'static,
        NDO: Send + 'static,
        F: FnOnce(DO) -> Proxy<DI, DO, NDI, NDO, M, A> + Send + 'static,
    {
        match self {
            Proxy::Request(value, resume) => Proxy::Request(
                value,
                Box::new(move |input| {
                    resume(input).pair_each_respond_with_request(handler)
                }),
            ),
            Proxy::Respond(value, resume) => {
                handler(value).pair_each_request_with_respond(resume)
            }
            Proxy::Lift(eff) => Proxy::Lift(M::map(eff, move |next| {
                next.pair_each_respond_with_request(handler)
            })),
            Proxy::Pure(a) => Proxy::Pure(a),
        }
    }

    /// Reverse the arrows: upstream becomes downstream and vice versa.
    ///
    /// `reflect` is an involution: reflecting twice gives back a proxy
    /// describing the same pipeline.
    pub fn reflect(self) -> Proxy<DO, DI, UI, UO, M, A> {
        match self {
            Proxy::Request(value, resume) => {
                Proxy::Respond(value, Box::new(move |input| resume(input).reflect()))
            }
            Proxy::Respond(value, resume) => {
                Proxy::Request(value, Box::new(move |reply| resume(reply).reflect()))
            }
            Proxy::Lift(eff) => Proxy::Lift(M::map(eff, |next| next.reflect())),
            Proxy::Pure(a) => Proxy::Pure(a),
        }
    }
}

impl<UO, UI, B, M, A> Proxy<UO, UI, (), B, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    B: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    /// Vertical (pipe) composition: connect this proxy's responds to the
    /// downstream proxy's requests along the shared `B` boundary.
    ///
    /// Composition is associative, and each side only advances as often as
    /// the matching request/respond pairs demand. The pipeline terminates
    /// with whichever side finishes first.
    pub fn compose<DI2, DO2>(
        self,
        downstream: Proxy<(), B, DI2, DO2, M, A>,
    ) -> Proxy<UO, UI, DI2, DO2, M, A>
    where
        DI2: Send + 'static,
        DO2: Send + 'static,
    {
        downstream.pair_each_request_with_respond(move |()| self)
    }
}

/// Pipe composition: `upstream | downstream`.
impl<UO, UI, B, DI2, DO2, M, A> BitOr<Proxy<(), B, DI2, DO2, M, A>>
    for Proxy<UO, UI, (), B, M, A>
where
    UO: Send + 'static,
    UI: Send + 'static,
    B: Send + 'static,
    DI2: Send + 'static,
    DO2: Send + 'static,
    M: EffectRuntime,
    A: Send + 'static,
{
    type Output = Proxy<UO, UI, DI2, DO2, M, A>;

    fn bitor(self, downstream: Proxy<(), B, DI2, DO2, M, A>) -> Self::Output {
        self.compose(downstream)
    }
}
