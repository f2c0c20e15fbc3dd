//! Bidirectional streaming pipelines built from composable, cancellable
//! effects.
//!
//! The crate has two layers. [`Task`] is the execution substrate: a
//! deferred, cancellable computation producing a [`Sum`] outcome. The
//! [`Proxy`](proxy::Proxy) algebra sits on top: pipeline stages with two
//! directions of information flow (upstream requests, downstream responses)
//! that fuse along their shared boundary with the pipe operator, while
//! every real side effect enters through an explicit lift.
//!
//! Producers, consumers and pipes are proxies with one or both directions
//! closed by the type system; composing them yields a closed
//! [`Effect`](stages::Effect) that a single `run` call drives to completion
//! or failure.
//!
//! ```no_run
//! use pipework::{each, stages, Context, PipelineError, Producer, Sum, TaskRuntime};
//!
//! # async fn demo() {
//! let numbers: Producer<i32, TaskRuntime<PipelineError>, ()> = each([1, 2, 3]);
//! let doubled = numbers.for_each(|n| stages::emit(n * 2));
//! let mut seen = Vec::new();
//! let outcome = doubled
//!     .run_with(
//!         &Context::new(),
//!         |never| match never {},
//!         |n| {
//!             seen.push(n);
//!             Sum::Right(())
//!         },
//!     )
//!     .await;
//! assert!(outcome.is_right());
//! assert_eq!(seen, vec![2, 4, 6]);
//! # }
//! ```

pub mod context;
pub mod error;
pub mod proxy;
pub mod runtime;
pub mod stages;
pub mod sum;
pub mod task;

pub use context::{CancelToken, Context};
pub use error::{Failure, PipelineError};
pub use proxy::{fail, lift, lift_eff, pure, request, respond, Never, Proxy};
pub use runtime::{Deferred, EffectRuntime, TaskRuntime};
pub use stages::{awaiting, each, emit, Consumer, Effect, Pipe, Producer};
pub use sum::Sum;
pub use task::Task;
