//! End-to-end pipeline scenarios: substitution, short-circuiting,
//! cancellation, and the interpreter's two driving inputs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use pipework::{
    each, lift, lift_eff, pure, stages, CancelToken, Consumer, Context, Deferred, Effect, Failure,
    Pipe, PipelineError, Producer, Sum, Task, TaskRuntime,
};

type Rt = TaskRuntime<PipelineError>;

/// A task that bumps `counter` when (and only when) it executes.
fn tick(counter: Arc<AtomicUsize>) -> Task<PipelineError, ()> {
    Task::lift(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Sum::Right(())
    })
}

/// A task recording `value` into a shared log.
fn record(log: Arc<Mutex<Vec<i32>>>, value: i32) -> Task<PipelineError, ()> {
    Task::lift(move |_| {
        log.lock().unwrap().push(value);
        Sum::Right(())
    })
}

// ---------------------------------------------------------------------------
// For-substitution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn for_each_doubles_every_yield() {
    let ctx = Context::new();
    let numbers: Producer<i32, Rt, &'static str> = each([1, 2, 3]).then(pure("done"));
    let doubled = numbers.for_each(|n| stages::emit(n * 2));

    let mut seen = Vec::new();
    let outcome = doubled
        .run_with(
            &ctx,
            |never| match never {},
            |n| {
                seen.push(n);
                Sum::Right(())
            },
        )
        .await;

    assert_eq!(seen, vec![2, 4, 6]);
    // The bound value is the producer's terminal result; the substituted
    // bodies never touch it.
    assert_eq!(outcome, Sum::Right("done"));
}

#[tokio::test]
async fn for_each_body_can_drop_or_fan_out() {
    let ctx = Context::new();
    let numbers: Producer<i32, Rt, ()> = each([1, 2, 3]);
    // Yield each odd value twice, swallow the evens.
    let fanned = numbers.for_each(|n| {
        if n % 2 == 1 {
            stages::emit(n).then(stages::emit(n))
        } else {
            pure(())
        }
    });

    let mut seen = Vec::new();
    let outcome = fanned
        .run_with(
            &ctx,
            |never| match never {},
            |n| {
                seen.push(n);
                Sum::Right(())
            },
        )
        .await;

    assert_eq!(outcome, Sum::Right(()));
    assert_eq!(seen, vec![1, 1, 3, 3]);
}

// ---------------------------------------------------------------------------
// Failure short-circuit across three stages
// ---------------------------------------------------------------------------

fn source_stage(calls: Arc<AtomicUsize>) -> Producer<i32, Rt, ()> {
    lift(tick(calls.clone()))
        .then(stages::emit(1))
        .then(lift(tick(calls.clone())))
        .then(stages::emit(2))
        .then(lift(tick(calls)))
        .then(stages::emit(3))
}

/// Passes values through, failing its lifted effect on the second one.
fn flaky_stage(calls: Arc<AtomicUsize>) -> Pipe<i32, i32, Rt, ()> {
    stages::awaiting().bind(move |x| {
        let effect = {
            let calls = calls.clone();
            Task::lift(move |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 2 {
                    Sum::Left(PipelineError::msg("flaky stage failed"))
                } else {
                    Sum::Right(())
                }
            })
        };
        lift(effect).then(stages::emit(x)).then(flaky_stage(calls))
    })
}

fn sink_stage(log: Arc<Mutex<Vec<i32>>>) -> Consumer<i32, Rt, ()> {
    stages::awaiting()
        .bind(move |x| lift(record(log.clone(), x)).then(sink_stage(log)))
}

#[tokio::test]
async fn failure_halts_the_whole_pipeline() {
    let ctx = Context::new();
    let source_calls = Arc::new(AtomicUsize::new(0));
    let flaky_calls = Arc::new(AtomicUsize::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));

    let pipeline = source_stage(source_calls.clone())
        | flaky_stage(flaky_calls.clone())
        | sink_stage(log.clone());
    let outcome = pipeline.run(&ctx).await;

    assert_eq!(outcome, Sum::Left(PipelineError::msg("flaky stage failed")));
    // Exactly one item made it through the sink.
    assert_eq!(log.lock().unwrap().clone(), vec![1]);
    // The flaky stage ran twice (the second run failed) and never a third
    // time; the source never reached its third item.
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source_calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pre_signaled_token_runs_no_effects() {
    let token = CancelToken::new();
    let ctx = Context::with_token(token.clone());
    token.cancel();

    let calls = Arc::new(AtomicUsize::new(0));
    let effect: Effect<Rt, ()> = lift(tick(calls.clone()));

    assert_eq!(effect.run(&ctx).await, Sum::Left(PipelineError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(PipelineError::Cancelled.is_cancelled());
}

#[tokio::test]
async fn cancellation_halts_at_the_next_lift() {
    let ctx = Context::new();
    let later_calls = Arc::new(AtomicUsize::new(0));

    // The first effect cancels the shared token; the second must never run.
    let cancel_self: Task<PipelineError, ()> = Task::lift(|ctx| {
        ctx.cancel();
        Sum::Right(())
    });
    let effect: Effect<Rt, ()> =
        lift(cancel_self).then(lift(tick(later_calls.clone())));

    assert_eq!(effect.run(&ctx).await, Sum::Left(PipelineError::Cancelled));
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Driving open proxies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_with_answers_requests_from_the_source() -> Result<()> {
    let ctx = Context::new();
    let wants_two: Consumer<i32, Rt, i32> = stages::awaiting()
        .bind(|a| stages::awaiting().map(move |b: i32| a + b));

    let mut served = 0;
    let outcome = wants_two
        .run_with(
            &ctx,
            |()| {
                served += 1;
                Sum::Right(served * 10)
            },
            |never: pipework::Never| match never {},
        )
        .await;

    let total = outcome.into_result()?;
    assert_eq!(total, 30);
    assert_eq!(served, 2);
    Ok(())
}

#[tokio::test]
async fn run_with_surfaces_a_failing_sink() {
    let ctx = Context::new();
    let numbers: Producer<i32, Rt, ()> = each([1, 2, 3]);

    let mut seen = Vec::new();
    let outcome = numbers
        .run_with(
            &ctx,
            |never| match never {},
            |n| {
                if n > 1 {
                    Sum::Left(PipelineError::msg("sink full"))
                } else {
                    seen.push(n);
                    Sum::Right(())
                }
            },
        )
        .await;

    assert_eq!(outcome, Sum::Left(PipelineError::msg("sink full")));
    assert_eq!(seen, vec![1]);
}

#[tokio::test]
async fn replace_request_feeds_a_consumer_from_an_effect() {
    let ctx = Context::new();
    let sum_two: Consumer<i32, Rt, i32> = stages::awaiting()
        .bind(|a| stages::awaiting().map(move |b: i32| a + b));

    let served = Arc::new(AtomicUsize::new(0));
    let feed = Arc::clone(&served);
    let closed: Effect<Rt, i32> = sum_two.replace_request(move |()| {
        let feed = Arc::clone(&feed);
        lift(Task::lift(move |_| {
            let n = feed.fetch_add(1, Ordering::SeqCst) + 1;
            Sum::Right(n as i32 * 10)
        }))
    });

    assert_eq!(closed.run(&ctx).await, Sum::Right(30));
    assert_eq!(served.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Stage helpers through a full pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filter_then_map_pipeline() {
    let ctx = Context::new();

    let a = || -> Producer<i32, Rt, Vec<i32>> {
        each([1, 2, 3, 4, 5, 6]).map(|_| Vec::new())
    };
    let evens = stages::filter(|n: &i32| n % 2 == 0);
    let halved = stages::map(|n: i32| n / 2);
    let sink = {
        fn take(n: usize) -> Consumer<i32, Rt, Vec<i32>> {
            fn go(n: usize, mut acc: Vec<i32>) -> Consumer<i32, Rt, Vec<i32>> {
                if n == 0 {
                    return pure(acc);
                }
                stages::awaiting().bind(move |x| {
                    acc.push(x);
                    go(n - 1, acc)
                })
            }
            go(n, Vec::new())
        }
        take(3)
    };

    let outcome = (a() | evens | halved | sink).run(&ctx).await;
    assert_eq!(outcome, Sum::Right(vec![1, 2, 3]));
}

// ---------------------------------------------------------------------------
// Effect extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unlift_hands_the_effect_to_the_runtime() {
    let ctx = Context::new();
    let effect: Effect<Rt, i32> = lift(Task::pure(21)).map(|n| n * 2);

    match effect.unlift() {
        Sum::Right(eff) => assert_eq!(eff.invoke(ctx).await, Sum::Right(42)),
        Sum::Left(e) => panic!("expected a lifted effect, got {e}"),
    }
}

#[tokio::test]
async fn unlift_without_a_lift_is_unsupported() {
    let effect: Effect<Rt, i32> = pure(5);
    assert_eq!(
        effect.unlift().left(),
        Some(PipelineError::NoLiftedEffect)
    );
}

#[tokio::test]
async fn lift_eff_embeds_a_raw_runtime_effect() {
    let ctx = Context::new();
    let effect: Effect<Rt, i32> = lift_eff(Deferred::pure(5)).map(|n| n + 1);
    assert_eq!(effect.run(&ctx).await, Sum::Right(6));
}

// ---------------------------------------------------------------------------
// Explicit retry via choice
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_is_explicit_choice_composition() {
    let ctx = Context::new();
    let attempts = Arc::new(AtomicUsize::new(0));

    let build = |attempts: Arc<AtomicUsize>| -> Effect<Rt, i32> {
        lift(Task::lift(move |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                Sum::Left(PipelineError::msg("transient"))
            } else {
                Sum::Right(99)
            }
        }))
    };

    let once_retried = build(attempts.clone()).or_else(build(attempts.clone()));
    assert_eq!(once_retried.run(&ctx).await, Sum::Right(99));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[should_panic(expected = "pipeline failed")]
async fn run_unit_raises_on_pipeline_failure() {
    let ctx = Context::new();
    let effect: Effect<Rt, ()> = pipework::fail(PipelineError::msg("boom"));
    effect.run_unit(&ctx).await;
}
