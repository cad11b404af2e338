//! Sequential middleware chain combinator.
//!
//! A chain is an ordered list of steps and an accumulator threaded through
//! them. Step `n+1` observes exactly the cumulative ordered results of
//! steps `1..n`, regardless of how long any step's asynchronous work takes:
//! ordering is by registration, never by completion.
//!
//! Three rules govern evaluation:
//!
//! - only the FIRST value a step emits is folded into the accumulator;
//!   later emissions of a multi-valued step are discarded,
//! - an ineligible or empty step contributes nothing but does not abort
//!   the chain,
//! - a step failure is the chain's single terminal outcome; no retry, no
//!   silent skip.

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::trace;

use crate::error::MiddlewareError;

/// Evaluation decision for one step.
pub(crate) enum StepEval<T> {
    /// The step is ineligible; the chain moves on.
    Skip,
    /// Run the step; only the stream's first emission is kept.
    Run(BoxStream<'static, Result<T, MiddlewareError>>),
}

/// One named step of a chain.
pub(crate) struct ChainStep<T> {
    pub(crate) name: String,
    pub(crate) eval: Box<dyn FnOnce(&[T]) -> StepEval<T> + Send>,
}

/// Threads `seed` through `steps` in order and returns the accumulated
/// results.
pub(crate) async fn fold_first<T>(
    steps: Vec<ChainStep<T>>,
    seed: Vec<T>,
) -> Result<Vec<T>, MiddlewareError> {
    let mut acc = seed;
    for step in steps {
        let ChainStep { name, eval } = step;
        match eval(&acc) {
            StepEval::Skip => {
                trace!(step = %name, "chain step ineligible, skipping");
            }
            StepEval::Run(mut output) => match output.next().await {
                Some(Ok(value)) => acc.push(value),
                Some(Err(error)) => return Err(error.with_step_name(&name)),
                None => {
                    trace!(step = %name, "chain step produced nothing");
                }
            },
        }
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::time::Duration;

    fn run<T: Send + 'static>(
        name: &str,
        output: BoxStream<'static, Result<T, MiddlewareError>>,
    ) -> ChainStep<T> {
        ChainStep {
            name: name.to_string(),
            eval: Box::new(move |_| StepEval::Run(output)),
        }
    }

    #[tokio::test]
    async fn results_keep_registration_order_despite_completion_order() {
        // The first step resolves last; the accumulator must still list it
        // first.
        let slow = run(
            "slow",
            stream::once(async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok("slow")
            })
            .boxed(),
        );
        let fast = run("fast", stream::once(async { Ok("fast") }).boxed());

        let acc = fold_first(vec![slow, fast], Vec::new()).await.unwrap();
        assert_eq!(acc, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn each_step_observes_prior_results() {
        let first = run("first", stream::once(async { Ok(1) }).boxed());
        let second = ChainStep {
            name: "second".to_string(),
            eval: Box::new(|acc: &[i32]| {
                let doubled = acc.iter().sum::<i32>() * 2;
                StepEval::Run(stream::once(async move { Ok(doubled) }).boxed())
            }),
        };
        let third = ChainStep {
            name: "third".to_string(),
            eval: Box::new(|acc: &[i32]| {
                let seen = acc.to_vec();
                StepEval::Run(stream::once(async move { Ok(seen.iter().sum()) }).boxed())
            }),
        };

        let acc = fold_first(vec![first, second, third], Vec::new())
            .await
            .unwrap();
        assert_eq!(acc, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn skipped_step_contributes_nothing_but_does_not_abort() {
        let first = run("first", stream::once(async { Ok("a") }).boxed());
        let skipped = ChainStep {
            name: "skipped".to_string(),
            eval: Box::new(|_: &[&str]| StepEval::Skip),
        };
        let last = run("last", stream::once(async { Ok("b") }).boxed());

        let acc = fold_first(vec![first, skipped, last], Vec::new())
            .await
            .unwrap();
        assert_eq!(acc, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_step_output_is_not_an_error() {
        let empty = run("empty", stream::empty().boxed());
        let last = run("last", stream::once(async { Ok("x") }).boxed());

        let acc = fold_first(vec![empty, last], Vec::new()).await.unwrap();
        assert_eq!(acc, vec!["x"]);
    }

    #[tokio::test]
    async fn only_the_first_emission_of_a_step_is_kept() {
        let multi = run("multi", stream::iter(vec![Ok("first"), Ok("second")]).boxed());

        let acc = fold_first(vec![multi], Vec::new()).await.unwrap();
        assert_eq!(acc, vec!["first"]);
    }

    #[tokio::test]
    async fn step_failure_is_the_single_terminal_outcome() {
        let first = run("first", stream::once(async { Ok(1) }).boxed());
        let failing = run(
            "broken.incoming",
            stream::once(async { Err(MiddlewareError::step("boom")) }).boxed(),
        );
        let never = ChainStep {
            name: "never".to_string(),
            eval: Box::new(|_: &[i32]| panic!("must not be evaluated")),
        };

        let error = fold_first(vec![first, failing, never], Vec::new())
            .await
            .unwrap_err();
        assert_eq!(error.middleware, "broken.incoming");
        assert_eq!(error.reason, "boom");
    }
}
