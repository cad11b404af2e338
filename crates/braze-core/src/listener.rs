//! Listener pipeline: pattern/type-filtered subscription over the merged
//! integration streams.
//!
//! A listener is cold: each [`Listener::stream`] (or
//! [`Listener::subscribe`]) call builds an independent pipeline over the
//! integrations registered at that moment, so multiple subscribers each see
//! every matching message from their own subscription point onward.
//!
//! Per raw envelope the pipeline applies, in this fixed order:
//!
//! 1. schema validity — an envelope without the `@context` marker is
//!    dropped silently (logged at diagnostic level; live integrations emit
//!    plenty of irrelevant events),
//! 2. the incoming middleware chain,
//! 3. the target-type filter,
//! 4. the content pattern.
//!
//! Chains for distinct envelopes run concurrently; one hung middleware step
//! stalls only its own chain. No ordering is guaranteed across envelopes
//! from independent integrations.

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::integration::EnvelopeStream;
use crate::kernel::Kernel;
use crate::middleware::ChainOutput;
use crate::pattern::{Pattern, TypeFilter};

/// Upper bound on middleware chains evaluated concurrently per subscriber.
const MAX_CONCURRENT_CHAINS: usize = 16;

/// A stream of matching messages (or chain failures).
pub type ListenerStream = BoxStream<'static, Result<ChainOutput>>;

impl Kernel {
    /// Creates a listener for messages whose content matches `pattern`,
    /// optionally restricted to a set of target types.
    ///
    /// Creating a listener lazily starts the webhook server when
    /// integrations mounted handlers and a transport is configured.
    pub fn hear(&self, pattern: Pattern, types: TypeFilter) -> Listener {
        self.maybe_start_http();
        Listener {
            kernel: self.clone(),
            pattern,
            types,
        }
    }

    /// Creates a listener matching any of the given pattern strings.
    pub fn hears<I, S>(&self, patterns: I, types: TypeFilter) -> Result<Listener>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.hear(Pattern::any(patterns)?, types))
    }

    /// Creates a listener matching every message, filtered only by type.
    pub fn on(&self, types: TypeFilter) -> Listener {
        self.hear(Pattern::Always, types)
    }
}

/// A pattern/type-filtered subscription over the merged integration streams.
pub struct Listener {
    kernel: Kernel,
    pattern: Pattern,
    types: TypeFilter,
}

impl Listener {
    /// Builds an independent pipeline and returns the live filtered stream.
    pub fn stream(&self) -> ListenerStream {
        let kernel = self.kernel.clone();
        let pattern = self.pattern.clone();
        let types = self.types.clone();

        let sources: Vec<EnvelopeStream> = kernel
            .integrations_snapshot()
            .iter()
            .flat_map(|integration| [integration.connect(), integration.listen()])
            .collect();

        stream::select_all(sources)
            .map(move |raw| {
                let kernel = kernel.clone();
                let pattern = pattern.clone();
                let types = types.clone();
                async move { process_message(kernel, raw, pattern, types).await }
            })
            .buffer_unordered(MAX_CONCURRENT_CHAINS)
            .filter_map(|outcome| async move { outcome.transpose() })
            .boxed()
    }

    /// Subscribes with a callback driven on a spawned task.
    ///
    /// Matches arrive as `Ok(output)`; a chain failure arrives as `Err` and
    /// terminates this subscription. Other subscriptions over the same
    /// integrations are unaffected.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(Result<ChainOutput>) + Send + 'static,
    {
        let mut matches = self.stream();
        let token = CancellationToken::new();
        let guard = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = guard.cancelled() => break,
                    item = matches.next() => match item {
                        Some(Ok(output)) => callback(Ok(output)),
                        Some(Err(error)) => {
                            callback(Err(error));
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        Subscription { token }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("pattern", &self.pattern)
            .field("types", &self.types)
            .finish()
    }
}

/// Handle to an active subscription.
///
/// Cancelling stops delivery to this subscriber only. Dropping the handle
/// leaves the subscription running.
#[derive(Debug, Clone)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    /// Stops delivering matches to this subscriber.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs one raw envelope through validity check, incoming chain and filters.
async fn process_message(
    kernel: Kernel,
    raw: Envelope,
    pattern: Pattern,
    types: TypeFilter,
) -> Result<Option<ChainOutput>> {
    if !raw.is_valid() {
        debug!(envelope = ?raw, "dropping envelope without @context marker");
        return Ok(None);
    }

    let output = kernel.run_incoming_chain(&raw).await.map_err(Error::from)?;

    if !types.accepts(raw.target_kind()) {
        return Ok(None);
    }
    if !pattern.matches(raw.content()) {
        return Ok(None);
    }

    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Entity;
    use crate::test_support::{MockIntegration, NamedIncoming, ping, wait_until};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(content: &str, target_kind: &str) -> Envelope {
        Envelope::message(
            Entity::new("svc").with_name("Svc"),
            Entity::new("room1").with_kind(target_kind),
            content,
        )
    }

    #[tokio::test]
    async fn hear_delivers_matching_messages_only() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let listener = kernel.hear(Pattern::compile("^ping$").unwrap(), TypeFilter::any());
        let mut matches = listener.stream();

        integration.push(message("pong", "Group"));
        integration.push(message("ping", "Group"));

        let output = matches.next().await.unwrap().unwrap();
        assert_eq!(output.message.content(), Some("ping"));
    }

    #[tokio::test]
    async fn envelope_without_context_is_never_delivered() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let mut matches = kernel.on(TypeFilter::any()).stream();

        let mut invalid = message("ping", "Group");
        invalid.context = None;
        integration.push(invalid);
        integration.push(message("valid", "Group"));

        let output = matches.next().await.unwrap().unwrap();
        assert_eq!(output.message.content(), Some("valid"));
    }

    #[tokio::test]
    async fn hears_matches_any_of_the_patterns() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let listener = kernel
            .hears(["^hello$", "^bye$"], TypeFilter::any())
            .unwrap();
        let mut matches = listener.stream();

        integration.push(message("neither", "Group"));
        integration.push(message("BYE", "Group"));

        let output = matches.next().await.unwrap().unwrap();
        assert_eq!(output.message.content(), Some("BYE"));
    }

    #[tokio::test]
    async fn type_filter_is_case_insensitive() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let mut matches = kernel.on(TypeFilter::parse("group")).stream();

        integration.push(message("private message", "Person"));
        integration.push(message("group message", "GROUP"));

        let output = matches.next().await.unwrap().unwrap();
        assert_eq!(output.message.content(), Some("group message"));
    }

    #[tokio::test]
    async fn subscriber_receives_chain_results_in_registration_order() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());
        kernel.register_incoming(Arc::new(NamedIncoming::new("alpha")), None);
        kernel.register_incoming(Arc::new(NamedIncoming::new("beta")), None);

        let mut matches = kernel.on(TypeFilter::any()).stream();
        integration.push(ping());

        let output = matches.next().await.unwrap().unwrap();
        let names: Vec<&str> = output
            .data
            .iter()
            .map(|entry| entry.middleware.as_str())
            .collect();
        assert_eq!(names, vec!["alpha.incoming", "beta.incoming"]);
    }

    #[tokio::test]
    async fn two_subscribers_each_receive_every_match() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let listener = kernel.hear(Pattern::compile("ping").unwrap(), TypeFilter::any());
        let mut first = listener.stream();
        let mut second = listener.stream();

        integration.push(message("ping", "Group"));

        let a = first.next().await.unwrap().unwrap();
        let b = second.next().await.unwrap().unwrap();
        assert_eq!(a.message.content(), Some("ping"));
        assert_eq!(b.message.content(), Some("ping"));
    }

    #[tokio::test]
    async fn cancelling_one_subscription_leaves_the_other_running() {
        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());

        let listener = kernel.on(TypeFilter::any());

        let first_count = Arc::new(AtomicUsize::new(0));
        let second_count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first_count);
        let first = listener.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second_count);
        let _second = listener.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        first.cancel();
        integration.push(message("hello", "Group"));

        wait_until(|| second_count.load(Ordering::SeqCst) == 1).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_receives_chain_failures_in_the_error_slot() {
        use crate::error::MiddlewareError;
        use crate::middleware::{ChainEntry, IncomingMiddleware, StepOutput};

        struct Failing;

        impl IncomingMiddleware for Failing {
            fn service_name(&self) -> &str {
                "failing"
            }

            fn incoming(
                &self,
                _kernel: Kernel,
                _message: Envelope,
                _acc: Vec<ChainEntry>,
            ) -> StepOutput {
                StepOutput::from_future(async { Err(MiddlewareError::step("boom")) })
            }
        }

        let kernel = Kernel::new();
        let integration = MockIntegration::new("svc");
        kernel.register_integration(integration.clone());
        kernel.register_incoming(Arc::new(Failing), None);

        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        let _sub = kernel.on(TypeFilter::any()).subscribe(move |item| {
            if item.is_err() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        integration.push(ping());

        wait_until(|| errors.load(Ordering::SeqCst) == 1).await;
    }
}
