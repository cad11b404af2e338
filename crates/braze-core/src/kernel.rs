//! The routing kernel: registry and registration surface.
//!
//! A [`Kernel`] owns three append-only collections — integrations, incoming
//! middleware, outgoing middleware — and everything else hangs off them:
//! listener pipelines merge the integrations' streams, the send dispatcher
//! routes outbound envelopes back by service ID, and both directions thread
//! messages through the middleware chains.
//!
//! `Kernel` is cheap to clone; clones share state. The collections are read
//! through snapshots, so registering while a chain is mid-evaluation cannot
//! disturb it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::chain::{ChainStep, StepEval, fold_first};
use crate::envelope::Envelope;
use crate::error::MiddlewareError;
use crate::integration::BoxedIntegration;
use crate::middleware::{
    ChainEntry, ChainOutput, IncomingMiddleware, MiddlewareDescriptor, OutgoingMiddleware,
};
use crate::pattern::Pattern;
use crate::transport::{HttpTransport, ServerHandle, WebhookRoute};

/// Anything that can be registered with the kernel.
///
/// The variant is chosen explicitly by the caller; the kernel never guesses
/// a role from the capabilities an object happens to expose.
pub enum Registrable {
    /// A chat-platform adapter.
    Integration(BoxedIntegration),
    /// A transformation step for inbound messages.
    Incoming(Arc<dyn IncomingMiddleware>),
    /// A transformation step for outbound content.
    Outgoing(Arc<dyn OutgoingMiddleware>),
}

/// The message-routing kernel.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

struct KernelInner {
    /// Registered integrations, in registration order.
    integrations: RwLock<Vec<BoxedIntegration>>,
    /// Incoming middleware chain, in registration order.
    incoming: RwLock<Vec<MiddlewareDescriptor<dyn IncomingMiddleware>>>,
    /// Outgoing middleware chain, in registration order.
    outgoing: RwLock<Vec<MiddlewareDescriptor<dyn OutgoingMiddleware>>>,
    /// Webhook mounts collected from integrations.
    endpoints: RwLock<Vec<WebhookRoute>>,
    /// Webhook server capability, if configured.
    http: Option<Arc<dyn HttpTransport>>,
    /// Whether the webhook server start has been triggered.
    http_started: AtomicBool,
    /// Handle keeping the webhook server alive.
    server: Mutex<Option<ServerHandle>>,
}

impl Kernel {
    /// Creates a kernel without a webhook transport.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a kernel builder.
    pub fn builder() -> KernelBuilder {
        KernelBuilder::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers an integration or middleware.
    ///
    /// `filter` gates middleware steps: one or more patterns tested against
    /// the triggering envelope's content before the step is allowed to run.
    /// It has no meaning for integrations and is ignored there.
    ///
    /// Ordering is significant: middleware chains evaluate in registration
    /// order, and that order is preserved in chain results.
    pub fn register(&self, registrable: Registrable, filter: Option<Pattern>) {
        match registrable {
            Registrable::Integration(integration) => self.add_integration(integration),
            Registrable::Incoming(middleware) => {
                let name = format!("{}.incoming", middleware.service_name());
                info!(middleware = %name, "registered incoming middleware");
                self.inner
                    .incoming
                    .write()
                    .push(MiddlewareDescriptor::new(name, filter, middleware));
            }
            Registrable::Outgoing(middleware) => {
                let name = format!("{}.outgoing", middleware.service_name());
                info!(middleware = %name, "registered outgoing middleware");
                self.inner
                    .outgoing
                    .write()
                    .push(MiddlewareDescriptor::new(name, filter, middleware));
            }
        }
    }

    /// Registers an integration.
    pub fn register_integration(&self, integration: BoxedIntegration) {
        self.register(Registrable::Integration(integration), None);
    }

    /// Registers an incoming middleware step.
    pub fn register_incoming(
        &self,
        middleware: Arc<dyn IncomingMiddleware>,
        filter: Option<Pattern>,
    ) {
        self.register(Registrable::Incoming(middleware), filter);
    }

    /// Registers an outgoing middleware step.
    pub fn register_outgoing(
        &self,
        middleware: Arc<dyn OutgoingMiddleware>,
        filter: Option<Pattern>,
    ) {
        self.register(Registrable::Outgoing(middleware), filter);
    }

    fn add_integration(&self, integration: BoxedIntegration) {
        info!(integration = %integration.service_name(), "registered integration");
        if let Some(handler) = integration.webhook() {
            let path = format!("/webhook/{}", integration.service_name());
            debug!(path = %path, "webhook endpoint mounted");
            self.inner.endpoints.write().push(WebhookRoute {
                path,
                handler,
            });
        }
        self.inner.integrations.write().push(integration);
    }

    /// Paths of all mounted webhook endpoints.
    pub fn http_endpoints(&self) -> Vec<String> {
        self.inner
            .endpoints
            .read()
            .iter()
            .map(|route| route.path.clone())
            .collect()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Snapshot of the registered integrations.
    pub(crate) fn integrations_snapshot(&self) -> Vec<BoxedIntegration> {
        self.inner.integrations.read().clone()
    }

    /// Finds an integration by its service ID.
    pub(crate) fn find_integration(&self, service_id: &str) -> Option<BoxedIntegration> {
        self.inner
            .integrations
            .read()
            .iter()
            .find(|integration| integration.service_id() == service_id)
            .cloned()
    }

    // =========================================================================
    // Middleware Chains
    // =========================================================================

    /// Runs the incoming chain for one inbound envelope.
    pub(crate) async fn run_incoming_chain(
        &self,
        message: &Envelope,
    ) -> Result<ChainOutput, MiddlewareError> {
        let descriptors = self.inner.incoming.read().clone();
        let steps = descriptors
            .into_iter()
            .map(|descriptor| {
                let kernel = self.clone();
                let message = message.clone();
                let name = descriptor.name.clone();
                ChainStep {
                    name: name.clone(),
                    eval: Box::new(move |acc: &[ChainEntry]| {
                        if !descriptor.eligible(&message) {
                            return StepEval::Skip;
                        }
                        let output =
                            descriptor
                                .middleware
                                .incoming(kernel, message, acc.to_vec());
                        StepEval::Run(
                            output
                                .into_stream()
                                .map(move |result| {
                                    result.map(|data| ChainEntry::incoming(&name, data))
                                })
                                .boxed(),
                        )
                    }),
                }
            })
            .collect();

        let data = fold_first(steps, Vec::new()).await?;
        Ok(ChainOutput {
            data,
            message: message.clone(),
        })
    }

    /// Runs the outgoing chain for content being sent in reply to `message`.
    pub(crate) async fn run_outgoing_chain(
        &self,
        content: &str,
        message: &Envelope,
    ) -> Result<ChainOutput, MiddlewareError> {
        let descriptors = self.inner.outgoing.read().clone();
        let steps = descriptors
            .into_iter()
            .map(|descriptor| {
                let kernel = self.clone();
                let content = content.to_string();
                let message = message.clone();
                let name = descriptor.name.clone();
                ChainStep {
                    name: name.clone(),
                    eval: Box::new(move |acc: &[ChainEntry]| {
                        if !descriptor.eligible(&message) {
                            return StepEval::Skip;
                        }
                        let output = descriptor.middleware.outgoing(
                            kernel,
                            content,
                            message,
                            acc.to_vec(),
                        );
                        StepEval::Run(
                            output
                                .into_stream()
                                .map(move |result| {
                                    result.map(|data| ChainEntry::outgoing(&name, data))
                                })
                                .boxed(),
                        )
                    }),
                }
            })
            .collect();

        let data = fold_first(steps, Vec::new()).await?;
        Ok(ChainOutput {
            data,
            message: message.clone(),
        })
    }

    // =========================================================================
    // Webhook Server
    // =========================================================================

    /// Starts the webhook server on first use.
    ///
    /// Called when a listener is created. Does nothing without a transport
    /// capability or mounted endpoints; subsequent calls are no-ops.
    pub(crate) fn maybe_start_http(&self) {
        let Some(transport) = self.inner.http.clone() else {
            return;
        };
        let routes = self.inner.endpoints.read().clone();
        if routes.is_empty() {
            return;
        }
        if self.inner.http_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let kernel = self.clone();
        tokio::spawn(async move {
            match transport.serve(routes).await {
                Ok(handle) => {
                    debug!(server = %handle.id, "webhook server started");
                    *kernel.inner.server.lock() = Some(handle);
                }
                Err(error) => {
                    warn!(error = %error, "failed to start webhook server");
                    kernel.inner.http_started.store(false, Ordering::SeqCst);
                }
            }
        });
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("integrations", &self.inner.integrations.read().len())
            .field("incoming", &self.inner.incoming.read().len())
            .field("outgoing", &self.inner.outgoing.read().len())
            .finish()
    }
}

/// Builder for [`Kernel`].
#[derive(Default)]
pub struct KernelBuilder {
    http: Option<Arc<dyn HttpTransport>>,
}

impl KernelBuilder {
    /// Sets the webhook server capability.
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(transport);
        self
    }

    /// Builds the kernel.
    pub fn build(self) -> Kernel {
        Kernel {
            inner: Arc::new(KernelInner {
                integrations: RwLock::new(Vec::new()),
                incoming: RwLock::new(Vec::new()),
                outgoing: RwLock::new(Vec::new()),
                endpoints: RwLock::new(Vec::new()),
                http: self.http,
                http_started: AtomicBool::new(false),
                server: Mutex::new(None),
            }),
        }
    }
}
