//! Units of work driven by the [`Runtime`](crate::Runtime).
//!
//! A subscription watches one resource kind, reconciles each event against its own state,
//! and may publish derived state for other subscriptions to read.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{client::EventStream, error::Error, event::EventKind};

pub mod platform_config;
pub use platform_config::{ConfigPhase, ConfigSubscription};
pub mod workload;
pub use workload::WorkloadSubscription;

pub trait Subscription {
    /// The object type carried by this subscription's stream.
    type Object: Send + Sync + 'static;

    /// The resource kind this subscription watches.
    fn kind(&self) -> &str;

    /// Opens the change stream.
    ///
    /// Succeeds at most once; later calls fail with [`Error::AlreadySubscribed`].
    fn subscribe(&mut self) -> impl Future<Output = Result<EventStream<Self::Object>, Error>> + Send;

    /// Handles one event. Failures are logged and never returned.
    fn reconcile(
        &mut self,
        object: &Self::Object,
        kind: EventKind,
    ) -> impl Future<Output = ()> + Send;

    /// Signal raised once the stream has been deliberately closed.
    fn is_complete(&self) -> Completion;

    /// Marks the stream as deliberately closed.
    fn close(&mut self) {
        self.is_complete().complete();
    }
}

/// One-shot completion signal.
#[derive(Debug, Clone, Default)]
pub struct Completion(CancellationToken);

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&self) {
        self.0.cancel();
    }

    pub fn is_complete(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once [`complete`](Self::complete) has been called.
    pub async fn wait(&self) {
        self.0.cancelled().await;
    }
}
