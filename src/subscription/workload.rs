use std::{fmt::Debug, marker::PhantomData};

use k8s_openapi::api::core::v1::Pod;
use kube_core::Resource;
use kube_runtime::watcher;
use tracing::Instrument;

use super::{Completion, Subscription};
use crate::{
    client::{EventStream, ObjectClient},
    error::Error,
    event::{EventKind, QualifiedName},
    snapshot::SnapshotReader,
};

/// Merges the platform config annotations onto every added or modified workload.
///
/// Workloads that already carry every directive value are skipped without a write, so the
/// controller's own updates echoing back as `Modified` events do not loop. Nothing is written
/// while no platform config is loaded. Deleted workloads need no cleanup. A failed update is
/// logged and the next event is processed as usual.
pub struct WorkloadSubscription<C, K = Pod> {
    client: C,
    kind: String,
    watcher_config: watcher::Config,
    platform_config: Option<SnapshotReader>,
    completion: Completion,
    subscribed: bool,
    _ph: PhantomData<fn() -> K>,
}

impl<C, K> WorkloadSubscription<C, K>
where
    C: ObjectClient<K>,
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(client: C, watcher_config: watcher::Config) -> Self {
        Self {
            client,
            kind: K::kind(&()).into_owned(),
            watcher_config,
            platform_config: None,
            completion: Completion::new(),
            subscribed: false,
            _ph: PhantomData,
        }
    }

    /// Wires the platform config snapshot that is merged onto workloads.
    pub fn with_platform_config(mut self, snapshot: SnapshotReader) -> Self {
        self.platform_config = Some(snapshot);
        self
    }

    async fn apply_platform_config(&self, object: &K) {
        let Some(config) = self.platform_config.as_ref().and_then(SnapshotReader::load) else {
            tracing::debug!(outcome = "no_platform_config", "No platform config loaded yet");
            return;
        };
        if config.is_empty() {
            tracing::debug!(outcome = "empty_platform_config", "Platform config has no directives");
            return;
        }

        let Some(updated) = config.apply_to(object) else {
            tracing::debug!(
                outcome = "converged",
                "Workload already carries the platform annotations"
            );
            return;
        };

        match self.client.replace(&updated).await {
            Ok(_) => tracing::info!(
                outcome = "annotated",
                annotations = config.annotations.len(),
                "Applied platform annotations"
            ),
            Err(err) => tracing::error!(
                outcome = "write_failed",
                subscription = %self.kind,
                error = %err,
                "Cannot apply platform annotations to {} {}",
                self.kind,
                QualifiedName::from_resource(object),
            ),
        }
    }
}

impl<C, K> Subscription for WorkloadSubscription<C, K>
where
    C: ObjectClient<K>,
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
{
    type Object = K;

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn subscribe(&mut self) -> Result<EventStream<K>, Error> {
        if self.subscribed {
            return Err(Error::AlreadySubscribed {
                kind: self.kind.clone(),
            });
        }
        let stream = self.client.watch(self.watcher_config.clone()).await?;
        self.subscribed = true;
        tracing::info!(subscription = %self.kind, "Started watch stream");
        Ok(stream)
    }

    async fn reconcile(&mut self, object: &K, kind: EventKind) {
        let name = QualifiedName::from_resource(object);
        let span = tracing::info_span!(
            "reconcile",
            subscription = %self.kind,
            event = %kind,
            namespace = name.namespace.as_deref().unwrap_or_default(),
            name = %name.name,
        );
        async move {
            tracing::info!("Received watch event");
            match kind {
                EventKind::Added => {
                    self.apply_platform_config(object)
                        .instrument(tracing::info_span!("watch_event_added"))
                        .await
                }
                EventKind::Modified => {
                    self.apply_platform_config(object)
                        .instrument(tracing::info_span!("watch_event_modified"))
                        .await
                }
                EventKind::Deleted => tracing::info_span!("watch_event_deleted")
                    .in_scope(|| tracing::debug!(outcome = "ignored", "Workload deleted")),
            }
        }
        .instrument(span)
        .await
    }

    fn is_complete(&self) -> Completion {
        self.completion.clone()
    }
}
