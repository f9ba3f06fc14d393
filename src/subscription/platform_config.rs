use std::fmt;

use k8s_openapi::api::core::v1::ConfigMap;

use super::{Completion, Subscription};
use crate::{
    client::{EventStream, ObjectClient},
    config::PlatformConfigTarget,
    error::Error,
    event::{EventKind, QualifiedName},
    platform::PlatformConfig,
    snapshot::{SnapshotReader, SnapshotWriter},
};

const KIND: &str = "ConfigMap";

/// The last event applied to the platform config map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigPhase {
    #[default]
    Uninitialized,
    Added,
    Modified,
    Deleted,
}

impl From<EventKind> for ConfigPhase {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Added => Self::Added,
            EventKind::Modified => Self::Modified,
            EventKind::Deleted => Self::Deleted,
        }
    }
}

impl fmt::Display for ConfigPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        })
    }
}

/// Maintains the platform config snapshot from the target config map.
///
/// Only events for the target config map are considered:
/// - `Added` parses the payload and replaces the snapshot.
///   A payload that fails to parse leaves the previous snapshot in place.
/// - `Deleted` clears the snapshot entirely.
/// - `Modified` is ignored; the snapshot keeps the last added payload.
pub struct ConfigSubscription<C> {
    client: C,
    target: PlatformConfigTarget,
    snapshot: SnapshotWriter,
    phase: ConfigPhase,
    completion: Completion,
    subscribed: bool,
}

impl<C: ObjectClient<ConfigMap>> ConfigSubscription<C> {
    pub fn new(client: C, target: PlatformConfigTarget) -> Self {
        Self {
            client,
            target,
            snapshot: SnapshotWriter::new(),
            phase: ConfigPhase::default(),
            completion: Completion::new(),
            subscribed: false,
        }
    }

    /// A read-only handle to the derived snapshot, for other subscriptions.
    pub fn snapshot(&self) -> SnapshotReader {
        self.snapshot.as_reader()
    }

    pub fn phase(&self) -> ConfigPhase {
        self.phase
    }

    fn apply_added(&mut self, config_map: &ConfigMap) {
        match PlatformConfig::from_config_map(config_map, &self.target) {
            Ok(config) => {
                tracing::info!(
                    outcome = "loaded",
                    annotations = config.annotations.len(),
                    "Loaded platform config"
                );
                self.snapshot.store(config);
            }
            Err(err) => {
                tracing::error!(
                    outcome = "parse_failed",
                    error = %err,
                    "Keeping previous platform config"
                );
            }
        }
    }

    fn handle(&mut self, config_map: &ConfigMap, kind: EventKind) {
        if !self.target.matches(config_map) {
            tracing::trace!(outcome = "ignored", "Not the platform config map");
            return;
        }

        tracing::info!("Received watch event");
        self.phase = kind.into();
        match kind {
            EventKind::Added => {
                tracing::info_span!("watch_event_added").in_scope(|| self.apply_added(config_map))
            }
            EventKind::Deleted => tracing::info_span!("watch_event_deleted").in_scope(|| {
                // there is no record of which directives were applied where, so drop all of them
                self.snapshot.clear();
                tracing::info!(outcome = "cleared", "Cleared platform config");
            }),
            EventKind::Modified => tracing::info_span!("watch_event_modified").in_scope(|| {
                tracing::debug!(outcome = "ignored", "Platform config modifications are not applied");
            }),
        }
    }
}

impl<C: ObjectClient<ConfigMap>> Subscription for ConfigSubscription<C> {
    type Object = ConfigMap;

    fn kind(&self) -> &str {
        KIND
    }

    async fn subscribe(&mut self) -> Result<EventStream<ConfigMap>, Error> {
        if self.subscribed {
            return Err(Error::AlreadySubscribed {
                kind: KIND.to_owned(),
            });
        }
        let stream = self.client.watch(self.target.watcher_config()).await?;
        self.subscribed = true;
        tracing::info!(subscription = KIND, "Started watch stream");
        Ok(stream)
    }

    async fn reconcile(&mut self, config_map: &ConfigMap, kind: EventKind) {
        let name = QualifiedName::from_resource(config_map);
        let span = tracing::info_span!(
            "reconcile",
            subscription = KIND,
            event = %kind,
            namespace = name.namespace.as_deref().unwrap_or_default(),
            name = %name.name,
        );
        span.in_scope(|| self.handle(config_map, kind));
    }

    fn is_complete(&self) -> Completion {
        self.completion.clone()
    }
}
