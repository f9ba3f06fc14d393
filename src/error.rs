use kube_runtime::watcher;

use crate::event::QualifiedName;

/// Errors raised by subscriptions and the object clients they use.
///
/// Only [`Error::Connection`] and [`Error::AlreadySubscribed`] ever leave a subscription;
/// everything else is logged inside `reconcile` or by the stream worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The change stream for `kind` could not be opened.
    #[error("failed to open {kind} stream: {source}")]
    Connection {
        kind: String,
        #[source]
        source: kube_client::Error,
    },
    /// `subscribe` was called again after a successful call.
    #[error("{kind} subscription is already subscribed")]
    AlreadySubscribed { kind: String },
    /// The platform config payload is not valid directive YAML.
    #[error("malformed platform config payload: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// The config entry has no data under the payload key.
    #[error("config map {object} has no {key:?} entry")]
    MissingPayload { object: QualifiedName, key: String },
    /// A full-replace update was rejected.
    #[error("failed to replace {object}: {source}")]
    Write {
        object: QualifiedName,
        #[source]
        source: kube_client::Error,
    },
    /// An inbound object could not be read as the kind its stream carries.
    #[error("unexpected object in {kind} stream: {message}")]
    TypeMismatch { kind: String, message: String },
    /// The underlying watch failed; the stream retries on its own.
    #[error("{kind} watch failed: {source}")]
    Stream {
        kind: String,
        #[source]
        source: watcher::Error,
    },
}

impl Error {
    pub(crate) fn from_watcher(kind: &str, err: watcher::Error) -> Self {
        match err {
            watcher::Error::WatchFailed(kube_client::Error::SerdeError(err))
            | watcher::Error::InitialListFailed(kube_client::Error::SerdeError(err)) => {
                Self::TypeMismatch {
                    kind: kind.to_owned(),
                    message: err.to_string(),
                }
            }
            source => Self::Stream {
                kind: kind.to_owned(),
                source,
            },
        }
    }
}
