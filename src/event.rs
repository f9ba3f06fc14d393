//! Change notifications delivered to subscriptions.

use std::fmt;

use kube_core::Resource;

/// Uniquely identifies an object of a known type by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    /// The object namespace, if any
    pub namespace: Option<String>,
    /// The object name
    pub name: String,
}

impl QualifiedName {
    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self {
            namespace: resource.meta().namespace.clone(),
            name: resource.meta().name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Classification of a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        })
    }
}

/// A change to an externally owned object.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<K> {
    pub kind: EventKind,
    pub object: K,
}

impl<K> Event<K> {
    pub fn added(object: K) -> Self {
        Self {
            kind: EventKind::Added,
            object,
        }
    }

    pub fn modified(object: K) -> Self {
        Self {
            kind: EventKind::Modified,
            object,
        }
    }

    pub fn deleted(object: K) -> Self {
        Self {
            kind: EventKind::Deleted,
            object,
        }
    }
}
