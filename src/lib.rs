//! platform-annotator propagates platform-wide annotations onto workloads.
//!
//! A [`ConfigSubscription`] watches a designated config map
//! and keeps a snapshot of the annotation directives it carries.
//! A [`WorkloadSubscription`] watches workloads (pods by default)
//! and merges the current snapshot into the annotations of every added or modified workload
//! through a full-replace update.
//!
//! The [`Runtime`] opens every subscription's stream, then runs one worker per subscription
//! until each stream ends or shutdown is requested.
//! Events of one subscription are reconciled strictly in delivery order;
//! different subscriptions interleave freely.

pub mod client;
pub mod config;
pub use config::PlatformConfigTarget;
pub mod error;
pub use error::Error;
pub mod event;
pub use event::{Event, EventKind, QualifiedName};
pub mod platform;
pub use platform::{Annotation, PlatformConfig};
mod runner;
pub use runner::{RunError, Runtime};
pub mod snapshot;
pub mod subscription;
pub use subscription::{Completion, ConfigSubscription, Subscription, WorkloadSubscription};
