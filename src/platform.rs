//! The platform config directive format and how it is merged onto objects.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube_core::Resource;
use serde::{Deserialize, Serialize};

use crate::{config::PlatformConfigTarget, error::Error, event::QualifiedName};

/// A single annotation directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

/// Ordered annotation directives parsed from the platform config map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl PlatformConfig {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Parses the payload stored under the target's key.
    pub fn from_config_map(
        config_map: &ConfigMap,
        target: &PlatformConfigTarget,
    ) -> Result<Self, Error> {
        let raw = config_map
            .data
            .as_ref()
            .and_then(|data| data.get(&target.data_key))
            .ok_or_else(|| Error::MissingPayload {
                object: QualifiedName::from_resource(config_map),
                key: target.data_key.clone(),
            })?;
        Self::parse(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The annotations this config resolves to.
    /// Later directives win over earlier ones with the same name.
    pub fn resolved(&self) -> BTreeMap<&str, &str> {
        self.annotations
            .iter()
            .map(|annotation| (annotation.name.as_str(), annotation.value.as_str()))
            .collect()
    }

    /// Returns a copy of `object` with every directive merged into its annotations,
    /// or `None` if the object already carries all of them.
    pub fn apply_to<K: Resource + Clone>(&self, object: &K) -> Option<K> {
        let resolved = self.resolved();
        let current = object.meta().annotations.as_ref();
        let converged = resolved.iter().all(|(name, value)| {
            current
                .and_then(|annotations| annotations.get(*name))
                .is_some_and(|existing| existing == value)
        });
        if converged {
            return None;
        }

        let mut updated = object.clone();
        let annotations = updated.meta_mut().annotations.get_or_insert_with(BTreeMap::new);
        for (name, value) in resolved {
            annotations.insert(name.to_owned(), value.to_owned());
        }
        Some(updated)
    }
}
