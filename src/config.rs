use k8s_openapi::api::core::v1::ConfigMap;
use kube_runtime::watcher;

/// Name of the config map carrying platform-wide defaults.
pub const DEFAULT_CONFIG_MAP_NAME: &str = "platform-default-configmap";
/// Data key under which the directives are stored.
pub const DEFAULT_DATA_KEY: &str = "platform-defaults";

/// Identifies the single config map the platform config is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfigTarget {
    /// The config map name.
    pub name: String,
    /// Restricts matching to one namespace; any namespace if `None`.
    pub namespace: Option<String>,
    /// The data key holding the directive YAML.
    pub data_key: String,
}

impl Default for PlatformConfigTarget {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONFIG_MAP_NAME.to_owned(),
            namespace: None,
            data_key: DEFAULT_DATA_KEY.to_owned(),
        }
    }
}

impl PlatformConfigTarget {
    pub fn matches(&self, config_map: &ConfigMap) -> bool {
        let meta = &config_map.metadata;
        meta.name.as_deref() == Some(self.name.as_str())
            && self
                .namespace
                .as_deref()
                .map_or(true, |namespace| meta.namespace.as_deref() == Some(namespace))
    }

    /// Narrows the config map watch to objects that can match this target.
    pub fn watcher_config(&self) -> watcher::Config {
        watcher::Config::default().fields(&self.field_selector())
    }

    fn field_selector(&self) -> String {
        let mut selector = format!("metadata.name={}", self.name);
        if let Some(namespace) = &self.namespace {
            selector.push_str(",metadata.namespace=");
            selector.push_str(namespace);
        }
        selector
    }
}

/// Watch config for workloads, optionally restricted to one namespace.
pub fn workload_watcher_config(namespace: Option<&str>) -> watcher::Config {
    match namespace {
        Some(namespace) => {
            watcher::Config::default().fields(&format!("metadata.namespace={namespace}"))
        }
        None => watcher::Config::default(),
    }
}
