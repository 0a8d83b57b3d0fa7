//! Resource Registry - Load resource descriptors from JSON
//!
//! This module loads the endpoint descriptors for every known resource type from
//! embedded JSON files and provides lookup functions for the rest of the crate.
//! Descriptors are read-only once loaded.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/objects.json"),
    include_str!("../resources/security.json"),
    include_str!("../resources/network.json"),
];

fn default_max_limit() -> u32 {
    2500
}

fn absolute_max_limit() -> u32 {
    5000
}

fn default_collection_key() -> String {
    "data".to_string()
}

/// Endpoint path and paging limits for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDescriptor {
    pub display_name: String,
    /// Collection path; singletons live at `{path}/{id}`
    pub path: String,
    /// Page size used when the caller does not ask for one
    #[serde(default = "default_max_limit")]
    pub default_max_limit: u32,
    /// Server-enforced ceiling on page size
    #[serde(default = "absolute_max_limit")]
    pub absolute_max_limit: u32,
    /// Key of the item array in list responses
    #[serde(default = "default_collection_key")]
    pub collection_key: String,
}

impl ResourceDescriptor {
    pub fn new(display_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            path: path.into(),
            default_max_limit: default_max_limit(),
            absolute_max_limit: absolute_max_limit(),
            collection_key: default_collection_key(),
        }
    }

    pub fn with_limits(mut self, default_max_limit: u32, absolute_max_limit: u32) -> Self {
        self.default_max_limit = default_max_limit;
        self.absolute_max_limit = absolute_max_limit;
        self
    }

    /// Path of a single object
    pub fn item_path(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.path.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDescriptor>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource descriptor by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDescriptor> {
    get_registry().resources.get(key)
}

/// Get all resource keys, sorted (for help output)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_addresses_resource_exists() {
        let resource = get_resource("addresses");
        assert!(resource.is_some(), "Addresses resource should exist");

        let resource = resource.unwrap();
        assert_eq!(resource.display_name, "Addresses");
        assert_eq!(resource.path, "/config/objects/v1/addresses");
        assert_eq!(resource.absolute_max_limit, 5000);
        assert_eq!(resource.collection_key, "data");
    }

    #[test]
    fn test_limits_are_consistent() {
        for key in get_all_resource_keys() {
            let resource = get_resource(key).unwrap();
            assert!(
                resource.default_max_limit <= resource.absolute_max_limit,
                "{} default limit exceeds its ceiling",
                key
            );
        }
    }

    #[test]
    fn test_typed_kinds_are_registered() {
        use crate::models::{AntiSpywareProfiles, Addresses, RedistributionProfiles};
        use crate::resource::RegisteredKind;

        for key in [
            Addresses::KEY,
            AntiSpywareProfiles::KEY,
            RedistributionProfiles::KEY,
        ] {
            assert!(get_resource(key).is_some(), "{} should be registered", key);
        }
    }

    #[test]
    fn test_item_path_encodes_id() {
        let descriptor = ResourceDescriptor::new("Tags", "/config/objects/v1/tags/");
        assert_eq!(descriptor.item_path("a b"), "/config/objects/v1/tags/a%20b");
    }
}
