//! List options: page size, server-side filters, client-side filters
//!
//! Client-side filters run once over the fully aggregated result. Running them
//! per page would see partial data at page boundaries.

use super::registry::ResourceDescriptor;
use crate::models::common::{Container, ScopedObject};
use crate::validation::ValidationError;

/// Query parameters owned by the pagination loop
const RESERVED_PARAMS: &[&str] = &["limit", "offset", "folder", "snippet", "device"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Requested page size; `None` uses the descriptor default
    pub max_limit: Option<i64>,
    /// Forwarded to the server as query parameters
    pub filters: Vec<(String, String)>,
    /// Keep only items whose container is exactly the requested one
    pub exact_match: bool,
    pub exclude_folders: Vec<String>,
    pub exclude_snippets: Vec<String>,
    pub exclude_devices: Vec<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_limit(mut self, limit: i64) -> Self {
        self.max_limit = Some(limit);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn exact_match(mut self) -> Self {
        self.exact_match = true;
        self
    }

    pub fn exclude_folder(mut self, name: impl Into<String>) -> Self {
        self.exclude_folders.push(name.into());
        self
    }

    pub fn exclude_snippet(mut self, name: impl Into<String>) -> Self {
        self.exclude_snippets.push(name.into());
        self
    }

    pub fn exclude_device(mut self, name: impl Into<String>) -> Self {
        self.exclude_devices.push(name.into());
        self
    }

    /// Page size to request: the caller's limit clamped to the ceiling.
    /// Non-positive limits are rejected before anything is sent.
    pub fn page_size(&self, descriptor: &ResourceDescriptor) -> Result<u32, ValidationError> {
        let ceiling = descriptor.absolute_max_limit.max(1);
        match self.max_limit {
            None => Ok(descriptor.default_max_limit.clamp(1, ceiling)),
            Some(requested) if requested <= 0 => Err(ValidationError::InvalidLimit { requested }),
            Some(requested) => {
                if requested > i64::from(ceiling) {
                    tracing::debug!(
                        "max_limit {} exceeds the {} ceiling of {}, clamping",
                        requested,
                        descriptor.display_name,
                        ceiling
                    );
                }
                Ok(u32::try_from(requested).unwrap_or(u32::MAX).min(ceiling))
            }
        }
    }

    /// Server filters minus anything the pagination loop sets itself
    pub fn server_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_PARAMS.contains(&key.as_str());
                if reserved {
                    tracing::warn!("Ignoring reserved list filter '{}'", key);
                }
                !reserved
            })
            .cloned()
            .collect()
    }

    pub fn has_client_filters(&self) -> bool {
        self.exact_match
            || !self.exclude_folders.is_empty()
            || !self.exclude_snippets.is_empty()
            || !self.exclude_devices.is_empty()
    }

    /// Apply the client-side filters to a complete result set
    pub fn apply<T: ScopedObject>(&self, requested: &Container, items: Vec<T>) -> Vec<T> {
        if !self.has_client_filters() {
            return items;
        }
        items
            .into_iter()
            .filter(|item| self.keep(requested, item))
            .collect()
    }

    fn keep<T: ScopedObject>(&self, requested: &Container, item: &T) -> bool {
        let fields = item.container_fields();

        if self.exact_match {
            let actual = match requested {
                Container::Folder(_) => &fields.folder,
                Container::Snippet(_) => &fields.snippet,
                Container::Device(_) => &fields.device,
            };
            if actual.as_deref() != Some(requested.name()) {
                return false;
            }
        }

        let excluded = |value: &Option<String>, names: &[String]| {
            value.as_ref().is_some_and(|v| names.contains(v))
        };

        !(excluded(&fields.folder, &self.exclude_folders)
            || excluded(&fields.snippet, &self.exclude_snippets)
            || excluded(&fields.device, &self.exclude_devices))
    }
}
