//! Fields shared by every resource schema

use crate::validation::ExclusiveGroup;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const CONTAINER_FIELDS: &[&str] = &["folder", "snippet", "device"];

/// Exactly one container on anything we send
pub const CONTAINER_GROUP: ExclusiveGroup = ExclusiveGroup::exactly_one("container", CONTAINER_FIELDS);

/// Responses may legitimately omit the container (predefined objects)
pub const RESPONSE_CONTAINER_GROUP: ExclusiveGroup =
    ExclusiveGroup::at_most_one("container", CONTAINER_FIELDS);

/// The single location an object is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    Folder(String),
    Snippet(String),
    Device(String),
}

impl Container {
    /// Wire field / query parameter name
    pub fn field(&self) -> &'static str {
        match self {
            Container::Folder(_) => "folder",
            Container::Snippet(_) => "snippet",
            Container::Device(_) => "device",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Container::Folder(name) | Container::Snippet(name) | Container::Device(name) => name,
        }
    }

    pub fn query_pair(&self) -> (String, String) {
        (self.field().to_string(), self.name().to_string())
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field(), self.name())
    }
}

/// Container fields, flattened into every schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl ContainerFields {
    pub fn folder(name: impl Into<String>) -> Self {
        Container::Folder(name.into()).into()
    }

    pub fn snippet(name: impl Into<String>) -> Self {
        Container::Snippet(name.into()).into()
    }

    pub fn device(name: impl Into<String>) -> Self {
        Container::Device(name.into()).into()
    }

    /// The container, if exactly one field is set
    pub fn container(&self) -> Option<Container> {
        match (&self.folder, &self.snippet, &self.device) {
            (Some(name), None, None) => Some(Container::Folder(name.clone())),
            (None, Some(name), None) => Some(Container::Snippet(name.clone())),
            (None, None, Some(name)) => Some(Container::Device(name.clone())),
            _ => None,
        }
    }
}

impl From<Container> for ContainerFields {
    fn from(container: Container) -> Self {
        match container {
            Container::Folder(name) => Self {
                folder: Some(name),
                ..Default::default()
            },
            Container::Snippet(name) => Self {
                snippet: Some(name),
                ..Default::default()
            },
            Container::Device(name) => Self {
                device: Some(name),
                ..Default::default()
            },
        }
    }
}

/// What client-side list filters need to know about an item
pub trait ScopedObject {
    fn container_fields(&self) -> ContainerFields;
    fn name(&self) -> Option<&str>;

    fn container(&self) -> Option<Container> {
        self.container_fields().container()
    }
}

impl ScopedObject for Value {
    fn container_fields(&self) -> ContainerFields {
        let get = |field: &str| self.get(field).and_then(Value::as_str).map(str::to_string);
        ContainerFields {
            folder: get("folder"),
            snippet: get("snippet"),
            device: get("device"),
        }
    }

    fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }
}
