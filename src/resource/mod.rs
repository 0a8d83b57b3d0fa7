//! Resource abstraction layer
//!
//! Endpoint descriptors are loaded from JSON files at compile time, so a new
//! resource type needs a descriptor entry plus (optionally) a typed schema.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource descriptors from embedded JSON
//! - [`filter`] - Page sizing plus server-side and client-side list filters
//! - [`service`] - CRUD and paginated listing for one resource type
//!
//! # Example
//!
//! ```ignore
//! use scm_client::models::{Address, Addresses, Container};
//! use scm_client::{ScmClient, ScmError};
//! use scm_client::resource::ListOptions;
//!
//! async fn list_texas(client: &ScmClient) -> Result<Vec<Address>, ScmError> {
//!     let addresses = client.resource::<Addresses>()?;
//!     addresses
//!         .list(&Container::Folder("Texas".into()), &ListOptions::new().exact_match())
//!         .await
//! }
//! ```

pub mod filter;
pub mod registry;
pub mod service;

use crate::models::common::ScopedObject;
use crate::validation::SchemaRules;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use filter::ListOptions;
pub use registry::*;
pub use service::ResourceService;

/// Typed schemas and their validation rules
pub trait ResourceKind {
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;
    type Response: DeserializeOwned + ScopedObject + Send;

    const CREATE_RULES: SchemaRules;
    const UPDATE_RULES: SchemaRules;
    const RESPONSE_RULES: SchemaRules;
}

/// A kind with its own registry entry
pub trait RegisteredKind: ResourceKind {
    /// Registry key of the descriptor
    const KEY: &'static str;
}

/// The three rule sets a service applies, detached from the kind's types
#[derive(Debug, Clone, Copy)]
pub struct KindRules {
    pub create: SchemaRules,
    pub update: SchemaRules,
    pub response: SchemaRules,
}

impl KindRules {
    pub fn of<R: ResourceKind>() -> Self {
        Self {
            create: R::CREATE_RULES,
            update: R::UPDATE_RULES,
            response: R::RESPONSE_RULES,
        }
    }
}
