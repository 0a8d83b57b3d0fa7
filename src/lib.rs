//! Client core for the Strata Cloud Manager configuration API
//!
//! - [`scm`] - transport, OAuth2 token lifecycle and the authenticated client
//! - [`resource`] - descriptor registry, paginated CRUD and list filters
//! - [`validation`] - exclusive groups, tagged unions and crossover tables
//! - [`models`] - typed schemas for a few representative resources
//! - [`config`] - file and environment configuration

pub mod config;
pub mod error;
pub mod models;
pub mod resource;
pub mod scm;
pub mod validation;

/// Version injected at compile time via SCM_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("SCM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

pub use error::{format_error, ApiFailure, ErrorKind, ScmError};
pub use resource::{KindRules, ListOptions, RegisteredKind, ResourceDescriptor, ResourceKind, ResourceService};
pub use scm::auth::{Credential, RetryPolicy, TokenManager};
pub use scm::client::{ScmClient, ScmClientBuilder};
pub use validation::ValidationError;
