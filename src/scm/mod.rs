//! Configuration API access
//!
//! # Module Structure
//!
//! - [`auth`] - credential handling and the cached, single-flight bearer token
//! - [`client`] - main client for making authenticated API requests
//! - [`http`] - transport boundary and the reqwest-backed implementation
//!
//! # Example
//!
//! ```ignore
//! use scm_client::scm::{auth::Credential, client::ScmClient};
//!
//! async fn example() -> Result<(), scm_client::ScmError> {
//!     let client = ScmClient::new(Credential::client_credentials("id", "secret", "1234567890"))?;
//!     let page = client.get("/config/objects/v1/addresses", &[("folder".into(), "Texas".into())]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
