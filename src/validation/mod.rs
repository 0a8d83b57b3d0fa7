//! Payload validation engine
//!
//! Pure, in-memory checks run before a payload is handed to the transport and
//! after a response comes back. Nothing in here performs I/O.
//!
//! # Module Structure
//!
//! - [`exclusive`] - "exactly one of" / "at most one of" field groups
//! - [`tagged`] - single-key-map discriminated fields and two-level crossover tables
//! - [`rules`] - per-schema rule sets and the extra-field policy
//! - [`error`] - structured failures

pub mod error;
pub mod exclusive;
mod path;
pub mod rules;
pub mod tagged;

pub use error::ValidationError;
pub use exclusive::ExclusiveGroup;
pub use rules::{ExtraFieldsPolicy, SchemaRules};
pub use tagged::{select_tag, CrossoverTable, TaggedUnion};
