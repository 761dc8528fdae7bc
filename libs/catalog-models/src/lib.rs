//! Clinical catalog data models
//!
//! Strongly-typed records persisted by the catalog: clinical analyses and
//! their nested pieces (interpretations, ontology terms, statuses). The
//! models are storage-agnostic; the `helix-catalog` crate maps them to and
//! from their stored document form.
//!
//! # Design Philosophy
//!
//! - **Tolerant decoding**: every struct derives `Default` and decodes with
//!   `#[serde(default)]`, so records written by older releases keep loading.
//! - **camelCase on the wire**: field names match the stored documents and
//!   the public REST payloads one-to-one.
//! - **Flexible**: free-form `attributes` maps capture deployment-specific
//!   extensions without schema changes.

pub mod clinical;
pub mod common;
pub mod interpretation;
pub mod status;
pub mod time;

// Re-export commonly used types
pub use clinical::*;
pub use common::*;
pub use interpretation::*;
pub use status::*;
