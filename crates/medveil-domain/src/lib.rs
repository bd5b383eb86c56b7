//! MedVeil Domain Layer
//!
//! Value objects shared by every MedVeil crate. Nothing in here performs I/O;
//! the adapters for encryption, inference, literature search and audit storage
//! live in their own crates and exchange these types.
//!
//! ## Key Concepts
//!
//! - **Query**: free-text question, optionally prefixed by document text
//! - **KeywordSet**: ordered search terms, capped at four
//! - **Article**: literature record deduplicated by identifier, capped at five
//! - **AuditEntry**: append-only, PHI-free event record
//! - **ChatMessage**: one turn of an inference request

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod article;
pub mod audit;
pub mod keyword;
pub mod message;
pub mod query;

// Re-exports for convenience
pub use article::{Article, ArticleSet};
pub use audit::{AuditEntry, EventType};
pub use keyword::KeywordSet;
pub use message::{ChatMessage, Role};
pub use query::Query;
