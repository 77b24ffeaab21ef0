//! Zenkofy Types - Shared domain types
//!
//! This crate contains domain types used across Zenkofy services:
//! - Identifiers for users, documents, notes and bookmarks
//! - Reading metadata (status, progress) and reading analytics
//! - Mirrored billing subscriptions

pub mod analytics;
pub mod document;
pub mod error;
pub mod ids;
pub mod note;
pub mod subscription;

pub use analytics::*;
pub use document::*;
pub use error::*;
pub use ids::*;
pub use note::*;
pub use subscription::*;
