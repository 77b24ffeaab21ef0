//! REST API handlers

pub mod analytics;
pub mod billing;
pub mod bookmarks;
pub mod documents;
pub mod health;
pub mod notes;
pub mod shared;
pub mod upload;
pub mod webhook;

pub use analytics::*;
pub use billing::*;
pub use bookmarks::*;
pub use documents::*;
pub use health::*;
pub use notes::*;
pub use upload::*;
pub use webhook::*;
