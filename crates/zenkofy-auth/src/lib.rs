//! Zenkofy Auth - access token verification
//!
//! Sign-in, sign-up and session refresh are handled by Supabase Auth. This
//! crate only verifies the access tokens it issues and turns them into a
//! caller identity for the API.

pub mod config;
pub mod error;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use token::{AccessClaims, Identity, TokenValidator};
