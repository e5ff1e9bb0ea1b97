//! Statistics backend integration module
//!
//! Typed REST client and wire types for the dashboard's backend API.

pub mod rest;
pub mod types;

// Re-export commonly used types
pub use rest::RemoteClient;
pub use types::*;
