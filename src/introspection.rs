//! RFC 7662 token introspection: claim normalization, the typed result and an HTTP client.

pub mod claim;
pub mod client;
pub mod result;

pub use claim::*;
pub use client::*;
pub use result::*;
