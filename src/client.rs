//! Client registrations: who the manager acquires tokens for and how it authenticates.

pub mod credential;
pub mod registration;
pub mod registry;

pub use credential::*;
pub use registration::*;
pub use registry::*;
