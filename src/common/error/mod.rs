//! Unified error types for the crate.
//!
//! Every fallible operation in the engine reports one of these variants
//! synchronously to its caller. Nothing is retried internally.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result};
