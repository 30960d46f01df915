//! CLI command implementations.
//!
//! - [`context`] - Cluster context report

pub mod context;

pub use context::ContextCommand;
