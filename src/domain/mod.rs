//! Shared domain types for the quote engine.

pub mod types;

pub use types::*;
