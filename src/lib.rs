//! `quotecast` library crate.
//!
//! The binary (`qc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., a future web/form front-end)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod location;
pub mod math;
pub mod model;
pub mod report;
pub mod service;
pub mod train;
