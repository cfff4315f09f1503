//! Command-line interface.
//!
//! Argument definitions live here; dispatch happens in `main.rs`.

pub mod args;

pub use args::{Cli, Commands};
