//! Command-line front end
//!
//! Thin handlers over the library; every state change is saved after a
//! successful call.

pub mod commands;

pub use commands::*;
