//! Core types shared by every part of the template cache.
//!
//! Currently this is the error taxonomy: [`CacheError`] and the crate-wide
//! [`Result`] alias. See the [`error`] module for how each variant maps onto
//! the build, lookup and render phases.

pub mod error;

pub use error::{CacheError, Result};
