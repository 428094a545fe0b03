//! tmpl-cache - a compiled template cache for web front ends
//!
//! Loads a directory tree of template fragments, compiles each content
//! fragment together with every shared layout and a set of helper functions,
//! and serves renders by key from an in-memory map that can be rebuilt from
//! disk at runtime without interrupting readers.
//!
//! # Architecture Overview
//!
//! ```text
//! templates/
//!   layouts/*.tmpl       ┐
//!   includes/**/*.tmpl   ├─ discovery ─> build ─> CacheMap ─> publish (Arc swap)
//!   mail/**/*.tmpl       ┘                                      │
//!                                                   render(key) ┘
//! ```
//!
//! - A build is complete before it is visible: readers see either the old
//!   map or the new one, never a mix.
//! - A failed rebuild is logged and returned; the previous map keeps serving.
//! - Render failures are typed [`core::CacheError`] values, including an
//!   unknown key.
//!
//! # Core Modules
//!
//! - [`config`] - Directory layout, key namespace and compile policy
//! - [`core`] - Error types
//! - [`pattern`] - Layout and content fragment discovery
//! - [`templating`] - Helpers, compiled units, the builder and the cache
//! - [`constants`] - Defaults shared across modules
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tmpl_cache::config::CacheConfig;
//! use tmpl_cache::templating::TemplateCache;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cache = TemplateCache::new(CacheConfig::from_env()?)?;
//!
//! let mut out = std::io::stdout();
//! cache.render_with_layout(&mut out, "welcome", "base", &json!({ "name": "Ada" }))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod core;
pub mod pattern;
pub mod templating;

// test_utils is available for unit tests and for integration tests via the
// test-utils feature
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
