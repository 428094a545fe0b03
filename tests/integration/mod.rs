//! Integration test suite for tmpl-cache
//!
//! End-to-end tests that build caches from template trees on disk and render
//! through the public API.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **config**: TOML loading and environment overrides
//! - **discovery**: Which files become keys, and under what key
//! - **helpers**: Built-in and caller-supplied helpers in real fragments
//! - **invalidation**: Rebuilds, snapshots and failure resilience
//! - **rendering**: Standalone, layout and multi-key rendering

mod config;
mod helpers;
mod rendering;
