//! Compiled template cache backed by Tera.
//!
//! Templates live in a directory tree of small fragments. Every content
//! fragment is compiled once, together with every layout and the helper set,
//! into its own [`CompiledUnit`]. Units are looked up by key and executed
//! against caller data, streaming output into any [`std::io::Write`] sink.
//!
//! # Modules
//!
//! - [`helpers`]: built-in helpers (`oddoreven`, `fmtdate`, `ucfirstwords`)
//!   and the [`HelperSet`] callers extend them with
//! - [`engine`]: compiling and executing one unit
//! - [`builder`]: turning a directory tree into a complete map
//! - [`cache`]: publishing that map and serving renders from it
//! - [`provider`]: the [`TemplateProvider`] trait for handlers
//!
//! # Fragment Syntax
//!
//! Fragments are Tera templates. Each one is addressable inside its unit by
//! file name, and the content fragment also by the alias `content`:
//!
//! ```text
//! layouts/base.tmpl:     <html><body>{% include "content" %}</body></html>
//! mail/welcome.tmpl:     Hello {{ name }}, it is {{ now | fmtdate(fmt="std") }}.
//! ```
//!
//! Rendering `welcome` alone gives the greeting; rendering it with layout
//! `base` wraps it in the page. A content fragment may instead
//! `{% extends "base.tmpl" %}` and fill the layout's blocks.

pub mod builder;
pub mod cache;
pub mod engine;
pub mod helpers;
pub mod provider;

pub use builder::{BuildReport, CacheMap, KeyCollision, SkippedFragment, build};
pub use cache::{CacheSnapshot, TemplateCache};
pub use engine::{CompiledUnit, UnitOptions, format_tera_error};
pub use helpers::{HelperSet, first_letters, format_date, odd_or_even};
pub use provider::TemplateProvider;
