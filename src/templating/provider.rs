//! Object-safe rendering seam for request handlers.
//!
//! Handlers that only need to render can hold a `&dyn TemplateProvider` (or
//! `Arc<dyn TemplateProvider>`) instead of a concrete [`TemplateCache`], which
//! keeps them testable against a stub.

use std::io::Write;

use tera::Context;

use super::cache::TemplateCache;
use crate::core::Result;

/// Renders templates by key.
pub trait TemplateProvider: Send + Sync {
    /// Renders `key` by its own entry point.
    fn render(&self, sink: &mut dyn Write, key: &str, data: &Context) -> Result<()>;

    /// Renders `key` through `layout`.
    fn render_with_layout(
        &self,
        sink: &mut dyn Write,
        key: &str,
        layout: &str,
        data: &Context,
    ) -> Result<()>;

    fn has_template(&self, key: &str) -> bool;

    /// Rebuilds from disk. On failure the previous templates keep serving.
    fn invalidate(&self) -> Result<()>;
}

impl TemplateProvider for TemplateCache {
    fn render(&self, sink: &mut dyn Write, key: &str, data: &Context) -> Result<()> {
        self.snapshot().render_context(sink, key, None, data)
    }

    fn render_with_layout(
        &self,
        sink: &mut dyn Write,
        key: &str,
        layout: &str,
        data: &Context,
    ) -> Result<()> {
        self.snapshot().render_context(sink, key, Some(layout), data)
    }

    fn has_template(&self, key: &str) -> bool {
        TemplateCache::has_template(self, key)
    }

    fn invalidate(&self) -> Result<()> {
        TemplateCache::invalidate(self).map(|_| ())
    }
}
