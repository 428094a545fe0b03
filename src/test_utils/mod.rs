//! Test utilities for tmpl-cache
//!
//! Helpers for writing template trees into temporary directories and for
//! seeing the crate's tracing output while a test runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use tmpl_cache::templating::TemplateCache;
//! use tmpl_cache::test_utils::TemplateTree;
//!
//! let tree = TemplateTree::new().unwrap();
//! tree.write_layout("base", "<{% include \"content\" %}>").unwrap();
//! tree.write_mail("welcome", "hi").unwrap();
//!
//! let cache = TemplateCache::new(tree.config()).unwrap();
//! assert!(cache.has_template("welcome"));
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::CacheConfig;
use crate::constants::{DEFAULT_CONTENT_DIRS, DEFAULT_FRAGMENT_SUFFIX, DEFAULT_LAYOUTS_DIR};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if it is set. With neither,
/// no subscriber is installed.
///
/// ```bash
/// RUST_LOG=tmpl_cache=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A template tree in a temporary directory, laid out by convention.
///
/// Names passed to the `write_*` methods are stems; the default suffix is
/// appended. Nested stems such as `"account/reset"` create subdirectories.
pub struct TemplateTree {
    temp_dir: TempDir,
}

impl TemplateTree {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir for template tree")?;
        Ok(Self {
            temp_dir,
        })
    }

    /// Templates root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Default configuration pointed at this tree.
    pub fn config(&self) -> CacheConfig {
        CacheConfig::default().with_root(self.root())
    }

    pub fn write_layout(&self, stem: &str, source: &str) -> Result<PathBuf> {
        self.write_fragment(DEFAULT_LAYOUTS_DIR, stem, source)
    }

    pub fn write_include(&self, stem: &str, source: &str) -> Result<PathBuf> {
        self.write_fragment(DEFAULT_CONTENT_DIRS[0], stem, source)
    }

    pub fn write_mail(&self, stem: &str, source: &str) -> Result<PathBuf> {
        self.write_fragment(DEFAULT_CONTENT_DIRS[1], stem, source)
    }

    /// Writes `<dir>/<stem><suffix>` under the root.
    pub fn write_fragment(&self, dir: &str, stem: &str, source: &str) -> Result<PathBuf> {
        let path = self.root().join(dir).join(format!("{stem}{DEFAULT_FRAGMENT_SUFFIX}"));
        self.write_file(&path, source)?;
        Ok(path)
    }

    /// Writes an arbitrary file, relative to the root.
    pub fn write_raw(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        self.write_file(&path, content)?;
        Ok(path)
    }

    /// Removes a fragment written earlier.
    pub fn remove_fragment(&self, dir: &str, stem: &str) -> Result<()> {
        let path = self.root().join(dir).join(format!("{stem}{DEFAULT_FRAGMENT_SUFFIX}"));
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))
    }

    /// Replaces a directory with a regular file of the same name, so walking
    /// it fails.
    pub fn break_dir(&self, dir: &str) -> Result<()> {
        let path = self.root().join(dir);
        if path.exists() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        fs::write(&path, "").with_context(|| format!("Failed to write {}", path.display()))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
