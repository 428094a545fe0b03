//! Configuration for the template cache
//!
//! The cache reads a directory tree laid out by convention:
//!
//! ```text
//! templates/
//!   layouts/*.tmpl          shared layout fragments, bundled into every unit
//!   includes/**/*.tmpl      content fragments (recursive)
//!   mail/**/*.tmpl          more content fragments, same key space
//! ```
//!
//! [`CacheConfig`] names each part of that convention so it can be moved or
//! renamed, and carries the policies the builder applies. Every field has a
//! default, so an empty TOML file is a valid configuration.
//!
//! # Configuration File
//!
//! ```toml
//! root = "site/templates"
//! layouts_dir = "layouts"
//! content_dirs = ["includes", "mail"]
//! suffix = ".tmpl"
//! key_namespace = "flat"       # or "directory"
//! compile_policy = "strict"    # or "permissive"
//! autoescape = true
//! content_alias = "content"
//! ```
//!
//! # Environment
//!
//! [`CacheConfig::from_env`] loads the file named by `TMPL_CACHE_CONFIG` when
//! set, then lets `TMPL_CACHE_ROOT` override the root.

mod parser;

pub use parser::parse_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::constants::{
    DEFAULT_CONTENT_ALIAS, DEFAULT_CONTENT_DIRS, DEFAULT_FRAGMENT_SUFFIX, DEFAULT_LAYOUTS_DIR,
    DEFAULT_TEMPLATES_DIR, ENV_CONFIG_PATH, ENV_TEMPLATES_ROOT,
};
use crate::core::CacheError;

/// How keys are derived from content fragment paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyNamespace {
    /// Key is the file name with the suffix stripped. Fragments with the
    /// same name in different directories collide; the last one processed
    /// wins and the collision is reported.
    #[default]
    Flat,
    /// Key is `<content_dir>/<relative path>` with the suffix stripped,
    /// using forward slashes, e.g. `mail/account/welcome`.
    Directory,
}

/// What a build does when one fragment fails to compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilePolicy {
    /// Abort the whole build with the compile error.
    #[default]
    Strict,
    /// Skip the failing key, log it, and list it in the build report.
    Permissive,
}

/// Template cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Templates root directory.
    pub root: PathBuf,
    /// Subdirectory of `root` holding layouts (matched non-recursively).
    pub layouts_dir: String,
    /// Subdirectories of `root` walked for content, in processing order.
    pub content_dirs: Vec<String>,
    /// Fragment file suffix, including the leading dot.
    pub suffix: String,
    /// Key derivation scheme.
    pub key_namespace: KeyNamespace,
    /// Compile failure policy.
    pub compile_policy: CompilePolicy,
    /// HTML-escape output of every fragment in a unit.
    pub autoescape: bool,
    /// Additional entry-point name for the content fragment in its unit.
    pub content_alias: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            layouts_dir: DEFAULT_LAYOUTS_DIR.to_string(),
            content_dirs: DEFAULT_CONTENT_DIRS.iter().map(|d| (*d).to_string()).collect(),
            suffix: DEFAULT_FRAGMENT_SUFFIX.to_string(),
            key_namespace: KeyNamespace::default(),
            compile_policy: CompilePolicy::default(),
            autoescape: true,
            content_alias: Some(DEFAULT_CONTENT_ALIAS.to_string()),
        }
    }
}

impl CacheConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = parse_config(path)?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Build a configuration from the process environment.
    ///
    /// Without `TMPL_CACHE_CONFIG` this starts from [`CacheConfig::default`].
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(ENV_CONFIG_PATH) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(root) = std::env::var_os(ENV_TEMPLATES_ROOT) {
            tracing::debug!("Templates root overridden by {}: {:?}", ENV_TEMPLATES_ROOT, root);
            config.root = PathBuf::from(root);
        }

        Ok(config)
    }

    /// Set the templates root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the key derivation scheme.
    pub fn with_key_namespace(mut self, namespace: KeyNamespace) -> Self {
        self.key_namespace = namespace;
        self
    }

    /// Set the compile failure policy.
    pub fn with_compile_policy(mut self, policy: CompilePolicy) -> Self {
        self.compile_policy = policy;
        self
    }

    /// Enable or disable HTML autoescaping.
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    /// Check that the configuration can drive a build.
    pub fn validate(&self) -> std::result::Result<(), CacheError> {
        let invalid = |reason: String| Err(CacheError::InvalidConfig { reason });

        if !self.suffix.starts_with('.') || self.suffix.len() < 2 {
            return invalid(format!("suffix '{}' must be a dot followed by an extension", self.suffix));
        }
        if self.suffix.contains(['/', '\\']) {
            return invalid(format!("suffix '{}' must not contain path separators", self.suffix));
        }
        if self.content_dirs.is_empty() {
            return invalid("at least one content directory is required".to_string());
        }

        check_dir_name("layouts_dir", &self.layouts_dir)?;
        for dir in &self.content_dirs {
            check_dir_name("content_dirs", dir)?;
        }

        if let Some(alias) = &self.content_alias
            && alias.trim().is_empty()
        {
            return invalid("content_alias must not be empty".to_string());
        }

        Ok(())
    }

    /// Directory holding the layout fragments.
    pub fn layouts_root(&self) -> PathBuf {
        self.root.join(&self.layouts_dir)
    }

    /// Glob pattern matching every layout fragment.
    ///
    /// The directory part is escaped, so glob metacharacters in the root
    /// path are matched literally.
    pub fn layouts_pattern(&self) -> String {
        let dir = self.layouts_root();
        format!(
            "{}/*{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(&self.suffix)
        )
    }

    /// Content directories as `(name, absolute-or-relative path)` pairs.
    pub fn content_roots(&self) -> Vec<(String, PathBuf)> {
        self.content_dirs.iter().map(|dir| (dir.clone(), self.root.join(dir))).collect()
    }
}

fn check_dir_name(field: &str, name: &str) -> std::result::Result<(), CacheError> {
    let path = Path::new(name);
    let single_normal = {
        let mut components = path.components();
        matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
    };

    if name.is_empty() || !single_normal || name.contains(['/', '\\']) {
        return Err(CacheError::InvalidConfig {
            reason: format!("{field} entry '{name}' must be a single directory name"),
        });
    }
    Ok(())
}
