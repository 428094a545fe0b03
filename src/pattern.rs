//! Fragment discovery for the template cache.
//!
//! Two kinds of fragment are discovered on every build:
//!
//! - **Layouts**: a non-recursive glob over `<root>/<layouts_dir>/*<suffix>`.
//!   Every layout is bundled into every compiled unit.
//! - **Content**: a recursive walk of each `<root>/<content_dir>`, in
//!   configured order. Every regular file whose name ends with the suffix
//!   becomes one [`ContentFragment`], keyed per [`KeyNamespace`].
//!
//! Both lists come back in a deterministic order (sorted by path for
//! layouts, by directory order then file name for content), so which
//! fragment wins a flat-key collision does not depend on the filesystem.
//!
//! A missing templates root is a [`CacheError::Discovery`]. A missing layouts
//! or content directory below it contributes nothing, and missing content
//! directories are listed in the [`ContentScan`] so a rebuild can tell a
//! vanished directory from an empty one. A path that exists but cannot be
//! read is a [`CacheError::Discovery`].
//!
//! # Security
//!
//! The walk does not follow symlinks, so a link inside a content directory
//! cannot pull in fragments from elsewhere on disk.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::config::{CacheConfig, KeyNamespace};
use crate::core::{CacheError, Result};

/// A content fragment found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFragment {
    /// Lookup key for the compiled unit
    pub key: String,
    /// File name, which is also the fragment's own entry point
    pub file_name: String,
    /// Path to the fragment
    pub path: PathBuf,
    /// Content directory the fragment was found in
    pub content_dir: String,
    /// Path relative to its content directory
    pub relative_path: PathBuf,
}

/// Content fragments found by one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentScan {
    /// Fragments in processing order
    pub fragments: Vec<ContentFragment>,
    /// Configured content directories that do not exist
    pub missing_dirs: Vec<String>,
}

/// Finds every layout fragment.
///
/// # Errors
///
/// - [`CacheError::InvalidPattern`] if the glob built from the configuration
///   does not compile
/// - [`CacheError::Discovery`] if a matched path cannot be read
pub fn discover_layouts(config: &CacheConfig) -> Result<Vec<PathBuf>> {
    let pattern = config.layouts_pattern();
    debug!("Resolving layouts with pattern '{}'", pattern);

    let entries = glob::glob(&pattern).map_err(|e| CacheError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;

    let mut layouts = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CacheError::Discovery {
            path: e.path().to_path_buf(),
            source: io::Error::from(e),
        })?;

        if path.is_file() {
            trace!("Found layout: {}", path.display());
            layouts.push(path);
        }
    }

    layouts.sort();
    debug!("Found {} layout(s)", layouts.len());
    Ok(layouts)
}

/// Walks every content directory and returns its fragments.
///
/// The token, when given, is checked before each directory entry.
///
/// # Errors
///
/// - [`CacheError::Discovery`] if the templates root is missing or not a
///   directory, a content directory exists but is not a directory, or any
///   entry beneath it cannot be read
/// - [`CacheError::Cancelled`] if the token fires during the walk
pub fn discover_content(
    config: &CacheConfig,
    cancel: Option<&CancellationToken>,
) -> Result<ContentScan> {
    require_dir(&config.root, "templates root")?;

    let mut scan = ContentScan::default();
    let fragments = &mut scan.fragments;

    for (content_dir, root) in config.content_roots() {
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CacheError::Discovery {
                    path: root,
                    source: io::Error::new(
                        io::ErrorKind::NotADirectory,
                        "content directory is not a directory",
                    ),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Content directory {} does not exist, skipping", root.display());
                scan.missing_dirs.push(content_dir);
                continue;
            }
            Err(source) => {
                return Err(CacheError::Discovery {
                    path: root,
                    source,
                });
            }
        }

        debug!("Walking content directory {}", root.display());
        let before = fragments.len();

        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(CacheError::Cancelled);
            }

            let entry = entry.map_err(|e| CacheError::Discovery {
                path: e.path().map_or_else(|| root.clone(), Path::to_path_buf),
                source: io::Error::from(e),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = file_name.strip_suffix(config.suffix.as_str()) else {
                trace!("Skipping non-fragment {}", entry.path().display());
                continue;
            };
            if stem.is_empty() {
                warn!("Skipping fragment with empty name: {}", entry.path().display());
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&root)
                .map_or_else(|_| PathBuf::from(&file_name), Path::to_path_buf);
            let key =
                derive_key(config.key_namespace, &content_dir, &relative_path, &config.suffix);

            trace!("Found content fragment {} -> '{}'", entry.path().display(), key);
            fragments.push(ContentFragment {
                key,
                file_name,
                path: entry.into_path(),
                content_dir: content_dir.clone(),
                relative_path,
            });
        }

        debug!("Found {} fragment(s) in {}", fragments.len() - before, content_dir);
    }

    Ok(scan)
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CacheError::Discovery {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotADirectory, format!("{what} is not a directory")),
        }),
        Err(source) => Err(CacheError::Discovery {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Derives the lookup key for a content fragment.
///
/// # Examples
///
/// ```rust,no_run
/// use tmpl_cache::config::KeyNamespace;
/// use tmpl_cache::pattern::derive_key;
/// use std::path::Path;
///
/// let rel = Path::new("account/welcome.tmpl");
/// assert_eq!(derive_key(KeyNamespace::Flat, "mail", rel, ".tmpl"), "welcome");
/// assert_eq!(derive_key(KeyNamespace::Directory, "mail", rel, ".tmpl"), "mail/account/welcome");
/// ```
pub fn derive_key(
    namespace: KeyNamespace,
    content_dir: &str,
    relative_path: &Path,
    suffix: &str,
) -> String {
    match namespace {
        KeyNamespace::Flat => {
            let name = relative_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            name.strip_suffix(suffix).unwrap_or(name.as_ref()).to_string()
        }
        KeyNamespace::Directory => {
            let mut parts = vec![content_dir.to_string()];
            parts.extend(relative_path.components().filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            }));
            let joined = parts.join("/");
            joined.strip_suffix(suffix).map(str::to_string).unwrap_or(joined)
        }
    }
}
