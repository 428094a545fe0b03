//! Compiled units backed by Tera.
//!
//! A [`CompiledUnit`] is one `Tera` instance holding a single content
//! fragment, every layout fragment and the merged [`HelperSet`]. Each source
//! is registered under its file name, which makes it an entry point:
//! executing `welcome.tmpl` runs the content fragment, executing `base.tmpl`
//! runs that layout. The content fragment may also be registered under an
//! alias (`content` by default) so a layout can pull it in with
//! `{% include "content" %}` without knowing which key it is rendering for.
//! A content fragment can equally drive a layout itself with
//! `{% extends "base.tmpl" %}`.
//!
//! Units are immutable once compiled.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tera::{Context, Tera};
use tracing::{debug, warn};

use super::helpers::HelperSet;
use crate::core::{CacheError, Result};
use crate::pattern::ContentFragment;

static LINE_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-->\s*(\d+):(\d+)").ok());

/// Options shared by every unit of one build.
#[derive(Debug, Clone)]
pub struct UnitOptions {
    /// Fragment suffix, used to resolve bare layout names
    pub suffix: String,
    /// HTML-escape output of every fragment in the unit
    pub autoescape: bool,
    /// Extra entry-point name for the content fragment
    pub content_alias: Option<String>,
}

/// One content fragment compiled together with every layout.
pub struct CompiledUnit {
    key: String,
    entry_point: String,
    source: PathBuf,
    content_dir: String,
    suffix: String,
    entry_points: BTreeSet<String>,
    tera: Tera,
}

impl CompiledUnit {
    /// Compiles `fragment` with `layouts` and `helpers` into a unit.
    ///
    /// A layout whose file name equals the content fragment's is left out of
    /// this unit, so the key's own entry point is always its content.
    ///
    /// # Errors
    ///
    /// [`CacheError::Compile`] if any of the sources fails to parse, or an
    /// `extends` names a template that is not in the unit.
    pub fn compile(
        fragment: &ContentFragment,
        layouts: &[PathBuf],
        helpers: &HelperSet,
        options: &UnitOptions,
    ) -> Result<Self> {
        let mut tera = Tera::default();
        // An empty suffix matches every template name.
        tera.autoescape_on(if options.autoescape { vec![""] } else { vec![] });
        helpers.register(&mut tera);

        let mut files: Vec<(PathBuf, Option<String>)> =
            vec![(fragment.path.clone(), Some(fragment.file_name.clone()))];
        if let Some(alias) = &options.content_alias {
            files.push((fragment.path.clone(), Some(alias.clone())));
        }
        for layout in layouts {
            let name = file_name_of(layout);
            if name == fragment.file_name {
                warn!(
                    "Layout {} shadows content fragment '{}' and is left out of its unit",
                    layout.display(),
                    fragment.key
                );
                continue;
            }
            files.push((layout.clone(), Some(name)));
        }

        let entry_points = files.iter().filter_map(|(_, name)| name.clone()).collect();

        tera.add_template_files(files).map_err(|e| {
            let message = format_tera_error(&e);
            CacheError::Compile {
                key: fragment.key.clone(),
                path: fragment.path.clone(),
                line: extract_line(&message),
                message,
            }
        })?;

        debug!("Compiled unit '{}' from {}", fragment.key, fragment.path.display());

        Ok(Self {
            key: fragment.key.clone(),
            entry_point: fragment.file_name.clone(),
            source: fragment.path.clone(),
            content_dir: fragment.content_dir.clone(),
            suffix: options.suffix.clone(),
            entry_points,
            tera,
        })
    }

    /// Key this unit is published under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The content fragment's own entry point (its file name).
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Content fragment the unit was compiled from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Content directory the fragment was found in.
    pub fn content_dir(&self) -> &str {
        &self.content_dir
    }

    /// Every entry point in the unit, sorted.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.entry_points.iter().map(String::as_str)
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_points.contains(name)
    }

    /// Resolves a caller-supplied entry-point name.
    ///
    /// An exact match wins; otherwise `base` resolves to `base<suffix>`.
    /// Unknown names are passed through so the engine reports them.
    pub fn resolve_entry_point(&self, name: &str) -> String {
        if self.has_entry_point(name) {
            return name.to_string();
        }
        let with_suffix = format!("{name}{}", self.suffix);
        if self.has_entry_point(&with_suffix) { with_suffix } else { name.to_string() }
    }

    /// Executes an entry point, streaming output into `sink`.
    ///
    /// Bytes written before a failure stay written.
    pub fn execute(&self, entry_point: &str, context: &Context, sink: &mut dyn Write) -> Result<()> {
        self.tera.render_to(entry_point, context, sink).map_err(|e| CacheError::Execution {
            key: self.key.clone(),
            entry_point: entry_point.to_string(),
            message: format_tera_error(&e),
        })
    }
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("key", &self.key)
            .field("source", &self.source)
            .field("entry_points", &self.entry_points)
            .finish_non_exhaustive()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Formats a Tera error with its whole cause chain.
///
/// Tera wraps the interesting part ("Variable `x` not found", a parse
/// position) in outer "Failed to render" messages; every level is kept,
/// joined with ` → `.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }

    let messages: Vec<String> = messages
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();

    if messages.is_empty() {
        "Template error (no details reported by the engine)".to_string()
    } else {
        messages.join(" → ")
    }
}

/// Extracts the line from a Tera parse position marker (` --> 3:7`).
fn extract_line(message: &str) -> Option<usize> {
    let caps = LINE_MARKER.as_ref()?.captures(message)?;
    caps.get(1)?.as_str().parse().ok()
}
