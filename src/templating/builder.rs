//! Building the cache map.
//!
//! A build is one synchronous pass:
//!
//! 1. Resolve every layout. Failure aborts the build.
//! 2. Walk the content directories in configured order.
//! 3. Compile each content fragment with every layout and the helper set,
//!    storing the unit under the fragment's key.
//!
//! The resulting map is complete before anyone can see it; publishing it is
//! the cache's job. A compile failure aborts the build under
//! [`CompilePolicy::Strict`] and skips the key under
//! [`CompilePolicy::Permissive`]. Skipped keys and flat-key collisions are
//! logged and listed in the [`BuildReport`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engine::{CompiledUnit, UnitOptions};
use super::helpers::HelperSet;
use crate::config::{CacheConfig, CompilePolicy};
use crate::core::{CacheError, Result};
use crate::pattern::{discover_content, discover_layouts};

/// Compiled units by key. Units are shared, never mutated.
pub type CacheMap = HashMap<String, Arc<CompiledUnit>>;

/// Two content fragments that derived the same flat key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    /// Fragment whose unit was discarded
    pub replaced: PathBuf,
    /// Fragment whose unit is published
    pub winner: PathBuf,
}

/// A fragment left out of the map under the permissive policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFragment {
    pub key: String,
    pub path: PathBuf,
    /// Display form of the compile error
    pub reason: String,
}

/// Summary of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Units in the map
    pub units: usize,
    /// Layouts bundled into every unit
    pub layouts: Vec<PathBuf>,
    pub collisions: Vec<KeyCollision>,
    pub skipped: Vec<SkippedFragment>,
    /// Configured content directories that were not on disk
    pub missing_dirs: Vec<String>,
    pub elapsed: Duration,
}

impl BuildReport {
    /// `true` when nothing was skipped or replaced.
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty() && self.skipped.is_empty()
    }
}

/// Discovers and compiles every fragment into a fresh map.
///
/// Nothing outside the returned value is touched, so a failed build leaves
/// no trace.
///
/// # Errors
///
/// - [`CacheError::InvalidPattern`] / [`CacheError::Discovery`] from discovery
/// - [`CacheError::Compile`] under the strict policy
/// - [`CacheError::Cancelled`] if `cancel` fires
pub fn build(
    config: &CacheConfig,
    helpers: &HelperSet,
    cancel: Option<&CancellationToken>,
) -> Result<(CacheMap, BuildReport)> {
    let started = Instant::now();
    debug!("Building template cache from {}", config.root.display());

    let layouts = discover_layouts(config)?;
    let scan = discover_content(config, cancel)?;
    let fragments = scan.fragments;

    let options = UnitOptions {
        suffix: config.suffix.clone(),
        autoescape: config.autoescape,
        content_alias: config.content_alias.clone(),
    };

    let mut map = CacheMap::with_capacity(fragments.len());
    let mut report = BuildReport::default();

    for fragment in &fragments {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(CacheError::Cancelled);
        }

        let unit = match CompiledUnit::compile(fragment, &layouts, helpers, &options) {
            Ok(unit) => unit,
            Err(e) if config.compile_policy == CompilePolicy::Permissive => {
                warn!("Skipping template '{}': {}", fragment.key, e);
                report.skipped.push(SkippedFragment {
                    key: fragment.key.clone(),
                    path: fragment.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(previous) = map.insert(fragment.key.clone(), Arc::new(unit)) {
            warn!(
                "Template key '{}' from {} replaces {}",
                fragment.key,
                fragment.path.display(),
                previous.source().display()
            );
            report.collisions.push(KeyCollision {
                key: fragment.key.clone(),
                replaced: previous.source().to_path_buf(),
                winner: fragment.path.clone(),
            });
        }
    }

    report.units = map.len();
    report.layouts = layouts;
    report.missing_dirs = scan.missing_dirs;
    report.elapsed = started.elapsed();

    info!(
        "Built {} template unit(s) with {} layout(s) in {:?}",
        report.units,
        report.layouts.len(),
        report.elapsed
    );

    Ok((map, report))
}
