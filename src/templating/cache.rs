//! The published template cache.
//!
//! [`TemplateCache`] owns the configuration, the merged helper set and the
//! currently published map. Readers never wait on a rebuild:
//!
//! - A lookup clones the `Arc` of the published map under a read lock and
//!   drops the lock straight away. Everything after that works on the
//!   [`CacheSnapshot`], so one render sees one map from start to finish.
//! - [`TemplateCache::invalidate`] builds a complete new map with no lock
//!   held, then replaces the `Arc` under a write lock held only for the swap.
//!   A failed build publishes nothing; the previous map keeps serving.
//!
//! # Examples
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tmpl_cache::config::CacheConfig;
//! use tmpl_cache::templating::TemplateCache;
//!
//! # fn example() -> tmpl_cache::core::Result<()> {
//! let cache = TemplateCache::new(CacheConfig::default())?;
//!
//! let mut page = Vec::new();
//! cache.render_with_layout(&mut page, "welcome", "base", &json!({ "name": "Ada" }))?;
//!
//! // After editing files on disk:
//! let report = cache.invalidate()?;
//! println!("{} templates", report.units);
//! # Ok(())
//! # }
//! ```

use std::io::{self, Write};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tera::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::builder::{BuildReport, CacheMap, build};
use super::engine::CompiledUnit;
use super::helpers::HelperSet;
use crate::config::CacheConfig;
use crate::constants::{MAX_KEY_SUGGESTIONS, SIMILARITY_THRESHOLD_PERCENT};
use crate::core::{CacheError, Result};

/// A published map and its generation.
#[derive(Debug)]
struct Published {
    generation: u64,
    units: CacheMap,
}

/// A template cache built from a directory tree.
///
/// Share it by reference (or `Arc`) between request handlers; every method
/// takes `&self`.
#[derive(Debug)]
pub struct TemplateCache {
    config: CacheConfig,
    helpers: HelperSet,
    published: RwLock<Arc<Published>>,
}

impl TemplateCache {
    /// Builds a cache with the built-in helpers.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfig`] for an unusable configuration, or any
    /// build error. No cache exists if construction fails.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_helpers(config, HelperSet::new())
    }

    /// Builds a cache with the built-in helpers plus `overrides`.
    ///
    /// A helper in `overrides` replaces a built-in of the same name.
    pub fn with_helpers(config: CacheConfig, overrides: HelperSet) -> Result<Self> {
        config.validate()?;
        let helpers = HelperSet::builtin().merge(overrides);
        let (units, report) = build(&config, &helpers, None)?;

        info!(
            "Template cache ready: {} template(s) from {}",
            report.units,
            config.root.display()
        );

        Ok(Self {
            config,
            helpers,
            published: RwLock::new(Arc::new(Published {
                generation: 1,
                units,
            })),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The merged helper set every unit is compiled with.
    pub fn helpers(&self) -> &HelperSet {
        &self.helpers
    }

    /// Pins the currently published map.
    pub fn snapshot(&self) -> CacheSnapshot {
        let published = match self.published.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        };
        CacheSnapshot {
            published,
        }
    }

    /// Whether `key` is in the current map.
    pub fn has_template(&self, key: &str) -> bool {
        self.snapshot().has_template(key)
    }

    /// Every key in the current map, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().keys()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Number of maps published so far, starting at 1 for construction.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    /// Renders `key` on its own.
    ///
    /// See [`CacheSnapshot::render`].
    pub fn render<W, D>(&self, sink: W, key: &str, data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        self.snapshot().render(sink, key, data)
    }

    /// Renders `key` through a layout.
    ///
    /// See [`CacheSnapshot::render_with_layout`].
    pub fn render_with_layout<W, D>(&self, sink: W, key: &str, layout: &str, data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        self.snapshot().render_with_layout(sink, key, layout, data)
    }

    /// Renders several keys in order against one snapshot.
    ///
    /// See [`CacheSnapshot::render_multiple`].
    pub fn render_multiple<W, D, K>(&self, sink: W, keys: &[K], data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
        K: AsRef<str>,
    {
        self.snapshot().render_multiple(sink, keys, data)
    }

    /// Renders `key` into a string.
    pub fn render_to_string<D>(&self, key: &str, data: &D) -> Result<String>
    where
        D: Serialize + ?Sized,
    {
        self.snapshot().render_to_string(key, data)
    }

    /// Rebuilds from disk and publishes the result.
    ///
    /// # Errors
    ///
    /// Any build error, or [`CacheError::Discovery`] when a content
    /// directory that holds published keys is gone. The previous map stays
    /// published, so renders keep succeeding for the keys it held.
    pub fn invalidate(&self) -> Result<BuildReport> {
        self.rebuild(None)
    }

    /// Like [`TemplateCache::invalidate`], abandoning the build when `cancel`
    /// fires. A cancelled build publishes nothing.
    pub fn invalidate_with_cancel(&self, cancel: &CancellationToken) -> Result<BuildReport> {
        self.rebuild(Some(cancel))
    }

    /// Runs [`TemplateCache::invalidate`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Any build error, or [`CacheError::TaskFailed`] if the task panicked or
    /// was aborted.
    pub async fn invalidate_async(self: &Arc<Self>) -> Result<BuildReport> {
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.invalidate())
            .await
            .map_err(|e| CacheError::TaskFailed {
                reason: e.to_string(),
            })?
    }

    fn rebuild(&self, cancel: Option<&CancellationToken>) -> Result<BuildReport> {
        debug!("Invalidating template cache");

        let (units, report) = match build(&self.config, &self.helpers, cancel)
            .and_then(|built| self.check_no_vanished_dirs(built))
        {
            Ok(built) => built,
            Err(e) => {
                error!(
                    "Template cache rebuild failed, keeping generation {}: {}",
                    self.generation(),
                    e
                );
                return Err(e);
            }
        };

        let generation = self.publish(units);
        info!("Published template cache generation {} ({} template(s))", generation, report.units);
        Ok(report)
    }

    /// Rejects a build in which a content directory serving published keys
    /// has disappeared.
    fn check_no_vanished_dirs(
        &self,
        (units, report): (CacheMap, BuildReport),
    ) -> Result<(CacheMap, BuildReport)> {
        let current = self.snapshot();
        if let Some(dir) = report.missing_dirs.iter().find(|dir| current.serves_content_dir(dir)) {
            return Err(CacheError::Discovery {
                path: self.config.root.join(dir),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "content directory holding published templates is missing",
                ),
            });
        }
        Ok((units, report))
    }

    fn publish(&self, units: CacheMap) -> u64 {
        let mut guard = match self.published.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let generation = guard.generation + 1;
        *guard = Arc::new(Published {
            generation,
            units,
        });
        generation
    }
}

/// A pinned view of one published map.
///
/// Holding a snapshot keeps its units alive after newer maps are published.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    published: Arc<Published>,
}

impl CacheSnapshot {
    pub fn generation(&self) -> u64 {
        self.published.generation
    }

    pub fn has_template(&self, key: &str) -> bool {
        self.published.units.contains_key(key)
    }

    /// Keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.published.units.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.published.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.units.is_empty()
    }

    fn serves_content_dir(&self, dir: &str) -> bool {
        self.published.units.values().any(|unit| unit.content_dir() == dir)
    }

    /// The compiled unit for `key`.
    ///
    /// # Errors
    ///
    /// [`CacheError::UnknownTemplate`] with the closest known keys.
    pub fn unit(&self, key: &str) -> Result<&Arc<CompiledUnit>> {
        self.published.units.get(key).ok_or_else(|| CacheError::UnknownTemplate {
            key: key.to_string(),
            suggestions: suggest_keys(key, self.published.units.keys()),
        })
    }

    /// Executes the content fragment of `key` by its own file name.
    ///
    /// Output streams into `sink` as it is produced. An unknown key or
    /// unusable data fails before anything is written; an execution failure
    /// leaves whatever was already written in the sink.
    pub fn render<W, D>(&self, mut sink: W, key: &str, data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        let unit = self.unit(key)?;
        let context = to_context(key, data)?;
        unit.execute(unit.entry_point(), &context, &mut sink)
    }

    /// Executes a layout of the unit for `key`.
    ///
    /// `layout` is a layout file name (`base.tmpl`) or its stem (`base`).
    /// The layout pulls the content in through the content alias or a
    /// block, so what it renders is still specific to `key`.
    pub fn render_with_layout<W, D>(&self, mut sink: W, key: &str, layout: &str, data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        let unit = self.unit(key)?;
        let context = to_context(key, data)?;
        unit.execute(&unit.resolve_entry_point(layout), &context, &mut sink)
    }

    /// Renders each key in turn into the same sink.
    ///
    /// Stops at the first failure; output of the keys before it stays in the
    /// sink.
    pub fn render_multiple<W, D, K>(&self, mut sink: W, keys: &[K], data: &D) -> Result<()>
    where
        W: Write,
        D: Serialize + ?Sized,
        K: AsRef<str>,
    {
        for key in keys {
            self.render(&mut sink, key.as_ref(), data)?;
        }
        Ok(())
    }

    pub fn render_to_string<D>(&self, key: &str, data: &D) -> Result<String>
    where
        D: Serialize + ?Sized,
    {
        let mut buffer = Vec::new();
        self.render(&mut buffer, key, data)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub(crate) fn render_context(
        &self,
        sink: &mut dyn Write,
        key: &str,
        layout: Option<&str>,
        context: &Context,
    ) -> Result<()> {
        let unit = self.unit(key)?;
        let entry_point = match layout {
            Some(layout) => unit.resolve_entry_point(layout),
            None => unit.entry_point().to_string(),
        };
        unit.execute(&entry_point, context, sink)
    }
}

/// Converts render data into a Tera context.
///
/// Maps and structs become top-level variables. `None` and `()` give an
/// empty context.
fn to_context<D: Serialize + ?Sized>(key: &str, data: &D) -> Result<Context> {
    let invalid = |message: String| CacheError::InvalidData {
        key: key.to_string(),
        message,
    };

    match serde_json::to_value(data).map_err(|e| invalid(e.to_string()))? {
        serde_json::Value::Null => Ok(Context::new()),
        value @ serde_json::Value::Object(_) => {
            Context::from_value(value).map_err(|e| invalid(e.to_string()))
        }
        other => Err(invalid(format!("expected a map or struct, got {other}"))),
    }
}

/// Known keys close enough to `key` to be worth suggesting, closest first.
fn suggest_keys<'a>(key: &str, known: impl Iterator<Item = &'a String>) -> Vec<String> {
    let key_len = key.chars().count();
    let mut scored: Vec<(usize, &String)> = known
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(key, candidate);
            let longest = key_len.max(candidate.chars().count()).max(1);
            let similarity = 100usize.saturating_sub(distance * 100 / longest);
            (similarity >= SIMILARITY_THRESHOLD_PERCENT).then_some((distance, candidate))
        })
        .collect();

    scored.sort();
    scored.into_iter().take(MAX_KEY_SUGGESTIONS).map(|(_, k)| k.clone()).collect()
}
