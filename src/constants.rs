//! Global constants used throughout the template cache.
//!
//! This module holds the on-disk layout conventions, the standard date
//! format, and the environment variable names read by
//! [`CacheConfig::from_env`](crate::config::CacheConfig::from_env). Keeping
//! them in one place makes the conventions discoverable.

/// Default templates root, relative to the working directory.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Subdirectory of the root holding shared layout fragments.
///
/// Layouts are matched non-recursively; every layout is bundled into every
/// compiled unit.
pub const DEFAULT_LAYOUTS_DIR: &str = "layouts";

/// Subdirectories walked recursively for content fragments, in order.
///
/// Later entries win flat-key collisions, so a `mail/` fragment replaces an
/// `includes/` fragment with the same base name.
pub const DEFAULT_CONTENT_DIRS: &[&str] = &["includes", "mail"];

/// File suffix that marks a template fragment.
pub const DEFAULT_FRAGMENT_SUFFIX: &str = ".tmpl";

/// Extra entry-point name the content fragment is registered under.
///
/// Layouts can `{% include "content" %}` without knowing which key they
/// are being rendered for.
pub const DEFAULT_CONTENT_ALIAS: &str = "content";

/// Format used by `fmtdate` for the `"std"` specifier.
///
/// Renders as e.g. `Tuesday 3 March 2020 14:05`.
pub const STD_TIME_FORMAT: &str = "%A %-d %B %Y %H:%M";

/// Specifier recognized by `fmtdate` for [`STD_TIME_FORMAT`].
pub const STD_TIME_SPECIFIER: &str = "std";

/// Environment variable overriding the templates root.
pub const ENV_TEMPLATES_ROOT: &str = "TMPL_CACHE_ROOT";

/// Environment variable naming a TOML configuration file.
pub const ENV_CONFIG_PATH: &str = "TMPL_CACHE_CONFIG";

/// Maximum number of "did you mean" suggestions attached to an unknown key.
pub const MAX_KEY_SUGGESTIONS: usize = 3;

/// Minimum similarity, as a percentage, for a known key to be suggested.
///
/// Similarity is `100 - distance * 100 / longer_len` using Levenshtein
/// distance.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;
