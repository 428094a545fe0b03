//! Error handling for the template cache
//!
//! Every fallible operation in the crate reports a [`CacheError`]. The variants
//! fall into four groups that match the lifecycle of the cache:
//!
//! - **Discovery**: [`CacheError::InvalidPattern`], [`CacheError::Discovery`]
//! - **Compilation**: [`CacheError::Compile`]
//! - **Lookup**: [`CacheError::UnknownTemplate`]
//! - **Execution**: [`CacheError::Execution`], [`CacheError::InvalidData`]
//!
//! Discovery and compilation errors come out of a build. They fail
//! construction, or fail an invalidation while the previously published map
//! keeps serving. Lookup and execution errors come out of a render and are
//! always returned to the caller, never raised as a panic.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tmpl_cache::core::CacheError;
//!
//! fn status_for(error: &CacheError) -> u16 {
//!     match error {
//!         CacheError::UnknownTemplate { .. } => 404,
//!         _ => 500,
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The error type for template cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The layout glob pattern could not be compiled.
    #[error("Invalid layout pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The glob pattern as built from the configuration
        pattern: String,
        /// What the glob parser rejected
        reason: String,
    },

    /// A path could not be read while discovering fragments.
    #[error("Failed to read template path {}: {source}", path.display())]
    Discovery {
        /// The path that could not be read
        path: PathBuf,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A fragment failed to parse.
    ///
    /// `path` is the content fragment whose unit was being compiled; the
    /// failing source may be one of the layouts bundled with it.
    #[error("Failed to compile template '{key}' ({}): {message}", path.display())]
    Compile {
        /// Key of the unit being compiled
        key: String,
        /// Content fragment the unit was built from
        path: PathBuf,
        /// Cleaned engine message
        message: String,
        /// Line reported by the engine, if any
        line: Option<usize>,
    },

    /// No compiled unit is published under the requested key.
    #[error("Unknown template '{key}'")]
    UnknownTemplate {
        /// The key that was requested
        key: String,
        /// Nearest known keys, closest first
        suggestions: Vec<String>,
    },

    /// The engine failed while executing an entry point.
    ///
    /// Output written to the sink before the failure is not rolled back.
    #[error("Failed to render template '{key}' via '{entry_point}': {message}")]
    Execution {
        /// Key of the unit being executed
        key: String,
        /// Entry point that was executed
        entry_point: String,
        /// Cleaned engine message
        message: String,
    },

    /// The data value could not be turned into a render context.
    #[error("Invalid render data for template '{key}': {message}")]
    InvalidData {
        /// Key of the unit being executed
        key: String,
        /// Why the value was rejected
        message: String,
    },

    /// The configuration is not usable.
    #[error("Invalid template cache configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it
        reason: String,
    },

    /// A build was cancelled before it finished. Nothing was published.
    #[error("Template build was cancelled")]
    Cancelled,

    /// A background rebuild task did not complete.
    #[error("Template rebuild task failed: {reason}")]
    TaskFailed {
        /// Join error reported by the runtime
        reason: String,
    },
}

impl CacheError {
    /// Returns `true` for [`CacheError::UnknownTemplate`].
    pub fn is_unknown_template(&self) -> bool {
        matches!(self, CacheError::UnknownTemplate { .. })
    }

    /// Returns the template key the error is about, if it has one.
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheError::Compile { key, .. }
            | CacheError::UnknownTemplate { key, .. }
            | CacheError::Execution { key, .. }
            | CacheError::InvalidData { key, .. } => Some(key),
            _ => None,
        }
    }

    /// A short hint on how to fix the error, for operator-facing output.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CacheError::UnknownTemplate { suggestions, .. } if !suggestions.is_empty() => {
                Some(format!("Did you mean: {}?", suggestions.join(", ")))
            }
            CacheError::UnknownTemplate { .. } => Some(
                "Check that the fragment exists under a content directory and the cache was invalidated after adding it"
                    .to_string(),
            ),
            CacheError::Compile { line: Some(line), .. } => {
                Some(format!("Check the template syntax around line {line}"))
            }
            CacheError::Compile { .. } => {
                Some("Check for unclosed {{ }} or {% %} delimiters and unknown filters".to_string())
            }
            CacheError::Discovery { .. } => {
                Some("Check that the templates directory exists and is readable".to_string())
            }
            CacheError::InvalidData { .. } => {
                Some("Render data must serialize to a map or struct".to_string())
            }
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
