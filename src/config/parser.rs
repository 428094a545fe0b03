//! TOML parsing with file path context.

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML file into any deserializable type.
///
/// Both failure modes carry the file path: a read failure reports
/// "Failed to read config file", a syntax or shape mismatch reports
/// "Failed to parse config file", with the underlying error as the cause.
///
/// # Examples
///
/// ```rust,no_run
/// use tmpl_cache::config::{CacheConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: CacheConfig = parse_config(Path::new("tmpl-cache.toml"))?;
/// println!("Templates root: {}", config.root.display());
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
