//! Configuration loading and environment overrides.

use std::path::PathBuf;

use anyhow::Result;
use serial_test::serial;
use tmpl_cache::config::{CacheConfig, CompilePolicy, KeyNamespace};
use tmpl_cache::constants::{ENV_CONFIG_PATH, ENV_TEMPLATES_ROOT};
use tmpl_cache::templating::TemplateCache;
use tmpl_cache::test_utils::TemplateTree;

/// Clears the variables on drop so a failing test does not leak them.
struct EnvGuard;

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: every test touching these variables is #[serial].
        unsafe {
            std::env::remove_var(ENV_CONFIG_PATH);
            std::env::remove_var(ENV_TEMPLATES_ROOT);
        }
    }
}

#[test]
fn test_custom_layout_from_toml() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_fragment("frames", "main", "({% include \"body\" %})")?;
    tree.write_fragment("pages", "about", "about us")?;

    let config_path = tree.write_raw(
        "cache.toml",
        &format!(
            r#"
root = "{}"
layouts_dir = "frames"
content_dirs = ["pages"]
content_alias = "body"
"#,
            tree.root().display().to_string().replace('\\', "/")
        ),
    )?;

    let config = CacheConfig::load(&config_path)?;
    assert_eq!(config.layouts_dir, "frames");
    assert_eq!(config.key_namespace, KeyNamespace::Flat);
    assert_eq!(config.compile_policy, CompilePolicy::Strict);

    let cache = TemplateCache::new(config)?;
    let mut out = Vec::new();
    cache.render_with_layout(&mut out, "about", "main", &())?;
    assert_eq!(String::from_utf8(out)?, "(about us)");
    Ok(())
}

#[test]
fn test_unknown_field_values_are_rejected() -> Result<()> {
    let tree = TemplateTree::new()?;
    let path = tree.write_raw("cache.toml", "key_namespace = \"nested\"\n")?;

    let error = CacheConfig::load(&path).unwrap_err();
    assert!(format!("{error:#}").contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let error = CacheConfig::load(&PathBuf::from("/definitely/not/here.toml")).unwrap_err();
    assert!(error.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_from_env_defaults() -> Result<()> {
    let _guard = EnvGuard;
    // SAFETY: serialized with the other environment tests.
    unsafe {
        std::env::remove_var(ENV_CONFIG_PATH);
        std::env::remove_var(ENV_TEMPLATES_ROOT);
    }

    assert_eq!(CacheConfig::from_env()?, CacheConfig::default());
    Ok(())
}

#[test]
#[serial]
fn test_from_env_root_overrides_file() -> Result<()> {
    let _guard = EnvGuard;
    let tree = TemplateTree::new()?;
    tree.write_fragment("views", "index", "index")?;
    let path = tree.write_raw("cache.toml", "root = \"elsewhere\"\ncontent_dirs = [\"views\"]\n")?;

    // SAFETY: serialized with the other environment tests.
    unsafe {
        std::env::set_var(ENV_CONFIG_PATH, &path);
        std::env::set_var(ENV_TEMPLATES_ROOT, tree.root());
    }

    let config = CacheConfig::from_env()?;
    assert_eq!(config.root, tree.root());
    assert_eq!(config.content_dirs, vec!["views".to_string()]);

    let cache = TemplateCache::new(config)?;
    assert!(cache.has_template("index"));
    Ok(())
}
