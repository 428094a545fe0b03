//! Rendering through the public cache API.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tmpl_cache::core::CacheError;
use tmpl_cache::templating::{TemplateCache, TemplateProvider};
use tmpl_cache::test_utils::{TemplateTree, init_test_logging};

const BASE_LAYOUT: &str = "<html><title>{{ title }}</title><body>{% include \"content\" %}</body></html>";

#[derive(Serialize)]
struct Welcome<'a> {
    title: &'a str,
    name: &'a str,
}

fn site() -> Result<TemplateTree> {
    let tree = TemplateTree::new()?;
    tree.write_layout("base", BASE_LAYOUT)?;
    tree.write_include("home", "Welcome home, {{ name }}.")?;
    tree.write_mail("welcome", "Hello {{ name }}!")?;
    Ok(tree)
}

#[test]
fn test_standalone_render_uses_own_entry_point() -> Result<()> {
    init_test_logging(None);
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    let mut out = Vec::new();
    cache.render(&mut out, "welcome", &json!({ "name": "Ada" }))?;
    assert_eq!(String::from_utf8(out)?, "Hello Ada!");
    Ok(())
}

#[test]
fn test_render_with_layout_wraps_content() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    let data = Welcome {
        title: "Hi",
        name: "Ada",
    };
    let mut out = Vec::new();
    cache.render_with_layout(&mut out, "welcome", "base", &data)?;
    assert_eq!(
        String::from_utf8(out)?,
        "<html><title>Hi</title><body>Hello Ada!</body></html>"
    );

    // Same layout, different key: the included content follows the key.
    let mut out = Vec::new();
    cache.render_with_layout(&mut out, "home", "base.tmpl", &data)?;
    assert_eq!(
        String::from_utf8(out)?,
        "<html><title>Hi</title><body>Welcome home, Ada.</body></html>"
    );
    Ok(())
}

#[test]
fn test_content_can_extend_a_layout() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_layout("frame", "[{% block body %}default{% endblock body %}]")?;
    tree.write_include("article", "{% extends \"frame.tmpl\" %}{% block body %}article{% endblock body %}")?;

    let cache = TemplateCache::new(tree.config())?;
    assert_eq!(cache.render_to_string("article", &())?, "[article]");
    Ok(())
}

#[test]
fn test_unknown_key_is_typed_and_writes_nothing() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    let mut out = Vec::new();
    let error = cache.render(&mut out, "welcom", &json!({})).unwrap_err();
    assert!(out.is_empty());
    assert!(error.is_unknown_template());
    assert_eq!(error.suggestion().as_deref(), Some("Did you mean: welcome?"));

    let error = cache.render_with_layout(&mut out, "nope", "base", &json!({})).unwrap_err();
    assert!(matches!(error, CacheError::UnknownTemplate { ref key, .. } if key == "nope"));
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn test_unknown_layout_is_an_execution_error() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    let mut out = Vec::new();
    let error = cache.render_with_layout(&mut out, "welcome", "missing", &json!({})).unwrap_err();
    assert!(matches!(error, CacheError::Execution { ref key, .. } if key == "welcome"));
    Ok(())
}

#[test]
fn test_execution_failure_is_returned() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_include("profile", "Name: {{ user.name }}")?;
    let cache = TemplateCache::new(tree.config())?;

    let error = cache.render_to_string("profile", &json!({})).unwrap_err();
    match &error {
        CacheError::Execution { key, entry_point, message } => {
            assert_eq!(key, "profile");
            assert_eq!(entry_point, "profile.tmpl");
            assert!(message.contains("user.name"), "message was: {message}");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_render_multiple_in_order() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    let mut out = Vec::new();
    cache.render_multiple(&mut out, &["home", "welcome"], &json!({ "name": "Ada" }))?;
    assert_eq!(String::from_utf8(out)?, "Welcome home, Ada.Hello Ada!");
    Ok(())
}

#[test]
fn test_autoescape_applies_to_every_fragment() -> Result<()> {
    let tree = site()?;
    let data = json!({ "title": "<b>", "name": "<i>" });

    let cache = TemplateCache::new(tree.config())?;
    assert_eq!(
        cache.render_to_string("welcome", &data)?,
        "Hello &lt;i&gt;!"
    );

    let cache = TemplateCache::new(tree.config().with_autoescape(false))?;
    let mut out = Vec::new();
    cache.render_with_layout(&mut out, "welcome", "base", &data)?;
    assert_eq!(
        String::from_utf8(out)?,
        "<html><title><b></title><body>Hello <i>!</body></html>"
    );
    Ok(())
}

#[test]
fn test_provider_trait_object() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;
    let provider: Box<dyn TemplateProvider> = Box::new(cache);

    let mut context = tera::Context::new();
    context.insert("title", "T");
    context.insert("name", "Bo");

    let mut out = Vec::new();
    provider.render_with_layout(&mut out, "welcome", "base", &context)?;
    assert_eq!(String::from_utf8(out)?, "<html><title>T</title><body>Hello Bo!</body></html>");
    assert!(!provider.has_template("base"));
    Ok(())
}

#[test]
fn test_concurrent_renders_share_one_cache() -> Result<()> {
    let tree = site()?;
    let cache = TemplateCache::new(tree.config())?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = &cache;
                scope.spawn(move || cache.render_to_string("welcome", &json!({ "name": i })))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let out = handle.join().unwrap().unwrap();
            assert_eq!(out, format!("Hello {i}!"));
        }
    });
    Ok(())
}
