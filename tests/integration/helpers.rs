//! Helpers inside real fragments.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tera::Value;
use tmpl_cache::templating::{HelperSet, TemplateCache, format_date, odd_or_even};
use tmpl_cache::test_utils::TemplateTree;

#[test]
fn test_helper_values() {
    assert_eq!(odd_or_even(3), "odd");
    assert_eq!(odd_or_even(4), "even");

    let t = Utc.with_ymd_and_hms(2021, 12, 25, 9, 30, 0).unwrap();
    assert_eq!(format_date("std", &t), "Saturday 25 December 2021 09:30");
}

#[test]
fn test_builtins_in_a_table() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_include(
        "rows",
        "{% for row in rows %}<tr class=\"{{ oddoreven(i=loop.index) }}\">{{ row }}</tr>{% endfor %}",
    )?;
    tree.write_mail("stamp", "Sent {{ sent | fmtdate(fmt=\"std\") }}")?;

    let cache = TemplateCache::new(tree.config().with_autoescape(false))?;
    assert_eq!(
        cache.render_to_string("rows", &json!({ "rows": ["a", "b", "c"] }))?,
        "<tr class=\"odd\">a</tr><tr class=\"even\">b</tr><tr class=\"odd\">c</tr>"
    );

    let sent = Utc.with_ymd_and_hms(2021, 12, 25, 9, 30, 0).unwrap();
    assert_eq!(
        cache.render_to_string("stamp", &json!({ "sent": sent }))?,
        "Sent Saturday 25 December 2021 09:30"
    );
    Ok(())
}

#[test]
fn test_helpers_are_visible_from_layouts() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_layout("card", "{{ name | ucfirstwords }}: {% include \"content\" %}")?;
    tree.write_include("bio", "{{ name }}")?;

    let cache = TemplateCache::new(tree.config())?;
    let mut out = Vec::new();
    cache.render_with_layout(&mut out, "bio", "card", &json!({ "name": "grace brewster hopper" }))?;
    assert_eq!(String::from_utf8(out)?, "GBH: grace brewster hopper");
    Ok(())
}

#[test]
fn test_caller_helpers_extend_and_override() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_include("page", "{{ shout(text=\"hi\") }} {{ oddoreven(i=1) }} {{ 2 | oddoreven }}")?;

    let overrides = HelperSet::new()
        .with_function("shout", |args: &HashMap<String, Value>| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok::<_, tera::Error>(Value::String(text.to_uppercase()))
        })
        .with_function("oddoreven", |_: &HashMap<String, Value>| {
            Ok::<_, tera::Error>(Value::String("mine".to_string()))
        });

    let cache = TemplateCache::with_helpers(tree.config(), overrides)?;
    assert_eq!(cache.render_to_string("page", &())?, "HI mine even");
    assert!(cache.helpers().function_names().contains(&"shout"));
    Ok(())
}

#[test]
fn test_unknown_helper_is_an_error() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_include("page", "{{ x | no_such_filter }}")?;

    let outcome = TemplateCache::new(tree.config())
        .and_then(|cache| cache.render_to_string("page", &json!({ "x": 1 })));
    assert!(outcome.is_err());
    Ok(())
}

#[test]
fn test_helper_error_surfaces_as_execution_error() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write_include("page", "{{ when | fmtdate(fmt=\"std\") }}")?;

    let cache = TemplateCache::new(tree.config())?;
    let error = cache.render_to_string("page", &json!({ "when": "not a date" })).unwrap_err();
    assert!(error.to_string().contains("fmtdate"), "error was: {error}");
    Ok(())
}
