//! Helper functions and filters available inside fragments.
//!
//! Every compiled unit is built with one [`HelperSet`]: the built-ins below,
//! merged with whatever the caller supplied at construction. On a name
//! collision the **caller's helper wins**, so a built-in can be replaced
//! without forking the crate.
//!
//! # Built-ins
//!
//! Each built-in is registered both as a Tera function and as a filter:
//!
//! | Name           | Function form                     | Filter form                      |
//! |----------------|-----------------------------------|----------------------------------|
//! | `oddoreven`    | `{{ oddoreven(i=loop.index) }}`   | `{{ loop.index \| oddoreven }}`   |
//! | `fmtdate`      | `{{ fmtdate(fmt="std", t=when) }}`| `{{ when \| fmtdate(fmt="std") }}`|
//! | `ucfirstwords` | `{{ ucfirstwords(text=name) }}`   | `{{ name \| ucfirstwords }}`      |
//!
//! `fmtdate` accepts an RFC 3339 string (the form chrono serializes
//! `DateTime` to) or a Unix timestamp in seconds. The only recognized
//! specifier is `"std"`, rendered as `Monday 2 January 2006 15:04`; any other
//! specifier renders as an empty string.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone};
use tera::{Filter, Function, Tera, Value};

use crate::constants::{STD_TIME_FORMAT, STD_TIME_SPECIFIER};

/// Returns `"odd"` or `"even"` for `i`.
pub fn odd_or_even(i: i64) -> &'static str {
    if i % 2 == 0 { "even" } else { "odd" }
}

/// Formats `time` according to a named specifier.
///
/// Unrecognized specifiers yield an empty string.
///
/// # Examples
///
/// ```rust,no_run
/// use chrono::{TimeZone, Utc};
/// use tmpl_cache::templating::format_date;
///
/// let t = Utc.with_ymd_and_hms(2020, 3, 3, 14, 5, 0).unwrap();
/// assert_eq!(format_date("std", &t), "Tuesday 3 March 2020 14:05");
/// assert_eq!(format_date("iso", &t), "");
/// ```
pub fn format_date<Tz>(specifier: &str, time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match specifier {
        STD_TIME_SPECIFIER => time.format(STD_TIME_FORMAT).to_string(),
        _ => String::new(),
    }
}

/// First letter of every whitespace-separated word, uppercased.
pub fn first_letters(text: &str) -> String {
    text.split_whitespace().filter_map(|word| word.chars().next()).flat_map(char::to_uppercase).collect()
}

/// A Tera function shared between every unit of a build.
#[derive(Clone)]
struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

/// A Tera filter shared between every unit of a build.
#[derive(Clone)]
struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

/// Named helpers registered into every compiled unit.
///
/// Cloning is cheap; the callables are reference counted and never mutated
/// once a cache is built.
#[derive(Clone, Default)]
pub struct HelperSet {
    functions: BTreeMap<String, SharedFunction>,
    filters: BTreeMap<String, SharedFilter>,
}

impl HelperSet {
    /// An empty set, with no built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in helpers.
    pub fn builtin() -> Self {
        Self::new()
            .with_function("oddoreven", oddoreven_function)
            .with_filter("oddoreven", oddoreven_filter)
            .with_function("fmtdate", fmtdate_function)
            .with_filter("fmtdate", fmtdate_filter)
            .with_function("ucfirstwords", ucfirstwords_function)
            .with_filter("ucfirstwords", ucfirstwords_filter)
    }

    /// Adds or replaces a function.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Function + 'static,
    {
        self.functions.insert(name.into(), SharedFunction(Arc::new(function)));
        self
    }

    /// Adds or replaces a filter.
    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Filter + 'static,
    {
        self.filters.insert(name.into(), SharedFilter(Arc::new(filter)));
        self
    }

    /// Merges `overrides` into this set. Entries from `overrides` replace
    /// entries of the same name and kind.
    pub fn merge(mut self, overrides: HelperSet) -> Self {
        self.functions.extend(overrides.functions);
        self.filters.extend(overrides.filters);
        self
    }

    /// Registers every helper on a Tera instance.
    pub fn register(&self, tera: &mut Tera) {
        for (name, function) in &self.functions {
            tera.register_function(name, function.clone());
        }
        for (name, filter) in &self.filters {
            tera.register_filter(name, filter.clone());
        }
    }

    /// Function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Filter names, sorted.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.filters.is_empty()
    }
}

impl fmt::Debug for HelperSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperSet")
            .field("functions", &self.function_names())
            .field("filters", &self.filter_names())
            .finish()
    }
}

fn required<'a>(args: &'a HashMap<String, Value>, helper: &str, name: &str) -> tera::Result<&'a Value> {
    args.get(name)
        .ok_or_else(|| tera::Error::msg(format!("`{helper}` requires a `{name}` argument")))
}

fn as_integer(helper: &str, value: &Value) -> tera::Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| tera::Error::msg(format!("`{helper}` expects an integer, got {value}")))
}

fn parse_time(value: &Value) -> tera::Result<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| tera::Error::msg(format!("`fmtdate` cannot parse time '{s}': {e}"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.fixed_offset())
            .ok_or_else(|| tera::Error::msg(format!("`fmtdate` timestamp out of range: {n}"))),
        other => Err(tera::Error::msg(format!(
            "`fmtdate` expects an RFC 3339 string or a Unix timestamp, got {other}"
        ))),
    }
}

fn render_date(specifier: &Value, time: &Value) -> tera::Result<Value> {
    let specifier = specifier
        .as_str()
        .ok_or_else(|| tera::Error::msg("`fmtdate` format specifier must be a string"))?;
    if specifier != STD_TIME_SPECIFIER {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(format_date(specifier, &parse_time(time)?)))
}

fn text_of<'a>(helper: &str, value: &'a Value) -> tera::Result<&'a str> {
    value.as_str().ok_or_else(|| tera::Error::msg(format!("`{helper}` expects a string, got {value}")))
}

fn oddoreven_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let i = as_integer("oddoreven", required(args, "oddoreven", "i")?)?;
    Ok(Value::String(odd_or_even(i).to_string()))
}

fn oddoreven_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(odd_or_even(as_integer("oddoreven", value)?).to_string()))
}

fn fmtdate_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    render_date(required(args, "fmtdate", "fmt")?, required(args, "fmtdate", "t")?)
}

fn fmtdate_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    render_date(required(args, "fmtdate", "fmt")?, value)
}

fn ucfirstwords_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = text_of("ucfirstwords", required(args, "ucfirstwords", "text")?)?;
    Ok(Value::String(first_letters(text)))
}

fn ucfirstwords_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(first_letters(text_of("ucfirstwords", value)?)))
}
