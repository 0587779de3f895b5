//! String and sequence filters.
//!
//! # Available Filters
//!
//! - `head` / `tail`: first element / everything but the first
//! - `split_with` / `join_with`: delimiter-parameterized split and join
//! - `filename`: basename with the extension stripped
//! - `with_ext`: basename with a replacement extension
//! - `search_regex`: anchored regex match
//! - `is_any_true` / `is_all_true`: boolean folds over a sequence
//!
//! # Examples
//!
//! ```jinja2
//! {{ 'db.example.org' | filename }}
//! {{ 'config.yml' | with_ext('bak') }}
//! {{ checks | is_all_true }}
//! ```

use minijinja::{Environment, Value};
use regex::Regex;

use super::{invalid_input, seq_items};

/// Register all string and sequence filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("head", head);
    env.add_filter("tail", tail);
    env.add_filter("split_with", split_with);
    env.add_filter("join_with", join_with);
    env.add_filter("filename", filename);
    env.add_filter("with_ext", with_ext);
    env.add_filter("search_regex", search_regex);
    env.add_filter("is_any_true", is_any_true);
    env.add_filter("is_all_true", is_all_true);
}

/// Return the first element of a sequence or string.
fn head(x: Value) -> Result<Value, minijinja::Error> {
    if let Some(s) = x.as_str() {
        return s
            .chars()
            .next()
            .map(|c| Value::from(c.to_string()))
            .ok_or_else(|| invalid_input("head: string is empty"));
    }
    let items = seq_items(&x).ok_or_else(|| invalid_input("head requires a sequence"))?;
    items
        .into_iter()
        .next()
        .ok_or_else(|| invalid_input("head: sequence is empty"))
}

/// Return all but the first element of a sequence or string.
fn tail(x: Value) -> Result<Value, minijinja::Error> {
    if let Some(s) = x.as_str() {
        let rest: String = s.chars().skip(1).collect();
        return Ok(Value::from(rest));
    }
    let items = seq_items(&x).ok_or_else(|| invalid_input("tail requires a sequence"))?;
    Ok(Value::from(items.into_iter().skip(1).collect::<Vec<_>>()))
}

/// Split a string by the given delimiter.
fn split_with(x: String, d: String) -> Result<Value, minijinja::Error> {
    if d.is_empty() {
        return Err(invalid_input("split_with: delimiter must not be empty"));
    }
    Ok(Value::from(
        x.split(&d).map(str::to_string).collect::<Vec<_>>(),
    ))
}

/// Join a list of values into a string with the given delimiter.
fn join_with(x: Value, d: String) -> Result<String, minijinja::Error> {
    let items = seq_items(&x).ok_or_else(|| invalid_input("join_with requires a sequence"))?;
    let parts: Vec<String> = items.iter().map(Value::to_string).collect();
    Ok(parts.join(&d))
}

/// Strip everything after the first dot of a basename.
fn filename(basename: String) -> String {
    basename.split('.').next().unwrap_or_default().to_string()
}

/// Replace the extension of a basename.
fn with_ext(basename: String, ext: String) -> String {
    format!("{}.{}", filename(basename), ext)
}

/// Check whether a string matches a regex pattern anchored at the start.
fn search_regex(r: String, s: String) -> Result<bool, minijinja::Error> {
    let re = Regex::new(&format!(r"\A(?:{r})"))
        .map_err(|e| invalid_input(format!("search_regex: invalid pattern: {e}")))?;
    Ok(re.is_match(&s))
}

/// Check if any element in the sequence is truthy.
fn is_any_true(xs: Value) -> Result<bool, minijinja::Error> {
    let items = xs
        .try_iter()
        .map_err(|_| invalid_input("is_any_true requires an iterable"))?;
    Ok(items.into_iter().any(|v| v.is_true()))
}

/// Check if all elements in the sequence are truthy.
fn is_all_true(xs: Value) -> Result<bool, minijinja::Error> {
    let items = xs
        .try_iter()
        .map_err(|_| invalid_input("is_all_true requires an iterable"))?;
    Ok(items.into_iter().all(|v| v.is_true()))
}
