//! Dictionary access and merging filters.
//!
//! # Available Filters
//!
//! - `merge_dicts`: merge two dictionaries, second wins on key collisions
//! - `merge_dicts_reverse`: merge two dictionaries, first wins
//! - `alias_keys`: duplicate entries under aliased key names
//! - `map_values`: extract a dictionary's values as a list
//! - `map_attributes`: extract the values of selected keys as a list
//! - `select_attributes`: keep only selected keys
//! - `drop_attributes`: remove selected keys
//! - `sorted_get`: value of the first key present out of a preference list
//!
//! # Examples
//!
//! ```jinja2
//! {{ defaults | merge_dicts(overrides) }}
//! {{ record | alias_keys({'ip-address': 'address'}) }}
//! {{ record | sorted_get(['address', 'ip-address']) }}
//! ```

use indexmap::IndexMap;
use minijinja::{Environment, Value};

use super::{invalid_input, map_pairs, seq_items};

/// Register all dictionary filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("merge_dicts", merge_dicts);
    env.add_filter("merge_dicts_reverse", merge_dicts_reverse);
    env.add_filter("alias_keys", alias_keys);
    env.add_filter("map_values", map_values);
    env.add_filter("map_attributes", map_attributes);
    env.add_filter("select_attributes", select_attributes);
    env.add_filter("drop_attributes", drop_attributes);
    env.add_filter("sorted_get", sorted_get);
}

/// Combine two pair lists into a mapping, later pairs overwriting earlier
/// ones while keeping the first-seen key position.
pub(crate) fn merged_value(
    first: Vec<(Value, Value)>,
    second: Vec<(Value, Value)>,
) -> Value {
    let mut out: IndexMap<String, (Value, Value)> = IndexMap::new();
    for (key, value) in first.into_iter().chain(second) {
        out.insert(key.to_string(), (key, value));
    }
    Value::from_iter(out.into_values())
}

fn require_map(value: &Value, filter: &str) -> Result<Vec<(Value, Value)>, minijinja::Error> {
    map_pairs(value).ok_or_else(|| invalid_input(format!("{filter} requires a mapping")))
}

/// Merge two dictionaries. On overlapping keys the values from the second
/// dictionary win.
fn merge_dicts(x: Value, y: Value) -> Result<Value, minijinja::Error> {
    Ok(merged_value(
        require_map(&x, "merge_dicts")?,
        require_map(&y, "merge_dicts")?,
    ))
}

/// Merge two dictionaries in reverse order, prioritizing the first.
fn merge_dicts_reverse(x: Value, y: Value) -> Result<Value, minijinja::Error> {
    Ok(merged_value(
        require_map(&y, "merge_dicts_reverse")?,
        require_map(&x, "merge_dicts_reverse")?,
    ))
}

/// Duplicate dictionary entries under new key names.
///
/// `alias` maps existing key → alias; the original entries are kept and a
/// missing source key is an error.
fn alias_keys(d: Value, alias: Option<Value>) -> Result<Value, minijinja::Error> {
    let mut pairs = require_map(&d, "alias_keys")?;
    let alias_pairs = match &alias {
        Some(alias) => require_map(alias, "alias_keys")?,
        None => Vec::new(),
    };

    for (source, target) in alias_pairs {
        let value = d.get_item(&source)?;
        if value.is_undefined() {
            return Err(invalid_input(format!("alias_keys: key '{source}' not found")));
        }
        pairs.push((target, value));
    }
    Ok(merged_value(pairs, Vec::new()))
}

/// Extract the values from a dictionary and return them as a list.
fn map_values(d: Value) -> Result<Value, minijinja::Error> {
    let pairs = require_map(&d, "map_values")?;
    Ok(Value::from(pairs.into_iter().map(|(_, v)| v).collect::<Vec<_>>()))
}

/// Extract the values of the listed keys, skipping keys that are absent.
fn map_attributes(d: Value, atts: Value) -> Result<Value, minijinja::Error> {
    let keys = seq_items(&atts)
        .ok_or_else(|| invalid_input("map_attributes requires a list of keys"))?;
    let mut out = Vec::new();
    for key in keys {
        let value = d.get_item(&key)?;
        if !value.is_undefined() {
            out.push(value);
        }
    }
    Ok(Value::from(out))
}

/// Keep only the listed keys of a dictionary.
fn select_attributes(d: Value, atts: Value) -> Result<Value, minijinja::Error> {
    let pairs = require_map(&d, "select_attributes")?;
    let keys: Vec<String> = seq_items(&atts)
        .ok_or_else(|| invalid_input("select_attributes requires a list of keys"))?
        .into_iter()
        .map(|k| k.to_string())
        .collect();
    let selected: Vec<_> = pairs
        .into_iter()
        .filter(|(k, _)| keys.contains(&k.to_string()))
        .collect();
    Ok(Value::from_iter(selected))
}

/// Remove the listed keys from a dictionary.
///
/// Accepts either a list of keys or a single key.
fn drop_attributes(d: Value, x: Value) -> Result<Value, minijinja::Error> {
    let pairs = require_map(&d, "drop_attributes")?;
    let keys: Vec<String> = match seq_items(&x) {
        Some(items) => items.into_iter().map(|k| k.to_string()).collect(),
        None => vec![x.to_string()],
    };
    let kept: Vec<_> = pairs
        .into_iter()
        .filter(|(k, _)| !keys.contains(&k.to_string()))
        .collect();
    Ok(Value::from_iter(kept))
}

/// Return the value of the first key in `ks` present in the dictionary.
fn sorted_get(d: Value, ks: Value) -> Result<Value, minijinja::Error> {
    let keys = seq_items(&ks)
        .ok_or_else(|| invalid_input("sorted_get requires a list of keys"))?;
    for key in &keys {
        let value = d.get_item(key)?;
        if !value.is_undefined() {
            return Ok(value);
        }
    }
    let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    Err(invalid_input(format!(
        "sorted_get: none of [{}] keys found",
        names.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, Value)]) -> Value {
        Value::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())))
    }

    #[test]
    fn test_merge_dicts_second_wins() {
        let x = dict(&[("a", Value::from(1)), ("b", Value::from(2))]);
        let y = dict(&[("b", Value::from(3)), ("c", Value::from(4))]);

        let merged = merge_dicts(x, y).unwrap();
        assert_eq!(merged.get_attr("a").unwrap(), Value::from(1));
        assert_eq!(merged.get_attr("b").unwrap(), Value::from(3));
        assert_eq!(merged.get_attr("c").unwrap(), Value::from(4));
    }

    #[test]
    fn test_merge_dicts_reverse_first_wins() {
        let x = dict(&[("b", Value::from(1))]);
        let y = dict(&[("b", Value::from(3)), ("c", Value::from(4))]);

        let merged = merge_dicts_reverse(x, y).unwrap();
        assert_eq!(merged.get_attr("b").unwrap(), Value::from(1));
        assert_eq!(merged.get_attr("c").unwrap(), Value::from(4));
    }

    #[test]
    fn test_merge_dicts_requires_mappings() {
        assert!(merge_dicts(Value::from(1), Value::from(2)).is_err());
    }

    #[test]
    fn test_alias_keys_keeps_original() {
        let d = dict(&[("ip-address", Value::from("10.0.0.1"))]);
        let alias = dict(&[("ip-address", Value::from("address"))]);

        let out = alias_keys(d, Some(alias)).unwrap();
        assert_eq!(out.get_attr("address").unwrap(), Value::from("10.0.0.1"));
        assert_eq!(out.get_attr("ip-address").unwrap(), Value::from("10.0.0.1"));
    }

    #[test]
    fn test_alias_keys_missing_source_is_error() {
        let d = dict(&[("a", Value::from(1))]);
        let alias = dict(&[("missing", Value::from("b"))]);
        assert!(alias_keys(d, Some(alias)).is_err());
    }

    #[test]
    fn test_map_values() {
        let d = dict(&[("a", Value::from(1)), ("b", Value::from(2))]);
        let values = map_values(d).unwrap();
        assert_eq!(values, Value::from(vec![Value::from(1), Value::from(2)]));
    }

    #[test]
    fn test_map_attributes_skips_missing() {
        let d = dict(&[("a", Value::from(1)), ("b", Value::from(2))]);
        let atts = Value::from(vec![Value::from("b"), Value::from("z"), Value::from("a")]);
        let out = map_attributes(d, atts).unwrap();
        assert_eq!(out, Value::from(vec![Value::from(2), Value::from(1)]));
    }

    #[test]
    fn test_select_and_drop_attributes() {
        let d = dict(&[
            ("a", Value::from(1)),
            ("b", Value::from(2)),
            ("c", Value::from(3)),
        ]);
        let atts = Value::from(vec![Value::from("a"), Value::from("c")]);

        let selected = select_attributes(d.clone(), atts.clone()).unwrap();
        assert!(selected.get_attr("b").unwrap().is_undefined());
        assert_eq!(selected.get_attr("c").unwrap(), Value::from(3));

        let dropped = drop_attributes(d, atts).unwrap();
        assert_eq!(dropped.get_attr("b").unwrap(), Value::from(2));
        assert!(dropped.get_attr("a").unwrap().is_undefined());
    }

    #[test]
    fn test_drop_attributes_scalar_key() {
        let d = dict(&[("a", Value::from(1)), ("b", Value::from(2))]);
        let dropped = drop_attributes(d, Value::from("a")).unwrap();
        assert!(dropped.get_attr("a").unwrap().is_undefined());
        assert_eq!(dropped.get_attr("b").unwrap(), Value::from(2));
    }

    #[test]
    fn test_sorted_get_first_match() {
        let d = dict(&[("fallback", Value::from("x")), ("primary", Value::from("y"))]);
        let out = sorted_get(
            d,
            Value::from(vec![Value::from("primary"), Value::from("fallback")]),
        )
        .unwrap();
        assert_eq!(out, Value::from("y"));
    }

    #[test]
    fn test_sorted_get_no_match_is_error() {
        let d = dict(&[("a", Value::from(1))]);
        let err = sorted_get(d, Value::from(vec![Value::from("x")])).unwrap_err();
        assert!(err.to_string().contains("none of"));
    }
}
