//! Structural reshaping filters.
//!
//! Transforms between dictionaries, lists, and flattened key/value forms:
//!
//! - `map_format`: printf-style formatting of a value (or of every value in a
//!   dictionary, with per-key patterns)
//! - `to_dict`: turn a value into a dictionary, optionally through a key
//!   pattern mapping
//! - `merge_item` / `key_item`: pivot a `[key, data]` pair into a merged
//!   dictionary and back
//! - `dict_to_list` / `list_to_dict`: pivot a keyed dictionary into a list of
//!   records and back
//! - `to_kv`: flatten nested data into `{key, value}` records with compound
//!   dotted keys
//! - `map_flatten`: flatten nested data into a single-level dictionary
//! - `map_join` / `merge_join`: join selected attribute values into a string
//! - `map_group`: group a list of dictionaries by shared key attributes
//!
//! # Examples
//!
//! ```jinja2
//! {{ records | list_to_dict('name') }}
//! {{ config | to_kv(sep='.') }}
//! {{ servers | map_group(['datacenter']) }}
//! ```

use minijinja::value::ValueKind;
use minijinja::{Environment, Value};

use super::dicts::merged_value;
use super::{invalid_input, map_pairs, seq_items};

/// Register all reshaping filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("map_format", map_format);
    env.add_filter("to_dict", to_dict);
    env.add_filter("merge_item", merge_item);
    env.add_filter("key_item", key_item);
    env.add_filter("dict_to_list", dict_to_list);
    env.add_filter("list_to_dict", list_to_dict);
    env.add_filter("to_kv", to_kv);
    env.add_filter("map_flatten", map_flatten);
    env.add_filter("map_join", map_join);
    env.add_filter("merge_join", merge_join);
    env.add_filter("map_group", map_group);
}

/// Substitute a single `%s`/`%d` placeholder with the value.
///
/// Patterns without exactly one placeholder are returned unchanged, matching
/// the permissive behavior templates rely on.
fn percent_format(pattern: &str, value: &Value) -> Option<String> {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut substituted = 0;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                out.push('%');
                chars.next();
            }
            Some('s') => {
                out.push_str(&value.to_string());
                substituted += 1;
                chars.next();
            }
            Some('d') => {
                out.push_str(&i64::try_from(value.clone()).ok()?.to_string());
                substituted += 1;
                chars.next();
            }
            _ => return None,
        }
    }
    if substituted == 1 {
        Some(out)
    } else {
        None
    }
}

/// Apply printf-style string formatting on an object.
///
/// When both the value and the pattern are dictionaries, each value entry is
/// formatted with its matching pattern entry (default `%s`). Patterns that
/// cannot be applied are returned as-is.
fn map_format(value: Value, pattern: Value) -> Value {
    if value.kind() == ValueKind::Map && pattern.kind() == ValueKind::Map {
        let Some(pairs) = map_pairs(&value) else {
            return pattern;
        };
        let formatted: Vec<(Value, Value)> = pairs
            .into_iter()
            .map(|(k, v)| {
                let entry_pattern = pattern
                    .get_item(&k)
                    .ok()
                    .filter(|p| !p.is_undefined())
                    .unwrap_or_else(|| Value::from("%s"));
                (k.clone(), map_format(v, entry_pattern))
            })
            .collect();
        return Value::from_iter(formatted);
    }

    let pattern_text = match pattern.as_str() {
        Some(s) => s.to_string(),
        None => pattern.to_string(),
    };
    match percent_format(&pattern_text, &value) {
        Some(out) => Value::from(out),
        None => pattern,
    }
}

/// Convert a value into a dictionary.
///
/// Without a key the value must already be a mapping or a list of pairs.
/// A mapping key produces `{format(key): format(value)}` entries with the
/// piped value as the formatting argument; a scalar key wraps the value as
/// `{key: value}`.
fn to_dict(x: Value, key: Option<Value>) -> Result<Value, minijinja::Error> {
    match key {
        None => {
            if let Some(pairs) = map_pairs(&x) {
                return Ok(Value::from_iter(pairs));
            }
            let items = seq_items(&x)
                .ok_or_else(|| invalid_input("to_dict requires a mapping or a list of pairs"))?;
            let mut pairs = Vec::with_capacity(items.len());
            for item in items {
                let pair = seq_items(&item).filter(|p| p.len() == 2).ok_or_else(|| {
                    invalid_input("to_dict requires a list of [key, value] pairs")
                })?;
                pairs.push((pair[0].clone(), pair[1].clone()));
            }
            Ok(Value::from_iter(pairs))
        }
        Some(key) if key.kind() == ValueKind::Map => {
            let pairs = map_pairs(&key).unwrap_or_default();
            let formatted: Vec<(Value, Value)> = pairs
                .into_iter()
                .map(|(k, v)| (map_format(x.clone(), k), map_format(x.clone(), v)))
                .collect();
            Ok(Value::from_iter(formatted))
        }
        Some(key) => Ok(Value::from_iter([(key, x)])),
    }
}

/// Merge a `[key, data]` pair into one dictionary keyed by `key_attr`.
fn merge_item(item: Value, key_attr: Value) -> Result<Value, minijinja::Error> {
    let parts = seq_items(&item)
        .filter(|p| p.len() == 2)
        .ok_or_else(|| invalid_input("merge_item requires a [key, value] pair"))?;
    let data = map_pairs(&parts[1])
        .ok_or_else(|| invalid_input("merge_item requires dictionary data"))?;
    let keyed = to_dict(parts[0].clone(), Some(key_attr))?;
    let keyed_pairs = map_pairs(&keyed).unwrap_or_default();
    Ok(merged_value(data, keyed_pairs))
}

/// Split an item into `[key, remainder]` using `key_attr`.
///
/// A list-valued `key_attr` is treated as a nested key path; nested paths
/// cannot remove the key from the remainder.
fn key_item(
    item: Value,
    key_attr: Value,
    remove_key: Option<bool>,
) -> Result<Value, minijinja::Error> {
    let remove_key = remove_key.unwrap_or(true);

    if let Some(path) = seq_items(&key_attr) {
        if remove_key {
            return Err(invalid_input("key_item: remove_key must be false for nested attributes"));
        }
        let mut current = item.clone();
        for part in &path {
            current = current.get_item(part)?;
            if current.is_undefined() {
                return Err(invalid_input(format!("key_item: key '{part}' not found")));
            }
        }
        return Ok(Value::from(vec![current, item]));
    }

    let value = item.get_item(&key_attr)?;
    if value.is_undefined() {
        return Err(invalid_input(format!("key_item: key '{key_attr}' not found")));
    }
    let remainder: Vec<(Value, Value)> = map_pairs(&item)
        .ok_or_else(|| invalid_input("key_item requires a mapping"))?
        .into_iter()
        .filter(|(k, _)| !(remove_key && k.to_string() == key_attr.to_string()))
        .collect();
    Ok(Value::from(vec![value, Value::from_iter(remainder)]))
}

/// Convert a keyed dictionary into a list of merged records.
fn dict_to_list(d: Value, key_attr: Value) -> Result<Value, minijinja::Error> {
    let pairs = map_pairs(&d).ok_or_else(|| invalid_input("dict_to_list requires a mapping"))?;
    let mut out = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        out.push(merge_item(Value::from(vec![key, value]), key_attr.clone())?);
    }
    Ok(Value::from(out))
}

/// Convert a list of records into a dictionary keyed by `key_attr`.
fn list_to_dict(
    l: Value,
    key_attr: Value,
    remove_key: Option<bool>,
) -> Result<Value, minijinja::Error> {
    let items = seq_items(&l).ok_or_else(|| invalid_input("list_to_dict requires a list"))?;
    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        let keyed = key_item(item, key_attr.clone(), remove_key)?;
        let parts = seq_items(&keyed).unwrap_or_default();
        pairs.push((parts[0].clone(), parts[1].clone()));
    }
    Ok(Value::from_iter(pairs))
}

fn compound_key(prefix: &str, sep: &str, part: &str) -> String {
    if prefix.is_empty() {
        part.to_string()
    } else {
        format!("{prefix}{sep}{part}")
    }
}

fn to_kv_walk(value: &Value, sep: &str, prefix: &str, out: &mut Vec<Value>) {
    if let Some(pairs) = map_pairs(value) {
        for (k, v) in pairs {
            to_kv_walk(&v, sep, &compound_key(prefix, sep, &k.to_string()), out);
        }
    } else if let Some(items) = seq_items(value) {
        for (i, v) in items.iter().enumerate() {
            to_kv_walk(v, sep, &compound_key(prefix, sep, &i.to_string()), out);
        }
    } else {
        out.push(Value::from_iter([
            ("key", Value::from(prefix)),
            ("value", value.clone()),
        ]));
    }
}

/// Flatten nested data into a list of `{key, value}` records with compound
/// keys.
fn to_kv(d: Value, sep: Option<String>, prefix: Option<String>) -> Value {
    let sep = sep.unwrap_or_else(|| ".".to_string());
    let prefix = prefix.unwrap_or_default();
    let mut out = Vec::new();
    to_kv_walk(&d, &sep, &prefix, &mut out);
    Value::from(out)
}

fn map_flatten_walk(value: &Value, env: &str, out: &mut Vec<(Value, Value)>) {
    if let Some(pairs) = map_pairs(value) {
        for (k, v) in pairs {
            let key = compound_key(env, ".", &k.to_string());
            if matches!(v.kind(), ValueKind::Map | ValueKind::Seq) {
                map_flatten_walk(&v, &key, out);
            } else {
                out.push((Value::from(key), v));
            }
        }
    } else if let Some(items) = seq_items(value) {
        for (i, v) in items.iter().enumerate() {
            let key = compound_key(env, ".", &i.to_string());
            if matches!(v.kind(), ValueKind::Map | ValueKind::Seq) {
                map_flatten_walk(v, &key, out);
            } else {
                out.push((Value::from(key), v.clone()));
            }
        }
    }
}

/// Flatten a nested dictionary into a single-level dictionary with compound
/// dotted keys.
fn map_flatten(o: Value, env: Option<String>) -> Result<Value, minijinja::Error> {
    let env = env.unwrap_or_default();
    if env.is_empty() && o.kind() != ValueKind::Map {
        return Err(invalid_input("map_flatten requires a dictionary"));
    }
    let mut out = Vec::new();
    map_flatten_walk(&o, &env, &mut out);
    Ok(Value::from_iter(out))
}

fn joined_attributes(d: &Value, atts: &Value, sep: &str) -> Result<String, minijinja::Error> {
    let keys = seq_items(atts).ok_or_else(|| invalid_input("map_join requires a list of keys"))?;
    let mut parts = Vec::new();
    for key in keys {
        let value = d.get_item(&key)?;
        if !value.is_undefined() {
            parts.push(value.to_string());
        }
    }
    Ok(parts.join(sep))
}

/// Join the values of the listed keys into a single string.
fn map_join(d: Value, atts: Value, sep: Option<String>) -> Result<String, minijinja::Error> {
    let sep = sep.unwrap_or_else(|| " ".to_string());
    joined_attributes(&d, &atts, &sep)
}

/// Join the values of the listed keys and add the result back onto the
/// dictionary under `attr`.
fn merge_join(
    d: Value,
    attr: String,
    atts: Value,
    sep: Option<String>,
) -> Result<Value, minijinja::Error> {
    let sep = sep.unwrap_or_else(|| " ".to_string());
    let joined = joined_attributes(&d, &atts, &sep)?;
    let pairs = map_pairs(&d).ok_or_else(|| invalid_input("merge_join requires a mapping"))?;
    Ok(merged_value(
        pairs,
        vec![(Value::from(attr), Value::from(joined))],
    ))
}

/// Group a list of dictionaries by shared key attributes.
///
/// Each output record carries the grouping attributes plus a data field
/// (named by `group_att`, default `data`) collecting either each item's
/// remainder or, when `group_att` is given, that attribute's values. Items
/// missing a requested `group_att` are dropped.
fn map_group(
    l: Value,
    key_atts: Value,
    group_att: Option<String>,
) -> Result<Value, minijinja::Error> {
    let items = seq_items(&l).ok_or_else(|| invalid_input("map_group requires a list"))?;
    let keys = seq_items(&key_atts)
        .ok_or_else(|| invalid_input("map_group requires a list of key attributes"))?;
    let data_field = group_att.clone().unwrap_or_else(|| "data".to_string());

    let mut groups: indexmap::IndexMap<String, (Vec<(Value, Value)>, Vec<Value>)> =
        indexmap::IndexMap::new();

    for item in items {
        let pairs = map_pairs(&item)
            .ok_or_else(|| invalid_input("map_group requires a list of mappings"))?;

        let mut group_key = String::new();
        for key in &keys {
            let value = item.get_item(key)?;
            if !value.is_undefined() {
                group_key.push_str(&value.to_string());
            }
            group_key.push('\u{1f}');
        }

        let key_names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let header: Vec<(Value, Value)> = pairs
            .iter()
            .filter(|(k, _)| key_names.contains(&k.to_string()))
            .cloned()
            .collect();

        match &group_att {
            None => {
                let remainder: Vec<(Value, Value)> = pairs
                    .iter()
                    .filter(|(k, _)| !key_names.contains(&k.to_string()))
                    .cloned()
                    .collect();
                let slot = groups
                    .entry(group_key)
                    .or_insert_with(|| (header.clone(), Vec::new()));
                slot.0 = header;
                slot.1.push(Value::from_iter(remainder));
            }
            Some(att) => {
                let value = item.get_item(&Value::from(att.as_str()))?;
                // Items missing the requested attribute contribute nothing,
                // not even an empty group.
                if !value.is_undefined() {
                    let slot = groups
                        .entry(group_key)
                        .or_insert_with(|| (header.clone(), Vec::new()));
                    slot.0 = header;
                    slot.1.push(value);
                }
            }
        }
    }

    let out: Vec<Value> = groups
        .into_values()
        .map(|(header, data)| {
            let mut pairs = header;
            pairs.push((Value::from(data_field.as_str()), Value::from(data)));
            Value::from_iter(pairs)
        })
        .collect();
    Ok(Value::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, Value)]) -> Value {
        Value::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())))
    }

    #[test]
    fn test_percent_format_substitutes_once() {
        assert_eq!(
            percent_format("host-%s.example.org", &Value::from("web")),
            Some("host-web.example.org".to_string())
        );
        assert_eq!(percent_format("no placeholder", &Value::from("x")), None);
        assert_eq!(percent_format("%s and %s", &Value::from("x")), None);
    }

    #[test]
    fn test_map_format_scalar() {
        let out = map_format(Value::from("web"), Value::from("%s.example.org"));
        assert_eq!(out, Value::from("web.example.org"));
    }

    #[test]
    fn test_map_format_without_placeholder_returns_pattern() {
        let out = map_format(Value::from("web"), Value::from("static"));
        assert_eq!(out, Value::from("static"));
    }

    #[test]
    fn test_map_format_dict_with_default_pattern() {
        let value = dict(&[("a", Value::from("x")), ("b", Value::from("y"))]);
        let pattern = dict(&[("a", Value::from("%s!"))]);
        let out = map_format(value, pattern);
        assert_eq!(out.get_attr("a").unwrap(), Value::from("x!"));
        assert_eq!(out.get_attr("b").unwrap(), Value::from("y"));
    }

    #[test]
    fn test_to_dict_scalar_key() {
        let out = to_dict(Value::from(5), Some(Value::from("count"))).unwrap();
        assert_eq!(out.get_attr("count").unwrap(), Value::from(5));
    }

    #[test]
    fn test_to_dict_pattern_key() {
        let key = dict(&[("%s-name", Value::from("%s-value"))]);
        let out = to_dict(Value::from("x"), Some(key)).unwrap();
        assert_eq!(out.get_attr("x-name").unwrap(), Value::from("x-value"));
    }

    #[test]
    fn test_to_dict_pairs() {
        let pairs = Value::from(vec![
            Value::from(vec![Value::from("a"), Value::from(1)]),
            Value::from(vec![Value::from("b"), Value::from(2)]),
        ]);
        let out = to_dict(pairs, None).unwrap();
        assert_eq!(out.get_attr("b").unwrap(), Value::from(2));
    }

    #[test]
    fn test_key_item_removes_key() {
        let item = dict(&[("name", Value::from("web")), ("port", Value::from(80))]);
        let out = key_item(item, Value::from("name"), None).unwrap();
        let parts = seq_items(&out).unwrap();
        assert_eq!(parts[0], Value::from("web"));
        assert!(parts[1].get_attr("name").unwrap().is_undefined());
        assert_eq!(parts[1].get_attr("port").unwrap(), Value::from(80));
    }

    #[test]
    fn test_key_item_nested_path() {
        let item = dict(&[("a", dict(&[("b", Value::from(2))]))]);
        let out = key_item(
            item,
            Value::from(vec![Value::from("a"), Value::from("b")]),
            Some(false),
        )
        .unwrap();
        let parts = seq_items(&out).unwrap();
        assert_eq!(parts[0], Value::from(2));
    }

    #[test]
    fn test_key_item_nested_path_with_remove_is_error() {
        let item = dict(&[("a", dict(&[("b", Value::from(2))]))]);
        let err = key_item(
            item,
            Value::from(vec![Value::from("a"), Value::from("b")]),
            Some(true),
        )
        .unwrap_err();
        assert!(err.to_string().contains("remove_key"));
    }

    #[test]
    fn test_dict_to_list_round_trip() {
        let d = dict(&[
            ("web1", dict(&[("port", Value::from(80))])),
            ("web2", dict(&[("port", Value::from(81))])),
        ]);
        let listed = dict_to_list(d, Value::from("name")).unwrap();
        let items = seq_items(&listed).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get_attr("name").unwrap(), Value::from("web1"));
        assert_eq!(items[0].get_attr("port").unwrap(), Value::from(80));

        let back = list_to_dict(listed, Value::from("name"), None).unwrap();
        assert_eq!(
            back.get_attr("web2").unwrap().get_attr("port").unwrap(),
            Value::from(81)
        );
    }

    #[test]
    fn test_to_kv_compound_keys() {
        let d = dict(&[(
            "db",
            dict(&[("host", Value::from("h")), ("ports", Value::from(vec![Value::from(1)]))]),
        )]);
        let out = to_kv(d, None, None);
        let items = seq_items(&out).unwrap();
        let keys: Vec<String> = items
            .iter()
            .map(|i| i.get_attr("key").unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["db.host", "db.ports.0"]);
    }

    #[test]
    fn test_map_flatten() {
        let d = dict(&[
            ("a", dict(&[("b", Value::from(1))])),
            ("c", Value::from(2)),
        ]);
        let out = map_flatten(d, None).unwrap();
        assert_eq!(out.get_attr("a.b").unwrap(), Value::from(1));
        assert_eq!(out.get_attr("c").unwrap(), Value::from(2));
    }

    #[test]
    fn test_map_flatten_requires_dict() {
        assert!(map_flatten(Value::from(vec![Value::from(1)]), None).is_err());
    }

    #[test]
    fn test_map_join() {
        let d = dict(&[("a", Value::from("x")), ("b", Value::from(2))]);
        let atts = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(map_join(d, atts, Some("-".into())).unwrap(), "x-2");
    }

    #[test]
    fn test_merge_join_adds_attribute() {
        let d = dict(&[("a", Value::from("x")), ("b", Value::from("y"))]);
        let atts = Value::from(vec![Value::from("a"), Value::from("b")]);
        let out = merge_join(d, "joined".to_string(), atts, None).unwrap();
        assert_eq!(out.get_attr("joined").unwrap(), Value::from("x y"));
        assert_eq!(out.get_attr("a").unwrap(), Value::from("x"));
    }

    #[test]
    fn test_map_group_collects_remainders() {
        let l = Value::from(vec![
            dict(&[("dc", Value::from("ams")), ("host", Value::from("h1"))]),
            dict(&[("dc", Value::from("ams")), ("host", Value::from("h2"))]),
            dict(&[("dc", Value::from("fra")), ("host", Value::from("h3"))]),
        ]);
        let out = map_group(l, Value::from(vec![Value::from("dc")]), None).unwrap();
        let groups = seq_items(&out).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].get_attr("dc").unwrap(), Value::from("ams"));
        let data = seq_items(&groups[0].get_attr("data").unwrap()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].get_attr("host").unwrap(), Value::from("h1"));
    }

    #[test]
    fn test_map_group_with_group_att() {
        let l = Value::from(vec![
            dict(&[("dc", Value::from("ams")), ("host", Value::from("h1"))]),
            dict(&[("dc", Value::from("ams"))]),
        ]);
        let out = map_group(
            l,
            Value::from(vec![Value::from("dc")]),
            Some("host".to_string()),
        )
        .unwrap();
        let groups = seq_items(&out).unwrap();
        assert_eq!(groups.len(), 1);
        let hosts = seq_items(&groups[0].get_attr("host").unwrap()).unwrap();
        assert_eq!(hosts, vec![Value::from("h1")]);
    }
}
