//! Jinja2-compatible filter plugins.
//!
//! Utility filters for template-driven data manipulation, organized into
//! categories:
//!
//! - **dicts**: dictionary access and merging (merge, alias, select, drop)
//! - **reshape**: structural transforms (flatten, group, key/value pivots)
//! - **strings**: string and sequence helpers (split, join, head, tail)
//! - **network**: DNS and address-range helpers
//! - **serialization**: YAML rendering
//!
//! # Usage
//!
//! ```rust,ignore
//! use plugible::plugins::filter::FilterRegistry;
//! use minijinja::Environment;
//!
//! let mut env = Environment::new();
//! FilterRegistry::register_all(&mut env);
//! ```

pub mod dicts;
pub mod network;
pub mod reshape;
pub mod serialization;
pub mod strings;

use minijinja::value::ValueKind;
use minijinja::{Environment, Error, ErrorKind, Value};

/// Registry for managing and registering filter plugins.
pub struct FilterRegistry;

impl FilterRegistry {
    /// Register all available filters with the given environment.
    pub fn register_all(env: &mut Environment<'static>) {
        dicts::register_filters(env);
        reshape::register_filters(env);
        strings::register_filters(env);
        network::register_filters(env);
        serialization::register_filters(env);
    }

    /// Register only dictionary filters.
    pub fn register_dicts(env: &mut Environment<'static>) {
        dicts::register_filters(env);
    }

    /// Register only reshaping filters.
    pub fn register_reshape(env: &mut Environment<'static>) {
        reshape::register_filters(env);
    }

    /// Register only string and sequence filters.
    pub fn register_strings(env: &mut Environment<'static>) {
        strings::register_filters(env);
    }

    /// Register only network filters.
    pub fn register_network(env: &mut Environment<'static>) {
        network::register_filters(env);
    }

    /// Register only serialization filters.
    pub fn register_serialization(env: &mut Environment<'static>) {
        serialization::register_filters(env);
    }
}

/// Collect the items of a sequence value.
pub(crate) fn seq_items(value: &Value) -> Option<Vec<Value>> {
    if value.kind() == ValueKind::Seq {
        value.try_iter().ok().map(Iterator::collect)
    } else {
        None
    }
}

/// Collect the key/value pairs of a mapping value, in mapping order.
pub(crate) fn map_pairs(value: &Value) -> Option<Vec<(Value, Value)>> {
    if value.kind() != ValueKind::Map {
        return None;
    }
    let keys: Vec<Value> = value.try_iter().ok()?.collect();
    let mut pairs = Vec::with_capacity(keys.len());
    for key in keys {
        let item = value.get_item(&key).ok()?;
        pairs.push((key, item));
    }
    Some(pairs)
}

/// Build an `InvalidOperation` error for filter misuse.
pub(crate) fn invalid_input(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}
