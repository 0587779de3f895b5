//! Serialization filters.
//!
//! # Available Filters
//!
//! - `to_safe_yaml`: render a data structure as a YAML document
//!
//! # Examples
//!
//! ```jinja2
//! {{ {'key': 'value'} | to_safe_yaml }}
//! ```

use minijinja::{Environment, Value};

/// Register all serialization filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("to_safe_yaml", to_safe_yaml);
}

/// Convert a data structure into a YAML document string.
fn to_safe_yaml(value: Value) -> String {
    serde_yaml::to_string(&value).unwrap_or_else(|_| "null".to_string())
}
