//! Network record filters.
//!
//! # Available Filters
//!
//! - `ip_range`: expand an IPv4 `start-end` specification into addresses
//! - `reverse_record`: turn an address record into its PTR counterpart
//! - `zone_fwd`: build a DNS forward-zone stanza
//!
//! # Examples
//!
//! ```jinja2
//! {{ '10.0.0.1-10.0.0.4' | ip_range }}
//! {{ record | reverse_record }}
//! {{ 'example.org' | zone_fwd(['10.0.0.2', '10.0.0.3']) }}
//! ```

use minijinja::{Environment, Value};
use std::net::Ipv4Addr;

use super::{invalid_input, seq_items};

/// Register all network filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("ip_range", ip_range);
    env.add_filter("reverse_record", reverse_record);
    env.add_filter("zone_fwd", zone_fwd);
}

/// Expand an IPv4 range specification into the list of addresses it covers.
///
/// The specification is either a single address or `start-end`, inclusive on
/// both ends.
fn ip_range(spec: String) -> Result<Value, minijinja::Error> {
    let parts: Vec<&str> = spec.split('-').collect();
    if parts.len() > 2 {
        return Err(invalid_input(format!("ip_range: invalid specification '{spec}'")));
    }
    let parse = |s: &str| {
        s.trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| invalid_input(format!("ip_range: invalid IPv4 address '{s}'")))
    };
    let start = parse(parts[0])?;
    let end = if parts.len() == 2 { parse(parts[1])? } else { start };

    let (lo, hi) = (u32::from(start), u32::from(end));
    if lo > hi {
        return Err(invalid_input(format!(
            "ip_range: start address must not exceed end address in '{spec}'"
        )));
    }

    Ok(Value::from(
        (lo..=hi)
            .map(|n| Ipv4Addr::from(n).to_string())
            .collect::<Vec<_>>(),
    ))
}

/// Reverse the address and hostname of a record for reverse DNS lookup.
///
/// Requires `ip-address` and `host` keys; the result is a PTR record with
/// the address rewritten into `in-addr.arpa` form.
fn reverse_record(record: Value) -> Result<Value, minijinja::Error> {
    let address = record
        .get_attr("ip-address")?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_input("reverse_record requires an 'ip-address' key"))?;
    let host = record.get_attr("host")?;
    if host.is_undefined() {
        return Err(invalid_input("reverse_record requires a 'host' key"));
    }

    let reversed: Vec<&str> = address.split('.').rev().collect();
    Ok(Value::from_iter([
        ("host", Value::from(format!("{}.in-addr.arpa", reversed.join(".")))),
        ("ip-address", host),
        ("type", Value::from("PTR")),
    ]))
}

/// Build a DNS forward zone configuration stanza.
fn zone_fwd(zone: String, servers: Value) -> Result<Value, minijinja::Error> {
    if seq_items(&servers).is_none() {
        return Err(invalid_input("zone_fwd requires a list of forwarders"));
    }
    let stanza = Value::from_iter([
        ("type", Value::from("forward")),
        ("forward", Value::from("only")),
        ("forwarders", servers),
    ]);
    Ok(Value::from_iter([(format!("zone \"{zone}\" IN"), stanza)]))
}
