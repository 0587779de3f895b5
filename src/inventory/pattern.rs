//! Host pattern expansion.
//!
//! A host pattern is a compact string describing one or many host names:
//! literal names, comma-separated alternatives, numeric ranges (`node[01:03]`,
//! `node[0:8:2]`), alphabetic ranges (`node[a:c]`), and an optional `:port`
//! suffix outside any bracket expression. Numeric ranges preserve the
//! zero-padding of their start bound.

use super::{InventoryError, InventoryResult};

/// Expand a host pattern into concrete host names plus an optional port.
///
/// `"node[01:03]"` expands to `node01`, `node02`, `node03` with no port;
/// `"node:2222"` expands to `node` with port `2222`.
pub fn expand(pattern: &str) -> InventoryResult<(Vec<String>, Option<u16>)> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(invalid(pattern, "pattern is empty"));
    }

    let (body, port) = split_port(pattern)?;

    let mut hosts = Vec::new();
    for term in split_terms(body) {
        let term = term.trim();
        if term.is_empty() {
            return Err(invalid(pattern, "pattern contains an empty element"));
        }
        hosts.extend(expand_ranges(term, pattern)?);
    }

    Ok((hosts, port))
}

fn invalid(pattern: &str, message: &str) -> InventoryError {
    InventoryError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}

/// Split a trailing `:port` suffix off the pattern. The colon must sit outside
/// any bracket expression and the suffix must be numeric.
fn split_port(pattern: &str) -> InventoryResult<(&str, Option<u16>)> {
    let mut depth = 0usize;
    let mut colon = None;
    for (i, ch) in pattern.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => colon = Some(i),
            _ => {}
        }
    }

    let Some(i) = colon else {
        return Ok((pattern, None));
    };

    let suffix = &pattern[i + 1..];
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(pattern, "port suffix must be numeric"));
    }
    let port: u16 = suffix
        .parse()
        .map_err(|_| invalid(pattern, "port suffix is out of range"))?;
    Ok((&pattern[..i], Some(port)))
}

/// Split on commas outside bracket expressions.
fn split_terms(pattern: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in pattern.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&pattern[start..]);
    terms
}

/// Expand every bracket range in a single term, left to right.
fn expand_ranges(term: &str, pattern: &str) -> InventoryResult<Vec<String>> {
    let Some(open) = term.find('[') else {
        return Ok(vec![term.to_string()]);
    };
    let close = term[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| invalid(pattern, "unclosed '[' in range expression"))?;

    let head = &term[..open];
    let spec = &term[open + 1..close];
    let rest = &term[close + 1..];

    let values = expand_range_spec(spec, pattern)?;
    let tails = expand_ranges(rest, pattern)?;

    let mut out = Vec::with_capacity(values.len() * tails.len());
    for value in &values {
        for tail in &tails {
            out.push(format!("{head}{value}{tail}"));
        }
    }
    Ok(out)
}

/// Expand a single `start:end[:step]` range specification.
fn expand_range_spec(spec: &str, pattern: &str) -> InventoryResult<Vec<String>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid(pattern, "range must have the form [start:end] or [start:end:step]"));
    }

    let step: usize = match parts.get(2) {
        Some(raw) => raw
            .parse()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| invalid(pattern, "range step must be a positive integer"))?,
        None => 1,
    };

    let (start, end) = (parts[0], parts[1]);
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let alpha = |s: &str| s.len() == 1 && s.as_bytes()[0].is_ascii_alphabetic();

    if numeric(start) && numeric(end) {
        let lo: u64 = start
            .parse()
            .map_err(|_| invalid(pattern, "range start is out of range"))?;
        let hi: u64 = end
            .parse()
            .map_err(|_| invalid(pattern, "range end is out of range"))?;
        if lo > hi {
            return Err(invalid(pattern, "range start must not exceed range end"));
        }
        // Ranges like [01:03] keep the zero-padded width of the start bound.
        let width = if start.len() > 1 && start.starts_with('0') {
            start.len()
        } else {
            0
        };
        Ok((lo..=hi)
            .step_by(step)
            .map(|n| format!("{n:0width$}"))
            .collect())
    } else if alpha(start) && alpha(end) {
        let lo = start.as_bytes()[0];
        let hi = end.as_bytes()[0];
        if lo > hi {
            return Err(invalid(pattern, "range start must not exceed range end"));
        }
        Ok((lo..=hi)
            .step_by(step)
            .filter(|b| b.is_ascii_alphabetic())
            .map(|b| (b as char).to_string())
            .collect())
    } else {
        Err(invalid(
            pattern,
            "range bounds must be both numeric or both single letters",
        ))
    }
}
