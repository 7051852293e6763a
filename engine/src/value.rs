// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Option value types, and the type coercion rules from the dependency + type validator.

use std::collections::BTreeMap;

use regex::Regex;
use std::sync::OnceLock;

use crate::error::Error;

/// The value type an [`crate::rules::OptionRule`] is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Integer,
    Size,
    Time,
    String,
    Path,
    Hash,
    List,
}

/// A fully typed, coerced option value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Value {
    /// The coerced value rendered back to a string, used for `allow_list` membership checks
    /// (every allow-listed type other than `size` compares against the original raw string, but
    /// `size` compares against its coerced numeric string per the design's validator rules).
    pub fn as_compare_string(&self) -> String {
        match self {
            Value::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => items.join(":"),
            Value::Map(map) => map.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(","),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

fn size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)(kb|mb|gb|tb|pb|b|k|m|g|t|p)?$").unwrap())
}

fn size_multiplier(qualifier: &str) -> i64 {
    match qualifier.chars().next() {
        Some('k') => 1024,
        Some('m') => 1024 * 1024,
        Some('g') => 1024 * 1024 * 1024,
        Some('t') => 1024_i64.pow(4),
        Some('p') => 1024_i64.pow(5),
        _ => 1,
    }
}

/// Parses a `size` value per §4.7: digits plus an optional unit qualifier, case-insensitive,
/// with a trailing `b` immediately after a unit letter treated identically to the bare letter.
pub fn parse_size(option: &str, raw: &str) -> Result<i64, Error> {
    let lowered = raw.to_lowercase();
    let caps = size_regex().captures(&lowered).ok_or_else(|| Error::FormatError {
        option: option.to_string(),
        reason: format!("'{}' is not a valid size", raw),
    })?;
    let digits: i64 = caps[1].parse().map_err(|_| Error::FormatError {
        option: option.to_string(),
        reason: format!("'{}' is not a valid size", raw),
    })?;
    let qualifier = caps.get(2).map(|m| m.as_str()).unwrap_or("b");
    Ok(digits * size_multiplier(qualifier))
}

/// Parses a `time` value: fractional seconds, converted to whole milliseconds.
pub fn parse_time_ms(option: &str, raw: &str) -> Result<i64, Error> {
    let seconds: f64 = raw.parse().map_err(|_| Error::FormatError {
        option: option.to_string(),
        reason: format!("'{}' is not a valid time", raw),
    })?;
    Ok((seconds * 1000.0).round() as i64)
}

/// Normalizes a `path` value: must start with `/`, must not contain `//`, trailing `/` stripped
/// (unless the value is exactly `/`).
pub fn normalize_path(option: &str, raw: &str) -> Result<String, Error> {
    if !raw.starts_with('/') {
        return Err(Error::option_invalid_value(option, format!("'{}' is not an absolute path", raw)));
    }
    if raw.contains("//") {
        return Err(Error::option_invalid_value(option, format!("'{}' contains '//'", raw)));
    }
    if raw == "/" {
        return Ok(raw.to_string());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Parses a `hash` value's raw `k=v` entries into an ordered map.
pub fn parse_hash(option: &str, raw_values: &[String]) -> Result<BTreeMap<String, String>, Error> {
    let mut map = BTreeMap::new();
    for entry in raw_values {
        let (k, v) = entry.split_once('=').ok_or_else(|| {
            Error::option_invalid_value(option, format!("'{}' is not a valid key=value pair", entry))
        })?;
        map.insert(k.to_string(), v.to_string());
    }
    Ok(map)
}
