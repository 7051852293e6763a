// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Option name resolution: `name` → `{option_id, key_idx, negate, reset, deprecated}`.
//!
//! Returned as a small struct rather than a packed integer, per the redesign note. Indexed
//! option names (`pg3-path`) are resolved dynamically by splitting the decimal run out of the
//! name and validating it against the owning group's configured key range, rather than
//! pre-expanding every admissible key into the static table.

use crate::ids::{GroupId, OptionId};
use crate::rules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub option_id: OptionId,
    /// 0-based internal key index (always 0 for ungrouped options).
    pub key_idx: u32,
    pub negate: bool,
    pub reset: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Unknown,
    /// The name parsed as an indexed option, but the key fell outside the group's admissible
    /// range.
    KeyOutOfRange { group: &'static str, min: u32, max: u32 },
}

/// Resolves a raw option name (the part after `--`, `no-`/`reset-` prefix not yet stripped).
pub fn lookup(raw_name: &str) -> Result<LookupResult, LookupError> {
    if let Some(rest) = raw_name.strip_prefix("no-") {
        let mut base = resolve_base(rest)?;
        if !base_rule(&base).negatable() {
            return Err(LookupError::Unknown);
        }
        base.negate = true;
        return Ok(base);
    }
    if let Some(rest) = raw_name.strip_prefix("reset-") {
        let mut base = resolve_base(rest)?;
        if base_rule(&base).secure {
            return Err(LookupError::Unknown);
        }
        base.reset = true;
        return Ok(base);
    }
    resolve_base(raw_name)
}

fn base_rule(r: &LookupResult) -> &'static rules::OptionRule {
    r.option_id.rule()
}

/// Resolves a canonical or deprecated-alias name, with optional group-index prefix, to a base
/// (non-negated, non-reset) lookup result.
fn resolve_base(name: &str) -> Result<LookupResult, LookupError> {
    // Try a direct (ungrouped, or group-selector) match first, including deprecated aliases.
    if let Some(result) = try_direct(name) {
        return Ok(result);
    }
    // Otherwise, try splitting a leading group name + decimal key + trailing suffix, e.g.
    // "pg3-path" -> group "pg", key 3, suffix "-path" -> canonical option "pg-path".
    for group in rules::GROUPS {
        if let Some(rest) = name.strip_prefix(group.name) {
            let digit_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digit_len == 0 {
                continue;
            }
            let (digits, suffix) = rest.split_at(digit_len);
            let key: u32 = match digits.parse() {
                Ok(k) => k,
                Err(_) => continue,
            };
            if key < group.min_key || key > group.max_key {
                return Err(LookupError::KeyOutOfRange { group: group.name, min: group.min_key, max: group.max_key });
            }
            let canonical = format!("{}{}", group.name, suffix);
            if let Some(option_id) = rules::option_id_by_name(&canonical) {
                if option_id.rule().group == Some(group.id) {
                    return Ok(LookupResult {
                        option_id,
                        key_idx: key - group.min_key,
                        negate: false,
                        reset: false,
                        deprecated: false,
                    });
                }
            }
        }
    }
    Err(LookupError::Unknown)
}

fn try_direct(name: &str) -> Option<LookupResult> {
    if let Some(id) = rules::option_id_by_name(name) {
        return Some(LookupResult { option_id: id, key_idx: 0, negate: false, reset: false, deprecated: false });
    }
    for rule in rules::option_rules() {
        if rule.deprecated_aliases.contains(&name) {
            let id = rules::option_id_by_name(rule.name).expect("rule indexed by its own name");
            return Some(LookupResult { option_id: id, key_idx: 0, negate: false, reset: false, deprecated: true });
        }
    }
    None
}

/// The group (if any) that owns `option_id`, for callers that need to map a key index back to
/// an external key for error messages.
pub fn owning_group(option_id: OptionId) -> Option<GroupId> {
    option_id.rule().group
}

/// Suggests the closest canonical option name to an unrecognised one, for "did you mean"-style
/// hints in `OptionInvalid` messages. `None` when nothing is close enough to be useful.
#[cfg(feature = "suggestions")]
pub fn suggest(name: &str) -> Option<&'static str> {
    const MAX_DISTANCE: usize = 3;
    rules::option_rules()
        .iter()
        .map(|rule| (rule.name, strsim::levenshtein(name, rule.name)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= MAX_DISTANCE)
        .map(|(name, _)| name)
}

#[cfg(not(feature = "suggestions"))]
pub fn suggest(_name: &str) -> Option<&'static str> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_name() {
        let r = lookup("stanza").unwrap();
        assert_eq!(r.option_id.rule().name, "stanza");
        assert!(!r.negate && !r.reset);
    }

    #[test]
    fn resolves_negated_boolean() {
        let r = lookup("no-online").unwrap();
        assert_eq!(r.option_id.rule().name, "online");
        assert!(r.negate);
    }

    #[test]
    fn resolves_reset() {
        let r = lookup("reset-compress-level").unwrap();
        assert_eq!(r.option_id.rule().name, "compress-level");
        assert!(r.reset);
    }

    #[test]
    fn rejects_reset_on_secure_option() {
        assert_eq!(lookup("reset-repo1-cipher-pass"), Err(LookupError::Unknown));
    }

    #[test]
    fn resolves_indexed_group_option() {
        let r = lookup("pg3-path").unwrap();
        assert_eq!(r.option_id.rule().name, "pg-path");
        assert_eq!(r.key_idx, 2);
    }

    #[test]
    fn rejects_out_of_range_group_key() {
        assert_eq!(
            lookup("pg99-path"),
            Err(LookupError::KeyOutOfRange { group: "pg", min: 1, max: 8 })
        );
    }

    #[test]
    fn resolves_deprecated_alias() {
        let r = lookup("log-level").unwrap();
        assert_eq!(r.option_id.rule().name, "log-level-console");
        assert!(r.deprecated);
    }

    #[test]
    fn no_config_negates_despite_non_boolean_type() {
        let r = lookup("no-config").unwrap();
        assert_eq!(r.option_id.rule().name, "config");
        assert!(r.negate);
    }

    #[test]
    #[cfg(feature = "suggestions")]
    fn suggests_close_misspelling() {
        assert_eq!(suggest("stanz"), Some("stanza"));
    }

    #[test]
    #[cfg(feature = "suggestions")]
    fn suggests_nothing_for_unrelated_input() {
        assert_eq!(suggest("xxxxxxxxxxxxxxxxxxxx"), None);
    }
}
