// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The environment variable scanner.
//!
//! Takes an explicit snapshot of the process environment rather than reading `std::env::vars()`
//! itself, so callers (and tests) control exactly what the engine sees.

use crate::error::Error;
use crate::ids::{CommandId, Role};
use crate::lookup::{self, LookupError};
use crate::rules;
use crate::slot::{SlotTable, Source};
use crate::value::ValueType;

pub const ENV_PREFIX: &str = "PGBACKREST_";

/// Fills slots from `env` that were not already set by the argument parser. Unknown names,
/// names that resolve to negate/reset, and options invalid for `(command, role)` only produce a
/// warning or silent skip, never a fatal error; an empty value is the sole fatal condition.
pub fn scan(env: &[(String, String)], command: CommandId, role: Role, slots: &mut SlotTable) -> Result<(), Error> {
    for (key, raw_value) in env {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else { continue };
        let name = suffix.to_lowercase().replace('_', "-");

        let lookup_result = match lookup::lookup(&name) {
            Ok(r) => r,
            Err(LookupError::Unknown) => {
                log::warn!("unrecognized environment option '{}{}'", ENV_PREFIX, suffix);
                continue;
            }
            Err(LookupError::KeyOutOfRange { group, min, max }) => {
                log::warn!(
                    "environment option '{}{}' has a key out of range for group '{}' ({}..={})",
                    ENV_PREFIX, suffix, group, min, max
                );
                continue;
            }
        };

        if lookup_result.negate || lookup_result.reset {
            log::warn!("environment option '{}{}' may not use a negate/reset prefix", ENV_PREFIX, suffix);
            continue;
        }

        let rule = lookup_result.option_id.rule();

        if !rule.valid_for(command, role) {
            continue;
        }

        if slots.is_found(lookup_result.option_id, lookup_result.key_idx) {
            continue;
        }

        if raw_value.is_empty() {
            return Err(Error::option_invalid_value(rule.name, "value must not be empty"));
        }

        let slot = slots.get_mut_or_default(lookup_result.option_id, lookup_result.key_idx);
        slot.source = Some(Source::Config);

        if rule.value_type == ValueType::Boolean {
            match raw_value.as_str() {
                "y" => slot.found = true,
                "n" => {
                    slot.found = true;
                    slot.negate = true;
                }
                _ => {
                    return Err(Error::option_invalid_value(rule.name, format!("'{}' is not 'y' or 'n'", raw_value)));
                }
            }
            continue;
        }

        slot.found = true;
        if rule.multi {
            slot.values.extend(raw_value.split(':').map(|s| s.to_string()));
        } else {
            slot.values.push(raw_value.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fills_unfound_slot() {
        let mut slots = SlotTable::new();
        scan(&env(&[("PGBACKREST_STANZA", "demo")]), CommandId::Info, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("stanza").unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["demo".to_string()]);
        assert_eq!(slots.get(id, 0).unwrap().source, Some(Source::Config));
    }

    #[test]
    fn does_not_overwrite_already_found_slot() {
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name("stanza").unwrap();
        slots.get_mut_or_default(id, 0).found = true;
        slots.get_mut_or_default(id, 0).values.push("from-cli".to_string());
        scan(&env(&[("PGBACKREST_STANZA", "demo")]), CommandId::Info, Role::Default, &mut slots).unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["from-cli".to_string()]);
    }

    #[test]
    fn empty_value_is_fatal() {
        let mut slots = SlotTable::new();
        assert!(scan(&env(&[("PGBACKREST_STANZA", "")]), CommandId::Info, Role::Default, &mut slots).is_err());
    }

    #[test]
    fn unknown_option_is_a_warning_not_an_error() {
        let mut slots = SlotTable::new();
        assert!(scan(&env(&[("PGBACKREST_NOT_REAL", "x")]), CommandId::Info, Role::Default, &mut slots).is_ok());
    }

    #[test]
    fn boolean_y_n_semantics() {
        let mut slots = SlotTable::new();
        scan(&env(&[("PGBACKREST_ONLINE", "n")]), CommandId::Backup, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("online").unwrap();
        assert!(slots.get(id, 0).unwrap().negate);
    }

    #[test]
    fn multi_valued_option_splits_on_colon() {
        let mut slots = SlotTable::new();
        scan(&env(&[("PGBACKREST_EXCLUDE", "a:b:c")]), CommandId::Restore, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("exclude").unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["a", "b", "c"]);
    }
}
