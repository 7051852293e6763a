// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The dependency + type validator: walks every option in the pre-computed resolve order,
//! applies `depend` constraints, coerces raw strings to typed values, and enforces
//! `allow_range`/`allow_list`.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::groups::ResolvedGroup;
use crate::ids::{CommandId, OptionId, Role};
use crate::rules::{self, OptionRule, Section};
use crate::slot::{Slot, SlotTable, Source};
use crate::value::{self, Value, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    pub source: Option<Source>,
    pub negate: bool,
    pub value: Option<Value>,
}

/// Map from `(option_id, dense_group_index)` to its resolved value. Ungrouped options are always
/// keyed at dense index 0. An absent entry means the option is fully unset (no default, not
/// required, or its `depend` was unsatisfied).
pub type ResolvedTable = BTreeMap<(OptionId, usize), ResolvedOption>;

pub fn resolve(
    slots: &SlotTable,
    groups: &[ResolvedGroup],
    command: CommandId,
    role: Role,
    help: bool,
) -> Result<ResolvedTable, Error> {
    let mut resolved: ResolvedTable = BTreeMap::new();

    for option_id in rules::resolve_order() {
        let option_id = *option_id;
        let rule = option_id.rule();
        let eff = rules::effective_rule(option_id, command);

        let dense_indices: Vec<(usize, u32)> = match rule.group {
            Some(gid) => {
                let g = groups.iter().find(|g| g.id == gid).expect("every GroupId has a resolved group");
                (0..g.index_total).map(|dense| (dense, g.index_map[dense])).collect()
            }
            None => vec![(0usize, 0u32)],
        };

        for (dense_idx, key_idx) in dense_indices {
            let slot = slots.get(option_id, key_idx);

            if !rule.valid_for(command, role) {
                if user_set_on_cmdline(slot) {
                    return Err(Error::option_invalid(rule.name, format!("is not valid for command '{}'", command)));
                }
                continue;
            }

            if let Some((dep_name, allowed)) = eff.depend {
                let dep_id = rules::option_id_by_name(dep_name).expect("depend target is itself a registered option");
                let satisfied = dependency_satisfied(&resolved, dep_id, dense_idx, allowed);
                if !satisfied {
                    if user_set_on_cmdline(slot) {
                        let allowed_desc = if allowed.is_empty() {
                            "any value".to_string()
                        } else {
                            format!("({})", allowed.iter().map(|a| format!("'{}'", a)).collect::<Vec<_>>().join(", "))
                        };
                        return Err(Error::option_invalid(
                            rule.name,
                            format!("not valid without option '{}' in {}", dep_name, allowed_desc),
                        ));
                    }
                    continue;
                }
            }

            let has_occurrence = slot.map(|s| s.found && !s.reset).unwrap_or(false);

            if has_occurrence {
                let s = slot.unwrap();
                if rule.value_type == ValueType::Boolean {
                    resolved.insert((option_id, dense_idx), ResolvedOption { source: s.source, negate: false, value: Some(Value::Bool(!s.negate)) });
                } else if s.negate {
                    resolved.insert((option_id, dense_idx), ResolvedOption { source: s.source, negate: true, value: None });
                } else {
                    let value = coerce_typed(rule, &s.values)?;
                    check_constraints(rule, eff, &value)?;
                    resolved.insert((option_id, dense_idx), ResolvedOption { source: s.source, negate: false, value: Some(value) });
                }
                continue;
            }

            if let Some(default) = eff.default {
                let value = coerce_default(rule, default)?;
                resolved.insert((option_id, dense_idx), ResolvedOption { source: Some(Source::Default), negate: false, value: Some(value) });
                continue;
            }

            if eff.required && !help {
                let hint = match rule.section {
                    Section::StanzaOnly => Some(" (must be set within a stanza section)".to_string()),
                    _ => None,
                };
                return Err(Error::OptionRequired { option: rule.name.to_string(), hint });
            }
        }
    }

    Ok(resolved)
}

fn user_set_on_cmdline(slot: Option<&Slot>) -> bool {
    slot.map(|s| s.found && s.source == Some(Source::Param)).unwrap_or(false)
}

fn dependency_satisfied(resolved: &ResolvedTable, dep_id: OptionId, dense_idx: usize, allowed: &[&'static str]) -> bool {
    let Some(dep) = resolved.get(&(dep_id, dense_idx)) else { return false };
    let Some(value) = &dep.value else { return false };
    if allowed.is_empty() {
        return true;
    }
    let compare = value.as_compare_string();
    allowed.contains(&compare.as_str())
}

fn coerce_typed(rule: &OptionRule, raw_values: &[String]) -> Result<Value, Error> {
    let first = raw_values.first().map(String::as_str).unwrap_or("");
    match rule.value_type {
        ValueType::Boolean => unreachable!("boolean options are handled before coercion"),
        ValueType::Integer => first
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::option_invalid_value(rule.name, format!("'{}' is not a valid integer", first))),
        ValueType::Size => value::parse_size(rule.name, first).map(Value::Int),
        ValueType::Time => value::parse_time_ms(rule.name, first).map(Value::Int),
        ValueType::Path => value::normalize_path(rule.name, first).map(Value::Str),
        ValueType::String => {
            if first.is_empty() {
                return Err(Error::option_invalid_value(rule.name, "value must not be empty"));
            }
            Ok(Value::Str(first.to_string()))
        }
        ValueType::Hash => value::parse_hash(rule.name, raw_values).map(Value::Map),
        ValueType::List => Ok(Value::List(raw_values.to_vec())),
    }
}

fn coerce_default(rule: &OptionRule, default: &str) -> Result<Value, Error> {
    if rule.value_type == ValueType::Boolean {
        return Ok(Value::Bool(default == "1"));
    }
    coerce_typed(rule, std::slice::from_ref(&default.to_string()))
}

fn check_constraints(rule: &OptionRule, eff: &rules::EffectiveRule, value: &Value) -> Result<(), Error> {
    if let Some((lo, hi)) = eff.allow_range {
        let n = value.as_int().expect("allow_range is only declared on integer-typed options");
        if n < lo || n > hi {
            return Err(Error::option_invalid_value(rule.name, format!("{} is out of range {}..={}", n, lo, hi)));
        }
    }
    if let Some(list) = eff.allow_list {
        let compare = value.as_compare_string();
        if !list.contains(&compare.as_str()) {
            let choices = list.iter().map(|v| format!("'{}'", v)).collect::<Vec<_>>().join(", ");
            return Err(Error::option_invalid_value(rule.name, format!("'{}' is not one of {}", compare, choices)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups;
    use crate::slot::SlotTable;

    fn resolved_groups(slots: &SlotTable, command: CommandId) -> Vec<ResolvedGroup> {
        groups::resolve(slots, command, Role::Default).unwrap()
    }

    #[test]
    fn compress_level_out_of_range_is_fatal() {
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name("compress-level").unwrap();
        slots.get_mut_or_default(id, 0).found = true;
        slots.get_mut_or_default(id, 0).values.push("12".to_string());
        slots.get_mut_or_default(id, 0).source = Some(Source::Param);
        let groups = resolved_groups(&slots, CommandId::Backup);
        let err = resolve(&slots, &groups, CommandId::Backup, Role::Default, false).unwrap_err();
        assert!(matches!(err, Error::OptionInvalidValue { .. }));
    }

    #[test]
    fn recovery_option_without_type_in_allowed_set_is_fatal() {
        let mut slots = SlotTable::new();
        // `type` is explicitly set to a value outside recovery-option's allowed set, so the
        // depend check fails even though `type` itself has a default.
        let type_id = rules::option_id_by_name("type").unwrap();
        slots.get_mut_or_default(type_id, 0).found = true;
        slots.get_mut_or_default(type_id, 0).values.push("name".to_string());
        slots.get_mut_or_default(type_id, 0).source = Some(Source::Param);
        let recovery_id = rules::option_id_by_name("recovery-option").unwrap();
        slots.get_mut_or_default(recovery_id, 0).found = true;
        slots.get_mut_or_default(recovery_id, 0).values.push("a=1".to_string());
        slots.get_mut_or_default(recovery_id, 0).source = Some(Source::Param);
        let groups = resolved_groups(&slots, CommandId::Restore);
        let err = resolve(&slots, &groups, CommandId::Restore, Role::Default, false).unwrap_err();
        assert!(matches!(err, Error::OptionInvalid { .. }));
    }

    #[test]
    fn recovery_option_resolves_when_type_satisfies_depend() {
        let mut slots = SlotTable::new();
        let type_id = rules::option_id_by_name("type").unwrap();
        slots.get_mut_or_default(type_id, 0).found = true;
        slots.get_mut_or_default(type_id, 0).values.push("immediate".to_string());
        slots.get_mut_or_default(type_id, 0).source = Some(Source::Param);
        let recovery_id = rules::option_id_by_name("recovery-option").unwrap();
        slots.get_mut_or_default(recovery_id, 0).found = true;
        slots.get_mut_or_default(recovery_id, 0).values.push("a=1".to_string());
        slots.get_mut_or_default(recovery_id, 0).source = Some(Source::Param);

        let groups = resolved_groups(&slots, CommandId::Restore);
        let resolved = resolve(&slots, &groups, CommandId::Restore, Role::Default, false).unwrap();
        let entry = resolved.get(&(recovery_id, 0)).unwrap();
        assert_eq!(entry.value.as_ref().unwrap().as_map().unwrap().get("a"), Some(&"1".to_string()));
    }

    #[test]
    fn missing_required_pg_path_is_fatal() {
        let slots = SlotTable::new();
        let groups = resolved_groups(&slots, CommandId::Backup);
        let err = resolve(&slots, &groups, CommandId::Backup, Role::Default, false).unwrap_err();
        assert!(matches!(err, Error::OptionRequired { .. }));
    }

    #[test]
    fn missing_required_is_not_fatal_in_help_mode() {
        let slots = SlotTable::new();
        let groups = resolved_groups(&slots, CommandId::Backup);
        assert!(resolve(&slots, &groups, CommandId::Backup, Role::Default, true).is_ok());
    }

    #[test]
    fn boolean_default_applies_when_unset() {
        let slots = SlotTable::new();
        let groups = resolved_groups(&slots, CommandId::Backup);
        let resolved = resolve(&slots, &groups, CommandId::Backup, Role::Default, true).unwrap();
        let online_id = rules::option_id_by_name("online").unwrap();
        assert_eq!(resolved.get(&(online_id, 0)).unwrap().value, Some(Value::Bool(true)));
    }

    #[test]
    fn negated_boolean_resolves_to_false() {
        let mut slots = SlotTable::new();
        let online_id = rules::option_id_by_name("online").unwrap();
        slots.get_mut_or_default(online_id, 0).found = true;
        slots.get_mut_or_default(online_id, 0).negate = true;
        slots.get_mut_or_default(online_id, 0).source = Some(Source::Param);
        let groups = resolved_groups(&slots, CommandId::Backup);
        let resolved = resolve(&slots, &groups, CommandId::Backup, Role::Default, true).unwrap();
        assert_eq!(resolved.get(&(online_id, 0)).unwrap().value, Some(Value::Bool(false)));
    }

    #[test]
    fn invalid_for_command_when_set_on_cmdline_is_fatal() {
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name("compress-level").unwrap();
        slots.get_mut_or_default(id, 0).found = true;
        slots.get_mut_or_default(id, 0).values.push("5".to_string());
        slots.get_mut_or_default(id, 0).source = Some(Source::Param);
        let groups = resolved_groups(&slots, CommandId::Info);
        assert!(resolve(&slots, &groups, CommandId::Info, Role::Default, false).is_err());
    }

    #[test]
    fn size_coercion_applies_multiplier() {
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name("buffer-size").unwrap();
        slots.get_mut_or_default(id, 0).found = true;
        slots.get_mut_or_default(id, 0).values.push("2kb".to_string());
        slots.get_mut_or_default(id, 0).source = Some(Source::Param);
        let groups = resolved_groups(&slots, CommandId::Backup);
        let resolved = resolve(&slots, &groups, CommandId::Backup, Role::Default, true).unwrap();
        assert_eq!(resolved.get(&(id, 0)).unwrap().value, Some(Value::Int(2048)));
    }
}
