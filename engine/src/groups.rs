// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The group index resolver: collapses the sparse key indices a user actually supplied into a
//! dense `indexMap`, and picks a default index from the group's selector option (`--pg`, `--repo`).

use crate::error::Error;
use crate::ids::{CommandId, GroupId, OptionId, Role};
use crate::rules::{self, OptionGroupRule};
use crate::slot::SlotTable;

/// Resolved state for one option group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub id: GroupId,
    pub name: &'static str,
    pub valid: bool,
    pub index_total: usize,
    /// `index_map[dense] == sparse key_idx`, strictly increasing.
    pub index_map: Vec<u32>,
    pub index_default: usize,
    pub index_default_exists: bool,
}

/// Resolves every group's index map. Must run after the argument parser, environment scanner and
/// file section resolver have all had a chance to fill slots, and before the dependency + type
/// validator (which consumes `index_map` to know which dense indices actually exist).
pub fn resolve(slots: &SlotTable, command: CommandId, role: Role) -> Result<Vec<ResolvedGroup>, Error> {
    GroupId::ALL.iter().map(|&id| resolve_one(rules::group_rule(id), slots, command, role)).collect()
}

fn resolve_one(group: &'static OptionGroupRule, slots: &SlotTable, command: CommandId, role: Role) -> Result<ResolvedGroup, Error> {
    let member_ids: Vec<OptionId> = rules::option_rules()
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.group == Some(group.id))
        .map(|(i, _)| OptionId(i as u16))
        .collect();

    let mut seen_keys: Vec<u32> = Vec::new();
    for &option_id in &member_ids {
        for key_idx in slots.key_indices_for(option_id) {
            if let Some(slot) = slots.get(option_id, key_idx) {
                if slot.found && !slot.reset && !seen_keys.contains(&key_idx) {
                    seen_keys.push(key_idx);
                }
            }
        }
    }
    seen_keys.sort_unstable();

    let (index_total, index_map) = if seen_keys.is_empty() { (1, vec![0u32]) } else { (seen_keys.len(), seen_keys) };

    let selector_id = rules::option_id_by_name(group.selector_option)
        .expect("every group selector is itself a registered option");
    let selector_rule = selector_id.rule();
    let selector_valid = selector_rule.valid_for(command, role);

    let mut index_default = 0usize;
    if selector_valid {
        if let Some(slot) = slots.get(selector_id, 0) {
            if slot.is_set_with_value() {
                let raw = slot.values.first().cloned().unwrap_or_default();
                let external_key: u32 = raw.parse().map_err(|_| {
                    Error::option_invalid_value(selector_rule.name, format!("'{}' is not a valid key", raw))
                })?;
                if external_key < group.min_key {
                    return Err(Error::option_invalid_value(
                        selector_rule.name,
                        format!("'{}' is outside the valid range {}..={}", raw, group.min_key, group.max_key),
                    ));
                }
                let sparse_key_idx = external_key - group.min_key;
                match index_map.iter().position(|&k| k == sparse_key_idx) {
                    Some(dense) => index_default = dense,
                    None => {
                        return Err(Error::option_invalid_value(
                            selector_rule.name,
                            format!("key {} was not set on any '{}*' option", external_key, group.name),
                        ))
                    }
                }
            }
        }
    }

    let index_default_exists = if group.default_always_exists { true } else { selector_valid };

    Ok(ResolvedGroup {
        id: group.id,
        name: group.name,
        valid: !member_ids.is_empty(),
        index_total,
        index_map,
        index_default,
        index_default_exists,
    })
}
