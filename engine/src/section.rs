// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The file section resolver: walks a loaded INI document's sections in priority order and
//! fills slots not already set by a higher-precedence source.

use std::collections::HashMap;

use crate::error::Error;
use crate::ids::{CommandId, OptionId, Role};
use crate::ini::{IniDocument, IniSection};
use crate::lookup::{self, LookupError};
use crate::rules::{self, Section};
use crate::slot::{SlotTable, Source};
use crate::value::ValueType;

/// Fills `slots` from `doc`, searching sections in the order `stanza:command`, `stanza`,
/// `global:command`, `global`. `stanza` is `None` when the active command has no stanza (e.g.
/// `info` with no `--stanza` given) and the stanza-scoped sections are skipped entirely.
pub fn resolve(
    doc: &IniDocument,
    stanza: Option<&str>,
    command: CommandId,
    role: Role,
    slots: &mut SlotTable,
) -> Result<(), Error> {
    let command_name = rules::command_rule(command).name;

    let mut search: Vec<(String, bool, bool)> = Vec::new();
    if let Some(stanza) = stanza {
        search.push((format!("{}:{}", stanza, command_name), true, false));
        search.push((stanza.to_string(), false, false));
    }
    search.push((format!("global:{}", command_name), true, true));
    search.push(("global".to_string(), false, true));

    for (name, is_command_section, is_global) in search {
        if let Some(section) = doc.section(&name) {
            resolve_section(section, is_command_section, is_global, command, role, slots)?;
        }
    }
    Ok(())
}

fn resolve_section(
    section: &IniSection,
    is_command_section: bool,
    is_global: bool,
    command: CommandId,
    role: Role,
    slots: &mut SlotTable,
) -> Result<(), Error> {
    let mut owner: HashMap<(OptionId, u32), &str> = HashMap::new();
    let mut written: HashMap<(OptionId, u32), ()> = HashMap::new();

    for (raw_name, raw_value) in &section.entries {
        let lookup_result = match lookup::lookup(raw_name) {
            Ok(r) => r,
            Err(LookupError::Unknown) => {
                log::warn!("unrecognized option '{}' in section '{}'", raw_name, section_label(section));
                continue;
            }
            Err(LookupError::KeyOutOfRange { group, min, max }) => {
                log::warn!(
                    "option '{}' in section '{}' has a key out of range for group '{}' ({}..={})",
                    raw_name, section_label(section), group, min, max
                );
                continue;
            }
        };

        if lookup_result.negate || lookup_result.reset {
            log::warn!(
                "'{}' in section '{}' uses a negate/reset prefix, which is not meaningful in a config file",
                raw_name, section_label(section)
            );
            continue;
        }

        let rule = lookup_result.option_id.rule();

        if rule.section == Section::CmdLineOnly {
            log::warn!(
                "'{}' is command-line only and may not appear in section '{}'",
                raw_name, section_label(section)
            );
            continue;
        }
        if is_global && rule.section == Section::StanzaOnly {
            log::warn!("'{}' is stanza-only and may not appear in global section '{}'", raw_name, section_label(section));
            continue;
        }
        if !rule.valid_for(command, role) {
            if is_command_section {
                log::warn!("'{}' is not valid for command '{}' in section '{}'", raw_name, command, section_label(section));
            }
            continue;
        }

        let target = (lookup_result.option_id, lookup_result.key_idx);

        if let Some(prev_name) = owner.get(&target) {
            if *prev_name != raw_name.as_str() {
                return Err(Error::option_invalid(
                    rule.name,
                    format!("specified by both '{}' and '{}' in section '{}'", prev_name, raw_name, section_label(section)),
                ));
            }
        } else {
            owner.insert(target, raw_name.as_str());
        }

        let already_written_here = written.contains_key(&target);

        if !already_written_here && slots.is_found(lookup_result.option_id, lookup_result.key_idx) {
            // Already resolved by a higher-precedence source (command line, environment, or an
            // earlier, higher-priority section).
            continue;
        }

        if raw_value.is_empty() {
            return Err(Error::option_invalid_value(rule.name, "value must not be empty"));
        }

        if rule.value_type == ValueType::Boolean {
            if already_written_here {
                return Err(Error::option_invalid(rule.name, "specified more than once in the same section"));
            }
            let slot = slots.get_mut_or_default(lookup_result.option_id, lookup_result.key_idx);
            match raw_value.as_str() {
                "y" => slot.found = true,
                "n" => {
                    slot.found = true;
                    slot.negate = true;
                }
                _ => return Err(Error::option_invalid_value(rule.name, format!("'{}' is not 'y' or 'n'", raw_value))),
            }
            slot.source = Some(Source::Config);
        } else {
            if already_written_here && !rule.multi {
                return Err(Error::option_invalid(rule.name, "specified more than once in the same section"));
            }
            let slot = slots.get_mut_or_default(lookup_result.option_id, lookup_result.key_idx);
            slot.found = true;
            slot.values.push(raw_value.clone());
            slot.source = Some(Source::Config);
        }

        written.insert(target, ());
    }
    Ok(())
}

fn section_label(section: &IniSection) -> &str {
    section.name.as_deref().unwrap_or("<preamble>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini;

    fn doc(text: &str) -> IniDocument {
        ini::parse("test.conf", text).unwrap()
    }

    #[test]
    fn command_section_takes_priority_over_plain_section() {
        let d = doc("[demo:backup]\nrepo1-path=/cmd\n\n[demo]\nrepo1-path=/stanza\n");
        let mut slots = SlotTable::new();
        resolve(&d, Some("demo"), CommandId::Backup, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("repo-path").unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["/cmd".to_string()]);
    }

    #[test]
    fn stanza_beats_global() {
        let d = doc("[demo]\nrepo1-path=/stanza\n\n[global]\nrepo1-path=/global\n");
        let mut slots = SlotTable::new();
        resolve(&d, Some("demo"), CommandId::Backup, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("repo-path").unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["/stanza".to_string()]);
    }

    #[test]
    fn already_found_slot_is_not_overwritten() {
        let d = doc("[global]\nstanza=from-file\n");
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name("stanza").unwrap();
        slots.get_mut_or_default(id, 0).found = true;
        slots.get_mut_or_default(id, 0).values.push("from-cli".to_string());
        resolve(&d, None, CommandId::Info, Role::Default, &mut slots).unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["from-cli".to_string()]);
    }

    #[test]
    fn duplicate_alias_in_section_is_fatal() {
        let d = doc("[global]\nlog-level=warn\nlog-level-console=info\n");
        let mut slots = SlotTable::new();
        assert!(resolve(&d, None, CommandId::Info, Role::Default, &mut slots).is_err());
    }

    #[test]
    fn repeated_key_on_non_multi_option_is_fatal() {
        let d = doc("[global]\nrepo1-path=/a\nrepo1-path=/b\n");
        let mut slots = SlotTable::new();
        assert!(resolve(&d, None, CommandId::Backup, Role::Default, &mut slots).is_err());
    }

    #[test]
    fn repeated_key_on_multi_option_accumulates() {
        let d = doc("[demo]\nexclude=a\nexclude=b\n");
        let mut slots = SlotTable::new();
        resolve(&d, Some("demo"), CommandId::Restore, Role::Default, &mut slots).unwrap();
        let id = rules::option_id_by_name("exclude").unwrap();
        assert_eq!(slots.get(id, 0).unwrap().values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cmd_line_only_option_in_file_is_a_warning_not_fatal() {
        let d = doc("[global]\nconfig-path=/x\n");
        let mut slots = SlotTable::new();
        assert!(resolve(&d, None, CommandId::Info, Role::Default, &mut slots).is_ok());
        let id = rules::option_id_by_name("config-path").unwrap();
        assert!(!slots.is_found(id, 0));
    }

    #[test]
    fn boolean_bad_token_is_fatal() {
        let d = doc("[demo]\ndelta=maybe\n");
        let mut slots = SlotTable::new();
        assert!(resolve(&d, Some("demo"), CommandId::Backup, Role::Default, &mut slots).is_err());
    }
}
