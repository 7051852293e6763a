// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The command-line argument parser.
//!
//! A local iterator over `argv` with explicit position state, per the "global mutable parser
//! state" redesign note — there is no shared cursor anywhere in this module.

use crate::error::Error;
use crate::ids::{CommandId, Role};
use crate::lookup::{self, LookupError};
use crate::rules;
use crate::slot::{Slot, SlotTable, Source};
use crate::value::ValueType;

pub struct ParsedArgs {
    pub command: Option<CommandId>,
    pub role: Role,
    pub help: bool,
    pub positionals: Vec<String>,
    pub slots: SlotTable,
}

/// Parses `argv` (not including the program name) into a command, role, positionals and a slot
/// table of every option occurrence found on the command line.
pub fn parse(argv: &[String]) -> Result<ParsedArgs, Error> {
    let mut command: Option<CommandId> = None;
    let mut role = Role::Default;
    let mut help = false;
    let mut positionals = Vec::new();
    let mut slots = SlotTable::new();
    let mut any_option_parsed = false;

    let mut iter = argv.iter();
    while let Some(tok) = iter.next() {
        if let Some(opt_tok) = tok.strip_prefix("--") {
            any_option_parsed = true;
            parse_option(opt_tok, &mut iter, &mut slots)?;
            continue;
        }

        if command.is_none() {
            // First non-option token: either the literal `help` pseudo-command, or the command.
            if tok == "help" {
                help = true;
                continue;
            }
            let (name, role_suffix) = match tok.split_once(':') {
                Some((n, r)) => (n, Some(r)),
                None => (tok.as_str(), None),
            };
            let rule = rules::command_by_name(name).ok_or_else(|| Error::CommandInvalid(tok.clone()))?;
            let parsed_role = match role_suffix {
                Some(r) => Role::parse(r).ok_or_else(|| Error::CommandInvalid(tok.clone()))?,
                None => Role::Default,
            };
            if !parsed_role.is_in(rule.valid_roles) {
                return Err(Error::CommandInvalid(tok.clone()));
            }
            command = Some(rule.id);
            role = parsed_role;
            continue;
        }

        positionals.push(tok.clone());
    }

    if command.is_none() {
        if any_option_parsed {
            return Err(Error::CommandRequired);
        }
        help = true;
    }

    if let Some(cmd) = command {
        let rule = rules::command_rule(cmd);
        if !rule.parameter_allowed && !positionals.is_empty() && !help {
            return Err(Error::ParamInvalid { command: rule.name.to_string() });
        }
    }

    Ok(ParsedArgs { command, role, help, positionals, slots })
}

fn parse_option(opt_tok: &str, iter: &mut std::slice::Iter<'_, String>, slots: &mut SlotTable) -> Result<(), Error> {
    let (name_part, inline_value) = match opt_tok.split_once('=') {
        Some((n, v)) => (n, Some(v.to_string())),
        None => (opt_tok, None),
    };

    let lookup_result = match lookup::lookup(name_part) {
        Ok(r) => r,
        Err(LookupError::Unknown) => {
            let reason = match lookup::suggest(name_part) {
                Some(candidate) => format!("unknown option (did you mean '{}'?)", candidate),
                None => "unknown option".to_string(),
            };
            return Err(Error::option_invalid(name_part, reason));
        }
        Err(LookupError::KeyOutOfRange { group, min, max }) => {
            return Err(Error::option_invalid_value(
                name_part,
                format!("key out of range for group '{}' (expected {}..={})", group, min, max),
            ));
        }
    };

    if lookup_result.deprecated {
        log::warn!("option '{}' is deprecated", name_part);
    }

    let rule = lookup_result.option_id.rule();

    if rule.secure {
        return Err(Error::option_invalid(
            rule.name,
            "is secure and cannot be set on the command line; use an environment variable or config file instead",
        ));
    }

    let slot = slots.get_mut_or_default(lookup_result.option_id, lookup_result.key_idx);

    if lookup_result.negate {
        apply_negate(rule.name, slot)?;
        return Ok(());
    }
    if lookup_result.reset {
        apply_reset(rule.name, slot)?;
        return Ok(());
    }

    if slot.reset {
        return Err(Error::option_invalid(rule.name, "cannot be both reset and set"));
    }
    if slot.negate {
        return Err(Error::option_invalid(rule.name, "cannot be both negated and set"));
    }

    let value = match (rule.value_type, inline_value) {
        (ValueType::Boolean, Some(_)) => {
            return Err(Error::option_invalid(rule.name, "is a flag and does not take a value"));
        }
        (ValueType::Boolean, None) => None,
        (_, Some(v)) => Some(v),
        (_, None) => match iter.next() {
            Some(v) => Some(v.clone()),
            None => return Err(Error::option_invalid(rule.name, "missing required value")),
        },
    };

    if slot.found && !rule.multi {
        return Err(Error::option_invalid(rule.name, "may not be specified more than once"));
    }

    slot.found = true;
    slot.source = Some(Source::Param);
    if let Some(v) = value {
        slot.values.push(v);
    }
    Ok(())
}

fn apply_negate(name: &str, slot: &mut Slot) -> Result<(), Error> {
    if slot.reset {
        return Err(Error::option_invalid(name, "cannot be both reset and negated"));
    }
    if slot.is_set_with_value() {
        return Err(Error::option_invalid(name, "cannot be both set and negated"));
    }
    if slot.negate {
        return Err(Error::option_invalid(name, "negated more than once"));
    }
    slot.found = true;
    slot.negate = true;
    slot.source = Some(Source::Param);
    Ok(())
}

fn apply_reset(name: &str, slot: &mut Slot) -> Result<(), Error> {
    if slot.negate {
        return Err(Error::option_invalid(name, "cannot be both negated and reset"));
    }
    if slot.is_set_with_value() {
        return Err(Error::option_invalid(name, "cannot be both set and reset"));
    }
    if slot.reset {
        return Err(Error::option_invalid(name, "reset more than once"));
    }
    slot.found = true;
    slot.reset = true;
    slot.source = Some(Source::Param);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identifies_command_and_option() {
        let parsed = parse(&argv(&["backup", "--stanza=demo", "--pg1-path=/var/lib/pg"])).unwrap();
        assert_eq!(parsed.command, Some(CommandId::Backup));
        assert!(!parsed.help);
        let stanza_id = rules::option_id_by_name("stanza").unwrap();
        assert_eq!(parsed.slots.get(stanza_id, 0).unwrap().values, vec!["demo".to_string()]);
    }

    #[test]
    fn role_suffix_parses() {
        let parsed = parse(&argv(&["archive-push:async", "wal1"])).unwrap();
        assert_eq!(parsed.command, Some(CommandId::ArchivePush));
        assert_eq!(parsed.role, Role::Async);
        assert_eq!(parsed.positionals, vec!["wal1".to_string()]);
    }

    #[test]
    fn invalid_role_for_command_is_fatal() {
        assert!(parse(&argv(&["backup:remote"])).is_err());
    }

    #[test]
    fn unknown_command_is_fatal() {
        assert!(parse(&argv(&["frobnicate"])).is_err());
    }

    #[test]
    fn no_input_means_help() {
        let parsed = parse(&argv(&[])).unwrap();
        assert!(parsed.help);
        assert_eq!(parsed.command, None);
    }

    #[test]
    fn option_without_command_is_fatal() {
        assert!(matches!(parse(&argv(&["--stanza=demo"])), Err(Error::CommandRequired)));
    }

    #[test]
    fn secure_option_on_cli_is_fatal() {
        assert!(parse(&argv(&["backup", "--repo1-cipher-pass=x"])).is_err());
    }

    #[test]
    fn params_rejected_when_not_allowed() {
        assert!(parse(&argv(&["backup", "extra"])).is_err());
    }

    #[test]
    fn negate_and_set_conflict() {
        assert!(parse(&argv(&["backup", "--online", "--no-online"])).is_err());
    }

    #[test]
    fn repeated_boolean_flag_is_fatal() {
        assert!(parse(&argv(&["backup", "--online", "--online"])).is_err());
    }

    #[test]
    fn reset_is_recognised() {
        let parsed = parse(&argv(&["backup", "--reset-compress-level"])).unwrap();
        let id = rules::option_id_by_name("compress-level").unwrap();
        assert!(parsed.slots.get(id, 0).unwrap().reset);
    }
}
