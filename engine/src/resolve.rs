// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Top-level orchestration: wires the nine components together in the fixed order the design
//! requires, from raw process inputs to an immutable [`Config`].

use crate::args;
use crate::config::Config;
use crate::env;
use crate::error::Error;
use crate::file_loader;
use crate::groups;
use crate::ids::CommandId;
use crate::rules;
use crate::section;
use crate::slot::SlotTable;
use crate::storage::Storage;
use crate::validate;

/// Resolves one configuration from explicit inputs. `argv` includes the program name at index 0,
/// matching the conventional process argument vector; `env` is a snapshot of `(name, value)`
/// pairs, not read from the process directly (see the ambient-stack configuration note).
pub fn resolve(argv: &[String], env_vars: &[(String, String)], storage: &dyn Storage) -> Result<Config, Error> {
    let exe_path = argv.first().cloned().unwrap_or_default();
    let command_args: &[String] = if argv.is_empty() { &[] } else { &argv[1..] };

    let parsed = args::parse(command_args)?;
    let command = parsed.command.unwrap_or(CommandId::Help);
    let role = parsed.role;
    let mut slots: SlotTable = parsed.slots;

    env::scan(env_vars, command, role, &mut slots)?;

    if let Some(doc) = file_loader::load(&slots, storage)? {
        let stanza = stanza_value(&slots);
        section::resolve(&doc, stanza.as_deref(), command, role, &mut slots)?;
    }

    let resolved_groups = groups::resolve(&slots, command, role)?;
    let resolved = validate::resolve(&slots, &resolved_groups, command, role, parsed.help)?;

    Ok(Config::new(command, role, parsed.help, parsed.positionals, exe_path, resolved, resolved_groups))
}

fn stanza_value(slots: &SlotTable) -> Option<String> {
    let id = rules::option_id_by_name("stanza")?;
    let slot = slots.get(id, 0)?;
    if slot.is_set_with_value() {
        slot.values.first().cloned()
    } else {
        None
    }
}
