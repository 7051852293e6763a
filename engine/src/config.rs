// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The finalizer: the immutable, fully resolved configuration object handed back to callers.

use crate::groups::ResolvedGroup;
use crate::ids::{CommandId, GroupId, Role};
use crate::rules;
use crate::validate::{ResolvedOption, ResolvedTable};
use crate::value::Value;

/// The fully resolved configuration produced by a single call to [`crate::resolve`].
///
/// Once built, a `Config` is never mutated; every query method borrows `self` immutably.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    command: CommandId,
    command_role: Role,
    help: bool,
    params: Vec<String>,
    exe_path: String,
    resolved: ResolvedTable,
    groups: Vec<ResolvedGroup>,
}

impl Config {
    pub(crate) fn new(
        command: CommandId,
        command_role: Role,
        help: bool,
        params: Vec<String>,
        exe_path: String,
        resolved: ResolvedTable,
        groups: Vec<ResolvedGroup>,
    ) -> Self {
        Config { command, command_role, help, params, exe_path, resolved, groups }
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    pub fn command_role(&self) -> Role {
        self.command_role
    }

    pub fn help(&self) -> bool {
        self.help
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn exe_path(&self) -> &str {
        &self.exe_path
    }

    pub fn group(&self, id: GroupId) -> &ResolvedGroup {
        self.groups.iter().find(|g| g.id == id).expect("every GroupId has a resolved group")
    }

    /// The resolved entry for an ungrouped option, or a grouped option's default dense index.
    pub fn option(&self, name: &str) -> Option<&ResolvedOption> {
        let id = rules::option_id_by_name(name)?;
        let dense_idx = match id.rule().group {
            Some(gid) => self.group(gid).index_default,
            None => 0,
        };
        self.resolved.get(&(id, dense_idx))
    }

    /// The resolved entry for a grouped option at a specific dense index (`0`-based, as returned
    /// by [`ResolvedGroup::index_map`]'s position rather than the external 1-based key).
    pub fn option_at(&self, name: &str, dense_idx: usize) -> Option<&ResolvedOption> {
        let id = rules::option_id_by_name(name)?;
        self.resolved.get(&(id, dense_idx))
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.option(name).is_some()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.option(name).and_then(|o| o.value.as_ref())
    }
}
