// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The declarative rule table: every command, option group and option the engine knows about.
//!
//! This is pure data. Per-option metadata that the original tool packs into a flat array of
//! opaque words with a bit-packed header is represented here as a tagged union list
//! ([`RuleDatum`]) instead; [`effective_rule`] materializes, once per `(option, command)` pair,
//! the flattened view the validator actually consumes, so no runtime scanning of the raw list
//! happens on the hot path.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ids::{role_bit, CommandId, GroupId, OptionId, RoleMask};
use crate::value::ValueType;

/// Where an option may be set from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Command line only; never valid in an environment variable or config file.
    CmdLineOnly,
    /// Valid in `global`/`global:<command>` or `<stanza>`/`<stanza>:<command>` sections.
    GlobalOrStanza,
    /// Valid only inside a `<stanza>`/`<stanza>:<command>` section, never `global*`.
    StanzaOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRule {
    pub id: CommandId,
    pub name: &'static str,
    pub valid_roles: RoleMask,
    pub parameter_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionGroupRule {
    pub id: GroupId,
    pub name: &'static str,
    /// Minimum admissible external (1-based) key. Kept per-group rather than a single hard-coded
    /// constant (see REDESIGN FLAGS); `pg` sets this to 1 for backward compatibility.
    pub min_key: u32,
    pub max_key: u32,
    /// Name of the plain option that selects this group's default member (`pg` selects within
    /// group `pg`, `repo` within group `repo`).
    pub selector_option: &'static str,
    /// True if the group always has a usable default index regardless of whether the selector
    /// option is valid for the active command (true for `pg`; computed from the selector's
    /// validity for `repo`).
    pub default_always_exists: bool,
}

impl OptionGroupRule {
    pub fn key_count(&self) -> usize {
        (self.max_key - self.min_key + 1) as usize
    }
}

/// A tagged entry in an option's data blob. A [`RuleDatum::CommandScope`] marker makes every
/// following entry, up to the next marker or the end of the list, apply only when the active
/// command matches; entries before the first marker are universal (they apply to every command
/// unless a later, command-scoped entry of the same kind overrides them).
#[derive(Debug, Clone, Copy)]
pub enum RuleDatum {
    Default(&'static str),
    AllowList(&'static [&'static str]),
    AllowRange(i64, i64),
    /// Depends on another option (by canonical name) having one of the given values. An empty
    /// allowed-value list means "any value at all, i.e. merely set".
    Depend(&'static str, &'static [&'static str]),
    Required(bool),
    CommandScope(CommandId),
}

#[derive(Debug, Clone, Copy)]
pub struct OptionRule {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required_default: bool,
    pub section: Section,
    pub secure: bool,
    pub multi: bool,
    pub group: Option<GroupId>,
    /// Permits a `no-<name>` alias despite `value_type != Boolean`. Only ever true for the file
    /// loader's own `config` switch; see the data model invariant's documented exception.
    pub negatable_override: bool,
    pub deprecated_aliases: &'static [&'static str],
    /// `(command, role mask)` pairs for which this option is meaningful at all.
    pub valid: &'static [(CommandId, RoleMask)],
    pub data: &'static [RuleDatum],
}

impl OptionRule {
    pub fn negatable(&self) -> bool {
        self.value_type == ValueType::Boolean || self.negatable_override
    }

    pub fn valid_for(&self, command: CommandId, role: crate::ids::Role) -> bool {
        self.valid
            .iter()
            .any(|(c, mask)| *c == command && role.is_in(*mask))
    }
}

/// Materialized, per-command view of an option's data blob: exactly what the validator needs.
#[derive(Debug, Clone, Default)]
pub struct EffectiveRule {
    pub default: Option<&'static str>,
    pub allow_list: Option<&'static [&'static str]>,
    pub allow_range: Option<(i64, i64)>,
    pub depend: Option<(&'static str, &'static [&'static str])>,
    pub required: bool,
}

macro_rules! cmd {
    ($id:ident, $name:expr, $roles:expr, $params:expr) => {
        CommandRule { id: CommandId::$id, name: $name, valid_roles: $roles, parameter_allowed: $params }
    };
}

pub static COMMANDS: &[CommandRule] = &[
    cmd!(Help, "help", role_bit::ALL, true),
    cmd!(Info, "info", role_bit::DEFAULT, false),
    cmd!(Check, "check", role_bit::DEFAULT, false),
    cmd!(Backup, "backup", role_bit::DEFAULT | role_bit::LOCAL, false),
    cmd!(Restore, "restore", role_bit::DEFAULT, false),
    cmd!(ArchivePush, "archive-push", role_bit::DEFAULT | role_bit::ASYNC | role_bit::LOCAL | role_bit::REMOTE, true),
    cmd!(ArchiveGet, "archive-get", role_bit::DEFAULT | role_bit::ASYNC | role_bit::LOCAL | role_bit::REMOTE, true),
];

pub fn command_rule(id: CommandId) -> &'static CommandRule {
    COMMANDS.iter().find(|c| c.id == id).expect("every CommandId has a COMMANDS entry")
}

pub fn command_by_name(name: &str) -> Option<&'static CommandRule> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub static GROUPS: &[OptionGroupRule] = &[
    OptionGroupRule {
        id: GroupId::Pg,
        name: "pg",
        min_key: 1,
        max_key: 8,
        selector_option: "pg",
        default_always_exists: true,
    },
    OptionGroupRule {
        id: GroupId::Repo,
        name: "repo",
        min_key: 1,
        max_key: 4,
        selector_option: "repo",
        default_always_exists: false,
    },
];

pub fn group_rule(id: GroupId) -> &'static OptionGroupRule {
    GROUPS.iter().find(|g| g.id == id).expect("every GroupId has a GROUPS entry")
}

pub fn group_by_name(name: &str) -> Option<&'static OptionGroupRule> {
    GROUPS.iter().find(|g| g.name == name)
}

// Commonly reused `valid` slices.
const ALL_DEFAULT: &[(CommandId, RoleMask)] = &[
    (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
    (CommandId::Restore, role_bit::DEFAULT),
    (CommandId::Check, role_bit::DEFAULT),
    (CommandId::ArchivePush, role_bit::ALL),
    (CommandId::ArchiveGet, role_bit::ALL),
    (CommandId::Info, role_bit::DEFAULT),
];

const PG_COMMANDS: &[(CommandId, RoleMask)] = &[
    (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
    (CommandId::Restore, role_bit::DEFAULT),
    (CommandId::Check, role_bit::DEFAULT),
];

const REPO_COMMANDS: &[(CommandId, RoleMask)] = &[
    (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
    (CommandId::Restore, role_bit::DEFAULT),
    (CommandId::Check, role_bit::DEFAULT),
    (CommandId::ArchivePush, role_bit::ALL),
    (CommandId::ArchiveGet, role_bit::ALL),
    (CommandId::Info, role_bit::DEFAULT),
];

macro_rules! opt {
    (
        name: $name:expr,
        type: $vt:ident,
        required: $req:expr,
        section: $section:ident,
        secure: $secure:expr,
        multi: $multi:expr,
        group: $group:expr,
        negatable: $negatable:expr,
        deprecated: $deprecated:expr,
        valid: $valid:expr,
        data: $data:expr,
    ) => {
        OptionRule {
            name: $name,
            value_type: ValueType::$vt,
            required_default: $req,
            section: Section::$section,
            secure: $secure,
            multi: $multi,
            group: $group,
            negatable_override: $negatable,
            deprecated_aliases: $deprecated,
            valid: $valid,
            data: $data,
        }
    };
}

pub static OPTIONS: &[OptionRule] = &[
    opt! {
        name: "stanza", type: String, required: true, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: ALL_DEFAULT,
        data: &[
            RuleDatum::CommandScope(CommandId::Info), RuleDatum::Required(false),
            RuleDatum::CommandScope(CommandId::Help), RuleDatum::Required(false),
        ],
    },
    opt! {
        name: "config", type: Path, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: true, deprecated: &[], valid: ALL_DEFAULT,
        data: &[],
    },
    opt! {
        name: "config-path", type: Path, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: ALL_DEFAULT,
        data: &[],
    },
    opt! {
        name: "config-include-path", type: Path, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: ALL_DEFAULT,
        data: &[],
    },
    opt! {
        name: "pg", type: Integer, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: PG_COMMANDS,
        data: &[],
    },
    opt! {
        name: "pg-path", type: Path, required: true, section: GlobalOrStanza, secure: false,
        multi: false, group: Some(GroupId::Pg), negatable: false, deprecated: &[], valid: PG_COMMANDS,
        data: &[],
    },
    opt! {
        name: "pg-port", type: Integer, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: Some(GroupId::Pg), negatable: false, deprecated: &[], valid: PG_COMMANDS,
        data: &[RuleDatum::Default("5432")],
    },
    opt! {
        name: "pg-host", type: String, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: Some(GroupId::Pg), negatable: false, deprecated: &[], valid: PG_COMMANDS,
        data: &[],
    },
    opt! {
        name: "repo", type: Integer, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: REPO_COMMANDS,
        data: &[],
    },
    opt! {
        name: "repo-path", type: Path, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: Some(GroupId::Repo), negatable: false, deprecated: &[], valid: REPO_COMMANDS,
        data: &[RuleDatum::Default("/var/lib/pgbackrest")],
    },
    opt! {
        name: "repo-host", type: String, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: Some(GroupId::Repo), negatable: false, deprecated: &[], valid: REPO_COMMANDS,
        data: &[],
    },
    opt! {
        name: "repo-cipher-pass", type: String, required: false, section: GlobalOrStanza, secure: true,
        multi: false, group: Some(GroupId::Repo), negatable: false, deprecated: &[], valid: REPO_COMMANDS,
        data: &[],
    },
    opt! {
        name: "compress-level", type: Integer, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL)],
        data: &[RuleDatum::Default("6"), RuleDatum::AllowRange(0, 9)],
    },
    opt! {
        name: "process-max", type: Integer, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[
            (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
            (CommandId::Restore, role_bit::DEFAULT),
        ],
        data: &[RuleDatum::Default("1"), RuleDatum::AllowRange(1, 96)],
    },
    opt! {
        name: "log-level-console", type: String, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &["log-level"], valid: ALL_DEFAULT,
        data: &[
            RuleDatum::Default("warn"),
            RuleDatum::AllowList(&["off", "error", "warn", "info", "detail", "debug", "trace"]),
        ],
    },
    opt! {
        name: "delta", type: Boolean, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[
            (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
            (CommandId::Restore, role_bit::DEFAULT),
        ],
        data: &[RuleDatum::Default("0")],
    },
    opt! {
        name: "online", type: Boolean, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[
            (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
            (CommandId::Check, role_bit::DEFAULT),
        ],
        data: &[RuleDatum::Default("1")],
    },
    opt! {
        name: "start-fast", type: Boolean, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL)],
        data: &[RuleDatum::Default("0")],
    },
    opt! {
        name: "archive-timeout", type: Time, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[
            (CommandId::Backup, role_bit::DEFAULT | role_bit::LOCAL),
            (CommandId::ArchivePush, role_bit::ALL),
        ],
        data: &[RuleDatum::Default("60")],
    },
    opt! {
        name: "protocol-timeout", type: Time, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: ALL_DEFAULT,
        data: &[RuleDatum::Default("1830")],
    },
    opt! {
        name: "buffer-size", type: Size, required: false, section: GlobalOrStanza, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[], valid: ALL_DEFAULT,
        data: &[RuleDatum::Default("1048576")],
    },
    opt! {
        name: "type", type: String, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Restore, role_bit::DEFAULT)],
        data: &[
            RuleDatum::Default("default"),
            RuleDatum::AllowList(&["default", "immediate", "name", "xid", "time", "lsn"]),
        ],
    },
    opt! {
        name: "target", type: String, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Restore, role_bit::DEFAULT)],
        data: &[RuleDatum::Depend("type", &["name", "xid", "time", "lsn"])],
    },
    opt! {
        name: "target-action", type: String, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Restore, role_bit::DEFAULT)],
        data: &[
            RuleDatum::Default("pause"),
            RuleDatum::AllowList(&["pause", "promote", "shutdown"]),
            RuleDatum::Depend("type", &["default", "immediate", "name", "xid", "time", "lsn"]),
        ],
    },
    opt! {
        name: "recovery-option", type: Hash, required: false, section: CmdLineOnly, secure: false,
        multi: true, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Restore, role_bit::DEFAULT)],
        data: &[RuleDatum::Depend("type", &["default", "immediate"])],
    },
    opt! {
        name: "exclude", type: List, required: false, section: GlobalOrStanza, secure: false,
        multi: true, group: None, negatable: false, deprecated: &[],
        valid: &[(CommandId::Restore, role_bit::DEFAULT)],
        data: &[],
    },
    opt! {
        name: "exec-id", type: String, required: false, section: CmdLineOnly, secure: false,
        multi: false, group: None, negatable: false, deprecated: &[],
        valid: &[
            (CommandId::ArchivePush, role_bit::ASYNC | role_bit::LOCAL | role_bit::REMOTE),
            (CommandId::ArchiveGet, role_bit::ASYNC | role_bit::LOCAL | role_bit::REMOTE),
        ],
        data: &[],
    },
];

/// Looks up an option's index by canonical name, memoizing the name→id map.
pub fn option_id_by_name(name: &str) -> Option<OptionId> {
    static INDEX: OnceLock<HashMap<&'static str, OptionId>> = OnceLock::new();
    let index = INDEX.get_or_init(|| {
        OPTIONS
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name, OptionId(i as u16)))
            .collect()
    });
    index.get(name).copied()
}

pub fn option_rules() -> &'static [OptionRule] {
    OPTIONS
}

/// Materializes the effective, per-command rule for `option`: entries before the first
/// `CommandScope` marker are the universal baseline; entries within a `CommandScope(command)`
/// block override the corresponding field only when `command` is the active command.
pub fn effective_rule(option: OptionId, command: CommandId) -> &'static EffectiveRule {
    static CACHE: OnceLock<HashMap<(OptionId, CommandId), EffectiveRule>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| {
        let mut map = HashMap::new();
        for (i, rule) in OPTIONS.iter().enumerate() {
            let id = OptionId(i as u16);
            for cmd in CommandId::ALL {
                map.insert((id, cmd), materialize(rule, cmd));
            }
        }
        map
    });
    cache
        .get(&(option, command))
        .expect("effective_rule cache covers every (option, command) pair")
}

fn materialize(rule: &'static OptionRule, command: CommandId) -> EffectiveRule {
    let mut eff = EffectiveRule { required: rule.required_default, ..EffectiveRule::default() };
    let mut scope: Option<CommandId> = None;
    for datum in rule.data {
        if let RuleDatum::CommandScope(c) = datum {
            scope = Some(*c);
            continue;
        }
        if let Some(s) = scope {
            if s != command {
                continue;
            }
        }
        match datum {
            RuleDatum::Default(v) => eff.default = Some(v),
            RuleDatum::AllowList(v) => eff.allow_list = Some(v),
            RuleDatum::AllowRange(lo, hi) => eff.allow_range = Some((*lo, *hi)),
            RuleDatum::Depend(opt, allowed) => eff.depend = Some((opt, allowed)),
            RuleDatum::Required(v) => eff.required = *v,
            RuleDatum::CommandScope(_) => unreachable!(),
        }
    }
    eff
}

/// The fixed, pre-computed order in which options must be processed so that every option's
/// `depend` target is fully resolved first (a topological sort over the depend graph).
pub fn resolve_order() -> &'static [OptionId] {
    static ORDER: OnceLock<Vec<OptionId>> = OnceLock::new();
    ORDER.get_or_init(compute_resolve_order)
}

fn compute_resolve_order() -> Vec<OptionId> {
    let n = OPTIONS.len();
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, rule) in OPTIONS.iter().enumerate() {
        if let Some(dep_name) = first_depend_name(rule) {
            if let Some(dep_id) = option_id_by_name(dep_name) {
                deps[i].push(dep_id.0 as usize);
            }
        }
    }

    let mut visited = vec![false; n];
    let mut in_progress = vec![false; n];
    let mut order = Vec::with_capacity(n);

    fn visit(
        i: usize,
        deps: &[Vec<usize>],
        visited: &mut [bool],
        in_progress: &mut [bool],
        order: &mut Vec<OptionId>,
    ) {
        if visited[i] {
            return;
        }
        if in_progress[i] {
            // A cycle in a hand-authored rule table is a programming error, not a runtime
            // condition; fall through and accept the partial order rather than panic in a
            // production path.
            return;
        }
        in_progress[i] = true;
        for &dep in &deps[i] {
            visit(dep, deps, visited, in_progress, order);
        }
        in_progress[i] = false;
        visited[i] = true;
        order.push(OptionId(i as u16));
    }

    for i in 0..n {
        visit(i, &deps, &mut visited, &mut in_progress, &mut order);
    }
    order
}

/// The first `Depend` entry found anywhere in an option's data blob (regardless of command
/// scope), used only to build the global, command-independent resolve order. The validator
/// itself always re-reads the command-scoped [`EffectiveRule::depend`] for the active command.
fn first_depend_name(rule: &OptionRule) -> Option<&'static str> {
    rule.data.iter().find_map(|d| match d {
        RuleDatum::Depend(name, _) => Some(*name),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_option_name_is_unique_and_lookupable() {
        for rule in OPTIONS {
            assert_eq!(option_id_by_name(rule.name).unwrap().rule().name, rule.name);
        }
    }

    #[test]
    fn resolve_order_places_dependencies_before_dependents() {
        let order = resolve_order();
        let pos = |name: &str| order.iter().position(|id| id.rule().name == name).unwrap();
        assert!(pos("type") < pos("recovery-option"));
        assert!(pos("type") < pos("target"));
        assert!(pos("type") < pos("target-action"));
    }

    #[test]
    fn stanza_required_by_default_but_not_for_info_or_help() {
        let id = option_id_by_name("stanza").unwrap();
        assert!(effective_rule(id, CommandId::Backup).required);
        assert!(!effective_rule(id, CommandId::Info).required);
        assert!(!effective_rule(id, CommandId::Help).required);
    }

    #[test]
    fn compress_level_has_allow_range() {
        let id = option_id_by_name("compress-level").unwrap();
        let eff = effective_rule(id, CommandId::Backup);
        assert_eq!(eff.allow_range, Some((0, 9)));
    }
}
