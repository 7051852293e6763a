// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Closed-set identifiers used throughout the rule table and resolver.
//!
//! These are small, `Copy`, hashable types rather than raw integers, per the "option id + key
//! index packing" redesign note: callers match on them, they don't decode bitfields.

use std::fmt;

/// A command, e.g. `backup` or `restore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandId {
    Help,
    Info,
    Check,
    Backup,
    Restore,
    ArchivePush,
    ArchiveGet,
}

impl CommandId {
    pub const ALL: [CommandId; 7] = [
        CommandId::Help,
        CommandId::Info,
        CommandId::Check,
        CommandId::Backup,
        CommandId::Restore,
        CommandId::ArchivePush,
        CommandId::ArchiveGet,
    ];
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::rules::command_rule(*self).name)
    }
}

/// A command role: the sub-identity a command runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Default,
    Async,
    Local,
    Remote,
}

/// Bitmask over the four fixed [`Role`] values.
pub type RoleMask = u8;

pub mod role_bit {
    use super::RoleMask;

    pub const DEFAULT: RoleMask = 0b0001;
    pub const ASYNC: RoleMask = 0b0010;
    pub const LOCAL: RoleMask = 0b0100;
    pub const REMOTE: RoleMask = 0b1000;
    pub const ALL: RoleMask = DEFAULT | ASYNC | LOCAL | REMOTE;
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Default, Role::Async, Role::Local, Role::Remote];

    pub fn bit(self) -> RoleMask {
        match self {
            Role::Default => role_bit::DEFAULT,
            Role::Async => role_bit::ASYNC,
            Role::Local => role_bit::LOCAL,
            Role::Remote => role_bit::REMOTE,
        }
    }

    pub fn is_in(self, mask: RoleMask) -> bool {
        mask & self.bit() != 0
    }

    /// Parses the `:role` suffix of a command token (e.g. `backup:async`).
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "default" => Some(Role::Default),
            "async" => Some(Role::Async),
            "local" => Some(Role::Local),
            "remote" => Some(Role::Remote),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Default => "default",
            Role::Async => "async",
            Role::Local => "local",
            Role::Remote => "remote",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An option group family, e.g. `pg` or `repo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    Pg,
    Repo,
}

impl GroupId {
    pub const ALL: [GroupId; 2] = [GroupId::Pg, GroupId::Repo];
}

/// Identifies a single entry in the [`crate::rules::OPTIONS`] table.
///
/// This is a plain index, resolved from a canonical option name once via
/// [`crate::rules::option_id_by_name`] and memoized, never multiplexed with anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub u16);

impl OptionId {
    pub fn rule(self) -> &'static crate::rules::OptionRule {
        &crate::rules::OPTIONS[self.0 as usize]
    }
}
