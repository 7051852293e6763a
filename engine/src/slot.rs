// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Parsed slots: the pre-resolution container for each `(option_id, key_idx)` observed while
//! walking the command line, environment and configuration files.

use std::collections::BTreeMap;

use crate::ids::OptionId;

/// Provenance of a slot's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Param,
    Config,
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub found: bool,
    pub negate: bool,
    pub reset: bool,
    pub source: Option<Source>,
    pub values: Vec<String>,
}

impl Slot {
    pub fn is_set_with_value(&self) -> bool {
        self.found && !self.negate && !self.reset
    }
}

/// All observed slots, keyed by `(option_id, key_idx)`. Ordered by key for deterministic
/// iteration (the idempotence testable property requires byte-identical repeated runs).
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: BTreeMap<(OptionId, u32), Slot>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, option_id: OptionId, key_idx: u32) -> Option<&Slot> {
        self.slots.get(&(option_id, key_idx))
    }

    pub fn get_mut_or_default(&mut self, option_id: OptionId, key_idx: u32) -> &mut Slot {
        self.slots.entry((option_id, key_idx)).or_default()
    }

    pub fn is_found(&self, option_id: OptionId, key_idx: u32) -> bool {
        self.get(option_id, key_idx).map(|s| s.found).unwrap_or(false)
    }

    /// All key indices observed (found, regardless of reset) for a given option, ascending.
    pub fn key_indices_for(&self, option_id: OptionId) -> Vec<u32> {
        self.slots
            .keys()
            .filter(|(id, _)| *id == option_id)
            .map(|(_, idx)| *idx)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(OptionId, u32), &Slot)> {
        self.slots.iter()
    }
}
