// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The file loader: the seven-case precedence table for `--config` / `--config-path` /
//! `--config-include-path`, plus the `*.conf` include directory concatenation.
//!
//! The precedence table in the design is written in terms of whether each of the three
//! switches is "on cmdline", but the environment scanner (§4.3) runs before this component and
//! fills the same slots; what actually drives each row is whether the slot was filled by the
//! time the file loader runs, from either source. This module keys off `Slot::found`/`negate`
//! rather than the originating `Source` for exactly that reason.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::Error;
use crate::ini::{self, IniDocument};
use crate::rules;
use crate::slot::SlotTable;
use crate::storage::Storage;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pgbackrest/pgbackrest.conf";
pub const LEGACY_CONFIG_PATH: &str = "/etc/pgbackrest.conf";
pub const DEFAULT_INCLUDE_PATH: &str = "/etc/pgbackrest/conf.d";

fn include_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".+\.conf$").unwrap())
}

/// Loads and parses the applicable config file(s), applying the precedence table. Returns
/// `None` (not an error) for the all-skipped `no-config` row with no include path configured.
pub fn load(slots: &SlotTable, storage: &dyn Storage) -> Result<Option<IniDocument>, Error> {
    let config_slot = raw_value(slots, "config");
    let config_path_slot = raw_value(slots, "config-path");
    let include_path_slot = raw_value(slots, "config-include-path");

    let config_negated = is_negated(slots, "config");

    let mut parts: Vec<String> = Vec::new();

    if config_negated {
        match include_path_slot {
            Some(include_path) => {
                parts.extend(load_include_dir(&include_path, true, storage)?);
            }
            None => {
                if let Some(config_path) = &config_path_slot {
                    let dir = format!("{}/conf.d", config_path);
                    parts.extend(load_include_dir(&dir, false, storage)?);
                }
                // else: both skipped.
            }
        }
    } else if let Some(explicit_config) = &config_slot {
        parts.extend(load_file(explicit_config, true, storage)?);
        match include_path_slot {
            Some(include_path) => parts.extend(load_include_dir(&include_path, true, storage)?),
            None => {
                if let Some(config_path) = &config_path_slot {
                    let dir = format!("{}/conf.d", config_path);
                    parts.extend(load_include_dir(&dir, false, storage)?);
                }
            }
        }
    } else if let Some(include_path) = include_path_slot {
        parts.extend(load_file(DEFAULT_CONFIG_PATH, false, storage)?);
        parts.extend(load_include_dir(&include_path, true, storage)?);
    } else if let Some(config_path) = &config_path_slot {
        let main = format!("{}/pgbackrest.conf", config_path);
        parts.extend(load_file(&main, false, storage)?);
        let dir = format!("{}/conf.d", config_path);
        parts.extend(load_include_dir(&dir, false, storage)?);
    } else {
        let mut loaded_default = load_file(DEFAULT_CONFIG_PATH, false, storage)?;
        if loaded_default.is_empty() {
            loaded_default = load_file(LEGACY_CONFIG_PATH, false, storage)?;
        }
        parts.extend(loaded_default);
        parts.extend(load_include_dir(DEFAULT_INCLUDE_PATH, false, storage)?);
    }

    if parts.is_empty() {
        return Ok(None);
    }
    let combined = parts.join("\n");
    Ok(Some(ini::parse("<config>", &combined)?))
}

fn raw_value(slots: &SlotTable, option_name: &str) -> Option<String> {
    let id = rules::option_id_by_name(option_name)?;
    let slot = slots.get(id, 0)?;
    if slot.is_set_with_value() {
        slot.values.first().cloned()
    } else {
        None
    }
}

fn is_negated(slots: &SlotTable, option_name: &str) -> bool {
    rules::option_id_by_name(option_name)
        .and_then(|id| slots.get(id, 0))
        .map(|s| s.negate)
        .unwrap_or(false)
}

/// Loads a single file. `required == true` makes a missing file fatal; otherwise a miss
/// silently yields no content.
fn load_file(path: &str, required: bool, storage: &dyn Storage) -> Result<Vec<String>, Error> {
    if !storage.is_file(path) {
        return if required { Err(Error::FileMissing { path: path.to_string() }) } else { Ok(Vec::new()) };
    }
    let content = storage
        .read_file(path)
        .map_err(|source| Error::FileOpen { path: path.to_string(), source })?;
    Ok(vec![content])
}

/// Loads every `*.conf` file directly inside `dir`, sorted lexicographically for reproducible
/// ordering, each validated with a dry-run INI parse before being accepted.
fn load_include_dir(dir: &str, required: bool, storage: &dyn Storage) -> Result<Vec<String>, Error> {
    if !storage.is_dir(dir) {
        return if required { Err(Error::PathMissing { path: dir.to_string() }) } else { Ok(Vec::new()) };
    }
    let mut names: Vec<String> = storage
        .list_dir(dir)
        .map_err(|source| Error::PathOpen { path: dir.to_string(), source })?
        .into_iter()
        .filter(|n| include_file_regex().is_match(n))
        .collect();
    names.sort();

    let mut parts = Vec::with_capacity(names.len());
    for name in names {
        let full = format!("{}/{}", dir, name);
        let content = storage
            .read_file(&full)
            .map_err(|source| Error::FileOpen { path: full.clone(), source })?;
        ini::parse(&full, &content)?; // dry-run validation
        parts.push(content);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;

    fn slots_with(option: &str, value: &str) -> SlotTable {
        let mut slots = SlotTable::new();
        let id = rules::option_id_by_name(option).unwrap();
        let slot = slots.get_mut_or_default(id, 0);
        slot.found = true;
        slot.values.push(value.to_string());
        slots
    }

    #[test]
    fn default_case_tries_default_then_legacy_path() {
        let storage = MemStorage::new().with_file(LEGACY_CONFIG_PATH, "[global]\nrepo1-path=/var/lib/backup\n");
        let slots = SlotTable::new();
        let doc = load(&slots, &storage).unwrap().unwrap();
        assert!(doc.section("global").is_some());
    }

    #[test]
    fn no_config_with_include_path_concatenates_in_order() {
        let storage = MemStorage::new()
            .with_dir("/x", vec!["b.conf", "a.conf"])
            .with_file("/x/a.conf", "[global]\nrepo1-path=/a\n")
            .with_file("/x/b.conf", "[global]\nrepo1-host=host-b\n");
        let mut slots = slots_with("config-include-path", "/x");
        let config_id = rules::option_id_by_name("config").unwrap();
        slots.get_mut_or_default(config_id, 0).negate = true;
        slots.get_mut_or_default(config_id, 0).found = true;

        let doc = load(&slots, &storage).unwrap().unwrap();
        let global = doc.section("global").unwrap();
        assert_eq!(global.entries[0].0, "repo1-path");
        assert_eq!(global.entries[1].0, "repo1-host");
    }

    #[test]
    fn explicit_config_path_is_required() {
        let storage = MemStorage::new();
        let slots = slots_with("config", "/does/not/exist.conf");
        assert!(matches!(load(&slots, &storage), Err(Error::FileMissing { .. })));
    }

    #[test]
    fn no_config_no_include_path_no_config_path_skips_everything() {
        let storage = MemStorage::new();
        let mut slots = SlotTable::new();
        let config_id = rules::option_id_by_name("config").unwrap();
        slots.get_mut_or_default(config_id, 0).negate = true;
        slots.get_mut_or_default(config_id, 0).found = true;
        assert!(load(&slots, &storage).unwrap().is_none());
    }
}
