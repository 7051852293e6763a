// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A thin parse/query wrapper around the `ini` crate.
//!
//! The file section resolver only ever needs an ordered list of `(key, value)` pairs per
//! section, duplicates included (list-valued keys are how `multi` options are expressed in
//! file-based sources). This module is the one place that understands the underlying INI crate's
//! types, so the rest of the engine only ever sees [`IniDocument`].

use ini::Ini;

use crate::error::Error;

/// One INI section: its name (absent for a leading, section-less preamble) and its key/value
/// pairs in file order, with duplicate keys preserved.
#[derive(Debug, Clone)]
pub struct IniSection {
    pub name: Option<String>,
    pub entries: Vec<(String, String)>,
}

/// A fully parsed INI document.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    pub sections: Vec<IniSection>,
}

impl IniDocument {
    /// Finds a section by exact name (`global`, `global:backup`, `<stanza>`, `<stanza>:backup`).
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name.as_deref() == Some(name))
    }
}

/// Parses INI text into a [`IniDocument`]. Used both for real loading and for the file loader's
/// dry-run validation of each include file before concatenation.
pub fn parse(path_for_errors: &str, content: &str) -> Result<IniDocument, Error> {
    let ini = Ini::load_from_str(content).map_err(|e| Error::FileOpen {
        path: path_for_errors.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
    })?;

    let mut sections = Vec::new();
    for (name, props) in ini.iter() {
        let entries = props.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        sections.push(IniSection { name: name.map(|n| n.to_string()), entries });
    }
    Ok(IniDocument { sections })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_preserves_duplicate_keys() {
        let doc = parse(
            "test.conf",
            "[global]\nrepo1-path=/var/lib/backup\nrecovery-option=a=1\nrecovery-option=b=2\n",
        )
        .unwrap();
        let global = doc.section("global").unwrap();
        let recovery: Vec<_> = global.entries.iter().filter(|(k, _)| k == "recovery-option").collect();
        assert_eq!(recovery.len(), 2);
    }

    #[test]
    fn rejects_malformed_ini() {
        assert!(parse("test.conf", "[unterminated").is_err());
    }
}
