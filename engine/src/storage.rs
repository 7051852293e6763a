// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A minimal read/list interface standing in for the real POSIX storage driver.
//!
//! The driver itself (permissions, symlink handling, remote storage backends, ...) is out of
//! scope for this crate; the file loader only ever needs to read one file and list the entries
//! of one directory, both blocking, both fallible in the ordinary `io::Error` sense.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Blocking read/list access to a filesystem-like backing store.
pub trait Storage {
    /// Reads the full contents of `path` as a UTF-8 string.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Lists the entry names (not full paths) directly inside `path`.
    fn list_dir(&self, path: &str) -> io::Result<Vec<String>>;

    /// True if `path` exists and is a regular file.
    fn is_file(&self, path: &str) -> bool;

    /// True if `path` exists and is a directory.
    fn is_dir(&self, path: &str) -> bool;
}

/// The default [`Storage`] implementation, backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixStorage;

impl Storage for PosixStorage {
    fn read_file(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn is_file(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }
}

/// An in-memory [`Storage`] implementation, used by tests that need deterministic, filesystem-free
/// fixtures for the file loader and section resolver.
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    files: BTreeMap<String, String>,
    dirs: BTreeMap<String, Vec<String>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn with_dir(mut self, path: impl Into<String>, entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dirs.insert(path.into(), entries.into_iter().map(Into::into).collect());
        self
    }
}

impl Storage for MemStorage {
    fn read_file(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains_key(path)
    }
}
