// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The engine's error taxonomy.
//!
//! One variant per stable error kind from the design's error table, each carrying the context
//! needed to reproduce its message rather than a pre-formatted string. [`Error::code`] maps every
//! variant to a stable, non-zero process exit code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid command '{0}'")]
    CommandInvalid(String),

    #[error("a command must be specified")]
    CommandRequired,

    #[error("command '{command}' does not take parameters")]
    ParamInvalid { command: String },

    #[error("option '{option}': {reason}")]
    OptionInvalid { option: String, reason: String },

    #[error("option '{option}': {reason}")]
    OptionInvalidValue { option: String, reason: String },

    #[error("option '{option}' required but not provided{hint}", hint = .hint.as_deref().unwrap_or(""))]
    OptionRequired { option: String, hint: Option<String> },

    #[error("option '{option}': {reason}")]
    FormatError { option: String, reason: String },

    #[error("unable to open file '{path}': {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file '{path}' does not exist")]
    FileMissing { path: String },

    #[error("unable to open path '{path}': {source}")]
    PathOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path '{path}' does not exist")]
    PathMissing { path: String },
}

impl Error {
    /// Stable numeric exit code, partitioned by error kind as required by the external interface.
    pub fn code(&self) -> i32 {
        match self {
            Error::CommandInvalid(_) => 1,
            Error::CommandRequired => 2,
            Error::ParamInvalid { .. } => 3,
            Error::OptionInvalid { .. } => 4,
            Error::OptionInvalidValue { .. } => 5,
            Error::OptionRequired { .. } => 6,
            Error::FormatError { .. } => 7,
            Error::FileOpen { .. } => 8,
            Error::FileMissing { .. } => 9,
            Error::PathOpen { .. } => 10,
            Error::PathMissing { .. } => 11,
        }
    }

    pub(crate) fn option_invalid(option: impl Into<String>, reason: impl Into<String>) -> Error {
        Error::OptionInvalid { option: option.into(), reason: reason.into() }
    }

    pub(crate) fn option_invalid_value(option: impl Into<String>, reason: impl Into<String>) -> Error {
        Error::OptionInvalidValue { option: option.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
