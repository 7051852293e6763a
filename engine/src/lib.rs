// This file is part of the `bkrest-config` library crate.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Configuration resolution engine for a relational-database backup/restore tool.
//!
//! [`resolve`] merges command-line arguments, environment variables and layered INI
//! configuration files into one validated, typed [`Config`], bound to a specific command and
//! command role. The engine is synchronous, runs exactly once per call, and never reads process
//! globals itself — every input is an explicit parameter, which is what makes it practical to
//! drive from tests with [`MemStorage`] instead of the real filesystem.
//!
//! ```no_run
//! use bkrest_config::{resolve, PosixStorage};
//!
//! let argv: Vec<String> = std::env::args().collect();
//! let env: Vec<(String, String)> = std::env::vars().collect();
//! let config = resolve(&argv, &env, &PosixStorage)?;
//! println!("command: {}", config.command());
//! # Ok::<(), bkrest_config::Error>(())
//! ```

mod args;
mod config;
mod env;
mod error;
mod file_loader;
mod groups;
mod ids;
mod ini;
mod lookup;
mod resolve;
mod rules;
mod section;
mod slot;
mod storage;
mod validate;
mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use groups::ResolvedGroup;
pub use ids::{CommandId, GroupId, Role};
pub use resolve::resolve;
pub use slot::Source;
pub use storage::{MemStorage, PosixStorage, Storage};
pub use validate::ResolvedOption;
pub use value::{Value, ValueType};
