//! Demo program for the `bkrest-config` library crate.
//!
//! Resolves the process's real command line and environment against the library's rule table
//! and prints the resulting configuration. See the crate's own doc comment for the library API.

// Licensed under the MIT license or the Apache license (Version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

use bkrest_config::{resolve, CommandId, GroupId, PosixStorage};

fn main() {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let env: Vec<(String, String)> = std::env::vars().collect();

    let config = match resolve(&argv, &env, &PosixStorage) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(err.code());
        }
    };

    println!("command: {} ({})", config.command(), config.command_role());
    println!("help: {}", config.help());
    println!("params: {:?}", config.params());

    if config.command() == CommandId::Backup || config.command() == CommandId::Restore || config.command() == CommandId::Check {
        println!("stanza: {:?}", config.value("stanza"));
    }

    let pg = config.group(GroupId::Pg);
    println!("pg group: indexTotal={} indexMap={:?} indexDefault={}", pg.index_total, pg.index_map, pg.index_default);
    for dense in 0..pg.index_total {
        if let Some(opt) = config.option_at("pg-path", dense) {
            println!("  pg-path[{}] = {:?} (source {:?})", dense, opt.value, opt.source);
        }
    }
}
