//! End-to-end resolution against a real filesystem, exercising `PosixStorage` in a way the
//! in-memory unit tests in `src/` cannot: actual file and directory I/O through a temp directory.

use bkrest_config::{resolve, CommandId, GroupId, PosixStorage};
use std::fs;
use std::io::Write;

fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("pgbackrest".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect()
}

#[test]
fn resolves_stanza_and_pg_path_from_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pgbackrest.conf");
    let mut file = fs::File::create(&config_path).unwrap();
    writeln!(file, "[global]\nrepo1-path=/var/lib/backup\n").unwrap();
    writeln!(file, "[demo]\npg1-path=/var/lib/postgresql/14/main\n").unwrap();

    let config = resolve(
        &argv(&[
            "--config",
            config_path.to_str().unwrap(),
            "backup",
            "--stanza=demo",
        ]),
        &[],
        &PosixStorage,
    )
    .unwrap();

    assert_eq!(config.command(), CommandId::Backup);
    assert_eq!(config.value("repo-path").unwrap().as_str(), Some("/var/lib/backup"));
    assert_eq!(config.value("pg-path").unwrap().as_str(), Some("/var/lib/postgresql/14/main"));
}

#[test]
fn includes_directory_merged_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pgbackrest.conf");
    fs::write(&config_path, "[global]\nrepo1-path=/base\n").unwrap();

    let include_dir = dir.path().join("conf.d");
    fs::create_dir(&include_dir).unwrap();
    fs::write(include_dir.join("10-first.conf"), "[global]\nrepo1-host=host-a\n").unwrap();
    fs::write(include_dir.join("20-second.conf"), "[global]\nrepo1-host=host-b\n").unwrap();

    let config = resolve(
        &argv(&[
            "--config",
            config_path.to_str().unwrap(),
            "--config-include-path",
            include_dir.to_str().unwrap(),
            "backup",
            "--stanza=demo",
            "--pg1-path=/p",
        ]),
        &[],
        &PosixStorage,
    )
    .unwrap();

    // Earliest name in the include directory wins, per section precedence.
    assert_eq!(config.value("repo-host").unwrap().as_str(), Some("host-a"));
}

#[test]
fn missing_explicit_config_path_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.conf");

    let err = resolve(
        &argv(&["--config", missing.to_str().unwrap(), "backup", "--stanza=demo", "--pg1-path=/p"]),
        &[],
        &PosixStorage,
    )
    .unwrap_err();

    assert!(matches!(err, bkrest_config::Error::FileMissing { .. }));
}

#[test]
fn no_config_file_still_resolves_pg_group_from_cmdline() {
    let config = resolve(
        &argv(&["--no-config", "backup", "--stanza=demo", "--pg1-path=/p", "--pg2-path=/q"]),
        &[],
        &PosixStorage,
    )
    .unwrap();

    let pg = config.group(GroupId::Pg);
    assert_eq!(pg.index_total, 2);
}
