// tests/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use sitepipe::config::{load_and_validate, resolve_config};
use sitepipe::dag::builtin::builtin_graph;
use sitepipe::errors::SitepipeError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn task_cycle_returns_structured_error() {
    let file = config_file(
        r#"
[tasks.a]
series = ["styles", "b"]

[tasks.b]
parallel = ["a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(SitepipeError::TaskCycle(msg)) => {
            assert!(msg.contains('a') || msg.contains('b'), "{msg}");
        }
        other => panic!("expected TaskCycle, got {other:?}"),
    }
}

#[test]
fn unknown_task_reference_is_a_config_error() {
    let file = config_file("[tasks.a]\nseries = [\"styles\", \"fonts\"]\n");

    match load_and_validate(file.path()) {
        Err(SitepipeError::ConfigError(msg)) => assert!(msg.contains("fonts"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[styles\nsource = 1\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(SitepipeError::TomlError(_))
    ));
}

#[test]
fn zero_queue_length_is_rejected() {
    let file = config_file("[watch]\nqueue_length = 0\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(SitepipeError::ConfigError(_))
    ));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let err = resolve_config(Some("/definitely/not/here/Sitepipe.toml")).unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn project_root_is_the_config_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sitepipe.toml");
    std::fs::write(&path, "[paths]\ndist = \"public\"\n").unwrap();

    let (cfg, root) = resolve_config(path.to_str()).unwrap();
    assert_eq!(cfg.paths.dist, "public");
    assert_eq!(root, dir.path());
}

#[test]
fn unknown_cli_task_is_task_not_found() {
    let err = builtin_graph()
        .entry(&["styles".to_string(), "sprites".to_string()], false)
        .unwrap_err();
    assert!(matches!(err, SitepipeError::TaskNotFound(name) if name == "sprites"));
}
