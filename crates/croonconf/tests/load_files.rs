use croonconf::CroonConfig;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

#[test]
fn cli_path_overlays_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        r#"
[paths]
dataset_dir = "/data/chorales"

[generation]
max_bars = 8
seed = 99

[model]
order = 6
"#,
    )
    .unwrap();

    let (config, sources) = CroonConfig::load_with_sources_from(Some(&path)).unwrap();
    assert!(sources.files.contains(&path));
    assert_eq!(config.paths.dataset_dir, PathBuf::from("/data/chorales"));
    assert_eq!(config.generation.max_bars, 8);
    assert_eq!(config.generation.seed, Some(99));
    assert_eq!(config.model.order, 6);
}

#[test]
fn broken_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[paths\n").unwrap();

    let err = CroonConfig::load_with_sources_from(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("broken.toml"), "{}", err);
}
