//! CLI command routing and configuration files.

use clap::Parser;
use clinicbridge_cli::{load_config, run, Cli};
use clinicbridge_core::config::{Config, TransportKind};
use tempfile::TempDir;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("clinicbridge").chain(args.iter().copied())).unwrap()
}

#[tokio::test]
async fn test_config_init_validate_and_set() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinicbridge.json5");
    let path_arg = path.to_str().unwrap();

    run(cli(&["--config", path_arg, "config", "init"])).await.unwrap();
    run(cli(&["--config", path_arg, "config", "validate"])).await.unwrap();
    run(cli(&["--config", path_arg, "config", "set", "transport.kind", "loopback"]))
        .await
        .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.transport.kind, TransportKind::Loopback);
}

#[tokio::test]
async fn test_invalid_config_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinicbridge.json5");
    std::fs::write(
        &path,
        "{ gateway: { port: 0 }, notifications: { default_country_code: '+966' } }",
    )
    .unwrap();

    let err = run(cli(&["--config", path.to_str().unwrap(), "config", "validate"]))
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("port"), "{err}");
    assert!(err.contains("country"), "{err}");
}

#[tokio::test]
async fn test_malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinicbridge.json5");
    std::fs::write(&path, "{ gateway: ").unwrap();

    assert!(load_config(Some(&path)).is_err());
    assert!(run(cli(&["--config", path.to_str().unwrap(), "config", "show"]))
        .await
        .is_err());
}

#[test]
fn test_json5_config_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinicbridge.json5");
    std::fs::write(
        &path,
        r#"{
            // comments and trailing commas are allowed
            gateway: { port: 3005, },
            audit: { retention: 50 },
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.gateway.port, 3005);
    assert_eq!(config.audit.retention, 50);
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_version_command() {
    run(cli(&["version"])).await.unwrap();
}
