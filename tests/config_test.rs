//! Config loading and defaults integration tests

use std::path::PathBuf;

use mangrove_admin::config::Config;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.api.http_port, 8080);
    assert_eq!(config.node.data_dir, PathBuf::from("./data"));
}

#[test]
fn test_config_with_all_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mangrove-admin.toml");
    std::fs::write(
        &path,
        r#"
[node]
data_dir = "/var/lib/mangrove"

[api]
http_port = 8181
static_dir = "/srv/mangrove/static"

[views]
recent_activity_limit = 10

[wallet]
enabled = true
address = "0x1111111111111111111111111111111111111111"
network = "polygon"
chain_id = 137
balance_eth = 2.5
reject = false
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.node.data_dir, PathBuf::from("/var/lib/mangrove"));
    assert_eq!(config.api.http_port, 8181);
    assert_eq!(config.api.static_dir, PathBuf::from("/srv/mangrove/static"));
    assert_eq!(config.views.recent_activity_limit, 10);
    assert_eq!(config.wallet.network, "polygon");
    assert_eq!(config.wallet.chain_id, 137);
    assert_eq!(config.wallet.balance_eth, 2.5);
}

#[test]
fn test_unreadable_toml_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[api\nhttp_port = 1").unwrap();
    assert!(Config::load(&path).is_err());
}
