//! Configuration resolution tests
//!
//! Covers the CLI → ENV → TOML → default priority order for the root
//! folder and the portal listener settings. Tests touching process
//! environment variables run serially.

use itdesk_common::config::{
    load_toml_config, load_toml_config_or_default, write_toml_config, CliOverrides,
    CompiledDefaults, PortalConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DATABASE_FILE, DEFAULT_PORT,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "ITDESK_ROOT_FOLDER",
    "ITDESK_ROOT",
    "ITDESK_BIND",
    "ITDESK_PORT",
    "ITDESK_LOCALES_DIR",
    "ITDESK_LOG_LEVEL",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_cli_root_folder_wins() {
    clear_env();
    env::set_var("ITDESK_ROOT_FOLDER", "/tmp/from-env");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolved = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
        .with_toml(&toml)
        .resolve();

    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));
    clear_env();
}

#[test]
#[serial]
fn test_env_root_folder_beats_toml() {
    clear_env();
    env::set_var("ITDESK_ROOT", "/tmp/from-short-env");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-short-env"));

    // The long name is checked first
    env::set_var("ITDESK_ROOT_FOLDER", "/tmp/from-long-env");
    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-long-env"));

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_root_folder_is_ignored() {
    clear_env();
    env::set_var("ITDESK_ROOT_FOLDER", "   ");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/from-toml"));

    clear_env();
}

#[test]
#[serial]
fn test_compiled_default_root_folder() {
    clear_env();
    let resolved = RootFolderResolver::new("test").resolve();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
    assert!(resolved.to_string_lossy().contains("itdesk"));
}

#[test]
fn test_initializer_creates_root_and_database_path() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("nested").join("itdesk");

    let init = RootFolderInitializer::new(root.clone());
    assert!(!root.exists());
    init.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join(DATABASE_FILE));
    assert_eq!(init.root_folder(), root.as_path());

    // Second call is a no-op
    init.ensure_directory_exists().unwrap();
}

#[test]
fn test_initializer_custom_database_file() {
    let root = PathBuf::from("/tmp/itdesk-root");
    let custom = RootFolderInitializer::new(root.clone()).with_database_file(Some("desk.db"));
    assert_eq!(custom.database_path(), root.join("desk.db"));

    let blank = RootFolderInitializer::new(root.clone()).with_database_file(Some(" "));
    assert_eq!(blank.database_path(), root.join(DATABASE_FILE));
}

#[test]
#[serial]
fn test_portal_config_defaults() {
    clear_env();
    let config = PortalConfig::resolve(&CliOverrides::default(), &TomlConfig::default());

    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.default_locale, "en");
    assert_eq!(config.session_ttl_hours, 24);
    assert_eq!(config.log_level, "info");
    assert!(config.locales_dir.is_none());
    assert_eq!(config.rate_limits.create_ticket_per_minute, 5);
    assert_eq!(config.rate_limits.login_per_minute, 10);
    assert_eq!(config.listen_address(), "127.0.0.1:5780");
}

#[test]
#[serial]
fn test_portal_config_priority() {
    clear_env();
    let toml: TomlConfig = toml::from_str(
        r#"
        bind_address = "10.0.0.1"
        port = 7000
        locales_dir = "/srv/locales-toml"
        default_locale = "es"
        session_ttl_hours = 8

        [logging]
        level = "warn"
        "#,
    )
    .unwrap();

    let from_toml = PortalConfig::resolve(&CliOverrides::default(), &toml);
    assert_eq!(from_toml.listen_address(), "10.0.0.1:7000");
    assert_eq!(from_toml.default_locale, "es");
    assert_eq!(from_toml.session_ttl_hours, 8);
    assert_eq!(from_toml.log_level, "warn");

    env::set_var("ITDESK_BIND", "0.0.0.0");
    env::set_var("ITDESK_PORT", "7100");
    env::set_var("ITDESK_LOG_LEVEL", "debug");
    let from_env = PortalConfig::resolve(&CliOverrides::default(), &toml);
    assert_eq!(from_env.listen_address(), "0.0.0.0:7100");
    assert_eq!(from_env.log_level, "debug");
    assert_eq!(from_env.locales_dir, Some(PathBuf::from("/srv/locales-toml")));

    let cli = CliOverrides {
        bind_address: Some("192.168.1.5".to_string()),
        port: Some(7200),
        locales_dir: Some(PathBuf::from("/srv/locales-cli")),
        log_level: Some("trace".to_string()),
    };
    let from_cli = PortalConfig::resolve(&cli, &toml);
    assert_eq!(from_cli.listen_address(), "192.168.1.5:7200");
    assert_eq!(from_cli.log_level, "trace");
    assert_eq!(from_cli.locales_dir, Some(PathBuf::from("/srv/locales-cli")));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_falls_through() {
    clear_env();
    env::set_var("ITDESK_PORT", "not-a-port");
    let toml = TomlConfig {
        port: Some(6000),
        ..Default::default()
    };
    assert_eq!(PortalConfig::resolve(&CliOverrides::default(), &toml).port, 6000);
    clear_env();
}

#[test]
#[serial]
fn test_nonpositive_session_ttl_uses_default() {
    clear_env();
    let toml = TomlConfig {
        session_ttl_hours: Some(0),
        ..Default::default()
    };
    assert_eq!(
        PortalConfig::resolve(&CliOverrides::default(), &toml).session_ttl_hours,
        24
    );
}

#[test]
fn test_partial_rate_limit_section() {
    let toml: TomlConfig = toml::from_str(
        r#"
        [rate_limits]
        create_ticket_per_minute = 2
        "#,
    )
    .unwrap();
    assert_eq!(toml.rate_limits.create_ticket_per_minute, 2);
    assert_eq!(toml.rate_limits.create_asset_per_minute, 10);
    assert_eq!(toml.rate_limits.create_user_per_minute, 5);
    assert_eq!(toml.logging.level, "info");
}

#[test]
fn test_write_then_load_config_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("conf").join("config.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/itdesk")),
        port: Some(8080),
        default_locale: Some("es".to_string()),
        ..Default::default()
    };
    write_toml_config(&config, &path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&path).unwrap(), config);
}

#[test]
fn test_bad_config_file_degrades_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n[[[").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert_eq!(load_toml_config_or_default(Some(&path)), TomlConfig::default());

    let missing = tmp.path().join("missing.toml");
    assert!(load_toml_config(&missing).is_err());
    assert_eq!(load_toml_config_or_default(Some(&missing)), TomlConfig::default());
}
