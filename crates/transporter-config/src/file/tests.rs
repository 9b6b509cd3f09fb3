use super::*;
use crate::MemoryStore;
use pretty_assertions::assert_eq;

const SAMPLE: &str = r#"
sources:
  - name: prod
    host: db.internal
    user: app
    dbname: app_db
    sslmode: verify-full
    protected: true
  - name: staging
    host: 10.0.0.12
    port: 6543
    user: app
    password: inline
    dbname: app_db
"#;

fn parse(yaml: &str) -> ConfigFile {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_parse_defaults() {
    let config = parse(SAMPLE);
    config.validate().unwrap();

    let prod = config.source("prod").unwrap();
    assert_eq!(prod.port, DEFAULT_PORT);
    assert_eq!(prod.password, None);
    assert_eq!(prod.ssl_mode.as_deref(), Some("verify-full"));
    assert!(prod.protected);

    let staging = config.source("staging").unwrap();
    assert_eq!(staging.port, 6543);
    assert!(!staging.protected);
    assert_eq!(config.transfer, None);
}

#[test]
fn test_catalog_resolves_missing_passwords_from_store() {
    let config = parse(SAMPLE);
    let secrets = MemoryStore::new()
        .with_password("prod", "from-keychain")
        .with_password("staging", "ignored");

    let catalog = config.catalog(&secrets).unwrap();

    assert_eq!(catalog.names(), vec!["prod".to_string(), "staging".to_string()]);
    let prod = catalog.get("prod").unwrap();
    assert_eq!(prod.password(), Some("from-keychain"));
    assert_eq!(prod.tls_mode(), Some(TlsMode::VerifyFull));
    assert!(prod.is_protected());
    assert_eq!(catalog.get("staging").unwrap().password(), Some("inline"));
}

#[test]
fn test_empty_source_list_is_rejected() {
    let config = parse("sources: []\n");
    assert!(matches!(config.validate(), Err(ConfigError::NoSources)));
}

#[test]
fn test_missing_fields_name_the_source() {
    let config = parse("sources:\n  - name: broken\n    host: localhost\n");
    match config.validate() {
        Err(ConfigError::InvalidSource { name, reason }) => {
            assert_eq!(name, "broken");
            assert!(reason.contains("user"));
            assert!(reason.contains("dbname"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_unknown_sslmode_is_rejected() {
    let config = parse(
        "sources:\n  - {name: a, host: h, user: u, dbname: d, sslmode: sometimes}\n",
    );
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSource { .. })
    ));
}

#[test]
fn test_duplicate_names_are_rejected() {
    let config = parse(
        "sources:\n  - {name: a, host: h, user: u, dbname: d}\n  - {name: a, host: h2, user: u, dbname: d}\n",
    );
    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateSource(ref name)) if name == "a"
    ));
}

#[test]
fn test_menu_labels_cannot_be_source_names() {
    let config = parse("sources:\n  - {name: Dump to file, host: h, user: u, dbname: d}\n");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSource { .. })
    ));
}

#[test]
fn test_transfer_section_overrides_settings() {
    let config = parse(&format!(
        "{SAMPLE}transfer:\n  timeout_secs: 60\n  dump_path: /var/tmp/refresh.sql\n  poll_interval_ms: 0\n"
    ));

    let settings = config.transfer_settings();
    assert_eq!(settings.timeout, Duration::from_secs(60));
    assert_eq!(settings.dump_path, PathBuf::from("/var/tmp/refresh.sql"));
    assert_eq!(settings.poll_interval, TransferSettings::default().poll_interval);
}

#[test]
fn test_tools_section_replaces_commands() {
    let config = parse(&format!(
        "{SAMPLE}tools:\n  pg_dump: [docker, exec, -i, pg, pg_dump]\n  psql: []\n"
    ));

    let tools = config.pg_tools(Duration::from_millis(250));
    assert_eq!(tools.pg_dump().program(), Path::new("docker"));
    assert_eq!(tools.pg_dump().args().len(), 4);
    assert_eq!(tools.psql().program(), Path::new("psql"));
}

#[test]
fn test_debug_redacts_password() {
    let config = parse(SAMPLE);
    let debug = format!("{:?}", config);
    assert!(!debug.contains("inline"));
    assert!(debug.contains("<redacted>"));
}
