use super::*;
use clap::CommandFactory;
use transporter_core::ConnectionDescriptor;

fn catalog() -> SourceCatalog {
    SourceCatalog::new(vec![
        ConnectionDescriptor::new("prod", "db", 5432, "app", "app").protected(true),
        ConnectionDescriptor::new("qa", "qa", 5432, "app", "app"),
    ])
}

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_flags_build_preset() {
    let cli = Cli::parse_from(["psql-transporter", "--from", "prod", "--to-file", "out.sql"]);
    let preset = cli.preset(&catalog()).unwrap();

    assert_eq!(preset.source.unwrap().as_database().unwrap().name(), "prod");
    assert_eq!(
        preset.destination,
        Some(Endpoint::File(PathBuf::from("out.sql")))
    );
}

#[test]
fn test_no_flags_leave_both_sides_open() {
    let cli = Cli::parse_from(["psql-transporter"]);
    let preset = cli.preset(&catalog()).unwrap();
    assert!(preset.source.is_none());
    assert!(preset.destination.is_none());
    assert_eq!(cli.log_level, "warn");
}

#[test]
fn test_unknown_source_lists_configured_names() {
    let cli = Cli::parse_from(["psql-transporter", "--from", "staging"]);
    let err = cli.preset(&catalog()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("\"staging\""));
    assert!(message.contains("prod, qa"));
}

#[test]
fn test_conflicting_source_flags_are_rejected() {
    let result = Cli::try_parse_from([
        "psql-transporter",
        "--from",
        "prod",
        "--from-file",
        "dump.sql",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_zero_timeout_is_rejected() {
    assert!(Cli::try_parse_from(["psql-transporter", "--timeout", "0"]).is_err());
}

#[test]
fn test_overrides_replace_config_values() {
    let cli = Cli::parse_from([
        "psql-transporter",
        "--dump-path",
        "/tmp/x.sql",
        "--timeout",
        "90",
    ]);
    let settings = cli.apply_overrides(TransferSettings::default());
    assert_eq!(settings.dump_path, PathBuf::from("/tmp/x.sql"));
    assert_eq!(settings.timeout, Duration::from_secs(90));
}

#[test]
fn test_secret_subcommand() {
    let cli = Cli::parse_from(["psql-transporter", "secret", "set", "qa"]);
    assert!(matches!(
        cli.command,
        Some(Command::Secret {
            action: SecretAction::Set { ref name }
        }) if name == "qa"
    ));
}

#[test]
fn test_log_dir_flag_without_value_uses_default_location() {
    let cli = Cli::parse_from(["psql-transporter", "--log-dir"]);
    assert_eq!(cli.log_directory(), Some(logging::default_log_directory()));

    let cli = Cli::parse_from(["psql-transporter", "--log-dir", "/var/log/pt"]);
    assert_eq!(cli.log_directory(), Some(PathBuf::from("/var/log/pt")));

    assert_eq!(Cli::parse_from(["psql-transporter"]).log_directory(), None);
}
