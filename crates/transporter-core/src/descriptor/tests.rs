//! Tests for connection descriptors and TLS modes

use super::*;
use pretty_assertions::assert_eq;

fn staging() -> ConnectionDescriptor {
    ConnectionDescriptor::new("staging", "db.internal", 5433, "app", "app_db")
        .with_password("s3cret")
        .with_tls_mode(Some(TlsMode::Require))
}

#[test]
fn test_connection_args_are_canonical() {
    assert_eq!(
        staging().connection_args(),
        vec!["-h", "db.internal", "-p", "5433", "-U", "app", "-d", "app_db"]
    );
}

#[test]
fn test_credentials_stay_out_of_arguments() {
    let args = staging().connection_args();
    assert!(!args.iter().any(|arg| arg.contains("s3cret")));
}

#[test]
fn test_env_overlay_carries_password_and_tls_mode() {
    assert_eq!(
        staging().env_overlay(),
        vec![
            (PASSWORD_ENV, "s3cret".to_string()),
            (SSL_MODE_ENV, "require".to_string()),
        ]
    );
}

#[test]
fn test_env_overlay_omits_unset_values() {
    let descriptor = ConnectionDescriptor::new("local", "localhost", 5432, "postgres", "app");
    assert!(descriptor.env_overlay().is_empty());
}

#[test]
fn test_debug_redacts_password() {
    let rendered = format!("{:?}", staging());
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn test_validate_reports_missing_fields() {
    let descriptor = ConnectionDescriptor::new("broken", "", 5432, "", "db");
    let err = descriptor.validate().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("host"));
    assert!(message.contains("user"));
    assert!(!message.contains("dbname"));
}

#[test]
fn test_validate_rejects_port_zero() {
    let descriptor = ConnectionDescriptor::new("zero", "localhost", 0, "postgres", "db");
    assert!(descriptor.validate().is_err());
}

#[test]
fn test_same_database_by_name() {
    let a = ConnectionDescriptor::new("prod", "a.example", 5432, "u", "one");
    let b = ConnectionDescriptor::new("prod", "b.example", 5432, "u", "two");
    assert!(a.refers_to_same_database(&b));
}

#[test]
fn test_same_database_by_address() {
    let a = ConnectionDescriptor::new("prod", "DB.example", 5432, "u", "app");
    let b = ConnectionDescriptor::new("prod-alias", "db.example", 5432, "other", "app");
    assert!(a.refers_to_same_database(&b));

    let c = ConnectionDescriptor::new("qa", "db.example", 5432, "u", "app_qa");
    assert!(!a.refers_to_same_database(&c));
}

#[test]
fn test_tls_mode_parsing() {
    assert_eq!("verify-full".parse::<TlsMode>().unwrap(), TlsMode::VerifyFull);
    assert_eq!("VERIFY_CA".parse::<TlsMode>().unwrap(), TlsMode::VerifyCa);
    assert_eq!(TlsMode::parse_optional("").unwrap(), None);
    assert_eq!(
        TlsMode::parse_optional("disable").unwrap(),
        Some(TlsMode::Disable)
    );
    assert!("sometimes".parse::<TlsMode>().is_err());
}

#[test]
fn test_tls_mode_encryption_requirement() {
    assert!(!TlsMode::Prefer.requires_encryption());
    assert!(TlsMode::Require.requires_encryption());
    assert_eq!(TlsMode::VerifyCa.to_string(), "verify-ca");
}
