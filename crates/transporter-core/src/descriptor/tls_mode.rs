//! TLS mode for database connections
//!
//! Follows libpq's `sslmode` values; the mode is handed to the external
//! tools through `PGSSLMODE`.

use std::fmt;
use std::str::FromStr;

use crate::TransferError;

/// TLS/SSL mode for a PostgreSQL connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsMode {
    /// Disable TLS entirely (not recommended for production)
    Disable,
    /// Try an unencrypted connection first, fall back to TLS
    Allow,
    /// Prefer TLS, but allow unencrypted connections
    Prefer,
    /// Require TLS, but don't verify the server certificate
    Require,
    /// Require TLS and verify the server certificate against the CA
    VerifyCa,
    /// Require TLS, verify CA, and verify the server hostname matches
    VerifyFull,
}

impl TlsMode {
    /// The libpq spelling of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Disable => "disable",
            TlsMode::Allow => "allow",
            TlsMode::Prefer => "prefer",
            TlsMode::Require => "require",
            TlsMode::VerifyCa => "verify-ca",
            TlsMode::VerifyFull => "verify-full",
        }
    }

    /// Returns true if this mode requires encryption
    pub fn requires_encryption(&self) -> bool {
        matches!(
            self,
            TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull
        )
    }

    /// Parse an optional mode where an empty string means "unset".
    pub fn parse_optional(value: &str) -> Result<Option<Self>, TransferError> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            value.parse().map(Some)
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsMode {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "disable" => Ok(TlsMode::Disable),
            "allow" => Ok(TlsMode::Allow),
            "prefer" => Ok(TlsMode::Prefer),
            "require" => Ok(TlsMode::Require),
            "verify-ca" => Ok(TlsMode::VerifyCa),
            "verify-full" => Ok(TlsMode::VerifyFull),
            _ => Err(TransferError::Configuration(format!(
                "unknown sslmode {:?} (expected disable, allow, prefer, require, verify-ca or verify-full)",
                s
            ))),
        }
    }
}
