//! Connection descriptors
//!
//! A `ConnectionDescriptor` addresses one PostgreSQL database. It is built
//! once from configuration and never mutated afterwards; the only behavior
//! it carries is producing the argument list and environment overlay for
//! the external dump/restore tools.

mod tls_mode;

pub use tls_mode::*;

use std::fmt;

use crate::{Result, TransferError};

/// Default PostgreSQL port
pub const DEFAULT_PORT: u16 = 5432;

/// Environment variable carrying the password to libpq tools
pub const PASSWORD_ENV: &str = "PGPASSWORD";

/// Environment variable carrying the TLS mode to libpq tools
pub const SSL_MODE_ENV: &str = "PGSSLMODE";

/// Immutable address and credentials of one database instance
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    name: String,
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    database: String,
    tls_mode: Option<TlsMode>,
    protected: bool,
}

impl ConnectionDescriptor {
    /// Create a descriptor with the required addressing fields.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            user: user.into(),
            password: None,
            database: database.into(),
            tls_mode: None,
            protected: false,
        }
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the TLS mode exported as `PGSSLMODE`
    pub fn with_tls_mode(mut self, mode: Option<TlsMode>) -> Self {
        self.tls_mode = mode;
        self
    }

    /// Mark the descriptor as protected (never a valid destination)
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn tls_mode(&self) -> Option<TlsMode> {
        self.tls_mode
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Canonical connection arguments shared by `pg_dump` and `psql`.
    ///
    /// Credentials are deliberately absent; see [`Self::env_overlay`].
    pub fn connection_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            self.user.clone(),
            "-d".to_string(),
            self.database.clone(),
        ]
    }

    /// Environment variables layered over the inherited environment of a tool.
    pub fn env_overlay(&self) -> Vec<(&'static str, String)> {
        let mut env = Vec::with_capacity(2);
        if let Some(password) = &self.password {
            env.push((PASSWORD_ENV, password.clone()));
        }
        if let Some(mode) = self.tls_mode {
            env.push((SSL_MODE_ENV, mode.as_str().to_string()));
        }
        env
    }

    /// Check that every required field is present.
    ///
    /// Reachability is not checked here; the external tool reports that.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("name", self.name.trim().is_empty()),
            ("host", self.host.trim().is_empty()),
            ("user", self.user.trim().is_empty()),
            ("dbname", self.database.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(TransferError::Configuration(format!(
                "source {:?} is missing required field(s): {}",
                self.name,
                missing.join(", ")
            )));
        }

        if self.port == 0 {
            return Err(TransferError::Configuration(format!(
                "source {:?} has an invalid port 0",
                self.name
            )));
        }

        Ok(())
    }

    /// Whether both descriptors address the same logical database.
    ///
    /// Equal names always match; otherwise host, port and database must agree.
    pub fn refers_to_same_database(&self, other: &ConnectionDescriptor) -> bool {
        self.name == other.name
            || (self.host.eq_ignore_ascii_case(&other.host)
                && self.port == other.port
                && self.database == other.database)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("tls_mode", &self.tls_mode)
            .field("protected", &self.protected)
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}@{}:{}/{})",
            self.name, self.user, self.host, self.port, self.database
        )
    }
}

#[cfg(test)]
mod tests;
