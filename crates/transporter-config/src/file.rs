//! The YAML configuration file
//!
//! ```yaml
//! sources:
//!   - name: staging
//!     host: 10.0.0.12
//!     port: 5432
//!     user: app
//!     dbname: app_db
//!     sslmode: require
//!     protected: false
//! ```
//!
//! The optional `transfer` section overrides [`TransferSettings`] and the
//! optional `tools` section replaces the `pg_dump`/`psql` command lines.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use transporter_core::{
    ConnectionDescriptor, DEFAULT_PORT, DUMP_TO_FILE_OPTION, LOAD_FROM_FILE_OPTION, PgTools,
    SourceCatalog, TlsMode, ToolCommand, TransferSettings,
};

use crate::{ConfigError, Result, SecretStore};

/// File name looked up in the working directory
pub const DEFAULT_FILE_NAME: &str = "psql-transporter.yaml";

/// Top-level document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsSection>,
}

/// One configured database
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    /// Inline password. When absent the secret store is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, rename = "dbname")]
    pub database: String,
    #[serde(default, rename = "sslmode", skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,
    #[serde(default)]
    pub protected: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl fmt::Debug for SourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceEntry")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("protected", &self.protected)
            .finish()
    }
}

impl SourceEntry {
    /// Build the descriptor for this entry, using `password` when the entry
    /// carries none inline.
    pub fn to_descriptor(&self, password: Option<String>) -> Result<ConnectionDescriptor> {
        let invalid = |reason: String| ConfigError::InvalidSource {
            name: self.name.clone(),
            reason,
        };

        let tls_mode = TlsMode::parse_optional(self.ssl_mode.as_deref().unwrap_or(""))
            .map_err(|e| invalid(e.to_string()))?;

        let mut descriptor = ConnectionDescriptor::new(
            self.name.as_str(),
            self.host.as_str(),
            self.port,
            self.user.as_str(),
            self.database.as_str(),
        )
        .with_tls_mode(tls_mode)
        .protected(self.protected);

        if let Some(password) = self.password.clone().or(password) {
            descriptor = descriptor.with_password(password);
        }

        descriptor.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(descriptor)
    }
}

/// Optional `transfer` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

/// Optional `tools` section: full argv of each tool, e.g.
/// `[docker, exec, -i, pg, pg_dump]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pg_dump: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psql: Option<Vec<String>>,
}

impl ConfigFile {
    /// The file written on first run: a single protected example source.
    pub fn example() -> Self {
        Self {
            sources: vec![SourceEntry {
                name: "example".to_string(),
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
                user: "postgres".to_string(),
                password: Some("postgres".to_string()),
                database: "app_db".to_string(),
                ssl_mode: Some(TlsMode::Disable.to_string()),
                protected: true,
            }],
            transfer: None,
            tools: None,
        }
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ConfigFile =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            sources = config.sources.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Write the config as YAML. New files are created owner-only on unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(io_error)?;
        file.write_all(yaml.as_bytes()).map_err(io_error)?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Check the source list: at least one entry, every entry complete, names
    /// unique and distinct from the selection menu labels.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut seen = HashSet::new();
        for entry in &self.sources {
            entry.to_descriptor(None)?;
            if entry.name == LOAD_FROM_FILE_OPTION || entry.name == DUMP_TO_FILE_OPTION {
                return Err(ConfigError::InvalidSource {
                    name: entry.name.clone(),
                    reason: "name is reserved for the file option".to_string(),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateSource(entry.name.clone()));
            }
        }
        Ok(())
    }

    /// Descriptors in file order, with missing passwords looked up in
    /// `secrets`. Secret store failures leave the password unset.
    pub fn catalog(&self, secrets: &dyn SecretStore) -> Result<SourceCatalog> {
        let mut descriptors = Vec::with_capacity(self.sources.len());
        for entry in &self.sources {
            let password = if entry.password.is_some() {
                None
            } else {
                match secrets.get(&entry.name) {
                    Ok(password) => password,
                    Err(e) => {
                        tracing::warn!(source = %entry.name, error = %e, "cannot read stored password");
                        None
                    }
                }
            };
            descriptors.push(entry.to_descriptor(password)?);
        }
        Ok(SourceCatalog::new(descriptors))
    }

    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Transfer settings with this file's overrides applied. Zero values
    /// keep the defaults.
    pub fn transfer_settings(&self) -> TransferSettings {
        let mut settings = TransferSettings::default();
        let Some(section) = &self.transfer else {
            return settings;
        };

        if let Some(secs) = section.timeout_secs.filter(|s| *s > 0) {
            settings = settings.with_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = &section.dump_path {
            settings = settings.with_dump_path(path.clone());
        }
        if let Some(ms) = section.poll_interval_ms.filter(|ms| *ms > 0) {
            settings = settings.with_poll_interval(Duration::from_millis(ms));
        }
        settings
    }

    /// Tool command lines, falling back to `pg_dump`/`psql` on the `PATH`.
    pub fn pg_tools(&self, poll_interval: Duration) -> PgTools {
        let mut tools = PgTools::new().with_poll_interval(poll_interval);
        let Some(section) = &self.tools else {
            return tools;
        };

        if let Some(command) = section.pg_dump.as_deref().and_then(ToolCommand::from_argv) {
            tools = tools.with_pg_dump(command);
        }
        if let Some(command) = section.psql.as_deref().and_then(ToolCommand::from_argv) {
            tools = tools.with_psql(command);
        }
        tools
    }
}

/// Create `dir/psql-transporter.yaml` with the example source when missing.
///
/// Returns the config path and whether it was just created.
pub fn ensure_exists(dir: &Path) -> Result<(PathBuf, bool)> {
    let path = dir.join(DEFAULT_FILE_NAME);
    ensure_file(&path).map(|created| (path, created))
}

/// Create the config at `path` with the example source when missing.
pub fn ensure_file(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ConfigFile::example().save(path)?;
            tracing::info!(path = %path.display(), "created default config");
            Ok(true)
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests;
