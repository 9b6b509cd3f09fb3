//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use transporter_core::{Endpoint, EndpointPreset, SourceCatalog, TransferError, TransferSettings};

use crate::logging;

/// Refresh one PostgreSQL database from another, or to and from dump files.
///
/// Sources are read from `psql-transporter.yaml`. Endpoints not given on
/// the command line are chosen interactively.
#[derive(Parser, Debug)]
#[command(name = "psql-transporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file [default: ./psql-transporter.yaml]
    #[arg(long, short, value_name = "PATH", env = "PSQL_TRANSPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source database name from the config
    #[arg(long, value_name = "NAME", conflicts_with = "from_file")]
    pub from: Option<String>,

    /// Read the source from a dump file
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,

    /// Destination database name from the config
    #[arg(long, value_name = "NAME", conflicts_with = "to_file")]
    pub to: Option<String>,

    /// Write the source to a dump file
    #[arg(long, value_name = "PATH")]
    pub to_file: Option<PathBuf>,

    /// Intermediate dump file for database copies
    #[arg(long, value_name = "PATH")]
    pub dump_path: Option<PathBuf>,

    /// Deadline for the whole transfer, in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Log filter, e.g. `info` or `transporter_core=debug` (RUST_LOG wins)
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,

    /// Also write JSON logs to daily files, in DIR or the local data directory
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub log_dir: Option<Option<PathBuf>>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage source passwords kept in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a password for a source, read from stdin
    Set { name: String },
    /// Remove the stored password of a source
    Delete { name: String },
}

impl Cli {
    /// Endpoints fixed by flags; unset sides are prompted for later.
    pub fn preset(&self, catalog: &SourceCatalog) -> Result<EndpointPreset, TransferError> {
        let source = match (&self.from, &self.from_file) {
            (Some(name), _) => Some(lookup(catalog, name, "source")?),
            (None, Some(path)) => Some(Endpoint::File(path.clone())),
            (None, None) => None,
        };
        let destination = match (&self.to, &self.to_file) {
            (Some(name), _) => Some(lookup(catalog, name, "destination")?),
            (None, Some(path)) => Some(Endpoint::File(path.clone())),
            (None, None) => None,
        };
        Ok(EndpointPreset {
            source,
            destination,
        })
    }

    /// Directory for JSON log files, if file logging was requested
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .map(|dir| dir.unwrap_or_else(logging::default_log_directory))
    }

    /// Apply `--dump-path` and `--timeout` on top of the config values.
    pub fn apply_overrides(&self, mut settings: TransferSettings) -> TransferSettings {
        if let Some(path) = &self.dump_path {
            settings = settings.with_dump_path(path.clone());
        }
        if let Some(secs) = self.timeout {
            settings = settings.with_timeout(Duration::from_secs(secs));
        }
        settings
    }
}

fn lookup(catalog: &SourceCatalog, name: &str, side: &str) -> Result<Endpoint, TransferError> {
    catalog
        .get(name)
        .cloned()
        .map(Endpoint::Database)
        .ok_or_else(|| {
            TransferError::Selection(format!(
                "unknown {} {:?}; configured sources: {}",
                side,
                name,
                catalog.names().join(", ")
            ))
        })
}

#[cfg(test)]
mod tests;
