//! Configuration for psql-transporter
//!
//! The source list lives in a YAML file (`psql-transporter.yaml` by
//! default). Passwords may be written inline or kept in the OS keychain,
//! keyed by source name.

mod error;
mod file;
mod secrets;

pub use error::*;
pub use file::*;
pub use secrets::*;
