//! Transfer endpoints, requests and validated plans

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConnectionDescriptor, Phase, ValidationError};

/// Selection label for reading the source from a dump file
pub const LOAD_FROM_FILE_OPTION: &str = "Load from file";

/// Selection label for writing the destination to a dump file
pub const DUMP_TO_FILE_OPTION: &str = "Dump to file";

/// Ordered list of configured databases
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<ConnectionDescriptor>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<ConnectionDescriptor>) -> Self {
        Self { sources }
    }

    /// Names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionDescriptor> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// One side of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Database(ConnectionDescriptor),
    File(PathBuf),
}

impl Endpoint {
    pub fn is_database(&self) -> bool {
        matches!(self, Endpoint::Database(_))
    }

    pub fn as_database(&self) -> Option<&ConnectionDescriptor> {
        match self {
            Endpoint::Database(descriptor) => Some(descriptor),
            Endpoint::File(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Database(descriptor) => f.write_str(descriptor.name()),
            Endpoint::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Source and destination as chosen, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: Endpoint,
    pub destination: Endpoint,
}

impl TransferRequest {
    pub fn new(source: Endpoint, destination: Endpoint) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// A validated transfer and the phases it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Database to file: export only
    ExportOnly {
        source: ConnectionDescriptor,
        output: PathBuf,
    },
    /// File to database: wipe, then import the supplied dump
    Restore {
        input: PathBuf,
        destination: ConnectionDescriptor,
    },
    /// Database to database: export to `artifact`, wipe, import
    Copy {
        source: ConnectionDescriptor,
        destination: ConnectionDescriptor,
        artifact: PathBuf,
    },
}

/// One phase bound to its operands
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Export {
        source: &'a ConnectionDescriptor,
        output: &'a Path,
    },
    Wipe {
        destination: &'a ConnectionDescriptor,
    },
    Import {
        destination: &'a ConnectionDescriptor,
        input: &'a Path,
    },
}

impl Step<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            Step::Export { .. } => Phase::Export,
            Step::Wipe { .. } => Phase::Wipe,
            Step::Import { .. } => Phase::Import,
        }
    }
}

impl TransferPlan {
    /// Phases in execution order
    pub fn steps(&self) -> Vec<Step<'_>> {
        match self {
            TransferPlan::ExportOnly { source, output } => vec![Step::Export { source, output }],
            TransferPlan::Restore { input, destination } => vec![
                Step::Wipe { destination },
                Step::Import { destination, input },
            ],
            TransferPlan::Copy {
                source,
                destination,
                artifact,
            } => vec![
                Step::Export {
                    source,
                    output: artifact,
                },
                Step::Wipe { destination },
                Step::Import {
                    destination,
                    input: artifact,
                },
            ],
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.steps().iter().map(Step::phase).collect()
    }

    /// Database that will be overwritten, if any
    pub fn destination_database(&self) -> Option<&ConnectionDescriptor> {
        match self {
            TransferPlan::ExportOnly { .. } => None,
            TransferPlan::Restore { destination, .. } | TransferPlan::Copy { destination, .. } => {
                Some(destination)
            }
        }
    }

    /// Dump file produced by this plan, if any
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            TransferPlan::ExportOnly { output, .. } => Some(output),
            TransferPlan::Copy { artifact, .. } => Some(artifact),
            TransferPlan::Restore { .. } => None,
        }
    }

    /// Dump file the import phase reads, if any
    pub fn import_input(&self) -> Option<&Path> {
        match self {
            TransferPlan::Restore { input, .. } => Some(input),
            TransferPlan::Copy { artifact, .. } => Some(artifact),
            TransferPlan::ExportOnly { .. } => None,
        }
    }
}

/// Destination labels offered after `source` was chosen.
///
/// Protected databases and the source itself are never offered. `Dump to
/// file` is offered only when the source is a database.
pub fn destination_candidates(catalog: &SourceCatalog, source: &Endpoint) -> Vec<String> {
    let mut candidates: Vec<String> = catalog
        .iter()
        .filter(|candidate| !candidate.is_protected())
        .filter(|candidate| match source {
            Endpoint::Database(source) => !source.refers_to_same_database(candidate),
            Endpoint::File(_) => true,
        })
        .map(|candidate| candidate.name().to_string())
        .collect();

    if source.is_database() {
        candidates.push(DUMP_TO_FILE_OPTION.to_string());
    }
    candidates
}

/// Check a request against the transfer invariants and produce its plan.
///
/// `artifact` is the intermediate dump path used by database-to-database
/// copies. A restore is only planned when its dump file can be opened, so
/// the destination is never wiped without the data to replace it.
pub fn validate(request: TransferRequest, artifact: &Path) -> Result<TransferPlan, ValidationError> {
    if let Endpoint::Database(destination) = &request.destination {
        if destination.is_protected() {
            return Err(ValidationError::ProtectedDestination(
                destination.name().to_string(),
            ));
        }
    }

    match (request.source, request.destination) {
        (Endpoint::File(_), Endpoint::File(_)) => Err(ValidationError::UnsupportedFileToFile),
        (Endpoint::Database(source), Endpoint::File(output)) => {
            Ok(TransferPlan::ExportOnly { source, output })
        }
        (Endpoint::File(input), Endpoint::Database(destination)) => {
            if !is_readable_file(&input) {
                return Err(ValidationError::MissingDumpFile(input));
            }
            Ok(TransferPlan::Restore { input, destination })
        }
        (Endpoint::Database(source), Endpoint::Database(destination)) => {
            if source.refers_to_same_database(&destination) {
                return Err(ValidationError::IdenticalEndpoints(
                    destination.name().to_string(),
                ));
            }
            Ok(TransferPlan::Copy {
                source,
                destination,
                artifact: artifact.to_path_buf(),
            })
        }
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}
