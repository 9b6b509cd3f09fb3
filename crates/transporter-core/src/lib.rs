//! psql-transporter core - transfer orchestration engine
//!
//! This crate drives one destructive PostgreSQL transfer end to end:
//!
//! - `ConnectionDescriptor` - Immutable address and credentials of one database
//! - `DumpRestore` - Capability trait over export / wipe / import
//! - `PgTools` - `DumpRestore` implementation shelling out to `pg_dump` and `psql`
//! - `ProgressMonitor` - Concurrent observer sampling export/import progress
//! - `Orchestrator` - State machine: select, validate, confirm, then run phases

mod descriptor;
mod error;
pub mod orchestrator;
pub mod progress;
pub mod runner;

pub use descriptor::*;
pub use error::*;
pub use orchestrator::{
    DEFAULT_DUMP_PATH, DUMP_TO_FILE_OPTION, Endpoint, EndpointPreset, LOAD_FROM_FILE_OPTION,
    Orchestrator, Presenter, SUCCESS_MARKER, SourceCatalog, Step, TransferOutcome, TransferPlan,
    TransferRequest, TransferSettings, TransferState, destination_candidates, select_endpoints,
    validate,
};
pub use progress::{
    CounterProbe, FileSizeProbe, FnSink, MonitorHandle, NoOpSink, ProgressMonitor, ProgressProbe,
    ProgressSample, ProgressSink, human_size, sink,
};
pub use runner::{
    CountingReader, DEFAULT_OPERATION_TIMEOUT, DumpRestore, OperationContext, PgTools, Phase,
    ProcessHandle, ToolCommand, WIPE_STATEMENT,
};
