// Swim Registrar - Core Library
// Parse-and-reconcile engine for swim-meet flat-file exports.
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod parser;
pub mod detect;
pub mod archive;
pub mod entities;
pub mod assembler;
pub mod merge;
pub mod db;
pub mod orphans;
pub mod reconciliation;
pub mod progress;
pub mod config;
pub mod worker;

// Re-export commonly used types
pub use error::{IngestError, Result};
pub use parser::{
    Dialect, Field, FieldSpec, Record, RecordType,
    compose_line, make_date_string, parse_athlete, parse_event_result,
};
pub use detect::{FileDescription, FileType, FlatFile, read_flat_file};
pub use archive::{ArchiveItem, ArchiveResolver, ContainerKind, ResolvedPayload};
pub use entities::{Athlete, Meet, MeetInfo, MeetResults, Relay, Scenario, Team};
pub use assembler::{assemble_meet, assemble_roster};
pub use merge::{RosterDiff, diff_rosters};
pub use db::{open_database, setup_database};
pub use orphans::{Orphan, OrphanEntry};
pub use reconciliation::{
    BatchOutcome, MeetOutcome, ReconciliationEngine, RosterOutcome, pair_rain_outs,
};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use config::IngestConfig;
pub use worker::{AutoConfirm, IngestHooks, IngestJob, RunSummary, WorkerHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
