// 🧵 Ingestion Worker - one run = parse phase, then reconciliation phase
//
// The store connection moves into the worker thread and comes back through
// the join handle, so two runs can never share it.

use crate::archive::{ArchiveItem, ArchiveResolver};
use crate::assembler;
use crate::config::IngestConfig;
use crate::detect::{self, FlatFile};
use crate::entities::{Meet, MeetResults, Scenario, Team};
use crate::error::Result;
use crate::progress::{ProgressReporter, ProgressUpdate};
use crate::reconciliation::{self, BatchOutcome, MeetOutcome, RosterOutcome};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

// ============================================================================
// CALLER HOOKS
// ============================================================================

/// Decisions the caller makes mid-run
pub trait IngestHooks: Send {
    /// Rain-out pairings as (first, second) indexes into the parsed batch
    fn pair_rain_outs(&mut self, _batch: &[MeetResults]) -> Vec<(usize, usize)> {
        Vec::new()
    }

    /// Asked once, before any write, when stored meets would be overwritten
    fn confirm_overwrite(&mut self, existing: &[Meet]) -> bool;
}

/// Fixed answers, for non-interactive runs
#[derive(Debug, Clone, Default)]
pub struct AutoConfirm {
    pub pairs: Vec<(usize, usize)>,
    pub overwrite: bool,
}

impl IngestHooks for AutoConfirm {
    fn pair_rain_outs(&mut self, _batch: &[MeetResults]) -> Vec<(usize, usize)> {
        self.pairs.clone()
    }

    fn confirm_overwrite(&mut self, _existing: &[Meet]) -> bool {
        self.overwrite
    }
}

// ============================================================================
// JOBS + SUMMARIES
// ============================================================================

#[derive(Debug, Clone)]
pub enum IngestJob {
    Rosters(Vec<PathBuf>),
    Results {
        files: Vec<PathBuf>,
        scenario: Scenario,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunSummary {
    Rosters(BatchOutcome<Vec<RosterOutcome>>),
    Meets(BatchOutcome<Vec<MeetOutcome>>),
    /// Cancelled while parsing; nothing was reconciled
    ParseCancelled { parsed: usize },
}

enum Parsed<T> {
    Complete(Vec<T>),
    Cancelled(usize),
}

// ============================================================================
// PARSE PHASE
// ============================================================================

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve, detect and assemble every file. Fail-fast: the first error
/// ends the phase.
fn parse_items<T>(
    files: &[PathBuf],
    scenario: Scenario,
    resolver: &ArchiveResolver,
    progress: &ProgressReporter,
    assemble: impl Fn(&FlatFile) -> Result<T>,
) -> Result<Parsed<T>> {
    let total = files.len();
    let mut parsed = Vec::with_capacity(total);

    for (i, path) in files.iter().enumerate() {
        if progress.is_cancelled() {
            warn!("Parsing cancelled after {} of {} file(s)", i, total);
            return Ok(Parsed::Cancelled(i));
        }

        let item = ArchiveItem::scan(path)?;
        let payload = resolver.resolve(&item)?;
        let file = detect::read_flat_file(payload.path(), payload.dialect)?;
        detect::expect_file_type(&file.description, scenario.expected_file_type(item.kind))?;
        parsed.push(assemble(&file)?);

        progress.report(format!("Parsed {}", display_name(path)), i + 1, total);
    }

    Ok(Parsed::Complete(parsed))
}

pub fn run_rosters(
    conn: &mut Connection,
    files: &[PathBuf],
    config: &IngestConfig,
    progress: &ProgressReporter,
) -> Result<RunSummary> {
    let teams: Vec<Team> = match parse_items(
        files,
        Scenario::TeamRoster,
        &config.resolver(),
        progress,
        assembler::assemble_roster,
    )? {
        Parsed::Complete(teams) => teams,
        Parsed::Cancelled(parsed) => return Ok(RunSummary::ParseCancelled { parsed }),
    };

    let outcome = config.engine().apply_rosters(conn, &teams, progress)?;
    Ok(RunSummary::Rosters(outcome))
}

pub fn run_results(
    conn: &mut Connection,
    files: &[PathBuf],
    scenario: Scenario,
    config: &IngestConfig,
    hooks: &mut dyn IngestHooks,
    progress: &ProgressReporter,
) -> Result<RunSummary> {
    let mut batch = match parse_items(files, scenario, &config.resolver(), progress, |file| {
        assembler::assemble_meet(file, scenario)
    })? {
        Parsed::Complete(batch) => batch,
        Parsed::Cancelled(parsed) => return Ok(RunSummary::ParseCancelled { parsed }),
    };

    if scenario.is_rain_out() {
        let pairs = hooks.pair_rain_outs(&batch);
        batch = reconciliation::pair_rain_outs(batch, &pairs)?;
    }

    let outcome = config.engine().apply_meet_results(
        conn,
        &mut batch,
        |existing| hooks.confirm_overwrite(existing),
        progress,
    )?;
    Ok(RunSummary::Meets(outcome))
}

/// Run a job on the current thread, surfacing any error on the status channel
pub fn execute(
    conn: &mut Connection,
    config: &IngestConfig,
    job: &IngestJob,
    hooks: &mut dyn IngestHooks,
    progress: &ProgressReporter,
) -> Result<RunSummary> {
    let result = match job {
        IngestJob::Rosters(files) => run_rosters(conn, files, config, progress),
        IngestJob::Results { files, scenario } => {
            run_results(conn, files, *scenario, config, hooks, progress)
        }
    };

    match &result {
        Ok(summary) => info!("Run finished: {:?}", summary),
        Err(e) => {
            error!("Run failed: {}", e);
            progress.fail(e.to_string());
        }
    }
    result
}

// ============================================================================
// BACKGROUND WORKER
// ============================================================================

pub struct WorkerHandle {
    pub run_id: Uuid,
    /// Status updates; closes when the run ends
    pub progress: UnboundedReceiver<ProgressUpdate>,
    cancel: CancellationToken,
    handle: JoinHandle<(Connection, Result<RunSummary>)>,
}

impl WorkerHandle {
    /// Ask the run to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run; hands the connection back
    pub fn join(self) -> thread::Result<(Connection, Result<RunSummary>)> {
        self.handle.join()
    }
}

/// Start a run on a dedicated thread
pub fn spawn(
    conn: Connection,
    config: IngestConfig,
    job: IngestJob,
    mut hooks: Box<dyn IngestHooks>,
) -> io::Result<WorkerHandle> {
    let (progress, rx) = ProgressReporter::channel();
    let cancel = progress.cancel_token();
    let run_id = Uuid::new_v4();

    let handle = thread::Builder::new()
        .name("swim-ingest".to_string())
        .spawn(move || {
            let mut conn = conn;
            let span = info_span!("ingest", run = %run_id);
            let _guard = span.enter();

            info!("Starting {:?}", job);
            let result = execute(&mut conn, &config, &job, hooks.as_mut(), &progress);
            (conn, result)
        })?;

    Ok(WorkerHandle {
        run_id,
        progress: rx,
        cancel,
        handle,
    })
}
