use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use swim_registrar::{
    db, detect, orphans, worker, ArchiveItem, BatchOutcome, IngestConfig, IngestHooks, IngestJob,
    Meet, MeetResults, RunSummary, Scenario,
};

#[derive(Parser)]
#[command(name = "swim-registrar", version, about = "Ingest swim-meet rosters and results")]
struct Cli {
    /// SQLite store
    #[arg(long, global = true, env = "SWIM_REGISTRAR_DB", default_value = "swim-registrar.db")]
    db: PathBuf,

    /// Directory for payloads extracted from .zip containers
    #[arg(long, global = true, env = "SWIM_REGISTRAR_SCRATCH")]
    scratch: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the store schema
    Init,

    /// Show what a container holds without touching the store
    Inspect { file: PathBuf },

    /// Replace team rosters from .sd3/.zip roster files
    Rosters {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ingest meet entries or results
    Results {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// MEET_RESULTS, BYE_WEEK_ENTRIES, BYE_WEEK_RESULTS, RAIN_OUT_ENTRIES, RAIN_OUT_RESULTS
        #[arg(long, default_value = "MEET_RESULTS")]
        scenario: Scenario,

        /// Rain-out pairing FIRST:SECOND (file indexes, 0-based)
        #[arg(long = "pair", value_parser = parse_pair)]
        pairs: Vec<(usize, usize)>,

        /// Overwrite stored meets without asking
        #[arg(long)]
        yes: bool,
    },

    /// List athletes seen in meet files but missing from rosters
    Orphans {
        #[arg(long)]
        meet: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_pair(s: &str) -> std::result::Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FIRST:SECOND, got '{}'", s))?;
    let parse = |v: &str| v.trim().parse::<usize>().map_err(|e| format!("'{}': {}", v, e));
    Ok((parse(a)?, parse(b)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("swim_registrar=debug,info")
        } else {
            EnvFilter::new("swim_registrar=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();

    let config = IngestConfig::new(&cli.db).with_scratch_dir(cli.scratch.clone());

    match cli.command {
        Commands::Init => run_init(&config),
        Commands::Inspect { file } => run_inspect(&config, &file),
        Commands::Rosters { files } => run_job(config, IngestJob::Rosters(files), Box::new(StdinPrompt::default())),
        Commands::Results {
            files,
            scenario,
            pairs,
            yes,
        } => {
            if scenario == Scenario::TeamRoster {
                return Err(anyhow!("use the 'rosters' command for team rosters"));
            }
            let hooks = StdinPrompt {
                pairs,
                assume_yes: yes,
            };
            run_job(config, IngestJob::Results { files, scenario }, Box::new(hooks))
        }
        Commands::Orphans { meet, format } => run_orphans(&config, meet, format),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_init(config: &IngestConfig) -> Result<()> {
    db::open_database(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    println!("✓ Database ready at {}", config.db_path.display());
    Ok(())
}

fn run_inspect(config: &IngestConfig, file: &Path) -> Result<()> {
    let item = ArchiveItem::scan(file)?;
    let payload = config.resolver().resolve(&item)?;
    let flat = detect::read_flat_file(payload.path(), payload.dialect)?;
    let desc = &flat.description;

    println!("📂 {}", file.display());
    println!("   Container: {:?} ({} member(s))", item.kind, item.members.len());
    println!("   Dialect:   {}", desc.dialect);
    println!("   Type:      {}", desc.file_type);
    println!("   Vendor:    {} {}", desc.vendor, desc.vendor_version);
    println!("   File date: {}", desc.file_date);
    println!("   Records:   {}", flat.records.len());
    for (record_type, count) in flat.record_counts() {
        println!("     {:<28} {}", record_type.to_string(), count);
    }
    Ok(())
}

fn run_job(config: IngestConfig, job: IngestJob, hooks: Box<dyn IngestHooks>) -> Result<()> {
    let conn = db::open_database(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    let mut handle = worker::spawn(conn, config, job, hooks).context("Failed to start ingestion worker")?;
    println!("🏊 Run {}", handle.run_id);

    while let Some(update) = handle.progress.blocking_recv() {
        if update.failed {
            println!("[fail] {}", update.message);
        } else {
            println!("[{:>3.0}%] {}", update.fraction() * 100.0, update.message);
        }
    }

    let (_conn, result) = handle
        .join()
        .map_err(|_| anyhow!("ingestion worker panicked"))?;

    print_summary(&result?);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    match summary {
        RunSummary::Rosters(BatchOutcome::Committed(outcomes)) => {
            for o in outcomes {
                println!(
                    "✓ {}{}: {} added, {} deleted, {} unchanged",
                    o.team_code,
                    if o.new_team { " (new)" } else { "" },
                    o.added,
                    o.deleted,
                    o.unchanged
                );
            }
        }
        RunSummary::Meets(BatchOutcome::Committed(outcomes)) => {
            for o in outcomes {
                println!(
                    "✓ {} [{}]: {} credited, {} orphaned",
                    o.description,
                    if o.updated { "updated" } else { "new" },
                    o.credited,
                    o.orphaned
                );
            }
        }
        RunSummary::Rosters(BatchOutcome::Declined) | RunSummary::Meets(BatchOutcome::Declined) => {
            println!("✗ Overwrite declined, nothing written");
        }
        RunSummary::Rosters(BatchOutcome::Cancelled) | RunSummary::Meets(BatchOutcome::Cancelled) => {
            println!("✗ Cancelled, batch rolled back");
        }
        RunSummary::ParseCancelled { parsed } => {
            println!("✗ Cancelled after parsing {} file(s), nothing written", parsed);
        }
    }
}

fn run_orphans(config: &IngestConfig, meet: Option<i64>, format: OutputFormat) -> Result<()> {
    let conn = db::open_database(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    let entries = match meet {
        Some(id) => orphans::orphans_for_meet(&conn, id)?,
        None => orphans::list_orphans(&conn)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No orphans");
            }
            for entry in &entries {
                println!(
                    "{}  {:<6} meet {:<5} {}",
                    entry.meet_date,
                    entry.team_code,
                    entry.orphan.meet_id,
                    entry.orphan.athlete_info()
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// INTERACTIVE HOOKS
// ============================================================================

#[derive(Default)]
struct StdinPrompt {
    pairs: Vec<(usize, usize)>,
    assume_yes: bool,
}

impl IngestHooks for StdinPrompt {
    fn pair_rain_outs(&mut self, batch: &[MeetResults]) -> Vec<(usize, usize)> {
        for (i, meet) in batch.iter().enumerate() {
            println!("   [{}] {}", i, meet.describe());
        }
        self.pairs.clone()
    }

    fn confirm_overwrite(&mut self, existing: &[Meet]) -> bool {
        if self.assume_yes {
            return true;
        }

        println!("⚠️  {} meet(s) already stored:", existing.len());
        for meet in existing {
            println!("   meet {} on {} ({})", meet.id, meet.meet_date, meet.result_type);
        }
        print!("Overwrite? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}
