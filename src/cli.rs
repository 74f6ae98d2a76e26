use crate::catalog::Catalog;
use crate::clock::SystemClock;
use crate::error::LaunchError;
use crate::ledger::PlaytimeLedger;
use crate::model::{CatalogEntry, SessionEvent};
use crate::orchestrator::LaunchCoordinator;
use crate::storage::PersistentStore;
use crate::summary;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "playtime-launcher",
    version,
    about = "Launch your games and keep track of how long you play them"
)]
pub struct Cli {
    /// Directory holding games.json and playtime.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Register a new game
    Add {
        /// Unique display name
        name: String,
        /// Path to the executable
        executable: String,
        /// Optional icon file
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a game from the catalog (its playtime history is kept)
    Remove { name: String },
    /// List registered games with their total playtime
    List,
    /// Show playtime statistics
    Stats,
    /// Launch one or more games and track them until they exit
    ///
    /// Pass every title you want to play to a single invocation. Totals are only safe
    /// with one launcher per data directory: two `launch` processes running at the same
    /// time each rewrite playtime.json from their own copy, and the last one to save wins.
    Launch {
        #[arg(required = true)]
        titles: Vec<String>,
    },
}

/// Store-backed services shared by every command.
struct App {
    catalog: Arc<Catalog>,
    ledger: Arc<PlaytimeLedger>,
}

impl App {
    fn open(args: &Cli) -> Self {
        let dir = args
            .data_dir
            .clone()
            .unwrap_or_else(PersistentStore::default_dir);
        tracing::debug!(dir = %dir.display(), "using data directory");
        let store = Arc::new(PersistentStore::new(dir));
        Self {
            catalog: Arc::new(Catalog::load(store.clone())),
            ledger: Arc::new(PlaytimeLedger::load(store)),
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let app = App::open(&args);
    let (out_tx, out_handle) = spawn_output_writer();

    let res = match &args.command {
        Command::Add {
            name,
            executable,
            icon,
        } => {
            let entry = CatalogEntry::new(name.as_str(), executable.as_str(), icon.clone());
            app.catalog
                .add(entry)
                .map(|()| {
                    let _ = out_tx.send(OutputLine::Stderr(format!("Added: {}", name.trim())));
                })
                .context("could not add game")
        }
        Command::Remove { name } => app
            .catalog
            .remove(name)
            .map(|removed| {
                let _ = out_tx.send(OutputLine::Stderr(format!("Removed: {}", removed.name)));
            })
            .context("could not remove game"),
        Command::List => print_list(&app, args.json, &out_tx),
        Command::Stats => print_stats(&app, args.json, &out_tx),
        Command::Launch { titles } => run_launch(&app, titles, args.json, &out_tx).await,
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

fn print_list(app: &App, json: bool, out_tx: &mpsc::UnboundedSender<OutputLine>) -> Result<()> {
    let entries = app.catalog.entries();
    if json {
        let out = serde_json::to_string_pretty(&entries)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        return Ok(());
    }
    let listing = summary::build_catalog_listing(&entries, &app.ledger.snapshot());
    for line in listing.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    Ok(())
}

fn print_stats(app: &App, json: bool, out_tx: &mpsc::UnboundedSender<OutputLine>) -> Result<()> {
    let ledger = app.ledger.snapshot();
    if json {
        let out = serde_json::to_string_pretty(&ledger)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        return Ok(());
    }
    let stats = summary::build_stats(&app.catalog.entries(), &ledger);
    for line in stats.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    Ok(())
}

fn local_clock_time() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

/// Launch every title, then wait until each started session has been recorded.
async fn run_launch(
    app: &App,
    titles: &[String],
    json: bool,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let (coordinator, mut events) = LaunchCoordinator::start(
        app.catalog.clone(),
        app.ledger.clone(),
        Arc::new(SystemClock::new()),
    );

    let mut pending = 0usize;
    let mut failed = 0usize;
    for title in titles {
        match coordinator.launch(title) {
            Ok(id) => {
                pending += 1;
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Game '{title}' launched at {} ({id}). Playtime so far: {}.",
                    local_clock_time(),
                    summary::format_seconds(app.ledger.total(title))
                )));
            }
            Err(e) => {
                failed += 1;
                // Spawn failures are reported through the event channel below.
                if !matches!(e, LaunchError::LaunchFailed { .. }) {
                    let _ = out_tx.send(OutputLine::Stderr(e.to_string()));
                }
            }
        }
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    while pending > 0 {
        tokio::select! {
            ev = events.recv() => {
                let Some(ev) = ev else { break };
                if matches!(ev, SessionEvent::Completed { .. }) {
                    pending -= 1;
                }
                let line = if json {
                    serde_json::to_string(&ev)?
                } else {
                    summary::describe_event(&ev)
                };
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
            _ = &mut ctrl_c => {
                let lost: Vec<String> = coordinator
                    .active_sessions()
                    .into_iter()
                    .map(|s| format!("{} {}", s.title, s.id))
                    .collect();
                tracing::warn!(sessions = ?lost, "interrupted, in-flight sessions will not be recorded");
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Interrupted; {} running session(s) not recorded.",
                    lost.len()
                )));
                break;
            }
        }
    }

    // Surface LaunchFailed events that are already queued.
    while let Ok(ev) = events.try_recv() {
        let line = if json {
            serde_json::to_string(&ev)?
        } else {
            summary::describe_event(&ev)
        };
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} launch(es) failed", titles.len());
    }
    Ok(())
}
