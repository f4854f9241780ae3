//! Vigil CLI - a single simulated agent that lives tick by tick.
//!
//! Single binary that provides:
//! - `vigil run` - headless life loop with periodic snapshots
//! - `vigil once` - one tick, printed as JSON
//! - `vigil repl` - line commands and chat on stdin
//! - `vigil serve` - local HTTP chat server
//! - `vigil bench` - quick backend evaluation
//! - `vigil status` - snapshot and journal overview
//! - `vigil init` - write a default configuration

mod server;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use vigil_kernel::adapters::quick_eval;
use vigil_kernel::observability::JournalEmitter;
use vigil_kernel::{BackendRouter, ChatService, Engine, EngineConfig, InferenceMode, SnapshotStore};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Tick-driven simulated agent", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Override the configured RNG seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the life loop
    Run {
        /// Stop after this many ticks (runs until Ctrl-C otherwise)
        #[arg(long)]
        ticks: Option<u64>,

        /// Delay between ticks
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Save a snapshot every N ticks
        #[arg(long, default_value = "48")]
        save_every: u64,
    },

    /// Advance one tick and print the report
    Once,

    /// Interactive command prompt (`chat <message>` talks to the backend)
    Repl,

    /// Serve the chat API on a local address
    Serve {
        #[arg(long, default_value = "127.0.0.1:7878")]
        addr: SocketAddr,
    },

    /// Run the quick evaluation prompts through the backend router
    Bench {
        #[arg(long)]
        mode: Option<String>,
    },

    /// Show snapshot and journal status
    Status,

    /// Initialize a new project
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Run {
            ticks,
            interval_ms,
            save_every,
        }) => run_loop(&project_root, cli.seed, ticks, interval_ms, save_every).await,
        Some(Commands::Once) => run_once(&project_root, cli.seed),
        Some(Commands::Repl) => repl(&project_root, cli.seed).await,
        Some(Commands::Serve { addr }) => {
            let service = chat_service(&project_root, cli.seed)?;
            server::serve(addr, service).await
        }
        Some(Commands::Bench { mode }) => bench(&project_root, mode).await,
        Some(Commands::Status) => show_status(&project_root),
        Some(Commands::Init) => init_project(&project_root),
        None => {
            println!("Vigil - tick-driven simulated agent");
            println!();
            println!("Usage: vigil <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Run the life loop");
            println!("  once    Advance one tick");
            println!("  repl    Interactive command prompt");
            println!("  serve   Local chat server");
            println!("  bench   Quick backend evaluation");
            println!("  status  Snapshot and journal status");
            println!("  init    Initialize a new project");
            println!();
            println!("Run 'vigil --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(project_root: &Path, seed: Option<u64>) -> Result<EngineConfig> {
    let mut config = EngineConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

/// Engine with the file journal attached and the last snapshot restored, if any.
fn build_engine(config: EngineConfig) -> Engine {
    let journal = JournalEmitter::new(&config.journal_path);
    let snapshot = config.snapshot_path.clone();

    let mut engine = Engine::new(config);
    let journal = engine.request("journal").then_some(journal);
    if let Some(journal) = &journal {
        engine = engine.with_journal(journal.clone());
    }

    let store = SnapshotStore::new(&snapshot);
    let mut message = "fresh start";
    if store.primary_path().exists() || store.backup_path().exists() {
        if engine.load_snapshot(&snapshot) {
            tracing::info!(tick = engine.tick(), "resumed from snapshot");
            message = "resumed from snapshot";
        } else {
            tracing::warn!(path = %snapshot.display(), "starting fresh, snapshot unusable");
        }
    }

    if let Some(journal) = journal {
        if let Err(e) = journal.emit_simple("session_started", Some(engine.tick()), message) {
            tracing::warn!(error = %e, "journal write failed");
        }
    }
    engine
}

fn chat_service(project_root: &Path, seed: Option<u64>) -> Result<ChatService> {
    let config = load_config(project_root, seed)?;
    let router = BackendRouter::new(&config.backend);
    Ok(ChatService::new(build_engine(config), router))
}

fn save(engine: &mut Engine) {
    let path = engine.config().snapshot_path.clone();
    if let Err(e) = engine.save_snapshot(&path) {
        tracing::warn!(error = %e, "snapshot save failed");
    }
}

async fn run_loop(
    project_root: &Path,
    seed: Option<u64>,
    ticks: Option<u64>,
    interval_ms: u64,
    save_every: u64,
) -> Result<()> {
    let config = load_config(project_root, seed)?;
    let mut engine = build_engine(config);
    tracing::info!(project = %project_root.display(), tick = engine.tick(), "starting life loop");

    let interval = Duration::from_millis(interval_ms);
    let save_every = save_every.max(1);
    let mut done = 0u64;

    loop {
        if ticks.is_some_and(|limit| done >= limit) {
            break;
        }

        if engine.is_paused() {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(Duration::from_millis(500)) => continue,
            }
        }

        let report = engine.life_cycle_step()?;
        done += 1;
        println!("[{:>6}] {:<9} {}", report.tick, report.phase.name(), report.human);
        if let Some(consolidation) = &report.consolidation {
            println!("         consolidation: {}", consolidation.summary());
        }
        if report.tick % save_every == 0 {
            save(&mut engine);
        }

        if !interval.is_zero() {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    save(&mut engine);
    tracing::info!(tick = engine.tick(), "life loop stopped");
    Ok(())
}

fn run_once(project_root: &Path, seed: Option<u64>) -> Result<()> {
    let config = load_config(project_root, seed)?;
    let mut engine = build_engine(config);
    let report = engine.life_cycle_step()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    save(&mut engine);
    Ok(())
}

async fn repl(project_root: &Path, seed: Option<u64>) -> Result<()> {
    let mut service = chat_service(project_root, seed)?;
    println!("vigil repl - commands: state, propose, ideas, summary, suggest <action>, pause, resume,");
    println!("tick [n], request <capability>, save [path], load [path], backend ..., chat <message>, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        let output = match line.strip_prefix("chat ") {
            Some(message) => {
                let reply = service.handle_message(message, None).await?;
                for entry in &reply.tick_log {
                    println!("  {entry}");
                }
                reply.reply
            }
            None => service.run_command(line)?,
        };
        println!("{output}");
    }

    let engine = service.engine_mut();
    save(engine);
    Ok(())
}

async fn bench(project_root: &Path, mode: Option<String>) -> Result<()> {
    let config = load_config(project_root, None)?;
    let mut router = BackendRouter::new(&config.backend);
    if let Some(name) = mode {
        let mode = InferenceMode::from_name(&name)
            .with_context(|| format!("Unknown mode {name}"))?;
        router.set_mode(mode);
    }

    let report = quick_eval(&mut router).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&router.status())?);
    Ok(())
}

fn show_status(project_root: &Path) -> Result<()> {
    let config = load_config(project_root, None)?;
    let store = SnapshotStore::new(&config.snapshot_path);
    let events = JournalEmitter::new(&config.journal_path);

    println!("Vigil Status");
    println!("============");
    println!();
    println!("Project: {}", project_root.display());
    println!();
    match store.load() {
        Ok(doc) => {
            println!("Snapshot: tick {} (v{}){}", doc.tick, doc.version, if doc.paused { " [paused]" } else { "" });
            println!(
                "  energy {:.2} stress {:.2} stability {:.2}",
                doc.internal.energy(),
                doc.internal.stress(),
                doc.internal.stability()
            );
            match &doc.intention {
                Some(intention) => println!("  intention: {}", intention.label),
                None => println!("  intention: none"),
            }
            println!("  ideas: {}", doc.ideas.len());
        }
        Err(e) => println!("Snapshot: none ({e})"),
    }
    println!();
    println!("Recent events:");
    for event in events.read_recent(5) {
        let tick = event.tick.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        println!("  [{}] {} {}", event.event_type, tick, event.message);
    }

    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let vigil_dir = project_root.join(".vigil");
    std::fs::create_dir_all(&vigil_dir)?;

    let config_path = vigil_dir.join("config.yaml");
    if !config_path.exists() {
        let default_config = r#"# Vigil configuration

# Unset seeds the RNG from the clock
# seed: 42

snapshot_path: .vigil/snapshot.json
journal_path: .vigil/events.jsonl

memory:
  short_term_capacity: 40
  notable_capacity: 200
  decision_log_capacity: 500

consolidation_every_ticks: 48
idea_capacity: 25

# The agent must never go networked; the primary backend has to be loopback
policy:
  offline_strict: true
  external_api_allowed: false

permissions:
  allow: [simulate, journal, snapshot, local_inference, propose]
  deny: [network, external_api, shell, filesystem_external]

backend:
  primary_endpoint: "http://127.0.0.1:1234"
  probe_interval_ms: 2000
  request_timeout_ms: 2000
  auto_mode: true
  mode: realtime
  keep_warm: true
"#;
        std::fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    println!("Initialized Vigil project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .vigil/config.yaml - engine configuration");
    println!();
    println!("Next steps:");
    println!("  1. Review the permissions and backend sections");
    println!("  2. Run: vigil run --ticks 288");

    Ok(())
}
