//! `keepsake-cli` – Keepsake Command Line Interface
//!
//! This binary is the front end of the media journal. It:
//!
//! 1. Checks for `~/.keepsake/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Opens the journal slot in the configured SQLite file (falling back to an
//!    in-memory session when the file cannot be opened).
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/add`, `/list`, `/search`, `/export`, `/import`, `/help`, …).
//! 4. Intercepts **Ctrl-C** to flush the journal before exiting.

mod config;
mod repl;

use colored::Colorize;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

use keepsake_store::storage::{InMemorySlotStorage, SlotStorage, SqliteSlotStorage};
use keepsake_store::store::MemoryStore;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG picks the filter (default "warn" so log lines do not drown the
    // REPL). KEEPSAKE_LOG_FORMAT=json switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("KEEPSAKE_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    print_banner();

    // ── First-Run Wizard ──────────────────────────────────────────────────
    match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(_)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }
    let cfg = config::load_or_default();

    // ── Journal ───────────────────────────────────────────────────────────
    let storage = open_storage(&cfg);
    let store = Arc::new(Mutex::new(MemoryStore::load(storage, cfg.storage_slot.clone())));
    {
        let mut guard = store.lock().unwrap_or_else(|p| p.into_inner());
        println!(
            "  Journal {} holds {} memor{}.",
            cfg.storage_slot.bold(),
            guard.len().to_string().bold(),
            if guard.len() == 1 { "y" } else { "ies" }
        );
        for w in guard.drain_warnings() {
            println!("  {} {}", "Error loading memories:".red(), w);
        }
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // Best-effort flush on termination; the REPL thread is blocked on stdin,
    // so the handler exits the process itself.
    let store_for_ctrlc = store.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – saving journal …".yellow().bold());
        let mut guard = store_for_ctrlc.lock().unwrap_or_else(|p| p.into_inner());
        if guard.has_unsaved_changes() {
            match guard.flush() {
                Ok(()) => println!("{}", "  ✓ Journal saved.".green()),
                Err(e) => {
                    error!(error = %e, "flush on termination failed");
                    println!("  {} {}", "✗ Could not save journal:".red(), e);
                }
            }
        }
        println!("{}", "  ✓ Exiting Keepsake.".green());
        std::process::exit(0);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; journal will not be flushed on Ctrl-C");
    }

    // ── Async runtime for file reads and media embedding ──────────────────
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start runtime".red(), e);
            return;
        }
    };

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(store.clone(), cfg, &runtime);

    let mut guard = store.lock().unwrap_or_else(|p| p.into_inner());
    if guard.has_unsaved_changes()
        && let Err(e) = guard.flush()
    {
        println!("{} {}", "Error saving memories:".red(), e);
    }
}

fn open_storage(cfg: &config::Config) -> Box<dyn SlotStorage> {
    let path = std::path::Path::new(&cfg.storage_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(error = %e, dir = %parent.display(), "could not create journal directory");
    }
    match SqliteSlotStorage::open(path) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            error!(error = %e, path = %cfg.storage_path, "could not open journal database");
            println!(
                "  {} {} – this session will not be saved.",
                "Could not open journal database:".red(),
                e
            );
            Box::new(InMemorySlotStorage::new())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║      Keepsake First-Run Wizard       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up your journal.\n");

    let mut cfg = config::Config::default();

    cfg.storage_path = repl::prompt_str(
        &format!("  Journal database [{}]: ", cfg.storage_path),
        &cfg.storage_path,
    );

    println!("  Default category for new memories:");
    for c in keepsake_types::Category::BUILT_IN.iter() {
        println!("    • {}", c.as_str());
    }
    cfg.default_category = repl::prompt_str(
        &format!("  Default category [{}]: ", cfg.default_category),
        &cfg.default_category,
    );

    cfg.export_dir = repl::prompt_str(
        &format!("  Export directory [{}]: ", cfg.export_dir),
        &cfg.export_dir,
    );

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _  __                         __       "#.bold().cyan());
    println!("{}", r#"  | |/ /___ ___ ___  ___ ___ _  / /_____ "#.bold().cyan());
    println!("{}", r#"  |   </ -_) -_) _ \(_-</ _ `/ /  '_/ -_)"#.bold().cyan());
    println!("{}", r#"  |_|\_\__/\__/ .__/___/\_,_/ /_/\_\\__/ "#.bold().cyan());
    println!("{}", r#"             /_/                         "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Keepsake".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Your photo and video journal");
    println!();
}
