//! plbridge CLI.
//!
//! `sync` installs declared functions and triggers, `check-env` compares the
//! local and database interpreter versions. `plan` and `compile` are their
//! read-only counterparts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use plbridge::config::CONFIG_FILE;
use plbridge::{Bridge, BridgeConfig, PostgresBackend, Verdict};

mod ui;

#[derive(Parser)]
#[command(name = "plbridge", version)]
#[command(about = "Syncs PL/Python functions and triggers declared with @plfunction and @pltrigger")]
struct Cli {
    /// Configuration file [default: plbridge.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install new and changed declarations into the database
    Sync,

    /// Show what sync would do without changing the database
    Plan,

    /// Compare the local Python version with the database interpreter
    CheckEnv,

    /// Print the generated DDL without connecting to the database
    Compile {
        /// Write the DDL to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.database_url)?;

    match cli.command {
        Commands::Sync => {
            ui::header("sync");
            let bridge = load_bridge(config)?;
            let mut backend = connect(bridge.config())?;

            let start = Instant::now();
            let spinner = ui::spinner("Syncing functions and triggers...");
            let result = bridge.sync(&mut backend);
            spinner.finish_and_clear();
            let report = result?;

            for name in &report.created {
                ui::success(&format!("Created {name}"));
            }
            for name in &report.replaced {
                ui::success(&format!("Replaced {name}"));
            }
            for (name, message) in &report.failures {
                ui::error(&format!("{name}: {message}"));
            }
            println!();
            ui::info(&format!(
                "{} created, {} replaced, {} unchanged, {} triggers",
                report.created.len(),
                report.replaced.len(),
                report.unchanged.len(),
                report.triggers
            ));
            ui::timing("Synced in", start.elapsed().as_millis());

            if report.has_failures() {
                ui::error(&format!("{} declaration(s) failed to install", report.failures.len()));
                std::process::exit(1);
            }
        }

        Commands::Plan => {
            ui::header("plan");
            let bridge = load_bridge(config)?;
            let mut backend = connect(bridge.config())?;
            let plan = bridge.plan(&mut backend)?;

            if plan.is_noop() {
                ui::success("Catalog is up to date");
            } else {
                for entry in plan.pending() {
                    ui::item(&entry.describe());
                }
            }
            println!();
            ui::info(&format!(
                "{} to create, {} to replace, {} unchanged",
                plan.creates().count(),
                plan.replaces().count(),
                plan.unchanged().count()
            ));
        }

        Commands::CheckEnv => {
            ui::header("check-env");
            let bridge = Bridge::new(config);
            let url = bridge.config().database_url()?;
            let mut backend = match PostgresBackend::connect(url) {
                Ok(backend) => backend,
                Err(e) => {
                    // An unreachable database is a verdict, not a failure
                    ui::warn(&Verdict::Unreachable(e.message().to_string()).to_string());
                    return Ok(());
                }
            };
            let report = bridge.check_environment(&mut backend)?;

            ui::info(&format!("Local Python version: {}", report.local));
            if let Some(remote) = &report.remote {
                ui::info(&format!("Database's Python version: {remote}"));
            }
            match report.verdict {
                Verdict::Match => ui::success(&report.verdict.to_string()),
                _ => ui::warn(&report.verdict.to_string()),
            }
        }

        Commands::Compile { output } => {
            let bridge = load_bridge(config)?;
            let units = bridge.compile()?;
            let ddl: Vec<String> = units
                .iter()
                .map(|unit| format!("-- {} {}\n{};\n", unit.kind, unit.name, unit.ddl.trim_end_matches(';')))
                .collect();
            let ddl = ddl.join("\n");

            match output {
                Some(path) => {
                    std::fs::write(&path, ddl).into_diagnostic()?;
                    ui::success(&format!("Wrote {} unit(s) to {}", units.len(), path.display()));
                }
                None => print!("{ddl}"),
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>, database_url: Option<String>) -> miette::Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::load_or_default(Path::new(CONFIG_FILE))?,
    };
    if let Some(url) = database_url {
        config.database.url = Some(url);
    }
    Ok(config)
}

fn load_bridge(config: BridgeConfig) -> miette::Result<Bridge> {
    let mut bridge = Bridge::new(config);
    let count = bridge.load_declarations()?;
    tracing::debug!(count, "declarations loaded");
    if bridge.registry().is_empty() {
        ui::dim("No PL/Python functions found");
    }
    Ok(bridge)
}

fn connect(config: &BridgeConfig) -> miette::Result<PostgresBackend> {
    let url = config.database_url()?;
    Ok(PostgresBackend::connect(url).map_err(plbridge::BridgeError::from)?)
}
