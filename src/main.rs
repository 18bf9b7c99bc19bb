//! ctlbreak CLI - resumable control-break aggregation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctlbreak::{BatchRunner, CheckpointStore, Config};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ctlbreak")]
#[command(version)]
#[command(about = "Aggregate ordered key/value records into per-key totals, resumable after a crash")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the batch, resuming from the checkpoint if one exists
    Run,

    /// Validate configuration file
    Validate,

    /// Show the current checkpoint
    Status,

    /// Discard the checkpoint (including a corrupt one) so the next run starts fresh
    Reset,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# ctlbreak configuration file
# Paths may reference environment variables as ${VAR}.

# Headerless CSV of key,value rows, grouped by key
input_file = "data/input.csv"

# Headerless CSV of key,total rows, written only when a run completes
output_file = "data/output.csv"

# Checkpoint of in-flight state; present only after an interrupted run
state_file = "data/state.json"
"#;
    println!("{example}");
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;

            info!("Configuration is valid");
            info!("  Input:      {:?}", config.input_file);
            info!("  Output:     {:?}", config.output_file);
            info!("  Checkpoint: {:?}", config.state_file);
        }

        Commands::Status => {
            let config = load_config(&cli.config)?;
            let store = CheckpointStore::new(&config.state_file);

            match store
                .load()
                .context("Checkpoint is unreadable; run `ctlbreak reset` to discard it")?
            {
                Some(state) => {
                    println!("Checkpoint:  {:?}", store.path());
                    println!(
                        "Key:         {}",
                        state.current_key.as_deref().unwrap_or("<none>")
                    );
                    println!("Partial sum: {}", state.current_sum);
                    println!("Next record: {}", state.index);
                }
                None => println!("No checkpoint at {:?}; next run starts fresh", store.path()),
            }
        }

        Commands::Reset => {
            let config = load_config(&cli.config)?;
            let store = CheckpointStore::new(&config.state_file);

            if store.exists() {
                warn!(path = %store.path().display(), "Discarding checkpoint");
            }
            store.clear().context("Failed to discard checkpoint")?;
            info!("Checkpoint cleared; next run starts from the first record");
        }

        Commands::Run => {
            let config = load_config(&cli.config)?;
            let mut runner = BatchRunner::from_config(&config);

            let stats = match runner.run() {
                Ok(stats) => stats,
                Err(e) if e.is_resumable() => {
                    return Err(anyhow::Error::new(e).context(format!(
                        "Run halted; progress saved to {:?}, re-run to resume",
                        config.state_file
                    )));
                }
                Err(e) => return Err(e).context("Batch run failed"),
            };

            println!("\n=== Aggregation Complete ===");
            println!("Records:     {}", stats.total_records);
            if stats.resumed() {
                println!("Resumed at:  {}", stats.resumed_from);
            }
            println!("Processed:   {}", stats.records_processed);
            println!("Groups:      {}", stats.groups_emitted);
            println!("Throughput:  {:.0}/s", stats.throughput_per_sec);
            println!("Runtime:     {:.3}s", stats.runtime_secs);
            println!("Output:      {:?}", config.output_file);
        }
    }

    Ok(())
}
