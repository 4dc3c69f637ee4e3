//! gapfill - fill gap markers in Polish marketing texts
//!
//! Reads an enhancement request (JSON), runs it against the configured
//! text-generation service and prints the response JSON on stdout. Logs go to
//! stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gapfill::config::Config;
use gapfill::domain::DomainRegistry;
use gapfill::gap::NotationMode;
use gapfill::llm::{HttpInferenceClient, StrategyOptions};
use gapfill::pipeline::{
    detection_report, gap_count_report, BatchStatus, EnhancementOptions, EnhancementRequest,
    Pipeline,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gapfill",
    about = "Fill [GAP:n] markers in Polish marketing texts",
    long_about = "Fills gap markers ([GAP:n] or ___) in short Polish marketing texts\n\
                  through a text-generation service, then repairs case agreement\n\
                  and validates the result.",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill every item of a request file and print the response
    Enhance {
        /// Request JSON (`-` for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the response here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (defaults to ~/.config/gapfill/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Count gaps per item without calling the service
    Validate {
        /// Request JSON (`-` for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the text `enhance` would prompt with: markers, contexts and strategy
    Detect {
        #[arg(short, long)]
        text: String,

        #[arg(short, long, value_enum, default_value_t = NotationMode::Auto)]
        notation: NotationMode,

        /// Normalize the text first, as `options.normalize_text` does
        #[arg(long)]
        normalize: bool,

        /// Context characters per side (defaults to the config value)
        #[arg(short, long)]
        window: Option<usize>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check that the inference service is reachable
    Health {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective config, optionally writing it back
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Save the effective config (file plus environment overrides)
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Enhance {
            input,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config.log_level);
            enhance(&input, output.as_deref(), config).await
        }
        Command::Validate { input } => {
            let request = read_request(&input)?;
            print_json(&gap_count_report(&request))
        }
        Command::Detect {
            text,
            notation,
            normalize,
            window,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let options = EnhancementOptions {
                gap_notation: notation,
                normalize_text: normalize,
                ..EnhancementOptions::default()
            };
            let strategy_options = StrategyOptions {
                token_threshold: config.token_threshold,
                batched_max_markers: config.batched_max_markers,
                context_window: window.unwrap_or(config.context_window),
                alternatives: 0,
            };
            print_json(&detection_report(&text, &options, &strategy_options))
        }
        Command::Health { config } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config.log_level);
            health(&config).await
        }
        Command::Config { config, write } => {
            let path = config.as_deref();
            let loaded = load_config(path)?;
            if write {
                let saved = loaded.save(path)?;
                eprintln!("  + Config written to {}", saved.display());
            }
            print_json(&loaded)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load()),
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(input: &Path) -> Result<EnhancementRequest> {
    let content = if input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read request from stdin")?
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read request file {}", input.display()))?
    };
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid request JSON in {}", input.display()))
}

fn load_registry(config: &Config) -> Result<DomainRegistry> {
    match &config.domains_file {
        Some(path) => DomainRegistry::with_file(path)
            .with_context(|| format!("Failed to load domains from {}", path.display())),
        None => Ok(DomainRegistry::builtin()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn enhance(input: &Path, output: Option<&Path>, config: Config) -> Result<()> {
    let request = read_request(input)?;
    let registry = Arc::new(load_registry(&config)?);
    let client = HttpInferenceClient::from_config(&config)?;
    tracing::info!(url = %client.generate_url(), "using inference service");

    let pipeline = Pipeline::new(client, config, registry);
    let response = pipeline
        .process_batch(&request)
        .await
        .context("Request rejected")?;

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    match output {
        Some(path) => std::fs::write(path, format!("{}\n", json))
            .with_context(|| format!("Failed to write response to {}", path.display()))?,
        None => println!("{}", json),
    }

    if response.status == BatchStatus::Error {
        anyhow::bail!("All {} items failed", response.items.len());
    }
    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let client = HttpInferenceClient::from_config(config)?;
    let status = client
        .health()
        .await
        .with_context(|| format!("Inference service at {} is not healthy", config.inference_url))?;

    let models = match client.list_models().await {
        Ok(models) => models,
        Err(err) => {
            tracing::warn!("could not list models: {}", err);
            Vec::new()
        }
    };

    print_json(&serde_json::json!({
        "url": config.inference_url,
        "health": status,
        "models": models,
    }))
}
