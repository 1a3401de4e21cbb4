//! CLI interface for dropout-tracker

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{self, Config};
use crate::llm::ChatClient;
use crate::tracker::recommend::MeasureCategory;
use crate::tracker::session::Session;
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(name = "dropout-tracker")]
#[command(about = "Student dropout prevention advisor and improvement tracker", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "DROPOUT_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI and API server (default when no command given)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask for preventive measures once and print them
    Recommend {
        /// Current dropout rate in percent
        #[arg(short, long)]
        rate: f64,
        /// Contributing factors
        #[arg(short, long, default_value = "")]
        factors: String,
    },
    /// Inspect or create the configuration file
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_file = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    match cli.command {
        None => {
            let config = Config::load_from(&config_file)?;
            crate::server::start(config).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let mut config = Config::load_from(&config_file)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::server::start(config).await?;
        }
        Some(Commands::Recommend { rate, factors }) => {
            let config = Config::load_from(&config_file)?;
            recommend_once(&config, rate, &factors).await?;
        }
        Some(Commands::Config { show, init, path }) => {
            if path {
                println!("{}", config_file.display());
            }
            if init {
                if config_file.exists() {
                    println!("Config already exists at {}", config_file.display());
                } else {
                    Config::default().save_to(&config_file)?;
                    println!("✓ Wrote default config to {}", config_file.display());
                }
            }
            if show || !(path || init) {
                let config = Config::load_from(&config_file)?;
                config::show_config(&config);
            }
        }
    }

    Ok(())
}

async fn recommend_once(config: &Config, rate: f64, factors: &str) -> Result<()> {
    let client = ChatClient::from_config(&config.llm)
        .context("Failed to create LLM client")?;
    let tracker = Tracker::new(Arc::new(client), config.scoring.seed);
    let session = Mutex::new(Session::new());

    println!("Generating recommendations...");
    let record = tracker
        .recommend(&session, rate, factors)
        .await
        .context("Failed to get recommendations")?;

    println!();
    println!("Recommended measures for a {:.1}% dropout rate:", record.reported_rate);
    for measure in &record.measures {
        match MeasureCategory::from_measure(measure) {
            Some(category) => println!("  {:<18} {}", category.label(), measure),
            None => println!("  {:<18} {}", "-", measure),
        }
    }

    Ok(())
}
