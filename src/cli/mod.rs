//! CLI module for the relay services
//!
//! One binary runs any of the three services.
//!
//! # Commands
//!
//! - `publisher` - HTTP `POST /send` that forwards messages to the queue
//! - `consumer` - queue subscriber serving `GET /reporte`
//! - `dashboard` - HTML page of the consumer's messages
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Publisher against a local broker
//! RABBIT_HOST=localhost relay publisher --port 5000
//!
//! # Dashboard reading a consumer on another host
//! relay dashboard --report-url http://analiticas:5000/reporte
//! ```

pub mod completions;
pub mod config;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Message relay over RabbitMQ
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Publisher, consumer and dashboard for a RabbitMQ message relay"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the publisher service (POST /send)
    Publisher(BrokerServeArgs),
    /// Run the consumer service (GET /reporte)
    Consumer(BrokerServeArgs),
    /// Run the dashboard service (GET /)
    Dashboard(DashboardArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

/// Arguments of the services that talk to the broker.
#[derive(Args, Debug, Clone)]
pub struct BrokerServeArgs {
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Override the RabbitMQ host
    #[arg(long)]
    pub rabbit_host: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Consumer report endpoint to poll
    #[arg(long)]
    pub report_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate an example configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "relay.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
