//! irods - command line front end for the iRODS protocol engine
//!
//! Opens an authenticated session against an iRODS agent and reports what the
//! server negotiated.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use irods_client::{Account, AuthScheme, PipelineConfiguration};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "irods")]
#[command(about = "Talk to an iRODS server over its native protocol")]
#[command(version)]
struct Cli {
    /// YAML configuration file (overrides IRODS_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long, env = "IRODS_HOST", default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, env = "IRODS_PORT", default_value = "1247")]
    port: u16,

    /// User name
    #[arg(short, long, env = "IRODS_USER_NAME")]
    user: String,

    /// Zone name
    #[arg(short, long, env = "IRODS_ZONE_NAME")]
    zone: String,

    /// Password
    #[arg(long, env = "IRODS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Authentication scheme
    #[arg(long, value_enum, default_value = "standard")]
    scheme: SchemeArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    Standard,
    Pam,
}

impl From<SchemeArg> for AuthScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Standard => AuthScheme::Standard,
            SchemeArg::Pam => AuthScheme::Pam,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show server version and properties
    Info {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Authenticate and disconnect
    AuthCheck,

    /// Print the effective pipeline configuration
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfiguration, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = PipelineConfiguration::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => PipelineConfiguration::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Configuration error".red(), e);
            std::process::exit(1);
        }
    };

    let account = Account::new(
        cli.host.as_str(),
        cli.port,
        cli.user.as_str(),
        cli.password.clone().unwrap_or_default(),
        cli.zone.as_str(),
    )
    .with_scheme(cli.scheme.into());

    match commands::execute(config, &account, cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
