//! medrelay - authenticated relay for watsonx.ai
//!
//! Forwards chat messages and symptom predictions to watsonx.ai, injecting
//! IAM bearer tokens and fixed generation parameters.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use medrelay::config::Config;
use medrelay::proxy::run_server;

#[derive(Parser)]
#[command(name = "medrelay")]
#[command(about = "Authenticated relay for watsonx.ai chat and predictions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file (defaults to WATSON_* environment variables)
        #[arg(short, long)]
        config: Option<String>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration
    Check {
        /// Path to configuration file (defaults to WATSON_* environment variables)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => {
            tracing::info!(config = %path, "Loading configuration file");
            Config::from_file(path)?
        }
        None => {
            tracing::info!("Loading configuration from environment");
            Config::from_env()?
        }
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; the filter is swapped for the configured level
    // once the config is loaded, unless RUST_LOG is set.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| "medrelay=info,tower_http=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut config = load_config(config.as_deref())?;

            if !from_env {
                let level = &config.logging.level;
                filter_handle.modify(|f| {
                    *f = EnvFilter::new(format!("medrelay={level},tower_http={level}"))
                })?;
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            tracing::info!(
                url = %config.watson.base_url(),
                model = %config.watson.model_id,
                cache_token = config.watson.cache_token,
                "Relaying to watsonx.ai"
            );

            run_server(config).await
        }

        Commands::Check { config } => {
            let config = load_config(config.as_deref())?;
            let watson = &config.watson;

            println!("Configuration OK");
            println!("  listen:        {}", config.server.listen);
            println!("  watson url:    {}", watson.base_url());
            println!("  iam url:       {}", watson.iam_url);
            println!("  api key:       {}", watson.api_key);
            println!("  model:         {}", watson.model_id);
            println!(
                "  project id:    {}",
                watson.project_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  deployment id: {}",
                watson.deployment_id.as_deref().unwrap_or("(not set)")
            );
            println!("  prediction fields: {}", config.prediction.fields.join(", "));
            println!("  token cache:   {}", watson.cache_token);
            Ok(())
        }
    }
}
