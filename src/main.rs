use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use taggenie::config::Config;
use taggenie::server;
use taggenie::suggest::Product;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "taggenie",
    about = "Marketing tags and SEO keywords for product listings",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (defaults to PORT or the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Never call OpenRouter
        #[arg(long)]
        local_only: bool,
    },
    /// Suggest tags for one product and print the result as JSON
    Suggest {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Never call OpenRouter
        #[arg(long)]
        local_only: bool,
    },
    /// Store an OpenRouter API key in the system keychain
    Setup {
        /// Key to store (prompted for when omitted)
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taggenie=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn prompt_for_key() -> Result<String> {
    println!();
    println!("  taggenie uses OpenRouter for AI-powered tag suggestions.");
    println!("  1. Get a free API key at: https://openrouter.ai/keys");
    println!("  2. Paste it below (saved in your system keychain)");
    println!();
    print!("  API Key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    Ok(key.trim().to_string())
}

fn setup(config: &Config, api_key: Option<String>) -> Result<()> {
    let key = match api_key {
        Some(key) => key.trim().to_string(),
        None => prompt_for_key()?,
    };
    if key.is_empty() {
        anyhow::bail!("No API key provided");
    }
    if !Config::validate_api_key_format(&key) {
        eprintln!("  Warning: Key doesn't look like an OpenRouter key (should start with sk-). Saving anyway...");
    }
    config.set_api_key(&key)?;
    println!("  + API key saved to the system keychain");

    // Leave a config file behind so the other settings are easy to find.
    if Config::config_path().is_some_and(|path| !path.exists()) {
        config.save()?;
    }
    println!("  Settings: {}", Config::config_location());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal outside local development.
    let _ = dotenvy::dotenv();
    init_logging();

    let args = Args::parse();
    let config = Config::load();

    match args.command {
        Command::Serve { port, local_only } => {
            let suggester = Arc::new(taggenie::build_suggester(&config, local_only)?);
            let cors = server::cors_layer(config.cors_origin.as_deref())?;
            let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.port)));
            server::serve(addr, server::router(suggester, cors)).await
        }
        Command::Suggest {
            title,
            description,
            local_only,
        } => {
            let suggester = taggenie::build_suggester(&config, local_only)?;
            let result = suggester.suggest(&Product::new(title, description)).await;
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
            println!("{}", json);
            Ok(())
        }
        Command::Setup { api_key } => setup(&config, api_key),
    }
}
