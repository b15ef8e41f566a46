use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use vod_proxy::lifecycle::startup;
use vod_proxy::security::SafetyPolicy;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client and policy checker for vod-proxy", long_about = None)]
struct Cli {
    /// Base URL of a running proxy.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a target URL against the configured safety policy (no network)
    CheckUrl {
        target: String,
        /// Configuration file whose policy is used; defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Search through the proxy's aggregation endpoint
    Search {
        wd: String,
        #[arg(short, long)]
        source: Option<String>,
        #[arg(long)]
        custom_api: Option<String>,
    },
    /// Fetch a detail document through the proxy's aggregation endpoint
    Detail {
        id: String,
        #[arg(short, long)]
        source: Option<String>,
        #[arg(long)]
        custom_api: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::CheckUrl { target, config } => {
            let config = startup::load(config.as_deref())?;
            let policy = SafetyPolicy::from_config(&config.security);
            if policy.validate(&target) {
                println!("allowed: {}", target);
            } else {
                println!("rejected: {}", target);
                std::process::exit(1);
            }
        }
        Commands::Search {
            wd,
            source,
            custom_api,
        } => {
            let res = client
                .get(format!("{}/api/search", cli.url))
                .query(&aggregate_params("wd", wd, source, custom_api))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Detail {
            id,
            source,
            custom_api,
        } => {
            let res = client
                .get(format!("{}/api/detail", cli.url))
                .query(&aggregate_params("id", id, source, custom_api))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn aggregate_params(
    key: &'static str,
    value: String,
    source: Option<String>,
    custom_api: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![(key, value)];
    if let Some(source) = source {
        params.push(("source", source));
    }
    if let Some(api) = custom_api {
        params.push(("customApi", api));
    }
    params
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
    }
    Ok(())
}
