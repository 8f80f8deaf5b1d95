use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the admission gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "GATE_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status and admission counters
    Status {
        /// Shallow liveness check (no admission counters)
        #[arg(long)]
        liveness: bool,
    },
    /// Run the health check (fails unless the service state is OK)
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status { liveness } => {
            client
                .get(format!("{base}/status"))
                .query(&[("liveness_check", liveness.to_string())])
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{base}/health_check")).send().await?,
    };

    if !print_response(res).await? {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gate returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(false);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(true)
}
