use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use metrics_bridge::cli::{build_queries, Args, Command};
use metrics_bridge::config::BridgeConfig;
use metrics_bridge::metrics::BridgeMetrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Command::Completions { shell } = &args.command {
        clap_complete::generate(*shell, &mut Args::command(), "metrics-bridge", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();

    let config = BridgeConfig::load(&args.config)?;
    let metrics = BridgeMetrics::standalone()?;
    let bridge = config.builder()?.metrics(metrics.clone()).build()?;

    let mut healthy = true;
    match &args.command {
        Command::Health => {
            let verdict = bridge.check_health().await;
            healthy = verdict.is_ok();
            let label = if healthy {
                verdict.status.to_string().bright_green()
            } else {
                verdict.status.to_string().bright_red()
            };
            eprintln!("{} {}", label, verdict.message);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Query { metrics: names } => {
            let envelope = bridge.query_data(&build_queries(names)).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Completions { .. } => {}
    }

    if args.print_metrics {
        print!("{}", metrics.render()?);
    }

    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}
