use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::query::DataQuery;

#[derive(Parser, Debug)]
#[command(name = "metrics-bridge")]
#[command(version)]
#[command(about = "Probe a liveness endpoint and look up metrics from a plain-text scrape endpoint")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "metrics-bridge.toml")]
    pub config: PathBuf,

    /// Print the bridge's own Prometheus counters after the command
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run one liveness check
    Health,
    /// Look up a metric; every name becomes one query in a single batch
    Query {
        #[arg(required = true)]
        metrics: Vec<String>,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

/// Query ids in the dashboard convention: A..Z, then AA, AB, ...
pub fn ref_id(index: usize) -> String {
    let mut n = index;
    let mut id = Vec::new();
    loop {
        id.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

/// One query per metric name, ids assigned in order.
pub fn build_queries(metrics: &[String]) -> Vec<DataQuery> {
    metrics
        .iter()
        .enumerate()
        .map(|(i, m)| DataQuery::for_metric(ref_id(i), m))
        .collect()
}
