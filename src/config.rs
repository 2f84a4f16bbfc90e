//! Node configuration, merged from CLI flags and environment variables.

use clap::Parser;

/// A wagerchain node serves the ledger's HTTP API and replicates blocks
/// with a fixed set of peers.
#[derive(Parser, Debug, Clone)]
#[command(name = "wagerchain", about = "Wagerchain betting ledger node")]
pub struct Cli {
    /// Address to bind the HTTP API to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Comma-separated base URLs of peer nodes (e.g. `http://10.0.0.2:8080`).
    #[arg(long, env = "PEERS", value_delimiter = ',', default_value = "")]
    pub peers: Vec<String>,

    /// Interval, in seconds, between periodic full-chain pulls from peers.
    #[arg(long, env = "PULL_INTERVAL_SECS", default_value_t = 10)]
    pub pull_interval_secs: u64,

    /// Log level passed to the tracing subscriber's env filter.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Resolved node configuration, ready to hand to the server and replicator.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub peers: Vec<String>,
    pub pull_interval_secs: u64,
    pub log_level: String,
}

impl Config {
    #[must_use]
    pub fn from_cli(cli: Cli) -> Self {
        let peers = cli
            .peers
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            bind_addr: cli.bind_addr,
            peers,
            pull_interval_secs: cli.pull_interval_secs,
            log_level: cli.log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_peers_entries_are_dropped() {
        let cli = Cli {
            bind_addr: "0.0.0.0:8080".to_string(),
            peers: vec!["http://a".to_string(), String::new(), " ".to_string()],
            pull_interval_secs: 10,
            log_level: "info".to_string(),
        };
        let config = Config::from_cli(cli);
        assert_eq!(config.peers, vec!["http://a".to_string()]);
    }
}
