//! CLI commands

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Temporal-KV CLI
#[derive(Parser, Debug)]
#[command(name = "temporal-kv")]
#[command(about = "Bitemporal key-value store")]
pub struct Cli {
    /// Store directory (overrides config file and environment)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Open the store read-only
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Coordinates of one exact entry
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// User key (UTF-8)
    #[arg(short, long)]
    pub key: String,
    /// Partition
    #[arg(short, long, default_value_t = 0)]
    pub partition: u32,
    /// Valid time in microseconds
    #[arg(long, default_value_t = 0)]
    pub valid_from: u64,
    /// Transaction id
    #[arg(long, default_value_t = 0)]
    pub tx_id: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a value
    Put {
        /// User key (UTF-8)
        #[arg(short, long)]
        key: String,
        /// Value (UTF-8)
        #[arg(short, long)]
        value: String,
        /// Partition
        #[arg(short, long, default_value_t = 0)]
        partition: u32,
        /// Valid time in microseconds (default 0)
        #[arg(long)]
        valid_from: Option<u64>,
        /// Transaction id (default: clock)
        #[arg(long)]
        tx_id: Option<u64>,
        /// Store the value with the JSON tag
        #[arg(long)]
        json: bool,
    },
    /// Fetch one exact entry
    Get(KeyArgs),
    /// Remove one exact entry
    Delete(KeyArgs),
    /// List entries in key order
    Scan {
        /// Restrict to one partition
        #[arg(short, long)]
        partition: Option<u32>,
    },
    /// List all versions of a key
    History {
        /// User key (UTF-8)
        #[arg(short, long)]
        key: String,
        /// Partition
        #[arg(short, long, default_value_t = 0)]
        partition: u32,
    },
    /// Store a directed edge
    EdgePut {
        /// Source node id
        #[arg(short, long)]
        source: String,
        /// Destination node id
        #[arg(short, long)]
        destination: String,
        /// Properties as a JSON object
        #[arg(long, default_value = "{}")]
        properties: String,
        /// Valid time in microseconds
        #[arg(long, default_value_t = 0)]
        valid_from: u64,
        /// Transaction id (default: clock)
        #[arg(long)]
        tx_id: Option<u64>,
    },
    /// List edges leaving a node
    Edges {
        /// Node id
        #[arg(short, long)]
        node: String,
        /// Only edges valid at or before this time (default: all)
        #[arg(long)]
        as_of: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::parse_from([
            "temporal-kv", "--db-path", "/tmp/x", "put", "-k", "alice", "-v", "{}", "--json",
            "--valid-from", "5",
        ]);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Put { key, json, valid_from, tx_id, .. } => {
                assert_eq!(key, "alice");
                assert!(json);
                assert_eq!(valid_from, Some(5));
                assert_eq!(tx_id, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_defaults() {
        let cli = Cli::parse_from(["temporal-kv", "get", "-k", "foo", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.partition, 0);
                assert_eq!(args.valid_from, 0);
                assert_eq!(args.tx_id, 0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
