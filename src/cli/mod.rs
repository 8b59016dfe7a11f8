//! Command-line front end

pub mod commands;

pub use commands::{Cli, Commands, KeyArgs, LogFormat};

use crate::api::encode_b64;
use crate::config::StoreConfig;
use crate::core::key::TemporalKey;
use crate::core::temporal::MonotonicClock;
use crate::core::value::Value;
use crate::error::{Error, Result};
use crate::graph::{Edge, Graph};
use crate::storage::KvStore;
use std::io::Write;
use std::sync::Arc;

/// Resolve the store configuration: file, then environment, then flags
pub fn resolve_config(cli: &Cli) -> Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(path) = &cli.db_path {
        config.path = path.clone();
    }
    if cli.read_only {
        config.read_only = true;
    }
    config.validate()?;
    Ok(config)
}

/// Run one command against an open store, writing results to `out`
pub fn execute(command: Commands, store: Arc<KvStore>, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Put {
            key,
            value,
            partition,
            valid_from,
            tx_id,
            json,
        } => {
            let value = if json {
                serde_json::from_str::<serde_json::Value>(&value)?;
                Value::Json(value.into_bytes())
            } else {
                Value::Raw(value.into_bytes())
            };
            let written = store.record(partition, key.into_bytes(), valid_from, tx_id, &value)?;
            writeln!(out, "{}", written)?;
        }
        Commands::Get(args) => match store.get(&exact_key(&args)?)? {
            Some(value) => writeln!(out, "{}", render_value(&value))?,
            None => writeln!(out, "(not found)")?,
        },
        Commands::Delete(args) => {
            let existed = store.delete(&exact_key(&args)?)?;
            writeln!(out, "{}", if existed { "deleted" } else { "(not found)" })?;
        }
        Commands::Scan { partition } => {
            let items = match partition {
                Some(partition) => store.partition_items(partition),
                None => store.items(),
            };
            for entry in items {
                let (key, value) = entry?;
                writeln!(out, "{}\t{}", key, render_value(&value))?;
            }
        }
        Commands::History { key, partition } => {
            for (key, value) in store.versions(partition, key.as_bytes())? {
                writeln!(out, "{}\t{}", key, render_value(&value))?;
            }
        }
        Commands::EdgePut {
            source,
            destination,
            properties,
            valid_from,
            tx_id,
        } => {
            let properties = match serde_json::from_str::<serde_json::Value>(&properties)? {
                serde_json::Value::Object(map) => map,
                _ => {
                    return Err(Error::Serialization(
                        "edge properties must be a JSON object".to_string(),
                    ))
                }
            };
            let graph = Graph::new(store);
            let edge = Edge::new(source.into_bytes(), destination.into_bytes(), properties);
            let written = match tx_id {
                Some(tx_id) => graph.put_edge(&edge, valid_from, tx_id)?,
                None => graph.record_edge(&edge, valid_from)?,
            };
            writeln!(out, "{}", written)?;
        }
        Commands::Edges { node, as_of } => {
            let graph = Graph::new(store);
            for edge in graph.out_edges(node.as_bytes(), as_of.unwrap_or(u64::MAX)) {
                let edge = edge?;
                writeln!(
                    out,
                    "{} -> {}\t{}",
                    String::from_utf8_lossy(&edge.source),
                    String::from_utf8_lossy(&edge.destination),
                    serde_json::Value::Object(edge.properties)
                )?;
            }
        }
    }
    Ok(())
}

/// Open the store with a monotonic clock
pub fn open_store(config: &StoreConfig) -> Result<Arc<KvStore>> {
    Ok(Arc::new(KvStore::open(config, Arc::new(MonotonicClock::new()))?))
}

fn exact_key(args: &KeyArgs) -> Result<TemporalKey> {
    TemporalKey::new(
        args.partition,
        args.key.as_bytes().to_vec(),
        args.valid_from,
        args.tx_id,
    )
}

/// JSON and UTF-8 payloads print as text, anything else as base64
fn render_value(value: &Value) -> String {
    match std::str::from_utf8(value.payload()) {
        Ok(text) => text.to_string(),
        Err(_) => format!("base64:{}", encode_b64(value.payload())),
    }
}
