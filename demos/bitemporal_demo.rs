//! Bitemporal salary tracking with a payroll correction
//!
//! Run: cargo run --example bitemporal_demo

use anyhow::Context;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use temporal_kv::prelude::*;

const EMPLOYEE: &[u8] = b"employee:alice";

fn micros(year: i32, month: u32, day: u32) -> anyhow::Result<u64> {
    let dt = Utc
        .with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .context("invalid date")?;
    micros_from_datetime(dt).context("date before epoch")
}

fn print_history(store: &KvStore) -> anyhow::Result<()> {
    println!("{:<22} {:<18} {:>10}  {}", "valid from", "tx id", "salary", "note");
    for (key, value) in store.versions(0, EMPLOYEE)? {
        let record: serde_json::Value = value.parse_json()?;
        let valid = datetime_from_micros(key.valid_from)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<22} {:<18} {:>10}  {}",
            valid,
            key.tx_id,
            record["salary"],
            record.get("note").and_then(|n| n.as_str()).unwrap_or("")
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let config = StoreConfig::new(dir.path().join("bitemporal_demo"));
    let store = KvStore::open(&config, Arc::new(MonotonicClock::new()))?;

    println!("=== Bitemporal salary tracking ===\n");

    let hired = micros(2022, 1, 1)?;
    let review = micros(2022, 6, 15)?;
    let promotion = micros(2023, 1, 1)?;

    store.record(0, EMPLOYEE, Some(hired), None, &Value::json(&json!({"salary": 75000}))?)?;
    store.record(0, EMPLOYEE, Some(review), None, &Value::json(&json!({"salary": 82000}))?)?;
    store.record(0, EMPLOYEE, Some(promotion), None, &Value::json(&json!({"salary": 95000}))?)?;

    println!("Before correction:");
    print_history(&store)?;

    // The June raise was entered wrong: same valid time, later transaction.
    store.record(
        0,
        EMPLOYEE,
        Some(review),
        None,
        &Value::json(&json!({"salary": 85000, "note": "payroll correction"}))?,
    )?;

    println!("\nAfter correction:");
    print_history(&store)?;

    // What was true on 2022-07-15, according to what we believe now?
    let july = micros(2022, 7, 15)?;
    let believed = store
        .versions(0, EMPLOYEE)?
        .into_iter()
        .filter(|(key, _)| key.valid_from <= july)
        .max_by_key(|(key, _)| (key.valid_from, key.tx_id));
    if let Some((key, value)) = believed {
        let record: serde_json::Value = value.parse_json()?;
        println!("\nSalary on 2022-07-15: {} (recorded at tx {})", record["salary"], key.tx_id);
    }

    Ok(())
}
