// File Import / Export
//
// JSON: array of Esplora UTXO records plus optional `originAddress`, so a
// file written here can be loaded back with origins intact.
// CSV: flat export for spreadsheets; not re-importable.

use std::path::Path;

use crate::error::{Result, UtxoError};
use crate::types::{Confirmation, Utxo};

pub const CSV_HEADER: [&str; 16] = [
    "TXID",
    "Vout",
    "Amount (BTC)",
    "Amount (Sats)",
    "Status",
    "Block Height",
    "Block Hash",
    "Block Time",
    "Age",
    "Origin Address",
    "Spent",
    "Spend TXID",
    "Spend Vin",
    "Spend Status Confirmed",
    "Spend Block Height",
    "Spend Block Time",
];

/// Format satoshis as BTC with 8 decimals.
///
/// # Examples
/// ```
/// assert_eq!(rustyutxo::export::format_btc_amount(100_000_000), "1.00000000");
/// assert_eq!(rustyutxo::export::format_btc_amount(-50_000_000), "-0.50000000");
/// ```
pub fn format_btc_amount(amount: i64) -> String {
    let neg = amount < 0;
    let abs = amount.unsigned_abs();
    let whole = abs / 100_000_000u64;
    let frac = abs % 100_000_000u64;
    if neg {
        format!("-{}.{:08}", whole, frac)
    } else {
        format!("{}.{:08}", whole, frac)
    }
}

/// Human age of a confirmed output relative to `now` (unix seconds).
pub fn format_age(confirmation: &Confirmation, now: u64) -> String {
    if !confirmation.confirmed {
        return "Pending".to_string();
    }
    let Some(block_time) = confirmation.block_time else {
        return String::new();
    };

    let elapsed = now.saturating_sub(block_time);
    let days = elapsed / 86_400;
    let hours = (elapsed % 86_400) / 3_600;
    let minutes = (elapsed % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn utxos_to_json(utxos: &[Utxo]) -> Result<String> {
    Ok(serde_json::to_string_pretty(utxos)?)
}

pub fn utxos_from_json(json: &str) -> Result<Vec<Utxo>> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_json_file(path: impl AsRef<Path>, utxos: &[Utxo]) -> Result<()> {
    std::fs::write(path, utxos_to_json(utxos)?)?;
    Ok(())
}

pub fn read_json_file(path: impl AsRef<Path>) -> Result<Vec<Utxo>> {
    let contents = std::fs::read_to_string(path)?;
    utxos_from_json(&contents)
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(utxo: &Utxo, now: u64) -> Vec<String> {
    let status = utxo.confirmation();
    let spend = utxo.spend_info();
    let spend_status = spend.and_then(|s| s.spend_confirmation.as_ref());

    vec![
        utxo.txid().to_string(),
        utxo.vout().to_string(),
        format_btc_amount(utxo.value_sats()),
        utxo.value_sats().to_string(),
        if status.confirmed { "Confirmed" } else { "Unconfirmed" }.to_string(),
        opt(status.block_height),
        opt(status.block_hash.as_deref()),
        opt(status.block_time),
        format_age(status, now),
        opt(utxo.origin_address()),
        opt(spend.and_then(|s| s.spent)),
        opt(spend.and_then(|s| s.spend_txid.as_deref())),
        opt(spend.and_then(|s| s.spend_vin)),
        opt(spend_status.map(|s| s.confirmed)),
        opt(spend_status.and_then(|s| s.block_height)),
        opt(spend_status.and_then(|s| s.block_time)),
    ]
}

pub fn utxos_to_csv(utxos: &[Utxo], now: u64) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for utxo in utxos {
        writer.write_record(csv_row(utxo, now))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| UtxoError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| UtxoError::Io(e.to_string()))
}

pub fn write_csv_file(path: impl AsRef<Path>, utxos: &[Utxo], now: u64) -> Result<()> {
    std::fs::write(path, utxos_to_csv(utxos, now)?)?;
    Ok(())
}
