//! Shared fixtures for fetcher and controller tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, UtxoError};
use crate::source::UtxoSource;
use crate::types::{Confirmation, SpendInfo, Utxo};

/// Unconfirmed output.
pub fn utxo(txid: &str, vout: u32, value: i64) -> Utxo {
    Utxo::new(txid, vout, value, Confirmation::unconfirmed()).unwrap()
}

pub fn confirmed(txid: &str, vout: u32, value: i64, height: u32) -> Utxo {
    Utxo::new(txid, vout, value, Confirmation::confirmed(height, "00", 1_600_000_000)).unwrap()
}

pub fn spent_in(utxo: Utxo, spend_txid: &str) -> Utxo {
    utxo.with_spend_info(SpendInfo {
        spent: Some(true),
        spend_txid: Some(spend_txid.to_string()),
        spend_vin: Some(0),
        spend_confirmation: None,
    })
}

/// In-memory `UtxoSource` with per-address canned results and latency.
#[derive(Default)]
pub struct MockSource {
    results: HashMap<String, Result<Vec<Utxo>>>,
    delays: HashMap<String, Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utxos(mut self, address: &str, utxos: Vec<Utxo>) -> Self {
        self.results.insert(address.to_string(), Ok(utxos));
        self
    }

    pub fn with_error(mut self, address: &str, error: UtxoError) -> Self {
        self.results.insert(address.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl UtxoSource for MockSource {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(address) {
            tokio::time::sleep(*delay).await;
        }
        self.results
            .get(address)
            .cloned()
            .unwrap_or_else(|| Err(UtxoError::NetworkError(format!("no route to {}", address))))
    }
}
