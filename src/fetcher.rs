// Aggregating Fetcher
//
// Turns a classified request into one merged UTXO set. Multi-address
// requests fan out one task per address (bounded by a semaphore) and join on
// all of them before deciding the outcome:
//
// - at least one address succeeded: success, failures kept as diagnostics
// - every address failed: the first failure to complete is returned
// - every address succeeded but nothing came back: NoUtxosFound

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::derivation::{AddressDeriver, Bip32Deriver};
use crate::error::{Result, UtxoError};
use crate::metrics;
use crate::source::{EsploraClient, UtxoSource};
use crate::telemetry::{truncate_hex, truncate_list};
use crate::types::{AggregationOutcome, FetchRequest, Utxo};

const DEFAULT_MAX_CONCURRENT: usize = 8;

#[derive(Clone)]
pub struct AggregatingFetcher {
    source: Arc<dyn UtxoSource>,
    deriver: Arc<dyn AddressDeriver>,
    max_concurrent: usize,
}

impl AggregatingFetcher {
    pub fn new(source: Arc<dyn UtxoSource>, deriver: Arc<dyn AddressDeriver>) -> Self {
        Self {
            source,
            deriver,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Esplora source and BIP32 derivation configured from `settings`.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let source = Arc::new(EsploraClient::new(settings)?);
        let deriver = Arc::new(Bip32Deriver::from_settings(settings));
        Ok(Self::new(source, deriver).with_max_concurrent(settings.max_concurrent_fetches))
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<AggregationOutcome> {
        metrics::increment_fetch_requests(request.kind());

        match request {
            FetchRequest::SingleAddress(address) => self.fetch_single(address).await,
            FetchRequest::AddressList(addresses) => self.fan_out(addresses).await,
            FetchRequest::ExtendedKey(key) => {
                let addresses = self.derive(key).await?;
                info!(
                    derived = addresses.len(),
                    addresses = %truncate_list(&addresses, 3),
                    "Derived addresses from extended key"
                );
                self.fan_out(&addresses).await
            }
            FetchRequest::Invalid => Err(UtxoError::InvalidInput),
        }
    }

    async fn fetch_single(&self, address: &str) -> Result<AggregationOutcome> {
        let mut utxos = match self.source.fetch_utxos(address).await {
            Ok(utxos) => utxos,
            Err(e) => {
                metrics::increment_address_fetches(e.kind());
                return Err(e);
            }
        };
        metrics::increment_address_fetches("ok");

        for utxo in &mut utxos {
            utxo.stamp_origin(address);
        }
        info!(address = %address, count = utxos.len(), "Fetched single address");

        Ok(AggregationOutcome {
            utxos,
            per_source_errors: BTreeMap::new(),
        })
    }

    async fn derive(&self, key: &str) -> Result<Vec<String>> {
        let deriver = Arc::clone(&self.deriver);
        let key = key.to_string();
        let addresses = tokio::task::spawn_blocking(move || deriver.derive_addresses(&key))
            .await
            .map_err(|e| UtxoError::AddressDerivationFailed(format!("derivation task failed: {}", e)))??;

        if addresses.is_empty() {
            return Err(UtxoError::AddressDerivationFailed(
                "derivation produced no addresses".to_string(),
            ));
        }
        Ok(addresses)
    }

    async fn fan_out(&self, addresses: &[String]) -> Result<AggregationOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let successes: Arc<Mutex<Vec<Vec<Utxo>>>> = Arc::new(Mutex::new(Vec::new()));
        let failures: Arc<Mutex<Vec<(String, UtxoError)>>> = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = addresses
            .iter()
            .map(|address| {
                let source = Arc::clone(&self.source);
                let sem = Arc::clone(&semaphore);
                let successes = Arc::clone(&successes);
                let failures = Arc::clone(&failures);
                let address = address.clone();
                let task_address = address.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match sem.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            failures
                                .lock()
                                .await
                                .push((task_address, UtxoError::NetworkError(e.to_string())));
                            return;
                        }
                    };

                    match source.fetch_utxos(&task_address).await {
                        Ok(mut utxos) => {
                            metrics::increment_address_fetches("ok");
                            for utxo in &mut utxos {
                                utxo.stamp_origin(&task_address);
                            }
                            debug!(
                                address = %task_address,
                                count = utxos.len(),
                                first_txid = %utxos.first().map(|u| truncate_hex(u.txid(), 16)).unwrap_or_default(),
                                "Address fetch complete"
                            );
                            successes.lock().await.push(utxos);
                        }
                        Err(e) => {
                            metrics::increment_address_fetches(e.kind());
                            warn!(address = %task_address, error = %e, "Address fetch failed");
                            failures.lock().await.push((task_address, e));
                        }
                    }
                });

                async move { (address, handle.await) }
            })
            .collect();

        // Barrier: every task has finished before the outcome is decided.
        for (address, joined) in join_all(tasks).await {
            if let Err(e) = joined {
                warn!(address = %address, error = %e, "Address fetch task aborted");
                failures
                    .lock()
                    .await
                    .push((address, UtxoError::NetworkError(format!("fetch task aborted: {}", e))));
            }
        }

        let batches = std::mem::take(&mut *successes.lock().await);
        let failed = std::mem::take(&mut *failures.lock().await);

        if batches.is_empty() {
            warn!(addresses = addresses.len(), "Every address fetch failed");
            return Err(failed
                .into_iter()
                .next()
                .map(|(_, e)| e)
                .unwrap_or(UtxoError::NoUtxosFound));
        }

        let utxos: Vec<Utxo> = batches.into_iter().flatten().collect();
        if utxos.is_empty() && failed.is_empty() {
            return Err(UtxoError::NoUtxosFound);
        }

        info!(
            addresses = addresses.len(),
            failed = failed.len(),
            count = utxos.len(),
            "Aggregated multi-address fetch"
        );

        Ok(AggregationOutcome {
            utxos,
            // Keyed by address: a repeated failing address is one entry,
            // holding the error of its last completed call.
            per_source_errors: failed.into_iter().collect(),
        })
    }
}
