// UTXO Source - single-address fetch primitive
//
// The aggregating fetcher only knows the `UtxoSource` trait. `EsploraClient`
// is the production implementation against an Esplora-compatible REST API
// (blockstream.info, mempool.space, self-hosted electrs).

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::error::{Result, UtxoError};
use crate::metrics;
use crate::types::{Utxo, UtxoRecord};

#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// Fetch every UTXO currently held by `address`, in the order the
    /// backend returns them.
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>>;
}

pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraClient {
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, &settings.esplora_base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn utxo_url(&self, address: &str) -> String {
        format!("{}/address/{}/utxo", self.base_url, address)
    }
}

/// Decode an Esplora response body into validated UTXOs.
pub fn decode_utxo_body(body: &str) -> Result<Vec<Utxo>> {
    let records: Vec<UtxoRecord> = serde_json::from_str(body)?;
    records.into_iter().map(Utxo::try_from).collect()
}

#[async_trait]
impl UtxoSource for EsploraClient {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let url = self.utxo_url(address);
        let timer = metrics::Timer::new();

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        metrics::record_esplora_request_duration(timer.elapsed_secs());

        if !status.is_success() {
            warn!(address = %address, status = status.as_u16(), "Esplora returned error status");
            return Err(UtxoError::ApiError {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let utxos = decode_utxo_body(&body)?;
        debug!(address = %address, count = utxos.len(), "Fetched UTXOs from Esplora");
        Ok(utxos)
    }
}
