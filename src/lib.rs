//! UTXO aggregation and analytics engine.
//!
//! Classifies a raw user input (address, address list, or extended public
//! key), fetches the unspent outputs of every resulting address from an
//! Esplora backend in parallel, and projects the merged set through a
//! filter/sort view with balance totals and privacy heuristics.

pub mod analytics;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod derivation;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_support;

pub use classifier::classify;
pub use config::EngineSettings;
pub use controller::{ControllerState, FetchDisposition, UtxoController};
pub use derivation::{AddressDeriver, Bip32Deriver};
pub use error::{Result, UtxoError};
pub use fetcher::AggregatingFetcher;
pub use source::{EsploraClient, UtxoSource};
pub use types::{
    AggregationOutcome, AnalyticsSummary, BalanceSummary, Confirmation, FetchRequest,
    SortDirection, SortField, SpendInfo, StatusFilter, Utxo, ViewState,
};
