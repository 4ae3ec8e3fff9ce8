//! # UTXO Controller
//!
//! Single owner of all mutable state: the raw set from the last applied
//! fetch, the view settings, and everything derived from them. Every change
//! goes through here and is applied as one write under the state lock.
//!
//! ## Supersession
//!
//! Each fetch (or import) takes a token from a monotonically increasing
//! counter before it starts. When it completes, its result is applied only
//! if that token is still the latest one issued; otherwise it is dropped
//! without touching state. In-flight requests are never cancelled, only
//! ignored on arrival.
//!
//! ## Derived state
//!
//! The visible set and summary are recomputed inside the mutating write.
//! Analytics are refreshed afterwards as a separate step that reads the
//! committed visible set, and are only stored if no newer view was committed
//! in between.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::analytics::analyze;
use crate::classifier::classify;
use crate::error::UtxoError;
use crate::fetcher::AggregatingFetcher;
use crate::metrics;
use crate::pipeline::view;
use crate::types::{
    AggregationOutcome, AnalyticsSummary, BalanceSummary, SortDirection, SortField, StatusFilter,
    Utxo, ViewState,
};

pub type RequestToken = u64;

/// What happened to a fetch once it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDisposition {
    /// `failed_sources` counts distinct failing addresses, not failed calls.
    Applied { count: usize, failed_sources: usize },
    Failed(UtxoError),
    Superseded,
}

/// Everything the presentation layer reads. Returned by value from
/// [`UtxoController::snapshot`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub utxos: Vec<Utxo>,
    pub view_state: ViewState,
    pub visible: Vec<Utxo>,
    pub summary: BalanceSummary,
    pub analytics: AnalyticsSummary,
    pub source_errors: BTreeMap<String, UtxoError>,
    pub last_error: Option<UtxoError>,
    view_generation: u64,
}

pub struct UtxoController {
    fetcher: AggregatingFetcher,
    latest_token: AtomicU64,
    state: RwLock<ControllerState>,
}

impl UtxoController {
    pub fn new(fetcher: AggregatingFetcher) -> Self {
        Self {
            fetcher,
            latest_token: AtomicU64::new(0),
            state: RwLock::new(ControllerState::default()),
        }
    }

    /// Issue a new token, invalidating every earlier one.
    pub fn issue_token(&self) -> RequestToken {
        self.latest_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest_token.load(Ordering::SeqCst) == token
    }

    /// Classify `raw`, fetch, and apply the result unless superseded.
    pub async fn load(&self, raw: &str) -> FetchDisposition {
        let request = classify(raw);
        let token = self.issue_token();
        debug!(token = token, kind = request.kind(), "Starting fetch");

        let result = self.fetcher.fetch(&request).await;
        self.apply(token, result).await
    }

    /// Replace the set with externally loaded UTXOs (file import). Takes a
    /// token like a fetch, so stale network results cannot overwrite it.
    pub async fn replace_utxos(&self, utxos: Vec<Utxo>) -> FetchDisposition {
        metrics::increment_fetch_requests("import");
        let token = self.issue_token();
        let outcome = AggregationOutcome {
            utxos,
            per_source_errors: BTreeMap::new(),
        };
        self.apply(token, Ok(outcome)).await
    }

    /// Reset to the empty state and invalidate in-flight fetches.
    pub async fn clear(&self) {
        self.issue_token();
        {
            let mut state = self.state.write().await;
            state.utxos.clear();
            state.source_errors.clear();
            state.last_error = None;
            Self::refresh_view(&mut state);
        }
        self.refresh_analytics().await;
    }

    /// Apply a completed fetch result if `token` is still current.
    pub async fn apply(
        &self,
        token: RequestToken,
        result: Result<AggregationOutcome, UtxoError>,
    ) -> FetchDisposition {
        let disposition = {
            let mut state = self.state.write().await;
            if !self.is_current(token) {
                metrics::increment_superseded_results();
                debug!(token = token, "Discarding superseded fetch result");
                return FetchDisposition::Superseded;
            }

            match result {
                Ok(outcome) => {
                    let count = outcome.utxos.len();
                    let failed_sources = outcome.per_source_errors.len();
                    for (source, error) in &outcome.per_source_errors {
                        warn!(source = %source, error = %error, "Source failed during aggregation");
                    }
                    state.utxos = outcome.utxos;
                    state.source_errors = outcome.per_source_errors;
                    state.last_error = None;
                    Self::refresh_view(&mut state);
                    info!(token = token, count = count, failed_sources = failed_sources, "Applied fetch result");
                    FetchDisposition::Applied { count, failed_sources }
                }
                Err(e) => {
                    state.utxos.clear();
                    state.source_errors.clear();
                    state.last_error = Some(e.clone());
                    Self::refresh_view(&mut state);
                    warn!(token = token, error = %e, "Fetch failed");
                    FetchDisposition::Failed(e)
                }
            }
        };

        self.refresh_analytics().await;
        disposition
    }

    pub async fn set_view_state(&self, view_state: ViewState) {
        self.update_view(|v| *v = view_state).await;
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        self.update_view(|v| v.status_filter = filter).await;
    }

    pub async fn set_amount_range(&self, min_amount_sats: Option<i64>, max_amount_sats: Option<i64>) {
        self.update_view(|v| {
            v.min_amount_sats = min_amount_sats;
            v.max_amount_sats = max_amount_sats;
        })
        .await;
    }

    pub async fn set_sort(&self, field: SortField, direction: SortDirection) {
        self.update_view(|v| {
            v.sort_field = field;
            v.sort_direction = direction;
        })
        .await;
    }

    async fn update_view<F>(&self, change: F)
    where
        F: FnOnce(&mut ViewState),
    {
        {
            let mut state = self.state.write().await;
            change(&mut state.view_state);
            Self::refresh_view(&mut state);
        }
        self.refresh_analytics().await;
    }

    pub async fn snapshot(&self) -> ControllerState {
        self.state.read().await.clone()
    }

    fn refresh_view(state: &mut ControllerState) {
        let filtered = view(&state.utxos, &state.view_state);
        state.visible = filtered.utxos;
        state.summary = filtered.summary;
        state.view_generation += 1;
        metrics::set_visible_utxos(state.visible.len());
    }

    /// Recompute analytics from the committed visible set. Dropped if the
    /// view changed again while computing.
    async fn refresh_analytics(&self) {
        let (visible, generation) = {
            let state = self.state.read().await;
            (state.visible.clone(), state.view_generation)
        };

        let analytics = analyze(&visible);

        let mut state = self.state.write().await;
        if state.view_generation == generation {
            state.analytics = analytics;
        }
    }
}
