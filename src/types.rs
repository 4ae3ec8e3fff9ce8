use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;

use crate::error::UtxoError;

// ========== UTXO Types ==========

/// Block inclusion state of an output (or of the transaction spending it).
///
/// Block fields are only meaningful while `confirmed` is true; constructors
/// strip them otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Confirmation {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

impl Confirmation {
    pub fn confirmed(block_height: u32, block_hash: impl Into<String>, block_time: u64) -> Self {
        Self {
            confirmed: true,
            block_height: Some(block_height),
            block_hash: Some(block_hash.into()),
            block_time: Some(block_time),
        }
    }

    pub fn unconfirmed() -> Self {
        Self::default()
    }

    fn normalized(mut self) -> Self {
        if !self.confirmed {
            self.block_height = None;
            self.block_hash = None;
            self.block_time = None;
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendInfo {
    pub spent: Option<bool>,
    pub spend_txid: Option<String>,
    pub spend_vin: Option<u32>,
    pub spend_confirmation: Option<Confirmation>,
}

impl SpendInfo {
    fn is_empty(&self) -> bool {
        self.spent.is_none()
            && self.spend_txid.is_none()
            && self.spend_vin.is_none()
            && self.spend_confirmation.is_none()
    }
}

/// One unspent (or annotated as spent) transaction output.
///
/// Everything is fixed at construction except `origin_address`, which the
/// aggregating fetcher stamps once with the address that produced it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "UtxoRecord", into = "UtxoRecord")]
pub struct Utxo {
    txid: String,
    vout: u32,
    value_sats: i64,
    confirmation: Confirmation,
    spend_info: Option<SpendInfo>,
    origin_address: Option<String>,
}

impl Utxo {
    pub fn new(
        txid: impl Into<String>,
        vout: u32,
        value_sats: i64,
        confirmation: Confirmation,
    ) -> Result<Self, UtxoError> {
        let txid = txid.into();
        if value_sats < 0 {
            return Err(UtxoError::DecodingError(format!(
                "negative value {} for output {}:{}",
                value_sats, txid, vout
            )));
        }
        Ok(Self {
            txid,
            vout,
            value_sats,
            confirmation: confirmation.normalized(),
            spend_info: None,
            origin_address: None,
        })
    }

    pub fn with_spend_info(mut self, spend_info: SpendInfo) -> Self {
        let spend_info = SpendInfo {
            spend_confirmation: spend_info.spend_confirmation.map(Confirmation::normalized),
            ..spend_info
        };
        self.spend_info = if spend_info.is_empty() { None } else { Some(spend_info) };
        self
    }

    /// Builder form of [`Utxo::stamp_origin`], used when importing records
    /// that already carry their origin.
    pub fn with_origin(mut self, address: impl Into<String>) -> Self {
        self.stamp_origin(address);
        self
    }

    /// Records the source address. Later stamps are ignored.
    pub fn stamp_origin(&mut self, address: impl Into<String>) {
        if self.origin_address.is_none() {
            self.origin_address = Some(address.into());
        }
    }

    /// Identity key `"{txid}:{vout}"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn vout(&self) -> u32 {
        self.vout
    }

    pub fn value_sats(&self) -> i64 {
        self.value_sats
    }

    pub fn confirmation(&self) -> &Confirmation {
        &self.confirmation
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation.confirmed
    }

    pub fn spend_info(&self) -> Option<&SpendInfo> {
        self.spend_info.as_ref()
    }

    pub fn origin_address(&self) -> Option<&str> {
        self.origin_address.as_deref()
    }
}

// ========== Wire Format ==========

/// Esplora `/address/{address}/utxo` record, extended with the optional
/// `originAddress` written by file export.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UtxoRecord {
    pub txid: String,
    pub vout: u32,
    pub status: Confirmation,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid_spent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin_spent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_spent: Option<Confirmation>,
    #[serde(default, rename = "originAddress", skip_serializing_if = "Option::is_none")]
    pub origin_address: Option<String>,
}

impl TryFrom<UtxoRecord> for Utxo {
    type Error = UtxoError;

    fn try_from(record: UtxoRecord) -> Result<Self, Self::Error> {
        let utxo = Utxo::new(record.txid, record.vout, record.value, record.status)?
            .with_spend_info(SpendInfo {
                spent: record.spent,
                spend_txid: record.txid_spent,
                spend_vin: record.vin_spent,
                spend_confirmation: record.status_spent,
            });
        Ok(match record.origin_address {
            Some(address) => utxo.with_origin(address),
            None => utxo,
        })
    }
}

impl From<Utxo> for UtxoRecord {
    fn from(utxo: Utxo) -> Self {
        let spend = utxo.spend_info.unwrap_or_default();
        UtxoRecord {
            txid: utxo.txid,
            vout: utxo.vout,
            status: utxo.confirmation,
            value: utxo.value_sats,
            spent: spend.spent,
            txid_spent: spend.spend_txid,
            vin_spent: spend.spend_vin,
            status_spent: spend.spend_confirmation,
            origin_address: utxo.origin_address,
        }
    }
}

// ========== Fetch Types ==========

/// Classified form of the raw text a user typed or pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    SingleAddress(String),
    AddressList(Vec<String>),
    ExtendedKey(String),
    Invalid,
}

impl FetchRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchRequest::SingleAddress(_) => "single",
            FetchRequest::AddressList(_) => "list",
            FetchRequest::ExtendedKey(_) => "xpub",
            FetchRequest::Invalid => "invalid",
        }
    }
}

/// Result of one fetch invocation: the merged set plus errors from sources
/// that failed while others succeeded. Errors are keyed by address, so an
/// address listed twice that fails both times appears once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationOutcome {
    pub utxos: Vec<Utxo>,
    pub per_source_errors: BTreeMap<String, UtxoError>,
}

// ========== View Types ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Confirmed,
    Unconfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    Amount,
    Age,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub status_filter: StatusFilter,
    pub min_amount_sats: Option<i64>,
    /// `Some(0)` means unbounded, same as `None`.
    pub max_amount_sats: Option<i64>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub total_sats: i64,
    pub count: usize,
    pub confirmed_count: usize,
    pub unconfirmed_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub multi_utxo_addresses: Vec<String>,
    pub common_spend_events: Vec<String>,
}

impl AnalyticsSummary {
    pub fn is_empty(&self) -> bool {
        self.multi_utxo_addresses.is_empty() && self.common_spend_events.is_empty()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "All"),
            StatusFilter::Confirmed => write!(f, "Confirmed"),
            StatusFilter::Unconfirmed => write!(f, "Unconfirmed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_value_rejected() {
        let result = Utxo::new("aa", 0, -1, Confirmation::unconfirmed());
        assert!(matches!(result, Err(UtxoError::DecodingError(_))));
    }

    #[test]
    fn test_unconfirmed_strips_block_fields() {
        let status = Confirmation {
            confirmed: false,
            block_height: Some(10),
            block_hash: Some("00ff".to_string()),
            block_time: Some(1_700_000_000),
        };
        let utxo = Utxo::new("aa", 1, 5, status).unwrap();
        assert_eq!(utxo.confirmation(), &Confirmation::unconfirmed());
    }

    #[test]
    fn test_origin_is_stamped_once() {
        let mut utxo = Utxo::new("aa", 0, 1, Confirmation::unconfirmed()).unwrap();
        assert!(utxo.origin_address().is_none());
        utxo.stamp_origin("addr1");
        utxo.stamp_origin("addr2");
        assert_eq!(utxo.origin_address(), Some("addr1"));
        assert_eq!(utxo.key(), "aa:0");
    }

    #[test]
    fn test_decode_esplora_record() {
        let json = r#"{
            "txid": "3f4fa1b2",
            "vout": 1,
            "status": {
                "confirmed": true,
                "block_height": 800000,
                "block_hash": "00000000000000000002a7c4",
                "block_time": 1690168629
            },
            "value": 150000
        }"#;
        let utxo: Utxo = serde_json::from_str(json).unwrap();
        assert_eq!(utxo.value_sats(), 150_000);
        assert_eq!(utxo.confirmation().block_height, Some(800_000));
        assert!(utxo.spend_info().is_none());
        assert!(utxo.origin_address().is_none());
    }

    #[test]
    fn test_decode_spend_fields_and_origin() {
        let json = r#"{
            "txid": "aa",
            "vout": 0,
            "status": {"confirmed": false},
            "value": 1000,
            "spent": true,
            "txid_spent": "bb",
            "vin_spent": 2,
            "status_spent": {"confirmed": true, "block_height": 12},
            "originAddress": "bc1qxyz"
        }"#;
        let utxo: Utxo = serde_json::from_str(json).unwrap();
        let spend = utxo.spend_info().unwrap();
        assert_eq!(spend.spent, Some(true));
        assert_eq!(spend.spend_txid.as_deref(), Some("bb"));
        assert_eq!(spend.spend_vin, Some(2));
        assert_eq!(utxo.origin_address(), Some("bc1qxyz"));
    }

    #[test]
    fn test_decode_negative_value_fails() {
        let json = r#"{"txid":"aa","vout":0,"status":{"confirmed":false},"value":-5}"#;
        assert!(serde_json::from_str::<Utxo>(json).is_err());
    }
}
