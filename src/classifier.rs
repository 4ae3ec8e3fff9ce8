//! # Input Classifier
//!
//! Turns whatever the user pasted into a [`FetchRequest`]. Pure and total:
//! anything that does not match is `Invalid`, never an error.
//!
//! Patterns:
//! - Legacy / P2SH: prefix `1`, `3`, `m`, `n` or `2`, base58 alphabet, 26-35 chars
//! - Bech32 (v0): prefix `bc1q` or `tb1q` followed by 38-58 lowercase alphanumerics
//! - Extended key: `xpub`, `ypub`, `zpub`, `tpub`, `upub` or `vpub` followed by
//!   70-110 base58 chars

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::FetchRequest;

static LEGACY_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[13mn2][a-km-zA-HJ-NP-Z1-9]{25,34}$").expect("legacy address pattern")
});

static BECH32_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(bc1q|tb1q)[a-z0-9]{38,58}$").expect("bech32 address pattern"));

static EXTENDED_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(xpub|ypub|zpub|tpub|upub|vpub)[a-km-zA-HJ-NP-Z1-9]{70,110}$")
        .expect("extended key pattern")
});

pub fn is_address(candidate: &str) -> bool {
    LEGACY_ADDRESS.is_match(candidate) || BECH32_ADDRESS.is_match(candidate)
}

pub fn is_extended_key(candidate: &str) -> bool {
    EXTENDED_KEY.is_match(candidate)
}

/// Classify raw input text.
///
/// Order matters: a lone address wins over an extended key, and a comma
/// list is only accepted when every token is itself an address.
pub fn classify(raw: &str) -> FetchRequest {
    let input = raw.trim();

    if is_address(input) {
        return FetchRequest::SingleAddress(input.to_string());
    }

    if is_extended_key(input) {
        return FetchRequest::ExtendedKey(input.to_string());
    }

    let tokens: Vec<&str> = input.split(',').map(str::trim).collect();
    if tokens.len() >= 2 && tokens.iter().all(|t| is_address(t)) {
        return FetchRequest::AddressList(tokens.into_iter().map(String::from).collect());
    }

    FetchRequest::Invalid
}
