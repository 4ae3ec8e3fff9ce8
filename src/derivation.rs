//! # Extended Key Address Derivation
//!
//! The aggregating fetcher only asks an [`AddressDeriver`] for a finite list
//! of candidate addresses. Three implementations:
//!
//! - [`Bip32Deriver`]: real BIP32 public derivation with the `bitcoin` crate.
//!   SLIP-132 prefixes select the script type; `ypub`/`zpub` style keys are
//!   re-tagged to `xpub`/`tpub` version bytes before decoding.
//! - [`StaticDeriver`]: a fixed key → addresses table (simulated derivation).
//! - [`UnavailableDeriver`]: derivation not wired up at all.

use bitcoin::secp256k1::{Secp256k1, VerifyOnly};
use bitcoin::util::base58;
use bitcoin::util::bip32::{ChildNumber, ExtendedPubKey};
use bitcoin::{Address, Network};
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::EngineSettings;
use crate::error::{Result, UtxoError};

const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
const TPUB_VERSION: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];

pub trait AddressDeriver: Send + Sync {
    fn derive_addresses(&self, key: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
}

fn key_layout(prefix: &str) -> Option<(Network, ScriptKind)> {
    match prefix {
        "xpub" => Some((Network::Bitcoin, ScriptKind::P2pkh)),
        "ypub" => Some((Network::Bitcoin, ScriptKind::P2shP2wpkh)),
        "zpub" => Some((Network::Bitcoin, ScriptKind::P2wpkh)),
        "tpub" => Some((Network::Testnet, ScriptKind::P2pkh)),
        "upub" => Some((Network::Testnet, ScriptKind::P2shP2wpkh)),
        "vpub" => Some((Network::Testnet, ScriptKind::P2wpkh)),
        _ => None,
    }
}

/// Derives `address_count` receive addresses (`<key>/0/i`) and, when
/// `include_change` is set, the same number of change addresses (`<key>/1/i`).
pub struct Bip32Deriver {
    address_count: u32,
    include_change: bool,
    secp: Secp256k1<VerifyOnly>,
}

impl Bip32Deriver {
    pub fn new(address_count: u32, include_change: bool) -> Self {
        Self {
            address_count,
            include_change,
            secp: Secp256k1::verification_only(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.derivation_address_count, settings.derivation_include_change)
    }

    /// Decode any supported SLIP-132 key into a standard `ExtendedPubKey`.
    fn decode_key(key: &str, network: Network) -> Result<ExtendedPubKey> {
        let mut data = base58::from_check(key)
            .map_err(|e| UtxoError::AddressDerivationFailed(format!("invalid extended key: {}", e)))?;
        if data.len() != 78 {
            return Err(UtxoError::AddressDerivationFailed(format!(
                "extended key payload is {} bytes, expected 78",
                data.len()
            )));
        }
        let version = match network {
            Network::Bitcoin => XPUB_VERSION,
            _ => TPUB_VERSION,
        };
        data[0..4].copy_from_slice(&version);
        let normalized = base58::check_encode_slice(&data);
        ExtendedPubKey::from_str(&normalized)
            .map_err(|e| UtxoError::AddressDerivationFailed(format!("invalid extended key: {}", e)))
    }

    fn derive_one(
        &self,
        account: &ExtendedPubKey,
        chain: u32,
        index: u32,
        network: Network,
        kind: ScriptKind,
    ) -> Result<String> {
        let path = [chain, index]
            .iter()
            .map(|i| ChildNumber::from_normal_idx(*i))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| UtxoError::AddressDerivationFailed(e.to_string()))?;

        let mut child = account.clone();
        for step in path {
            child = child
                .ckd_pub(&self.secp, step)
                .map_err(|e| UtxoError::AddressDerivationFailed(format!("{}/{}: {}", chain, index, e)))?;
        }

        let address = match kind {
            ScriptKind::P2pkh => Address::p2pkh(&child.public_key, network),
            ScriptKind::P2shP2wpkh => Address::p2shwpkh(&child.public_key, network)
                .map_err(|e| UtxoError::AddressDerivationFailed(e.to_string()))?,
            ScriptKind::P2wpkh => Address::p2wpkh(&child.public_key, network)
                .map_err(|e| UtxoError::AddressDerivationFailed(e.to_string()))?,
        };
        Ok(address.to_string())
    }
}

impl AddressDeriver for Bip32Deriver {
    fn derive_addresses(&self, key: &str) -> Result<Vec<String>> {
        let prefix = key.get(..4).unwrap_or(key);
        let (network, kind) =
            key_layout(prefix).ok_or_else(|| UtxoError::ExtendedKeyUnsupported(prefix.to_string()))?;
        let account = Self::decode_key(key, network)?;

        let chains: &[u32] = if self.include_change { &[0, 1] } else { &[0] };
        let mut addresses = Vec::with_capacity(chains.len() * self.address_count as usize);
        for chain in chains {
            for index in 0..self.address_count {
                addresses.push(self.derive_one(&account, *chain, index, network, kind)?);
            }
        }
        Ok(addresses)
    }
}

/// Fixed key → addresses table.
#[derive(Debug, Clone, Default)]
pub struct StaticDeriver {
    table: HashMap<String, Vec<String>>,
}

impl StaticDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>, addresses: Vec<String>) -> Self {
        self.table.insert(key.into(), addresses);
        self
    }
}

impl AddressDeriver for StaticDeriver {
    fn derive_addresses(&self, key: &str) -> Result<Vec<String>> {
        self.table
            .get(key)
            .cloned()
            .ok_or_else(|| UtxoError::AddressDerivationFailed("no addresses known for this key".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDeriver;

impl AddressDeriver for UnavailableDeriver {
    fn derive_addresses(&self, _key: &str) -> Result<Vec<String>> {
        Err(UtxoError::AddressDerivationFailed(
            "extended key derivation is not available".to_string(),
        ))
    }
}
