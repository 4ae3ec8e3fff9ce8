// Privacy Analytics
//
// Two heuristics over the currently visible set:
// - address reuse: more than one UTXO stamped with the same origin address
// - common spend: more than one UTXO consumed by the same spending txid
//
// Output lines are sorted so the summary is deterministic regardless of
// fetch completion order.

use std::collections::HashMap;

use crate::types::{AnalyticsSummary, Utxo};

const SHORTEN_THRESHOLD: usize = 12;
const SHORTEN_KEEP: usize = 6;

/// `first6…last6` for anything longer than 12 characters.
pub fn shorten(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= SHORTEN_THRESHOLD {
        return value.to_string();
    }
    let head: String = chars[..SHORTEN_KEEP].iter().collect();
    let tail: String = chars[chars.len() - SHORTEN_KEEP..].iter().collect();
    format!("{}…{}", head, tail)
}

pub fn analyze(visible: &[Utxo]) -> AnalyticsSummary {
    AnalyticsSummary {
        multi_utxo_addresses: address_reuse(visible),
        common_spend_events: common_spends(visible),
    }
}

fn address_reuse(visible: &[Utxo]) -> Vec<String> {
    let mut by_address: HashMap<&str, usize> = HashMap::new();
    for address in visible.iter().filter_map(Utxo::origin_address) {
        *by_address.entry(address).or_insert(0) += 1;
    }

    let mut lines: Vec<String> = by_address
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(address, count)| format!("{} has {} UTXOs.", shorten(address), count))
        .collect();
    lines.sort();
    lines
}

fn common_spends(visible: &[Utxo]) -> Vec<String> {
    // Members keep visible-set order inside each group.
    let mut by_spend: HashMap<&str, Vec<&Utxo>> = HashMap::new();
    for utxo in visible {
        let Some(spend) = utxo.spend_info() else { continue };
        if spend.spent != Some(true) {
            continue;
        }
        if let Some(spend_txid) = spend.spend_txid.as_deref() {
            by_spend.entry(spend_txid).or_default().push(utxo);
        }
    }

    let mut lines: Vec<String> = by_spend
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(spend_txid, members)| {
            let outpoints: Vec<String> = members
                .iter()
                .map(|u| format!("{}:{}", shorten(u.txid()), u.vout()))
                .collect();
            format!(
                "Common Spend: {} UTXOs spent in TXID {} (UTXOs: {})",
                members.len(),
                shorten(spend_txid),
                outpoints.join(", ")
            )
        })
        .collect();
    lines.sort();
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{confirmed, spent_in, utxo};
    use crate::types::SpendInfo;

    const TXID_A: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";
    const TXID_B: &str = "ffeeddccbbaa00112233445566778899ffeeddccbbaa00112233445566778899";
    const SPEND: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("short"), "short");
        assert_eq!(shorten("exactly12chr"), "exactly12chr");
        assert_eq!(shorten("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"), "1A1zP1…DivfNa");
    }

    #[test]
    fn test_multi_utxo_address() {
        let visible = vec![
            utxo("t1", 0, 1).with_origin("X"),
            utxo("t2", 0, 1).with_origin("X"),
            utxo("t3", 0, 1).with_origin("X"),
            utxo("t4", 0, 1).with_origin("Y"),
        ];
        let summary = analyze(&visible);
        assert_eq!(summary.multi_utxo_addresses, vec!["X has 3 UTXOs.".to_string()]);
        assert!(summary.common_spend_events.is_empty());
    }

    #[test]
    fn test_addresses_without_origin_are_ignored() {
        let visible = vec![utxo("t1", 0, 1), utxo("t2", 0, 1)];
        assert!(analyze(&visible).is_empty());
    }

    #[test]
    fn test_reuse_lines_sorted_and_shortened() {
        let long = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
        let visible = vec![
            utxo("t1", 0, 1).with_origin(long),
            utxo("t2", 0, 1).with_origin("B"),
            utxo("t3", 0, 1).with_origin(long),
            utxo("t4", 0, 1).with_origin("B"),
        ];
        let summary = analyze(&visible);
        assert_eq!(
            summary.multi_utxo_addresses,
            vec!["B has 2 UTXOs.".to_string(), "bc1qar…wf5mdq has 2 UTXOs.".to_string()]
        );
    }

    #[test]
    fn test_common_spend() {
        let visible = vec![
            spent_in(confirmed(TXID_A, 0, 1_000, 10), "T"),
            spent_in(confirmed(TXID_B, 3, 2_000, 11), "T"),
        ];
        let summary = analyze(&visible);
        assert_eq!(
            summary.common_spend_events,
            vec!["Common Spend: 2 UTXOs spent in TXID T (UTXOs: a1b2c3…7e8f90:0, ffeedd…778899:3)".to_string()]
        );
    }

    #[test]
    fn test_common_spend_requires_spent_flag() {
        let not_flagged = utxo(TXID_A, 0, 1).with_spend_info(SpendInfo {
            spent: None,
            spend_txid: Some(SPEND.to_string()),
            spend_vin: None,
            spend_confirmation: None,
        });
        let visible = vec![not_flagged, spent_in(utxo(TXID_B, 0, 1), SPEND)];
        assert!(analyze(&visible).common_spend_events.is_empty());
    }

    #[test]
    fn test_common_spend_shortens_spend_txid() {
        let visible = vec![spent_in(utxo("aa", 0, 1), SPEND), spent_in(utxo("bb", 1, 1), SPEND)];
        let summary = analyze(&visible);
        assert_eq!(
            summary.common_spend_events,
            vec!["Common Spend: 2 UTXOs spent in TXID 012345…abcdef (UTXOs: aa:0, bb:1)".to_string()]
        );
    }
}
