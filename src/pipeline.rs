//! # Filter-Sort Pipeline
//!
//! Pure projection of the raw UTXO set through the current [`ViewState`]:
//! status filter, amount range, then a stable sort. The balance summary is
//! always computed over the filtered set, never the raw one.
//!
//! ## Ordering rules
//!
//! - `Amount`: numeric on `value_sats`.
//! - `Age`: both confirmed compare block height (missing height is 0). An
//!   unconfirmed output is the most recent: first under `Descending`, last
//!   under `Ascending`. Two unconfirmed outputs fall back to value,
//!   largest first, whatever the direction.
//! - `Status`: confirmed first under `Ascending`; equal status falls back to
//!   value, largest first.

use std::cmp::Ordering;

use crate::types::{BalanceSummary, SortDirection, SortField, StatusFilter, Utxo, ViewState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    pub utxos: Vec<Utxo>,
    pub summary: BalanceSummary,
}

pub fn view(utxos: &[Utxo], state: &ViewState) -> FilteredView {
    let mut visible: Vec<Utxo> = utxos
        .iter()
        .filter(|u| matches_status(u, state.status_filter))
        .filter(|u| matches_amount(u, state.min_amount_sats, state.max_amount_sats))
        .cloned()
        .collect();

    // sort_by is stable
    visible.sort_by(|a, b| compare(a, b, state.sort_field, state.sort_direction));

    let summary = summarize(&visible);
    FilteredView { utxos: visible, summary }
}

pub fn summarize(utxos: &[Utxo]) -> BalanceSummary {
    let confirmed_count = utxos.iter().filter(|u| u.is_confirmed()).count();
    BalanceSummary {
        // Clamped at i64::MAX; imported records are only bounded below.
        total_sats: utxos
            .iter()
            .map(Utxo::value_sats)
            .fold(0i64, |acc, v| acc.saturating_add(v)),
        count: utxos.len(),
        confirmed_count,
        unconfirmed_count: utxos.len() - confirmed_count,
    }
}

fn matches_status(utxo: &Utxo, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Confirmed => utxo.is_confirmed(),
        StatusFilter::Unconfirmed => !utxo.is_confirmed(),
    }
}

fn matches_amount(utxo: &Utxo, min: Option<i64>, max: Option<i64>) -> bool {
    if let Some(min) = min {
        if utxo.value_sats() < min {
            return false;
        }
    }
    // A max of zero means "no upper bound".
    match max {
        Some(max) if max != 0 => utxo.value_sats() <= max,
        _ => true,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn value_descending(a: &Utxo, b: &Utxo) -> Ordering {
    b.value_sats().cmp(&a.value_sats())
}

pub fn compare(a: &Utxo, b: &Utxo, field: SortField, direction: SortDirection) -> Ordering {
    match field {
        SortField::Amount => directed(a.value_sats().cmp(&b.value_sats()), direction),
        SortField::Age => match (a.is_confirmed(), b.is_confirmed()) {
            (true, true) => {
                let ha = a.confirmation().block_height.unwrap_or(0);
                let hb = b.confirmation().block_height.unwrap_or(0);
                directed(ha.cmp(&hb), direction)
            }
            // Unconfirmed counts as newer than any confirmed output.
            (true, false) => directed(Ordering::Less, direction),
            (false, true) => directed(Ordering::Greater, direction),
            (false, false) => value_descending(a, b),
        },
        SortField::Status => {
            if a.is_confirmed() == b.is_confirmed() {
                value_descending(a, b)
            } else if a.is_confirmed() {
                directed(Ordering::Less, direction)
            } else {
                directed(Ordering::Greater, direction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{confirmed, utxo};

    fn keys(view: &FilteredView) -> Vec<String> {
        view.utxos.iter().map(Utxo::key).collect()
    }

    fn sorted(field: SortField, direction: SortDirection) -> ViewState {
        ViewState {
            sort_field: field,
            sort_direction: direction,
            ..ViewState::default()
        }
    }

    fn sample() -> Vec<Utxo> {
        vec![
            confirmed("c1", 0, 30_000, 100),
            utxo("u1", 0, 80_000),
            confirmed("c2", 1, 120_000, 250),
            utxo("u2", 2, 5_000),
            confirmed("c3", 0, 50_000, 175),
        ]
    }

    #[test]
    fn test_status_filter() {
        let confirmed_only = ViewState { status_filter: StatusFilter::Confirmed, ..ViewState::default() };
        let view_c = view(&sample(), &confirmed_only);
        assert_eq!(view_c.summary.count, 3);
        assert!(view_c.utxos.iter().all(Utxo::is_confirmed));

        let unconfirmed_only = ViewState { status_filter: StatusFilter::Unconfirmed, ..ViewState::default() };
        let view_u = view(&sample(), &unconfirmed_only);
        assert_eq!(view_u.summary.count, 2);
        assert_eq!(view_u.summary.confirmed_count, 0);
    }

    #[test]
    fn test_amount_range() {
        let state = ViewState {
            min_amount_sats: Some(30_000),
            max_amount_sats: Some(80_000),
            ..ViewState::default()
        };
        let result = view(&sample(), &state);
        assert_eq!(result.summary.total_sats, 30_000 + 80_000 + 50_000);
    }

    #[test]
    fn test_zero_max_is_unbounded() {
        let zero = ViewState { min_amount_sats: Some(50_000), max_amount_sats: Some(0), ..ViewState::default() };
        let absent = ViewState { min_amount_sats: Some(50_000), max_amount_sats: None, ..ViewState::default() };
        let with_zero = view(&sample(), &zero);
        assert_eq!(with_zero, view(&sample(), &absent));
        assert_eq!(with_zero.summary.count, 3);
    }

    #[test]
    fn test_summary_over_filtered_set() {
        let state = ViewState { min_amount_sats: Some(60_000), ..ViewState::default() };
        let result = view(&sample(), &state);
        assert_eq!(
            result.summary,
            BalanceSummary { total_sats: 200_000, count: 2, confirmed_count: 1, unconfirmed_count: 1 }
        );
    }

    #[test]
    fn test_amount_sort_both_directions() {
        let asc = view(&sample(), &sorted(SortField::Amount, SortDirection::Ascending));
        assert_eq!(keys(&asc), vec!["u2:2", "c1:0", "c3:0", "u1:0", "c2:1"]);
        let desc = view(&sample(), &sorted(SortField::Amount, SortDirection::Descending));
        assert_eq!(keys(&desc), vec!["c2:1", "u1:0", "c3:0", "c1:0", "u2:2"]);
    }

    #[test]
    fn test_age_descending_puts_unconfirmed_first() {
        let utxos = vec![confirmed("old", 0, 1_000, 100), utxo("new", 0, 1_000)];
        let result = view(&utxos, &sorted(SortField::Age, SortDirection::Descending));
        assert_eq!(keys(&result), vec!["new:0", "old:0"]);
    }

    #[test]
    fn test_age_ordering() {
        let desc = view(&sample(), &sorted(SortField::Age, SortDirection::Descending));
        // unconfirmed pair ordered by value, largest first
        assert_eq!(keys(&desc), vec!["u1:0", "u2:2", "c2:1", "c3:0", "c1:0"]);

        let asc = view(&sample(), &sorted(SortField::Age, SortDirection::Ascending));
        assert_eq!(keys(&asc), vec!["c1:0", "c3:0", "c2:1", "u1:0", "u2:2"]);
    }

    #[test]
    fn test_age_missing_height_treated_as_zero() {
        let no_height = Utxo::new(
            "nh",
            0,
            1,
            crate::types::Confirmation { confirmed: true, block_height: None, block_hash: None, block_time: None },
        )
        .unwrap();
        let utxos = vec![confirmed("h1", 0, 1, 1), no_height];
        let asc = view(&utxos, &sorted(SortField::Age, SortDirection::Ascending));
        assert_eq!(keys(&asc), vec!["nh:0", "h1:0"]);
    }

    #[test]
    fn test_status_sort() {
        let asc = view(&sample(), &sorted(SortField::Status, SortDirection::Ascending));
        assert_eq!(keys(&asc), vec!["c2:1", "c3:0", "c1:0", "u1:0", "u2:2"]);
        let desc = view(&sample(), &sorted(SortField::Status, SortDirection::Descending));
        assert_eq!(keys(&desc), vec!["u1:0", "u2:2", "c2:1", "c3:0", "c1:0"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let utxos = vec![confirmed("a", 0, 10, 5), confirmed("b", 0, 10, 5), confirmed("c", 0, 10, 5)];
        let result = view(&utxos, &sorted(SortField::Age, SortDirection::Descending));
        assert_eq!(keys(&result), vec!["a:0", "b:0", "c:0"]);
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let huge = i64::MAX / 2 + 1;
        let utxos = vec![utxo("h1", 0, huge), utxo("h2", 0, huge), utxo("h3", 0, 10)];
        let result = view(&utxos, &ViewState::default());
        assert_eq!(result.summary.total_sats, i64::MAX);
        assert_eq!(result.summary.count, 3);
    }

    #[test]
    fn test_empty_input() {
        let result = view(&[], &ViewState::default());
        assert!(result.utxos.is_empty());
        assert_eq!(result.summary, BalanceSummary::default());
    }
}
