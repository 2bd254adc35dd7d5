//! Holder-index-less fallback: reduce a window of `Transfer(from, to, value)`
//! events to balances (spec §4.1). Shared by every adapter whose source lacks
//! a holder index of its own (`AlchemyAdapter` as a secondary path,
//! `InfuraAdapter` as its only path).

use std::collections::BTreeMap;

use crate::raw::{HolderPage, RawHolder};

/// One decoded `Transfer` log entry, addresses as lowercase `0x`-prefixed hex,
/// `value` as a base-unit decimal string.
#[derive(Clone, Debug)]
pub struct TransferLog {
    pub from: String,
    pub to: String,
    pub value: String,
}

const BURN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Replay a window of transfer logs into a holder page, descending by
/// balance. Deterministic tie-breaking is the canonical model's job
/// (`types::rank_holders`); this only needs a stable, reproducible order for
/// a `limit`-bounded page, which ascending address order over a `BTreeMap`
/// already gives before the final balance sort.
pub fn replay_transfers(logs: &[TransferLog], limit: usize) -> HolderPage {
    let mut balances: BTreeMap<String, i128> = BTreeMap::new();

    for log in logs {
        let value: i128 = log.value.parse().unwrap_or(0);
        if log.from != BURN_ADDRESS {
            *balances.entry(log.from.clone()).or_insert(0) -= value;
        }
        if log.to != BURN_ADDRESS {
            *balances.entry(log.to.clone()).or_insert(0) += value;
        }
    }

    let mut holders: Vec<RawHolder> = balances
        .into_iter()
        .filter(|(_, bal)| *bal > 0)
        .map(|(address, bal)| RawHolder {
            address,
            balance: bal.to_string(),
        })
        .collect();
    holders.sort_by(|a, b| {
        let a_bal: i128 = a.balance.parse().unwrap_or(0);
        let b_bal: i128 = b.balance.parse().unwrap_or(0);
        b_bal.cmp(&a_bal).then_with(|| a.address.cmp(&b.address))
    });
    holders.truncate(limit);

    HolderPage {
        holders,
        next_cursor: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nets_transfers_into_positive_balances() {
        let logs = vec![
            TransferLog {
                from: BURN_ADDRESS.to_string(),
                to: "0xaa".to_string(),
                value: "100".to_string(),
            },
            TransferLog {
                from: "0xaa".to_string(),
                to: "0xbb".to_string(),
                value: "40".to_string(),
            },
        ];
        let page = replay_transfers(&logs, 10);
        assert_eq!(page.holders.len(), 2);
        assert_eq!(page.holders[0].address, "0xaa");
        assert_eq!(page.holders[0].balance, "60");
        assert_eq!(page.holders[1].address, "0xbb");
        assert_eq!(page.holders[1].balance, "40");
    }

    #[test]
    fn zero_and_negative_balances_are_dropped() {
        let logs = vec![TransferLog {
            from: BURN_ADDRESS.to_string(),
            to: "0xaa".to_string(),
            value: "0".to_string(),
        }];
        let page = replay_transfers(&logs, 10);
        assert!(page.holders.is_empty());
    }

    #[test]
    fn limit_truncates_the_result_page() {
        let logs = vec![
            TransferLog {
                from: BURN_ADDRESS.to_string(),
                to: "0xaa".to_string(),
                value: "100".to_string(),
            },
            TransferLog {
                from: BURN_ADDRESS.to_string(),
                to: "0xbb".to_string(),
                value: "200".to_string(),
            },
        ];
        let page = replay_transfers(&logs, 1);
        assert_eq!(page.holders.len(), 1);
        assert_eq!(page.holders[0].address, "0xbb");
    }
}
