//! Holder balances and deterministic rank assignment (spec §3).

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// One holder's balance and its rank among all held balances in a snapshot.
///
/// Invariant (enforced by [`rank_holders`], not by the struct itself): ranks are
/// a contiguous permutation of `1..=N` for the held set, descending by balance,
/// ties broken by ascending address bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub address: Address,
    pub balance: u128,
    pub rank: u32,
}

/// Assign deterministic, contiguous ranks to a set of (address, balance) pairs.
///
/// Descending by balance; ties broken lexicographically by address, ascending.
/// This is the single place rank assignment happens so every adapter (including
/// the transfer-replay path for holder-index-less sources) and the simulator
/// produce identical tie-break behavior.
pub fn rank_holders(mut balances: Vec<(Address, u128)>) -> Vec<HolderBalance> {
    balances.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    balances
        .into_iter()
        .enumerate()
        .map(|(i, (address, balance))| HolderBalance {
            address,
            balance,
            rank: (i + 1) as u32,
        })
        .collect()
}

/// Sum of all balances. Used to check the supply invariant (spec §8, invariant 1).
pub fn total_balance(holders: &[HolderBalance]) -> u128 {
    holders.iter().map(|h| h.balance).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn ranks_descending_by_balance() {
        let ranked = rank_holders(vec![(addr(1), 10), (addr(2), 30), (addr(3), 20)]);
        assert_eq!(ranked[0].address, addr(2));
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].address, addr(3));
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].address, addr(1));
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_break_lexicographically_ascending() {
        let ranked = rank_holders(vec![(addr(9), 10), (addr(1), 10)]);
        assert_eq!(ranked[0].address, addr(1));
        assert_eq!(ranked[1].address, addr(9));
    }

    #[test]
    fn ranks_are_contiguous_permutation() {
        let ranked = rank_holders(vec![(addr(1), 5), (addr(2), 5), (addr(3), 1)]);
        let mut ranks: Vec<u32> = ranked.iter().map(|h| h.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3]);
    }
}
