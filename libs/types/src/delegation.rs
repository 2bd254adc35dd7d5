//! Voting-power delegations (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationAmount {
    Full,
    Partial(u128),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub delegatee: Address,
    pub effective_from: DateTime<Utc>,
    pub amount: DelegationAmount,
}

/// Error describing why a set of delegations violates the delegation-graph
/// invariants (spec §3: no self-loops; a delegator has at most one active
/// delegatee).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DelegationGraphError {
    #[error("delegation self-loop at {0}")]
    SelfLoop(Address),
    #[error("delegator {0} has more than one active delegatee")]
    MultipleDelegatees(Address),
}

/// Validate the delegation graph invariants over a full delegation set.
///
/// `delegations` is assumed already filtered to those active as of the
/// reference time (callers pick the most recent `effective_from` per delegator
/// before calling this).
pub fn validate_delegation_graph(
    delegations: &[Delegation],
) -> Result<(), DelegationGraphError> {
    use std::collections::HashSet;

    let mut seen_delegators = HashSet::new();
    for d in delegations {
        if d.delegator == d.delegatee {
            return Err(DelegationGraphError::SelfLoop(d.delegator));
        }
        if !seen_delegators.insert(d.delegator) {
            return Err(DelegationGraphError::MultipleDelegatees(d.delegator));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn rejects_self_loop() {
        let a = Address([1; 20]);
        let d = Delegation {
            delegator: a,
            delegatee: a,
            effective_from: at(0),
            amount: DelegationAmount::Full,
        };
        assert!(matches!(
            validate_delegation_graph(&[d]),
            Err(DelegationGraphError::SelfLoop(_))
        ));
    }

    #[test]
    fn rejects_two_active_delegatees_for_one_delegator() {
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        let c = Address([3; 20]);
        let ds = vec![
            Delegation {
                delegator: a,
                delegatee: b,
                effective_from: at(0),
                amount: DelegationAmount::Full,
            },
            Delegation {
                delegator: a,
                delegatee: c,
                effective_from: at(1),
                amount: DelegationAmount::Full,
            },
        ];
        assert!(matches!(
            validate_delegation_graph(&ds),
            Err(DelegationGraphError::MultipleDelegatees(_))
        ));
    }

    #[test]
    fn accepts_clean_graph() {
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        let c = Address([3; 20]);
        let ds = vec![
            Delegation {
                delegator: a,
                delegatee: b,
                effective_from: at(0),
                amount: DelegationAmount::Full,
            },
            Delegation {
                delegator: b,
                delegatee: c,
                effective_from: at(0),
                amount: DelegationAmount::Partial(100),
            },
        ];
        assert!(validate_delegation_graph(&ds).is_ok());
    }
}
