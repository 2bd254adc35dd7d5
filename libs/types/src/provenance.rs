//! Provenance tags (spec §3, §4.2, §7): a label on every analytical result saying
//! whether the underlying data was live, a degraded tier, or synthetic.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvenanceTag {
    Live,
    FallbackFreeTier,
    Cached,
    Simulated,
}

impl ProvenanceTag {
    /// Relative strength used by the cross-kind consistency rule (§4.2): when a
    /// snapshot mixes tiers across data kinds, the weakest tier wins. Live is
    /// strongest; the two degraded-but-real tiers are equal; simulated is
    /// weakest.
    fn strength(self) -> u8 {
        match self {
            ProvenanceTag::Live => 3,
            ProvenanceTag::FallbackFreeTier | ProvenanceTag::Cached => 2,
            ProvenanceTag::Simulated => 1,
        }
    }

    /// The weaker of two tags, per the strength ordering above. Ties keep `self`.
    pub fn weaker(self, other: ProvenanceTag) -> ProvenanceTag {
        if other.strength() < self.strength() {
            other
        } else {
            self
        }
    }

    /// Fold a non-empty sequence of per-kind provenance tags into the single tag
    /// a snapshot as a whole carries.
    pub fn combine(tags: impl IntoIterator<Item = ProvenanceTag>) -> Option<ProvenanceTag> {
        tags.into_iter().reduce(ProvenanceTag::weaker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weakest_tier_wins() {
        assert_eq!(
            ProvenanceTag::Live.weaker(ProvenanceTag::Simulated),
            ProvenanceTag::Simulated
        );
        assert_eq!(
            ProvenanceTag::Cached.weaker(ProvenanceTag::Live),
            ProvenanceTag::Cached
        );
    }

    #[test]
    fn combine_folds_to_weakest() {
        let tags = vec![
            ProvenanceTag::Live,
            ProvenanceTag::FallbackFreeTier,
            ProvenanceTag::Live,
        ];
        assert_eq!(
            ProvenanceTag::combine(tags),
            Some(ProvenanceTag::FallbackFreeTier)
        );
    }

    #[test]
    fn combine_of_empty_is_none() {
        assert_eq!(ProvenanceTag::combine(std::iter::empty()), None);
    }
}
