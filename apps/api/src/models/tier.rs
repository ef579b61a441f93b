//! Membership tiers and the access rule derived from their ordering.
//!
//! This is the only place that decides which tiers a user may see. The store,
//! the backends and the presentation layer all go through [`visible_tiers`]
//! or [`Tier::can_view`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Membership tier. Variant order is the access order: `Free < Silver < Gold < Platinum`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Silver,
    Gold,
    Platinum,
}

/// The full tier ladder in ascending order.
pub const TIER_LADDER: [Tier; 4] = [Tier::Free, Tier::Silver, Tier::Gold, Tier::Platinum];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown tier '{0}'")]
pub struct UnknownTier(pub String);

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }

    /// Capitalised name for display ("Gold").
    pub fn label(self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }

    /// Position on the ladder, starting at 0 for `Free`.
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Resolves a tier claim from identity metadata. Missing or unrecognised
    /// values fail closed to `Free`.
    pub fn from_claim(claim: Option<&str>) -> Tier {
        claim
            .and_then(|raw| raw.parse::<Tier>().ok())
            .unwrap_or(Tier::Free)
    }

    /// Whether a user holding `self` may see an event published at `event_tier`.
    pub fn can_view(self, event_tier: Tier) -> bool {
        event_tier <= self
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "silver" => Ok(Tier::Silver),
            "gold" => Ok(Tier::Gold),
            "platinum" => Ok(Tier::Platinum),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

/// Tiers visible to a user at `tier`: the ladder prefix ending at `tier` inclusive.
pub fn visible_tiers(tier: Tier) -> &'static [Tier] {
    &TIER_LADDER[..=tier.rank()]
}

/// Keeps only the items whose tier is visible to `tier`.
pub fn filter_visible<T, F>(items: Vec<T>, tier: Tier, tier_of: F) -> Vec<T>
where
    F: Fn(&T) -> Tier,
{
    items
        .into_iter()
        .filter(|item| tier.can_view(tier_of(item)))
        .collect()
}

/// "Free + Silver + Gold" style summary of what `tier` can access.
pub fn access_summary(tier: Tier) -> String {
    visible_tiers(tier)
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_tiers_is_ladder_prefix() {
        for (idx, tier) in TIER_LADDER.iter().enumerate() {
            assert_eq!(visible_tiers(*tier), &TIER_LADDER[..=idx]);
        }
    }

    #[test]
    fn test_visible_free_and_platinum() {
        assert_eq!(visible_tiers(Tier::Free), &[Tier::Free]);
        assert_eq!(
            visible_tiers(Tier::Platinum),
            &[Tier::Free, Tier::Silver, Tier::Gold, Tier::Platinum]
        );
    }

    #[test]
    fn test_from_claim_fails_closed() {
        assert_eq!(Tier::from_claim(None), Tier::Free);
        assert_eq!(Tier::from_claim(Some("")), Tier::Free);
        assert_eq!(Tier::from_claim(Some("diamond")), Tier::Free);
        assert_eq!(visible_tiers(Tier::from_claim(Some("admin"))), &[Tier::Free]);
    }

    #[test]
    fn test_from_claim_is_case_insensitive() {
        assert_eq!(Tier::from_claim(Some(" Gold ")), Tier::Gold);
        assert_eq!(Tier::from_claim(Some("PLATINUM")), Tier::Platinum);
    }

    #[test]
    fn test_can_view_matches_ordering() {
        for user in TIER_LADDER {
            for event in TIER_LADDER {
                assert_eq!(user.can_view(event), event.rank() <= user.rank());
            }
        }
    }

    #[test]
    fn test_filter_visible() {
        let items = vec![Tier::Platinum, Tier::Free, Tier::Gold, Tier::Silver];
        let kept = filter_visible(items, Tier::Silver, |t| *t);
        assert_eq!(kept, vec![Tier::Free, Tier::Silver]);
    }

    #[test]
    fn test_access_summary() {
        assert_eq!(access_summary(Tier::Free), "Free");
        assert_eq!(access_summary(Tier::Gold), "Free + Silver + Gold");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Silver).unwrap(), "\"silver\"");
        let t: Tier = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(t, Tier::Gold);
        assert!(serde_json::from_str::<Tier>("\"bronze\"").is_err());
    }
}
