//! Shared vocabulary used across bounded contexts and in event payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` for a snake_case enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Returns the wire name of this value.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// A string did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// The enum that was being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

/// Relationship status between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// Default status on first interaction.
    Stranger,
    /// Known to each other.
    Acquaintance,
    /// Mutual liking and some trust.
    Friend,
    /// Deep, trusted bond.
    Bonded,
    /// Open antagonism.
    Rival,
    /// Entrenched enmity.
    Nemesis,
}

string_enum!(RelationshipStatus {
    Stranger => "stranger",
    Acquaintance => "acquaintance",
    Friend => "friend",
    Bonded => "bonded",
    Rival => "rival",
    Nemesis => "nemesis",
});

/// Irreversible relationship events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    /// Affinity flips sign, trust collapses to 30%.
    Betrayal,
    /// Affinity flips sign at 70% strength, trust recovers by 30.
    Redemption,
    /// Trust drops to 20%, affinity untouched.
    TrustCollapse,
}

string_enum!(ReversalKind {
    Betrayal => "betrayal",
    Redemption => "redemption",
    TrustCollapse => "trust_collapse",
});

/// Result tier of a dice check, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckTier {
    /// The check failed.
    Failure,
    /// Success with a cost.
    Partial,
    /// Clean success.
    Success,
    /// Exceptional success.
    Critical,
}

string_enum!(CheckTier {
    Failure => "failure",
    Partial => "partial",
    Success => "success",
    Critical => "critical",
});

/// Narrative flavour of a quest seed (and of the quest it becomes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedType {
    /// Something that matters to the NPC personally.
    Personal,
    /// Hearsay about the wider world.
    Rumor,
    /// An explicit favour.
    Request,
    /// An imminent danger.
    Warning,
}

string_enum!(SeedType {
    Personal => "personal",
    Rumor => "rumor",
    Request => "request",
    Warning => "warning",
});

/// Seed tier: 1 is the rarest and most significant, 3 the most common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SeedTier(u8);

impl SeedTier {
    /// Tier 1: rare and high-stakes.
    pub const ONE: Self = Self(1);
    /// Tier 2.
    pub const TWO: Self = Self(2);
    /// Tier 3: common and low-stakes.
    pub const THREE: Self = Self(3);

    /// Builds a tier from its number, if it is 1, 2 or 3.
    #[must_use]
    pub fn new(tier: u8) -> Option<Self> {
        (1..=3).contains(&tier).then_some(Self(tier))
    }

    /// Returns the tier number.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index, for per-tier tables.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for SeedTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("seed tier must be 1, 2 or 3, got {value}"))
    }
}

impl From<SeedTier> for u8 {
    fn from(tier: SeedTier) -> Self {
        tier.0
    }
}

impl fmt::Display for SeedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.0)
    }
}

/// Final outcome of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestResult {
    /// Every objective completed.
    Success,
    /// Completed through at least one replacement objective.
    Partial,
    /// Nothing salvageable.
    Failure,
    /// The player walked away.
    Abandoned,
}

string_enum!(QuestResult {
    Success => "success",
    Partial => "partial",
    Failure => "failure",
    Abandoned => "abandoned",
});

/// The closed set of objective kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// Reach a map node, optionally performing an action there.
    ReachNode,
    /// Hand items to someone.
    Deliver,
    /// Bring a companion NPC to a destination.
    Escort,
    /// Speak with an NPC, optionally about a topic.
    TalkToNpc,
    /// Pass a check at or above a tier.
    ResolveCheck,
}

string_enum!(ObjectiveType {
    ReachNode => "reach_node",
    Deliver => "deliver",
    Escort => "escort",
    TalkToNpc => "talk_to_npc",
    ResolveCheck => "resolve_check",
});

/// Why an objective failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// The NPC the objective depends on died.
    TargetDead,
    /// The quest ran out of time.
    TimeExpired,
    /// Failed by the owning service for any other reason.
    Other,
}

string_enum!(FailReason {
    TargetDead => "target_dead",
    TimeExpired => "time_expired",
    Other => "other",
});

/// Rewards (or penalties) granted when a quest reaches a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestRewards {
    /// Experience granted to the player.
    pub experience: u32,
    /// Currency granted to the player.
    pub gold: u32,
    /// Affinity change towards the quest giver.
    pub affinity: f64,
    /// Trust change towards the quest giver.
    pub trust: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tiers_are_ordered_worst_to_best() {
        assert!(CheckTier::Failure < CheckTier::Partial);
        assert!(CheckTier::Partial < CheckTier::Success);
        assert!(CheckTier::Success < CheckTier::Critical);
    }

    #[test]
    fn test_string_round_trip_uses_wire_names() {
        assert_eq!(ObjectiveType::TalkToNpc.as_str(), "talk_to_npc");
        assert_eq!(
            "trust_collapse".parse::<ReversalKind>(),
            Ok(ReversalKind::TrustCollapse)
        );
        assert_eq!(
            serde_json::to_value(FailReason::TargetDead).unwrap(),
            serde_json::json!("target_dead")
        );
    }

    #[test]
    fn test_unknown_variant_reports_kind_and_value() {
        let err = "sabotage".parse::<ReversalKind>().unwrap_err();
        assert_eq!(err.kind, "ReversalKind");
        assert_eq!(err.value, "sabotage");
    }

    #[test]
    fn test_seed_tier_rejects_out_of_range() {
        assert_eq!(SeedTier::new(0), None);
        assert_eq!(SeedTier::new(4), None);
        assert_eq!(SeedTier::new(2), Some(SeedTier::TWO));
        assert!(serde_json::from_value::<SeedTier>(serde_json::json!(7)).is_err());
    }
}
