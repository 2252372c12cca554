//! Status transitions stored as data.
//!
//! Each status owns up to three guarded rules, one per [`TransitionKind`].
//! [`TransitionTable::evaluate`] tries them in the fixed order demote, rival,
//! promote and returns the first satisfied target, so simultaneous
//! eligibility always resolves to the most negative outcome.

use questweave_core::vocabulary::RelationshipStatus;
use serde::{Deserialize, Serialize};

use super::relationship::Relationship;

/// Guard over a relationship's axes and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Condition {
    AffinityAtLeast(f64),
    AffinityAtMost(f64),
    AffinityBelow(f64),
    TrustAtLeast(f64),
    TrustBelow(f64),
    FamiliarityAtLeast(u32),
    HasTag(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// Evaluates the guard against `relationship`.
    #[must_use]
    pub fn holds(&self, relationship: &Relationship) -> bool {
        match self {
            Self::AffinityAtLeast(v) => relationship.affinity >= *v,
            Self::AffinityAtMost(v) => relationship.affinity <= *v,
            Self::AffinityBelow(v) => relationship.affinity < *v,
            Self::TrustAtLeast(v) => relationship.trust >= *v,
            Self::TrustBelow(v) => relationship.trust < *v,
            Self::FamiliarityAtLeast(v) => relationship.familiarity >= *v,
            Self::HasTag(tag) => relationship.tags.contains(tag),
            Self::All(all) => all.iter().all(|c| c.holds(relationship)),
            Self::Any(any) => any.iter().any(|c| c.holds(relationship)),
        }
    }
}

/// Which slot a rule occupies. Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Demote,
    Rival,
    Promote,
}

impl TransitionKind {
    pub const ORDER: [Self; 3] = [Self::Demote, Self::Rival, Self::Promote];
}

/// One guarded transition out of `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: RelationshipStatus,
    pub kind: TransitionKind,
    pub condition: Condition,
    pub target: RelationshipStatus,
}

impl TransitionRule {
    fn new(
        from: RelationshipStatus,
        kind: TransitionKind,
        condition: Condition,
        target: RelationshipStatus,
    ) -> Self {
        Self {
            from,
            kind,
            condition,
            target,
        }
    }
}

/// The full transition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionTable {
    rules: Vec<TransitionRule>,
}

impl TransitionTable {
    /// Builds a table from arbitrary rules. Rule order is irrelevant;
    /// evaluation order comes from [`TransitionKind::ORDER`].
    #[must_use]
    pub fn new(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Finds the first satisfied rule for the relationship's current status
    /// and returns its target, unless that target is the current status.
    #[must_use]
    pub fn evaluate(&self, relationship: &Relationship) -> Option<RelationshipStatus> {
        evaluate_transition(self, relationship.status, relationship)
    }

    /// The default progression ladder.
    #[must_use]
    pub fn standard() -> Self {
        use Condition::{
            AffinityAtLeast, AffinityAtMost, AffinityBelow, All, Any, FamiliarityAtLeast,
            TrustAtLeast, TrustBelow,
        };
        use RelationshipStatus::{Acquaintance, Bonded, Friend, Nemesis, Rival, Stranger};
        use TransitionKind as K;

        let to_rival = || AffinityAtMost(-30.0);

        Self::new(vec![
            TransitionRule::new(Stranger, K::Rival, to_rival(), Rival),
            TransitionRule::new(
                Stranger,
                K::Promote,
                All(vec![FamiliarityAtLeast(3), AffinityAtLeast(-10.0)]),
                Acquaintance,
            ),
            TransitionRule::new(
                Acquaintance,
                K::Demote,
                All(vec![TrustBelow(10.0), AffinityBelow(0.0)]),
                Stranger,
            ),
            TransitionRule::new(Acquaintance, K::Rival, to_rival(), Rival),
            TransitionRule::new(
                Acquaintance,
                K::Promote,
                All(vec![
                    AffinityAtLeast(30.0),
                    TrustAtLeast(30.0),
                    FamiliarityAtLeast(5),
                ]),
                Friend,
            ),
            TransitionRule::new(
                Friend,
                K::Demote,
                Any(vec![AffinityBelow(20.0), TrustBelow(20.0)]),
                Acquaintance,
            ),
            TransitionRule::new(Friend, K::Rival, to_rival(), Rival),
            TransitionRule::new(
                Friend,
                K::Promote,
                All(vec![
                    AffinityAtLeast(70.0),
                    TrustAtLeast(60.0),
                    FamiliarityAtLeast(15),
                ]),
                Bonded,
            ),
            TransitionRule::new(
                Bonded,
                K::Demote,
                Any(vec![AffinityBelow(50.0), TrustBelow(40.0)]),
                Friend,
            ),
            TransitionRule::new(Bonded, K::Rival, to_rival(), Rival),
            TransitionRule::new(
                Rival,
                K::Demote,
                All(vec![AffinityAtMost(-70.0), TrustBelow(10.0)]),
                Nemesis,
            ),
            TransitionRule::new(
                Rival,
                K::Promote,
                All(vec![AffinityAtLeast(0.0), TrustAtLeast(20.0)]),
                Acquaintance,
            ),
            TransitionRule::new(
                Nemesis,
                K::Promote,
                All(vec![AffinityAtLeast(-40.0), TrustAtLeast(10.0)]),
                Rival,
            ),
        ])
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Pure interpreter: tests the rules for `status` in demote, rival, promote
/// order and returns the first satisfied target that differs from `status`.
#[must_use]
pub fn evaluate_transition(
    table: &TransitionTable,
    status: RelationshipStatus,
    relationship: &Relationship,
) -> Option<RelationshipStatus> {
    TransitionKind::ORDER.iter().find_map(|kind| {
        table
            .rules
            .iter()
            .filter(|rule| rule.from == status && rule.kind == *kind)
            .find(|rule| rule.condition.holds(relationship))
            .map(|rule| rule.target)
            .filter(|target| *target != status)
    })
}
