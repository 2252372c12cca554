//! The relationship record.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use questweave_core::clock::whole_days_between;
use questweave_core::repository::Record;
use questweave_core::vocabulary::RelationshipStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dynamics::{
    apply_affinity_damping, apply_familiarity_decay, apply_trust_damping, clamp_affinity,
    clamp_trust,
};
use super::transitions::TransitionTable;

/// One side of a relationship: an entity kind and its opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind, e.g. `npc` or `player`.
    pub kind: String,
    /// Identifier owned by the module that created the entity.
    pub id: String,
}

impl EntityRef {
    /// A non-player character.
    pub fn npc(id: impl Into<String>) -> Self {
        Self {
            kind: "npc".to_owned(),
            id: id.into(),
        }
    }

    /// A player character.
    pub fn player(id: impl Into<String>) -> Self {
        Self {
            kind: "player".to_owned(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// How `source` regards `target`.
///
/// The axes and status are private to the domain layer: every mutating
/// method clamps the axes and re-evaluates the status exactly once, so the
/// stored status always matches the last evaluation of the current axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Record identifier.
    pub id: Uuid,
    /// The entity holding the attitude.
    pub source: EntityRef,
    /// The entity the attitude is about.
    pub target: EntityRef,
    pub(crate) affinity: f64,
    pub(crate) trust: f64,
    pub(crate) familiarity: u32,
    pub(crate) status: RelationshipStatus,
    /// Free-form markers (e.g. `promoted`, `reversal:betrayal`).
    pub tags: BTreeSet<String>,
    /// Game turn of the last interaction.
    pub last_interaction_turn: u32,
    /// Wall-clock time of the last interaction, for familiarity decay.
    pub last_interaction_at: DateTime<Utc>,
}

impl Relationship {
    /// Creates a neutral `stranger` relationship.
    #[must_use]
    pub fn new(
        id: Uuid,
        source: EntityRef,
        target: EntityRef,
        turn: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source,
            target,
            affinity: 0.0,
            trust: 0.0,
            familiarity: 0,
            status: RelationshipStatus::Stranger,
            tags: BTreeSet::new(),
            last_interaction_turn: turn,
            last_interaction_at: at,
        }
    }

    /// Restores stored axes and status verbatim (after clamping the axes).
    #[must_use]
    pub fn with_axes(
        mut self,
        affinity: f64,
        trust: f64,
        familiarity: u32,
        status: RelationshipStatus,
    ) -> Self {
        self.affinity = clamp_affinity(affinity);
        self.trust = clamp_trust(trust);
        self.familiarity = familiarity;
        self.status = status;
        self
    }

    #[must_use]
    pub fn affinity(&self) -> f64 {
        self.affinity
    }

    #[must_use]
    pub fn trust(&self) -> f64 {
        self.trust
    }

    #[must_use]
    pub fn familiarity(&self) -> u32 {
        self.familiarity
    }

    #[must_use]
    pub fn status(&self) -> RelationshipStatus {
        self.status
    }

    /// Applies damped raw changes to both axes, then re-evaluates status.
    /// Returns the new status if a transition fired.
    pub fn apply_change(
        &mut self,
        raw_affinity: f64,
        raw_trust: f64,
        table: &TransitionTable,
    ) -> Option<RelationshipStatus> {
        self.shift_axes(raw_affinity, raw_trust);
        self.reevaluate(table)
    }

    /// Records one interaction at `turn`: familiarity decay for the time
    /// spent apart since the previous interaction, damped changes, one more
    /// point of familiarity, and a fresh interaction timestamp. Status is
    /// re-evaluated once, after all of it.
    pub fn record_interaction(
        &mut self,
        raw_affinity: f64,
        raw_trust: f64,
        turn: u32,
        at: DateTime<Utc>,
        table: &TransitionTable,
    ) -> Option<RelationshipStatus> {
        let days_apart = whole_days_between(self.last_interaction_at, at);
        self.familiarity = apply_familiarity_decay(self.familiarity, days_apart);
        self.shift_axes(raw_affinity, raw_trust);
        self.familiarity = self.familiarity.saturating_add(1);
        self.last_interaction_turn = turn;
        self.last_interaction_at = at;
        self.reevaluate(table)
    }

    /// Adds familiarity carried over from elsewhere (e.g. before promotion).
    pub fn add_familiarity(
        &mut self,
        amount: u32,
        table: &TransitionTable,
    ) -> Option<RelationshipStatus> {
        self.familiarity = self.familiarity.saturating_add(amount);
        self.reevaluate(table)
    }

    /// Applies familiarity decay for time spent apart.
    pub fn decay_familiarity(
        &mut self,
        days_since_last_interaction: u32,
        table: &TransitionTable,
    ) -> Option<RelationshipStatus> {
        self.familiarity = apply_familiarity_decay(self.familiarity, days_since_last_interaction);
        self.reevaluate(table)
    }

    /// Runs the transition table against the current axes and adopts the
    /// result. Returns the new status if a transition fired.
    pub fn reevaluate(&mut self, table: &TransitionTable) -> Option<RelationshipStatus> {
        let next = table.evaluate(self)?;
        self.status = next;
        Some(next)
    }

    fn shift_axes(&mut self, raw_affinity: f64, raw_trust: f64) {
        self.affinity =
            clamp_affinity(self.affinity + apply_affinity_damping(self.affinity, raw_affinity));
        self.trust = clamp_trust(self.trust + apply_trust_damping(self.trust, raw_trust));
    }
}

impl Record for Relationship {
    type Kind = RelationshipStatus;
    const NAME: &'static str = "relationship";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> Self::Kind {
        self.status
    }

    fn is_active(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn fresh() -> Relationship {
        Relationship::new(
            Uuid::from_u128(1),
            EntityRef::npc("miller"),
            EntityRef::player("p1"),
            0,
            at(),
        )
    }

    #[test]
    fn test_new_relationship_is_a_neutral_stranger() {
        let rel = fresh();
        assert_eq!(rel.status(), RelationshipStatus::Stranger);
        assert!(rel.affinity().abs() < f64::EPSILON);
        assert!(rel.trust().abs() < f64::EPSILON);
        assert_eq!(rel.familiarity(), 0);
    }

    #[test]
    fn test_with_axes_clamps_out_of_range_values() {
        let rel = fresh().with_axes(250.0, -4.0, 3, RelationshipStatus::Friend);
        assert!((rel.affinity() - 100.0).abs() < f64::EPSILON);
        assert!(rel.trust().abs() < f64::EPSILON);
        assert_eq!(rel.status(), RelationshipStatus::Friend);
    }

    #[test]
    fn test_repeated_interactions_promote_stranger_to_acquaintance() {
        let table = TransitionTable::standard();
        let mut rel = fresh();

        let first = rel.record_interaction(2.0, 1.0, 1, at(), &table);
        let second = rel.record_interaction(2.0, 1.0, 2, at(), &table);
        let third = rel.record_interaction(2.0, 1.0, 3, at(), &table);

        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(third, Some(RelationshipStatus::Acquaintance));
        assert_eq!(rel.familiarity(), 3);
        assert_eq!(rel.last_interaction_turn, 3);
    }

    #[test]
    fn test_apply_change_keeps_axes_in_range() {
        let table = TransitionTable::standard();
        let mut rel = fresh().with_axes(99.0, 99.0, 40, RelationshipStatus::Bonded);

        rel.apply_change(500.0, 500.0, &table);

        assert!(rel.affinity() <= 100.0);
        assert!(rel.trust() <= 100.0);
    }

    #[test]
    fn test_decay_removes_one_point_per_thirty_days() {
        let table = TransitionTable::standard();
        let mut rel = fresh().with_axes(5.0, 15.0, 20, RelationshipStatus::Acquaintance);

        rel.decay_familiarity(95, &table);

        assert_eq!(rel.familiarity(), 17);
        assert_eq!(rel.status(), RelationshipStatus::Acquaintance);
    }

    #[test]
    fn test_interaction_after_long_absence_decays_first() {
        let table = TransitionTable::standard();
        let mut rel = fresh().with_axes(5.0, 15.0, 10, RelationshipStatus::Acquaintance);
        let later = at() + chrono::Duration::days(61);

        rel.record_interaction(0.0, 0.0, 9, later, &table);

        // 10 - 61/30 + 1
        assert_eq!(rel.familiarity(), 9);
        assert_eq!(rel.last_interaction_at, later);
    }

    #[test]
    fn test_record_kind_is_current_status() {
        let rel = fresh().with_axes(40.0, 40.0, 6, RelationshipStatus::Friend);
        assert_eq!(rel.kind(), RelationshipStatus::Friend);
        assert!(rel.is_active());
    }
}
