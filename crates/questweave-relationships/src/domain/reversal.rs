//! Irreversible reversal events.

use questweave_core::vocabulary::ReversalKind;

use super::dynamics::{clamp_affinity, clamp_trust};
use super::relationship::Relationship;
use super::transitions::TransitionTable;

/// Trust bonus granted by a redemption.
pub const REDEMPTION_TRUST_BONUS: f64 = 30.0;

/// Applies a reversal and returns the resulting relationship; the input is
/// left untouched. Reversals bypass damping. The re-evaluated status is
/// adopted immediately and the relationship is tagged `reversal:<kind>`.
#[must_use]
pub fn apply_reversal(
    relationship: &Relationship,
    kind: ReversalKind,
    table: &TransitionTable,
) -> Relationship {
    let mut next = relationship.clone();
    let (affinity, trust) = match kind {
        ReversalKind::Betrayal => (-next.affinity, next.trust * 0.3),
        ReversalKind::Redemption => (-next.affinity * 0.7, next.trust + REDEMPTION_TRUST_BONUS),
        ReversalKind::TrustCollapse => (next.affinity, next.trust * 0.2),
    };
    next.affinity = clamp_affinity(affinity);
    next.trust = clamp_trust(trust);
    next.tags.insert(format!("reversal:{kind}"));
    next.reevaluate(table);
    next
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use questweave_core::vocabulary::RelationshipStatus;
    use uuid::Uuid;

    use super::*;
    use crate::domain::relationship::EntityRef;

    const EPS: f64 = 1e-9;

    fn friend(affinity: f64, trust: f64) -> Relationship {
        Relationship::new(
            Uuid::from_u128(3),
            EntityRef::npc("innkeeper"),
            EntityRef::player("p1"),
            4,
            Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap(),
        )
        .with_axes(affinity, trust, 12, RelationshipStatus::Friend)
    }

    #[test]
    fn test_betrayal_flips_affinity_and_demotes() {
        // Arrange
        let table = TransitionTable::standard();
        let original = friend(45.0, 40.0);

        // Act
        let betrayed = apply_reversal(&original, ReversalKind::Betrayal, &table);

        // Assert
        assert!((betrayed.affinity() + 45.0).abs() < EPS);
        assert!((betrayed.trust() - 12.0).abs() < EPS);
        assert_eq!(betrayed.status(), RelationshipStatus::Acquaintance);
        assert!(betrayed.tags.contains("reversal:betrayal"));
    }

    #[test]
    fn test_reversal_leaves_input_untouched() {
        let table = TransitionTable::standard();
        let original = friend(45.0, 40.0);

        let _ = apply_reversal(&original, ReversalKind::Betrayal, &table);

        assert!((original.affinity() - 45.0).abs() < EPS);
        assert_eq!(original.status(), RelationshipStatus::Friend);
        assert!(original.tags.is_empty());
    }

    #[test]
    fn test_redemption_scales_affinity_and_restores_trust() {
        let table = TransitionTable::standard();
        let rival = friend(-50.0, 5.0).with_axes(-50.0, 5.0, 12, RelationshipStatus::Rival);

        let redeemed = apply_reversal(&rival, ReversalKind::Redemption, &table);

        assert!((redeemed.affinity() - 35.0).abs() < EPS);
        assert!((redeemed.trust() - 35.0).abs() < EPS);
        assert_eq!(redeemed.status(), RelationshipStatus::Acquaintance);
    }

    #[test]
    fn test_trust_collapse_keeps_affinity() {
        let table = TransitionTable::standard();
        let original = friend(60.0, 50.0);

        let collapsed = apply_reversal(&original, ReversalKind::TrustCollapse, &table);

        assert!((collapsed.affinity() - 60.0).abs() < EPS);
        assert!((collapsed.trust() - 10.0).abs() < EPS);
        assert_eq!(collapsed.status(), RelationshipStatus::Acquaintance);
    }

    #[test]
    fn test_redemption_trust_is_clamped() {
        let table = TransitionTable::standard();
        let original = friend(10.0, 90.0);

        let redeemed = apply_reversal(&original, ReversalKind::Redemption, &table);

        assert!((redeemed.trust() - 100.0).abs() < EPS);
    }
}
