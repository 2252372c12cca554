//! Damping, decay and clamping of relationship axes.
//!
//! All functions are pure. Changes lose effectiveness as an axis
//! saturates, but never below [`DAMPING_FLOOR`] of the raw change.

/// Lower bound of affinity.
pub const AFFINITY_MIN: f64 = -100.0;
/// Upper bound of affinity.
pub const AFFINITY_MAX: f64 = 100.0;
/// Lower bound of trust.
pub const TRUST_MIN: f64 = 0.0;
/// Upper bound of trust.
pub const TRUST_MAX: f64 = 100.0;
/// Largest per-axis change accepted from the narrative collaborator.
pub const META_DELTA_LIMIT: f64 = 5.0;
/// Minimum fraction of a raw change that always applies.
pub const DAMPING_FLOOR: f64 = 0.1;
/// Curvature of the damping curve.
pub const DAMPING_EXPONENT: f64 = 1.2;
/// Days without interaction that cost one point of familiarity.
pub const FAMILIARITY_DECAY_DAYS: u32 = 30;

fn damping_factor(current: f64) -> f64 {
    (1.0 - (current.abs() / 100.0).powf(DAMPING_EXPONENT)).max(DAMPING_FLOOR)
}

/// Scales an affinity change by how saturated the current value is.
#[must_use]
pub fn apply_affinity_damping(current: f64, raw_change: f64) -> f64 {
    raw_change * damping_factor(current)
}

/// Scales a trust gain like affinity; losses always apply in full.
#[must_use]
pub fn apply_trust_damping(current: f64, raw_change: f64) -> f64 {
    if raw_change >= 0.0 {
        raw_change * damping_factor(current)
    } else {
        raw_change
    }
}

/// Familiarity lost after `days_since_last_interaction` days apart.
#[must_use]
pub fn apply_familiarity_decay(current: u32, days_since_last_interaction: u32) -> u32 {
    current.saturating_sub(days_since_last_interaction / FAMILIARITY_DECAY_DAYS)
}

#[must_use]
pub fn clamp_affinity(value: f64) -> f64 {
    value.clamp(AFFINITY_MIN, AFFINITY_MAX)
}

#[must_use]
pub fn clamp_trust(value: f64) -> f64 {
    value.clamp(TRUST_MIN, TRUST_MAX)
}

/// Bounds an externally proposed delta to ±[`META_DELTA_LIMIT`].
#[must_use]
pub fn clamp_meta_delta(value: f64) -> f64 {
    value.clamp(-META_DELTA_LIMIT, META_DELTA_LIMIT)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_neutral_relationship_takes_full_change() {
        assert!((apply_affinity_damping(0.0, 10.0) - 10.0).abs() < EPS);
    }

    #[test]
    fn test_saturated_relationship_keeps_floor() {
        assert!((apply_affinity_damping(100.0, 10.0) - 1.0).abs() < EPS);
        assert!((apply_affinity_damping(-100.0, -10.0) - -1.0).abs() < EPS);
    }

    #[test]
    fn test_damping_is_symmetric_in_current() {
        let up = apply_affinity_damping(60.0, 8.0);
        let down = apply_affinity_damping(-60.0, 8.0);
        assert!((up - down).abs() < EPS);
    }

    #[test]
    fn test_trust_loss_is_never_damped() {
        assert!((apply_trust_damping(90.0, -20.0) - -20.0).abs() < EPS);
        assert!(apply_trust_damping(90.0, 20.0) < 20.0);
    }

    #[test]
    fn test_familiarity_decays_one_point_per_thirty_days() {
        assert_eq!(apply_familiarity_decay(10, 29), 10);
        assert_eq!(apply_familiarity_decay(10, 30), 9);
        assert_eq!(apply_familiarity_decay(10, 95), 7);
        assert_eq!(apply_familiarity_decay(2, 3000), 0);
    }

    #[test]
    fn test_clamps_enforce_ranges() {
        assert!((clamp_affinity(140.0) - 100.0).abs() < EPS);
        assert!((clamp_affinity(-140.0) - -100.0).abs() < EPS);
        assert!((clamp_trust(-3.0)).abs() < EPS);
        assert!((clamp_meta_delta(12.0) - 5.0).abs() < EPS);
        assert!((clamp_meta_delta(-12.0) - -5.0).abs() < EPS);
        assert!((clamp_meta_delta(2.5) - 2.5).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_damping_never_amplifies(current in -99.0..99.0f64, raw in -50.0..50.0f64) {
            let damped = apply_affinity_damping(current, raw);
            prop_assert!(damped.abs() <= raw.abs() + EPS);
            prop_assert!(damped.abs() + EPS >= DAMPING_FLOOR * raw.abs());
        }

        #[test]
        fn prop_damping_weakens_as_relationship_saturates(
            a in -99.0..99.0f64,
            b in -99.0..99.0f64,
            raw in 0.5..50.0f64,
        ) {
            let (near, far) = if a.abs() <= b.abs() { (a, b) } else { (b, a) };
            let near_effect = apply_affinity_damping(near, raw).abs();
            let far_effect = apply_affinity_damping(far, raw).abs();
            prop_assert!(near_effect + EPS >= far_effect);
            if near.abs() < far.abs() && near_effect > DAMPING_FLOOR * raw + EPS {
                prop_assert!(near_effect > far_effect);
            }
        }
    }
}
