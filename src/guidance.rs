//! Guidance decision policy.
//!
//! Maps one tick's observation to exactly one `GuidanceState`. Size is checked
//! before position because position feedback is meaningless while the object
//! is far too small or too large. Horizontal correction is checked before
//! vertical so that only one axis is reported at a time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::align::AlignmentFeatures;
use crate::error::GuidanceError;
use crate::zone::TargetZone;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceState {
    Perfect,
    Left,
    Right,
    Up,
    Down,
    Closer,
    Further,
    NoObject,
}

impl GuidanceState {
    pub const ALL: [GuidanceState; 8] = [
        GuidanceState::Perfect,
        GuidanceState::Left,
        GuidanceState::Right,
        GuidanceState::Up,
        GuidanceState::Down,
        GuidanceState::Closer,
        GuidanceState::Further,
        GuidanceState::NoObject,
    ];

    /// Stable instruction key.
    pub fn key(self) -> &'static str {
        match self {
            GuidanceState::Perfect => "perfect",
            GuidanceState::Left => "left",
            GuidanceState::Right => "right",
            GuidanceState::Up => "up",
            GuidanceState::Down => "down",
            GuidanceState::Closer => "closer",
            GuidanceState::Further => "further",
            GuidanceState::NoObject => "no_object",
        }
    }
}

impl fmt::Display for GuidanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for GuidanceState {
    type Err = GuidanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        GuidanceState::ALL
            .into_iter()
            .find(|state| state.key() == key)
            .ok_or_else(|| GuidanceError::ContractViolation(format!("unknown guidance state '{}'", s)))
    }
}

/// What the evaluation loop saw this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Observation {
    Detected(AlignmentFeatures),
    NoDetection,
}

/// Decide the candidate state for one observation. Total: never fails.
///
/// `NoObject` is only a candidate; the scheduler applies the no-detection
/// grace period before it is ever announced.
pub fn decide(observation: &Observation, zone: &TargetZone) -> GuidanceState {
    let features = match observation {
        Observation::Detected(features) => features,
        Observation::NoDetection => return GuidanceState::NoObject,
    };

    if features.size_ratio < zone.min_size_ratio {
        GuidanceState::Closer
    } else if features.size_ratio > zone.max_size_ratio {
        GuidanceState::Further
    } else if features.offset_x.unsigned_abs() > u64::from(zone.position_threshold_x) {
        if features.offset_x > 0 {
            GuidanceState::Right
        } else {
            GuidanceState::Left
        }
    } else if features.offset_y.unsigned_abs() > u64::from(zone.position_threshold_y) {
        if features.offset_y > 0 {
            GuidanceState::Down
        } else {
            GuidanceState::Up
        }
    } else {
        GuidanceState::Perfect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{analyze, Detection};
    use crate::zone::{FrameDimensions, ZoneRatios};

    fn zone() -> TargetZone {
        TargetZone::compute(
            FrameDimensions::new(1280, 720).unwrap(),
            &ZoneRatios::default(),
        )
        .unwrap()
    }

    fn features(offset_x: i64, offset_y: i64, size_ratio: f64) -> Observation {
        Observation::Detected(AlignmentFeatures {
            offset_x,
            offset_y,
            size_ratio,
        })
    }

    #[test]
    fn no_detection_is_no_object_candidate() {
        assert_eq!(decide(&Observation::NoDetection, &zone()), GuidanceState::NoObject);
    }

    #[test]
    fn size_dominates_position() {
        let zone = zone();
        for (ox, oy) in [(0, 0), (500, 0), (-500, 300), (0, -300), (900, 900)] {
            assert_eq!(decide(&features(ox, oy, 0.1), &zone), GuidanceState::Closer);
            assert_eq!(decide(&features(ox, oy, 3.0), &zone), GuidanceState::Further);
        }
    }

    #[test]
    fn horizontal_correction_wins_over_vertical() {
        let zone = zone();
        assert_eq!(decide(&features(200, 200, 1.0), &zone), GuidanceState::Right);
        assert_eq!(decide(&features(-200, -200, 1.0), &zone), GuidanceState::Left);
        assert_eq!(decide(&features(0, 200, 1.0), &zone), GuidanceState::Down);
        assert_eq!(decide(&features(0, -200, 1.0), &zone), GuidanceState::Up);
    }

    #[test]
    fn thresholds_are_exclusive() {
        let zone = zone();
        let tx = zone.position_threshold_x as i64;
        let ty = zone.position_threshold_y as i64;
        assert_eq!(decide(&features(tx, ty, 1.0), &zone), GuidanceState::Perfect);
        assert_eq!(decide(&features(-tx, -ty, 1.0), &zone), GuidanceState::Perfect);
        assert_eq!(decide(&features(tx + 1, 0, 1.0), &zone), GuidanceState::Right);
        assert_eq!(decide(&features(0, -ty - 1, 1.0), &zone), GuidanceState::Up);
        assert_eq!(decide(&features(0, 0, zone.min_size_ratio), &zone), GuidanceState::Perfect);
        assert_eq!(decide(&features(0, 0, zone.max_size_ratio), &zone), GuidanceState::Perfect);
    }

    #[test]
    fn decision_is_total_over_feature_grid() {
        let zone = zone();
        let offsets = [i64::MIN, -10_000, -65, -64, -51, -50, -1, 0, 1, 50, 51, 64, 65, 10_000, i64::MAX];
        let ratios = [0.0, 0.1, 0.499, 0.5, 0.8, 1.0, 1.2, 1.2001, 10.0, f64::INFINITY];
        for &ox in &offsets {
            for &oy in &offsets {
                for &sr in &ratios {
                    let state = decide(&features(ox, oy, sr), &zone);
                    assert!(GuidanceState::ALL.contains(&state));
                    assert_ne!(state, GuidanceState::NoObject);
                }
            }
        }
    }

    #[test]
    fn reference_small_box_asks_to_come_closer() {
        let zone = zone();
        let det = Detection::new(100, 100, 300, 300, 0.9);
        let obs = Observation::Detected(analyze(&det, &zone, zone.frame_center()).unwrap());
        assert_eq!(decide(&obs, &zone), GuidanceState::Closer);
    }

    #[test]
    fn reference_target_sized_box_is_perfect() {
        let zone = zone();
        let det = Detection::new(205, 72, 1075, 648, 0.9);
        let obs = Observation::Detected(analyze(&det, &zone, zone.frame_center()).unwrap());
        assert_eq!(decide(&obs, &zone), GuidanceState::Perfect);
    }

    #[test]
    fn state_keys_round_trip_and_unknown_keys_are_contract_violations() {
        for state in GuidanceState::ALL {
            assert_eq!(state.key().parse::<GuidanceState>().unwrap(), state);
        }
        assert!(matches!(
            "sideways".parse::<GuidanceState>(),
            Err(GuidanceError::ContractViolation(_))
        ));
    }
}
