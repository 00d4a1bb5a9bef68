//! Tuning constants spec.md fixes as literals, grouped so an embedder can
//! override them without forking the crate (SPEC_FULL.md §2, "Ambient
//! stack — Configuration").

use serde::{Deserialize, Serialize};

use crate::crossing;
use crate::triplines;

/// Tunable constants governing tripline placement and crossing admission.
/// `Default` reproduces spec.md's literal values exactly; the `pub const`s
/// in [`crate::triplines`] and [`crate::crossing`] remain the source of
/// truth those defaults read from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How far before/after an intersection a tripline sits, in metres.
    pub intersection_margin_m: f64,
    /// Half-width of a tripline, in metres.
    pub tripline_radius_m: f64,
    /// Shortest way the builder places triplines on; also the minimum
    /// spacing between two accepted cluster nodes.
    pub min_segment_len_m: f64,
    /// Longest gap between successive fixes for the same vehicle that is
    /// still trusted to imply a single chord, in microseconds.
    pub max_gps_pair_duration_micros: i64,
    /// Speed above which a completed pair is rejected as GPS noise, in m/s.
    pub max_speed_mps: f64,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            intersection_margin_m: triplines::INTERSECTION_MARGIN,
            tripline_radius_m: triplines::TRIPLINE_RADIUS,
            min_segment_len_m: triplines::MIN_SEGMENT_LEN,
            max_gps_pair_duration_micros: crossing::MAX_GPS_PAIR_DURATION_MICROS,
            max_speed_mps: crossing::MAX_SPEED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_literals() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.intersection_margin_m, 10.0);
        assert_eq!(cfg.tripline_radius_m, 10.0);
        assert_eq!(cfg.min_segment_len_m, 20.0);
        assert_eq!(cfg.max_gps_pair_duration_micros, 20_000_000);
        assert_eq!(cfg.max_speed_mps, 31.0);
    }
}
