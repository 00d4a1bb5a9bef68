use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::triplines::{TripLine, TripLineSet};

/// Maximum plausible speed for an admitted sample: 31 m/s ≈ 112 km/h.
pub const MAX_SPEED: f64 = 31.0;
/// Longest gap between successive fixes for the same vehicle that is still
/// trusted to imply a single chord (20 s).
pub const MAX_GPS_PAIR_DURATION_MICROS: i64 = 20 * 1_000_000;

/// A single GPS fix: an opaque vehicle id, a monotonic microsecond
/// timestamp, and a lon/lat position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub vehicle_id: String,
    pub time_micros: i64,
    pub lon: f64,
    pub lat: f64,
}

impl GpsPoint {
    fn coord(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

/// The chord between two successive fixes for the same vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsSegment {
    pub p0: GpsPoint,
    pub p1: GpsPoint,
}

impl GpsSegment {
    fn new(p0: GpsPoint, p1: GpsPoint) -> GpsSegment {
        GpsSegment { p0, p1 }
    }

    /// Both endpoints sit at the same coordinate: no heading can be
    /// inferred, so the segment can't cross anything meaningfully.
    fn is_still(&self) -> bool {
        self.p0.coord() == self.p1.coord()
    }

    fn envelope(&self) -> rstar::AABB<[f64; 2]> {
        crate::triplines::index::envelope_of(self.p0.coord(), self.p1.coord())
    }

    /// Intersect this segment with `tripline` as two 2-D line segments. On a
    /// proper intersection, return the fractional parameter along `self`
    /// where it occurs.
    fn intersect(&self, tripline: &TripLine) -> Option<f64> {
        segment_intersection(self.p0.coord(), self.p1.coord(), tripline.right, tripline.left)
    }
}

/// Orientation of the ordered triple `(a, b, c)`: positive if counter-
/// clockwise, negative if clockwise, zero if collinear.
fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Proper segment intersection via the standard orientation test; on a
/// crossing, solves for `u` along `p0..p1` (spec.md §4.3,
/// "Crossing geometry").
fn segment_intersection(
    p0: (f64, f64),
    p1: (f64, f64),
    q0: (f64, f64),
    q1: (f64, f64),
) -> Option<f64> {
    let o1 = orientation(p0, p1, q0);
    let o2 = orientation(p0, p1, q1);
    let o3 = orientation(q0, q1, p0);
    let o4 = orientation(q0, q1, p1);

    if (o1 > 0.0) == (o2 > 0.0) || o1 == 0.0 || o2 == 0.0 {
        return None;
    }
    if (o3 > 0.0) == (o4 > 0.0) || o3 == 0.0 || o4 == 0.0 {
        return None;
    }

    // Solve the two-line intersection for u along p0..p1.
    let d1 = (p1.0 - p0.0, p1.1 - p0.1);
    let d2 = (q1.0 - q0.0, q1.1 - q0.1);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom == 0.0 {
        return None;
    }
    let diff = (q0.0 - p0.0, q0.1 - p0.1);
    let u = (diff.0 * d2.1 - diff.1 * d2.0) / denom;
    Some(u)
}

/// A GPS segment's intersection with one tripline, at an interpolated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub tl_index: usize,
    pub time_micros: i64,
}

/// Whether `c` completes the pending crossing `self` (spec.md §4.3,
/// "Completion predicate"): same way, distinct triplines. Matches the
/// `way_id`-only predicate spec.md §9 open question 1 attributes to the
/// original source; see DESIGN.md for why the stricter `cluster_index`
/// reading was rejected.
fn completes(pending: &TripLine, c: &TripLine) -> bool {
    pending.way_id == c.way_id && pending.tl_index != c.tl_index
}

#[derive(Debug, Clone, Default)]
struct VehicleState {
    last_point: Option<GpsPoint>,
    pending: Vec<Crossing>,
}

/// The emitted result of a completed pair: two crossings and the inferred
/// speed in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub a: Crossing,
    pub b: Crossing,
    pub speed: f64,
}

/// Per-vehicle crossing/speed-inference state, driven by `update` (spec.md
/// §4.3). Holds no reference to the tripline geometry itself — callers pass
/// a `TripLineSet` to every call so this can stay cheap to construct per
/// engine shard.
#[derive(Debug)]
pub struct CrossingEngine {
    config: EngineConfig,
    vehicles: HashMap<String, VehicleState>,
    trip_events: HashMap<usize, u64>,
    drop_offs: HashMap<(usize, usize), u64>,
}

impl Default for CrossingEngine {
    fn default() -> CrossingEngine {
        CrossingEngine::new()
    }
}

impl CrossingEngine {
    pub fn new() -> CrossingEngine {
        CrossingEngine::with_config(EngineConfig::default())
    }

    /// Build with overridden tuning constants (SPEC_FULL.md §2,
    /// "Configuration"): `max_gps_pair_duration_micros` and `max_speed_mps`
    /// govern the stale-pair and over-speed rejections in [`Self::update`].
    pub fn with_config(config: EngineConfig) -> CrossingEngine {
        CrossingEngine {
            config,
            vehicles: HashMap::new(),
            trip_events: HashMap::new(),
            drop_offs: HashMap::new(),
        }
    }

    /// Process one fix, returning every speed sample it completes (usually
    /// zero or one, never more than the number of candidate triplines).
    pub fn update(&mut self, triplines: &TripLineSet, fix: GpsPoint) -> Vec<SpeedSample> {
        let vehicle_id = fix.vehicle_id.clone();
        let state = self.vehicles.entry(vehicle_id).or_default();

        let p0 = match state.last_point.replace(fix.clone()) {
            Some(p0) => p0,
            None => return Vec::new(),
        };

        if fix.time_micros - p0.time_micros > self.config.max_gps_pair_duration_micros {
            log::debug!("vehicle {}: stale pair, discarding", fix.vehicle_id);
            return Vec::new();
        }

        let segment = GpsSegment::new(p0, fix.clone());
        if segment.is_still() {
            return Vec::new();
        }

        let mut seg_crossings: Vec<Crossing> = triplines
            .query(segment.envelope())
            .into_iter()
            .filter_map(|tl| {
                segment.intersect(tl).map(|u| Crossing {
                    tl_index: tl.tl_index,
                    time_micros: (p0_time(&segment) as f64 + u * duration(&segment) as f64).round() as i64,
                })
            })
            .collect();
        seg_crossings.sort_by_key(|c| c.time_micros);

        let mut samples = Vec::new();
        for crossing in seg_crossings.drain(..) {
            *self.trip_events.entry(crossing.tl_index).or_insert(0) += 1;
            if let Some(sample) = self.match_crossing(triplines, &fix.vehicle_id, crossing) {
                samples.push(sample);
            }
        }
        samples
    }

    fn match_crossing(
        &mut self,
        triplines: &TripLineSet,
        vehicle_id: &str,
        c: Crossing,
    ) -> Option<SpeedSample> {
        let c_tl = triplines.tripline(c.tl_index);
        let state = self.vehicles.get_mut(vehicle_id)?;

        let match_pos = state
            .pending
            .iter()
            .position(|q| completes(triplines.tripline(q.tl_index), c_tl));

        let Some(pos) = match_pos else {
            // No completion: replace any existing pending entry for the same
            // tripline (re-crossing while still pending), else append.
            if let Some(existing) = state.pending.iter_mut().find(|q| q.tl_index == c.tl_index) {
                *existing = c;
            } else {
                state.pending.push(c);
            }
            return None;
        };

        let q = state.pending[pos];
        let q_tl = triplines.tripline(q.tl_index);

        for (i, r) in state.pending.iter().enumerate() {
            if i == pos {
                continue;
            }
            let r_tl = triplines.tripline(r.tl_index);
            if r_tl.way_id != q_tl.way_id {
                *self.drop_offs.entry((r.tl_index, q.tl_index)).or_insert(0) += 1;
            }
        }

        state.pending.clear();
        state.pending.push(c);

        admit(q, c, q_tl, c_tl, self.config.max_speed_mps)
    }

    pub fn trip_events(&self, tl_index: usize) -> u64 {
        self.trip_events.get(&tl_index).copied().unwrap_or(0)
    }

    pub fn drop_offs(&self) -> &HashMap<(usize, usize), u64> {
        &self.drop_offs
    }

    /// Drop per-vehicle state whose last fix predates `now_micros -
    /// horizon_micros`. Opt-in, never called internally (spec.md §5).
    pub fn evict_vehicles_older_than(&mut self, horizon_micros: i64, now_micros: i64) {
        self.vehicles.retain(|_, state| match &state.last_point {
            Some(p) => now_micros - p.time_micros <= horizon_micros,
            None => true,
        });
    }
}

fn p0_time(segment: &GpsSegment) -> i64 {
    segment.p0.time_micros
}

fn duration(segment: &GpsSegment) -> i64 {
    segment.p1.time_micros - segment.p0.time_micros
}

/// Speed-sample admission (spec.md §4.4): wrong-way rejection on a oneway,
/// zero/negative duration rejection, and the over-speed cap. `a` is the
/// last (older) crossing, `b` the completing one.
fn admit(a: Crossing, b: Crossing, a_tl: &TripLine, b_tl: &TripLine, max_speed_mps: f64) -> Option<SpeedSample> {
    if b_tl.nd_index < a_tl.nd_index && b_tl.oneway {
        return None;
    }

    let ds = (b_tl.dist - a_tl.dist).abs();
    let dt_micros = b.time_micros - a.time_micros;
    if dt_micros < 0 {
        panic!("crossing sort order violated: negative dt = {dt_micros} micros");
    }
    let dt = dt_micros as f64 / 1_000_000.0;
    if dt == 0.0 {
        return None;
    }

    let speed = ds / dt;
    if speed > max_speed_mps {
        return None;
    }

    Some(SpeedSample { a, b, speed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, Node, Way};
    use std::collections::HashMap as Map;

    fn single_way_network() -> Network {
        let mut tags = Map::new();
        tags.insert("highway".to_string(), "residential".to_string());
        let way = Way { id: 1, node_ids: vec![1, 2], tags };
        let mut nodes = Map::new();
        nodes.insert(1, Node { id: 1, lon: 0.0, lat: 0.0 });
        nodes.insert(2, Node { id: 2, lon: 0.0, lat: 0.001 });
        Network::new(vec![way], nodes)
    }

    fn fix(vehicle: &str, t: i64, lon: f64, lat: f64) -> GpsPoint {
        GpsPoint { vehicle_id: vehicle.to_string(), time_micros: t, lon, lat }
    }

    #[test]
    fn first_fix_for_a_vehicle_produces_no_samples() {
        let network = single_way_network();
        let triplines = TripLineSet::build(&network);
        let mut engine = CrossingEngine::new();
        let samples = engine.update(&triplines, fix("v1", 0, 0.0, 0.00005));
        assert!(samples.is_empty());
    }

    #[test]
    fn straight_way_crossing_produces_one_sample_s1() {
        let network = single_way_network();
        let triplines = TripLineSet::build(&network);
        let mut engine = CrossingEngine::new();

        // The way's two inner triplines sit at lat ~0.00008993 and
        // ~0.00091007; these fixtures must straddle both.
        engine.update(&triplines, fix("v1", 0, 0.0, 0.00005));
        let samples = engine.update(&triplines, fix("v1", 5_000_000, 0.0, 0.00095));

        assert_eq!(samples.len(), 1);
        let expected = 88.0 / 5.0;
        assert!((samples[0].speed - expected).abs() / expected < 0.05);
    }

    #[test]
    fn stale_pair_produces_no_samples_s2() {
        let network = single_way_network();
        let triplines = TripLineSet::build(&network);
        let mut engine = CrossingEngine::new();

        engine.update(&triplines, fix("v1", 0, 0.0, 0.00005));
        let samples = engine.update(&triplines, fix("v1", 21_000_000, 0.0, 0.00095));
        assert!(samples.is_empty());
    }

    #[test]
    fn wrong_way_on_oneway_produces_no_samples_s3() {
        let mut tags = Map::new();
        tags.insert("highway".to_string(), "residential".to_string());
        tags.insert("oneway".to_string(), "yes".to_string());
        let way = Way { id: 1, node_ids: vec![1, 2], tags };
        let mut nodes = Map::new();
        nodes.insert(1, Node { id: 1, lon: 0.0, lat: 0.0 });
        nodes.insert(2, Node { id: 2, lon: 0.0, lat: 0.001 });
        let network = Network::new(vec![way], nodes);
        let triplines = TripLineSet::build(&network);
        let mut engine = CrossingEngine::new();

        // Travel from the end of the way back toward the start, crossing
        // both inner triplines in reverse order.
        engine.update(&triplines, fix("v1", 0, 0.0, 0.00095));
        let samples = engine.update(&triplines, fix("v1", 5_000_000, 0.0, 0.00005));
        assert!(samples.is_empty());
        assert!(triplines.triplines().iter().any(|t| engine.trip_events(t.tl_index) > 0));
    }

    #[test]
    fn overspeed_pair_is_rejected_s5() {
        let network = single_way_network();
        let triplines = TripLineSet::build(&network);
        let mut engine = CrossingEngine::new();

        engine.update(&triplines, fix("v1", 0, 0.0, 0.00005));
        let samples = engine.update(&triplines, fix("v1", 1_000_000, 0.0, 0.00095));
        assert!(samples.is_empty());
    }

    #[test]
    fn completion_predicate_requires_same_way_and_distinct_triplines() {
        let network = single_way_network();
        let triplines = TripLineSet::build(&network);
        let a = triplines.triplines()[0];
        let b = triplines.triplines()[1];
        // Same way, different clusters: completes under the way_id-only
        // predicate (spec.md §9 open question 1).
        assert!(completes(&a, &b));
        assert!(!completes(&a, &a));
    }
}
