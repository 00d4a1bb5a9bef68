use std::collections::HashMap;

use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::geodesy::{self, LengthIndexedLine};
use crate::network::Network;

pub mod index;
pub mod segment;

pub use index::SpatialIndex;
pub use segment::{get_street_segments, StreetSegment};

/// How far before/after an intersection a tripline sits, in metres.
pub const INTERSECTION_MARGIN: f64 = 10.0;
/// Half-width of a tripline, in metres.
pub const TRIPLINE_RADIUS: f64 = 10.0;
/// Shortest way the builder will place triplines on; also the minimum
/// spacing between two accepted cluster nodes.
pub const MIN_SEGMENT_LEN: f64 = 2.0 * INTERSECTION_MARGIN;
/// Epsilon, in degrees, used to sample either side of an offset point when
/// estimating its local tangent bearing.
const TANGENT_EPSILON_DEG: f64 = 9e-6;

/// A short line segment placed just before or after an intersection,
/// used as a detector for GPS crossings (spec.md §3, GLOSSARY).
///
/// Identity is `tl_index` (spec.md's design note on replacing reference
/// identity with a stable integer id) — counters key on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripLine {
    pub right: (f64, f64),
    pub left: (f64, f64),
    pub way_id: u64,
    pub nd_index: usize,
    pub tl_index: usize,
    pub cluster_index: usize,
    pub dist: f64,
    pub oneway: bool,
}

impl TripLine {
    fn envelope(&self) -> AABB<[f64; 2]> {
        index::envelope_of(self.right, self.left)
    }
}

/// The immutable output of `TripLineSet::build`: every tripline, the
/// per-way cluster map, and the spatial index over them (spec.md §4.1).
#[derive(Debug)]
pub struct TripLineSet {
    triplines: Vec<TripLine>,
    clusters: HashMap<u64, Vec<usize>>,
    index: SpatialIndex,
    bounds: Option<AABB<[f64; 2]>>,
}

impl TripLineSet {
    pub fn build(network: &Network) -> TripLineSet {
        TripLineSet::build_with_config(network, &EngineConfig::default())
    }

    /// Build with overridden tuning constants (SPEC_FULL.md §2,
    /// "Configuration"). `EngineConfig::default()` reproduces spec.md's
    /// literal values, same as [`TripLineSet::build`].
    pub fn build_with_config(network: &Network, config: &EngineConfig) -> TripLineSet {
        let intersections = intersection_node_ids(network);

        let mut triplines = Vec::new();
        let mut clusters = HashMap::new();
        let mut index = SpatialIndex::new();
        let mut bounds: Option<AABB<[f64; 2]>> = None;
        let mut next_tl_index = 0usize;

        for way in &network.ways {
            if !way.is_supported_highway() {
                log::debug!("way {}: skipped, unsupported highway tag", way.id);
                continue;
            }
            let Some(polyline) = network.polyline_for(way) else {
                log::debug!("way {}: skipped, missing referenced node", way.id);
                continue;
            };
            if polyline.len() < 2 {
                continue;
            }

            let way_len = polyline_length_m(&polyline);
            if way_len < config.min_segment_len_m {
                log::debug!("way {}: skipped, shorter than {} m", way.id, config.min_segment_len_m);
                continue;
            }

            let line = LengthIndexedLine::new(&polyline);
            let scale = (line.end_index() - line.start_index()) / way_len;
            let oneway = way.is_oneway();
            let last_idx = polyline.len() - 1;

            let mut cluster_positions: Vec<usize> = Vec::new();
            let mut last_cluster_dist = f64::NEG_INFINITY;
            let mut cluster_index = 0usize;

            for (idx, &point) in polyline.iter().enumerate() {
                let is_endpoint = idx == 0 || idx == last_idx;
                let is_intersection = intersections.contains(&way.node_ids[idx]);
                if !(is_endpoint || is_intersection) {
                    continue;
                }

                let pt_index = line.project(point);
                let pt_dist = pt_index / scale;
                if pt_dist - last_cluster_dist < config.min_segment_len_m {
                    continue;
                }
                last_cluster_dist = pt_dist;
                cluster_positions.push(idx);

                for delta in [-config.intersection_margin_m, config.intersection_margin_m] {
                    let off_index = pt_index + delta * scale;
                    if off_index < line.start_index() || off_index > line.end_index() {
                        continue;
                    }
                    if let Some(tl) = build_tripline(
                        &line,
                        off_index,
                        scale,
                        way.id,
                        idx,
                        next_tl_index,
                        cluster_index,
                        oneway,
                        config.tripline_radius_m,
                    ) {
                        bounds = Some(match bounds {
                            Some(b) => b.merged(&tl.envelope()),
                            None => tl.envelope(),
                        });
                        index.insert(tl.envelope(), tl.tl_index);
                        triplines.push(tl);
                        next_tl_index += 1;
                    } else {
                        log::debug!(
                            "way {} node {}: skipped degenerate tangent at offset {}",
                            way.id,
                            idx,
                            delta
                        );
                    }
                }
                cluster_index += 1;
            }

            if cluster_positions.last() != Some(&last_idx) {
                cluster_positions.push(last_idx);
            }
            clusters.insert(way.id, cluster_positions);
        }

        TripLineSet { triplines, clusters, index, bounds }
    }

    pub fn triplines(&self) -> &[TripLine] {
        &self.triplines
    }

    pub fn tripline(&self, tl_index: usize) -> &TripLine {
        &self.triplines[tl_index]
    }

    pub fn clusters(&self) -> &HashMap<u64, Vec<usize>> {
        &self.clusters
    }

    pub fn query(&self, envelope: AABB<[f64; 2]>) -> Vec<&TripLine> {
        self.index.query(envelope).into_iter().map(|i| &self.triplines[i]).collect()
    }

    pub fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        self.bounds
    }

    pub fn center_point(&self) -> Option<(f64, f64)> {
        self.bounds.map(|b| {
            let lo = b.lower();
            let hi = b.upper();
            ((lo[0] + hi[0]) / 2.0, (lo[1] + hi[1]) / 2.0)
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn build_tripline(
    line: &LengthIndexedLine,
    off_index: f64,
    scale: f64,
    way_id: u64,
    nd_index: usize,
    tl_index: usize,
    cluster_index: usize,
    oneway: bool,
    tripline_radius_m: f64,
) -> Option<TripLine> {
    let p = line.extract_point(off_index);
    let before = line.extract_point((off_index - TANGENT_EPSILON_DEG).max(line.start_index()));
    let after = line.extract_point((off_index + TANGENT_EPSILON_DEG).min(line.end_index()));
    if before == after {
        return None;
    }
    let theta = geodesy::azimuth(before, after);
    let right = geodesy::destination(p, geodesy::normalize_azimuth(theta + 90.0), tripline_radius_m);
    let left = geodesy::destination(p, geodesy::normalize_azimuth(theta - 90.0), tripline_radius_m);
    Some(TripLine {
        right,
        left,
        way_id,
        nd_index,
        tl_index,
        cluster_index,
        dist: off_index / scale,
        oneway,
    })
}

fn polyline_length_m(coords: &[(f64, f64)]) -> f64 {
    coords.windows(2).map(|w| geodesy::haversine_distance(w[0], w[1])).sum()
}

/// Node ids that appear in two or more (way, position) slots across the
/// whole network — including the same way visiting a node twice
/// (spec.md §4.1, "Intersection detection").
fn intersection_node_ids(network: &Network) -> std::collections::HashSet<u64> {
    let mut counts: HashMap<u64, u32> = HashMap::new();
    for way in &network.ways {
        for &id in &way.node_ids {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts.into_iter().filter(|(_, c)| *c >= 2).map(|(id, _)| id).collect()
}
