use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::network::Network;

/// A slice of a way's polyline between two cluster boundaries, produced on
/// demand by `get_street_segments` (spec.md §4.1, "Street segmentation").
/// Pure geometry — no engine state is retained here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetSegment {
    pub coords: Vec<(f64, f64)>,
    pub way_id: u64,
    pub tags: HashMap<String, String>,
    pub start_nd_index: usize,
    pub end_nd_index: usize,
}

/// Slice every supported-highway way at its cluster boundaries.
///
/// Ways absent from `clusters` (skipped entirely by the tripline builder —
/// unsupported highway tag already filtered by the caller iterating
/// `network.ways`, missing geometry, or shorter than `MIN_SEGMENT_LEN`)
/// still get one segment spanning the whole way, per spec.md §4.1.
pub fn get_street_segments(
    network: &Network,
    clusters: &HashMap<u64, Vec<usize>>,
) -> Vec<StreetSegment> {
    let mut segments = Vec::new();
    for way in network.ways.iter().filter(|w| w.is_supported_highway()) {
        let Some(polyline) = network.polyline_for(way) else {
            continue;
        };
        if polyline.len() < 2 {
            continue;
        }
        let last = polyline.len() - 1;
        let boundaries: &[usize] = match clusters.get(&way.id) {
            Some(b) if !b.is_empty() => b,
            _ => &[],
        };
        let fallback = [0usize, last];
        let boundaries: &[usize] = if boundaries.is_empty() { &fallback } else { boundaries };

        for pair in boundaries.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start >= end {
                continue;
            }
            segments.push(StreetSegment {
                coords: polyline[start..=end].to_vec(),
                way_id: way.id,
                tags: way.tags.clone(),
                start_nd_index: start,
                end_nd_index: end,
            });
        }
    }
    segments
}
