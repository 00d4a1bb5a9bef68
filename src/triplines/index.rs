use rstar::{RTree, RTreeObject, AABB};

/// A tripline, keyed by its bounding rectangle, for `RTree` storage. Holds
/// only the owning `TripLineSet`'s `tl_index` — the spatial index is a pure
/// lookup structure, it doesn't own tripline data (spec.md §4.2).
#[derive(Debug, Clone, Copy)]
struct Entry {
    envelope: AABB<[f64; 2]>,
    tl_index: usize,
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over tripline bounding rectangles: `insert`/`query`, the
/// two operations spec.md §4.2 asks for and nothing else. Built once in
/// `TripLineSet::build` and read-only afterwards (spec.md §5).
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<Entry>,
}

impl SpatialIndex {
    pub fn new() -> SpatialIndex {
        SpatialIndex { tree: RTree::new() }
    }

    pub fn insert(&mut self, envelope: AABB<[f64; 2]>, tl_index: usize) {
        self.tree.insert(Entry { envelope, tl_index });
    }

    /// All tripline indices whose bounding rectangle intersects `envelope`.
    pub fn query(&self, envelope: AABB<[f64; 2]>) -> Vec<usize> {
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.tl_index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Bounding rectangle of two `(lon, lat)` endpoints.
pub fn envelope_of(a: (f64, f64), b: (f64, f64)) -> AABB<[f64; 2]> {
    AABB::from_corners([a.0.min(b.0), a.1.min(b.1)], [a.0.max(b.0), a.1.max(b.1)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_finds_overlapping_entries_only() {
        let mut idx = SpatialIndex::new();
        idx.insert(envelope_of((0.0, 0.0), (0.0, 1.0)), 1);
        idx.insert(envelope_of((10.0, 10.0), (10.0, 11.0)), 2);

        let hits = idx.query(envelope_of((-1.0, -1.0), (1.0, 2.0)));
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let idx = SpatialIndex::new();
        assert!(idx.query(envelope_of((0.0, 0.0), (1.0, 1.0))).is_empty());
    }
}
