use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod error;
pub mod sqlite;

pub use error::Error;

/// Highway types the tripline builder accepts (spec.md §4.1 step 1).
pub const SUPPORTED_HIGHWAYS: &[&str] = &[
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "unclassified",
    "residential",
    "service",
    "motorway_link",
    "trunk_link",
    "primary_link",
    "secondary_link",
    "tertiary_link",
];

/// A network node: an intersection candidate or a plain shape point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub lon: f64,
    pub lat: f64,
}

/// A way: an ordered chain of node ids plus its OSM-style tags.
///
/// This is the collaborator contract spec.md §6 describes: the loader that
/// produced a `Way` is not this crate's concern, only that it can answer
/// `has_tag`/`get_tag`/`tag_is_true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Way {
    pub id: u64,
    pub node_ids: Vec<u64>,
    pub tags: HashMap<String, String>,
}

impl Way {
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn tag_is_true(&self, key: &str) -> bool {
        matches!(self.get_tag(key), Some("yes") | Some("true") | Some("1"))
    }

    /// `highway` value is one of the types the tripline builder supports.
    pub fn is_supported_highway(&self) -> bool {
        self.get_tag("highway")
            .map(|v| SUPPORTED_HIGHWAYS.contains(&v))
            .unwrap_or(false)
    }

    /// oneway iff `oneway=yes/true/1`, `highway=motorway`, or
    /// `junction=roundabout` (spec.md §4.1 step 5).
    pub fn is_oneway(&self) -> bool {
        self.tag_is_true("oneway")
            || self.get_tag("highway") == Some("motorway")
            || self.get_tag("junction") == Some("roundabout")
    }
}

/// A static road network: the ways and the nodes they reference.
///
/// Building one from OSM tags and geometry is out of scope for this crate
/// (spec.md §1); `Network` is just the shape the tripline builder consumes.
/// Construct it directly for embedders with their own OSM pipeline, or load
/// one from a SQLite extract with [`sqlite::load`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub ways: Vec<Way>,
    pub nodes: HashMap<u64, Node>,
}

impl Network {
    pub fn new(ways: Vec<Way>, nodes: HashMap<u64, Node>) -> Network {
        Network { ways, nodes }
    }

    /// Materialise a way's polyline as `(lon, lat)` pairs in node order.
    ///
    /// Returns `None` if any referenced node id is missing, per spec.md
    /// §4.1 step 2 ("Skip silently if the loader cannot").
    pub fn polyline_for(&self, way: &Way) -> Option<Vec<(f64, f64)>> {
        way.node_ids
            .iter()
            .map(|id| self.nodes.get(id).map(|n| (n.lon, n.lat)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(tags: &[(&str, &str)]) -> Way {
        Way {
            id: 1,
            node_ids: vec![1, 2],
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn supported_highway_checks_value() {
        assert!(way(&[("highway", "residential")]).is_supported_highway());
        assert!(!way(&[("highway", "footway")]).is_supported_highway());
        assert!(!way(&[]).is_supported_highway());
    }

    #[test]
    fn oneway_detection() {
        assert!(way(&[("oneway", "yes")]).is_oneway());
        assert!(way(&[("oneway", "1")]).is_oneway());
        assert!(way(&[("highway", "motorway")]).is_oneway());
        assert!(way(&[("junction", "roundabout")]).is_oneway());
        assert!(!way(&[("highway", "residential")]).is_oneway());
    }

    #[test]
    fn polyline_for_missing_node_is_none() {
        let mut nodes = HashMap::new();
        nodes.insert(1, Node { id: 1, lon: 0.0, lat: 0.0 });
        let net = Network::new(vec![], nodes);
        let w = way(&[]);
        assert!(net.polyline_for(&w).is_none());
    }

    #[test]
    fn polyline_for_resolves_in_order() {
        let mut nodes = HashMap::new();
        nodes.insert(1, Node { id: 1, lon: 0.0, lat: 0.0 });
        nodes.insert(2, Node { id: 2, lon: 1.0, lat: 1.0 });
        let net = Network::new(vec![], nodes);
        let w = way(&[]);
        assert_eq!(net.polyline_for(&w), Some(vec![(0.0, 0.0), (1.0, 1.0)]));
    }
}
