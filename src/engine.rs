//! The public façade: ties the one-shot [`TripLineSet`] to the mutable
//! [`CrossingEngine`] state behind the API spec.md §6 describes
//! (`set_streets`, `update`, the diagnostic getters).

use std::sync::Arc;

use rstar::AABB;

use crate::config::EngineConfig;
use crate::crossing::{CrossingEngine, GpsPoint, SpeedSample};
use crate::network::Network;
use crate::triplines::{get_street_segments, StreetSegment, TripLine, TripLineSet};

/// Streaming traffic-speed estimator for one network.
///
/// `set_streets` is called once; the resulting [`TripLineSet`] is wrapped in
/// an `Arc` so diagnostic reads (`get_triplines`, `get_bounds`, ...) can run
/// concurrently with the single writer driving `update`, per spec.md §5.
pub struct Engine {
    config: EngineConfig,
    triplines: Option<Arc<TripLineSet>>,
    crossings: CrossingEngine,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine::with_config(EngineConfig::default())
    }

    /// Build with overridden tuning constants (SPEC_FULL.md §2,
    /// "Configuration"): the same `config` governs both tripline placement
    /// in `set_streets` and crossing admission in `update`.
    pub fn with_config(config: EngineConfig) -> Engine {
        Engine { config, triplines: None, crossings: CrossingEngine::with_config(config) }
    }

    /// Build the tripline set for `network`. One-shot; calling it again
    /// simply replaces the previous set (idempotency is not required by
    /// spec.md §6).
    pub fn set_streets(&mut self, network: &Network) {
        self.triplines = Some(Arc::new(TripLineSet::build_with_config(network, &self.config)));
    }

    /// Pure function of the cluster map built by `set_streets` and the
    /// supplied network; panics if called before `set_streets`.
    pub fn get_street_segments(&self, network: &Network) -> Vec<StreetSegment> {
        let triplines = self.triplines.as_ref().expect("set_streets must be called first");
        get_street_segments(network, triplines.clusters())
    }

    pub fn get_triplines(&self) -> &[TripLine] {
        match &self.triplines {
            Some(t) => t.triplines(),
            None => &[],
        }
    }

    pub fn get_triplines_in(&self, rect: AABB<[f64; 2]>) -> Vec<&TripLine> {
        match &self.triplines {
            Some(t) => t.query(rect),
            None => Vec::new(),
        }
    }

    pub fn get_center_point(&self) -> Option<(f64, f64)> {
        self.triplines.as_ref().and_then(|t| t.center_point())
    }

    pub fn get_bounds(&self) -> Option<AABB<[f64; 2]>> {
        self.triplines.as_ref().and_then(|t| t.bounds())
    }

    /// Feed one GPS fix, returning every speed sample it completes. Panics
    /// if called before `set_streets` (no triplines exist to cross yet).
    pub fn update(&mut self, fix: GpsPoint) -> Vec<SpeedSample> {
        let triplines = self.triplines.clone().expect("set_streets must be called first");
        self.crossings.update(&triplines, fix)
    }

    pub fn get_n_trip_events(&self, tl_index: usize) -> u64 {
        self.crossings.trip_events(tl_index)
    }

    pub fn get_drop_offs(&self) -> &std::collections::HashMap<(usize, usize), u64> {
        self.crossings.drop_offs()
    }

    /// Evict per-vehicle state whose last fix predates `now_micros -
    /// horizon_micros`. Never called internally (spec.md §5, per-vehicle
    /// state growth is unbounded by default).
    pub fn evict_vehicles_older_than(&mut self, horizon_micros: i64, now_micros: i64) {
        self.crossings.evict_vehicles_older_than(horizon_micros, now_micros);
    }
}
