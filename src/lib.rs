//! Streaming traffic-speed estimation: tripline construction over a static
//! road network, plus a crossing engine that turns GPS fixes into speed
//! samples and drop-off counts.
//!
//! [`Engine`] is the entry point: build it, call [`Engine::set_streets`]
//! once, then drive [`Engine::update`] with fixes in arrival order.

pub mod config;
pub mod crossing;
pub mod engine;
pub mod geodesy;
pub mod network;
pub mod triplines;

pub use config::EngineConfig;
pub use crossing::{CrossingEngine, Crossing, GpsPoint, GpsSegment, SpeedSample};
pub use engine::Engine;
pub use network::Network;
pub use triplines::{StreetSegment, TripLine, TripLineSet};
