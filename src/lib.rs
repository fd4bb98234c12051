//! Consensus geocoding in a disagreeing world.
//!
//! Queries a pool of geocoding providers for the same address, treats the
//! combined answers as one set of candidate locations, and clusters them so
//! callers can see where most geocoders agree. The binary in this crate
//! serves the results over HTTP; [`client::GeocodeClient`] is the matching
//! submission client, and [`render::MapView`] turns a cluster
//! FeatureCollection into a styled map document.

pub mod address;
pub mod client;
pub mod cluster;
pub mod config;
pub mod geocode_cache;
pub mod geocoders;
pub mod location;
pub mod models;
pub mod render;
pub mod utils;
