//! hostpulse - live host telemetry sampler.
//!
//! Provides:
//! - `collector`: readers for `/proc` and `/sys` behind mockable traits
//! - `rates`: counter deltas turned into CPU shares and throughput
//! - `scheduler`: per-domain refresh cadences
//! - `sampler`: drives the collectors into a `HostReport`
//! - `history`, `alerts`, `actions`: chart rings, threshold alerts, kill/renice
//! - `fmt`: shared formatting helpers (bytes, duration, rate)
//! - `model`: serializable records

pub mod actions;
pub mod alerts;
pub mod collector;
pub mod fmt;
pub mod history;
pub mod model;
pub mod rates;
pub mod sampler;
pub mod scheduler;
