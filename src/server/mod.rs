//! HTTP server exposing cache statistics.
//!
//! - [`stats_api`]: route handlers for health, JSON stats and Prometheus metrics

pub mod stats_api;
