//! block-cache: a segmented read-through cache for fixed-size blocks.
//!
//! Reads that miss go to a blocking [`store::BackingStore`] and land in the
//! recency segment; explicit writes land in the frequency segment. When the
//! cache is full, entries leave from the recency tail.

pub mod cache;
pub mod config;
pub mod server;
pub mod store;
pub mod workload;
