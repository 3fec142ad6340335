//! tally: per-target like/dislike counters with cache-aside reads and batched lookups.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
