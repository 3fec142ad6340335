//! Application services: the reaction engine, batch reader and the ports they depend on.

pub mod cache;
pub mod context;
pub mod error;
pub mod reactions;
pub mod repos;
