//! Data layer for the visit timeline.
//!
//! Reads raw visits from a browser history database, normalizes them, groups
//! them by date, computes period aggregates, persists the JSON artifacts and
//! merges artifacts from several browsers into one view.

pub mod aggregator;
pub mod grouper;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod summary;

pub use timeline_core as core;
