//! Core types for the visit timeline.
//!
//! Holds the data model, the error type, and the pure building blocks that
//! the pipeline stages share: timestamp conversion, transition decoding, URL
//! inspection and frequency ranking.

pub mod error;
pub mod models;
pub mod ranking;
pub mod settings;
pub mod time_utils;
pub mod transition;
pub mod url_utils;

pub use error::{Result, TimelineError};
