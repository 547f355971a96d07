//! Utility functions for timestamps.

pub mod timestamps;

pub use timestamps::{millis_timestamp, now_utc, Timestamp};
