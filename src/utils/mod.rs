//! Utility functions and helpers
//!
//! This module contains timestamp utilities shared by the item model and
//! the HTTP projections.

pub mod time;

pub use time::{now_millis, to_iso};
