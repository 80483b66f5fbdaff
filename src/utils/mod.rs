//! # Utility Modules
//!
//! Supporting utilities for the codec and transport.
//!
//! ## Components
//! - **Time**: milliseconds-since-midnight clock for timestamp requests
//! - **Metrics**: per-session atomic counters and an exchange timer

pub mod metrics;
pub mod time;

pub use metrics::{Metrics, MetricsSnapshot, Timer};
