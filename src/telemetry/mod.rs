//! # Telemetry Module
//!
//! Periodic link statistics logging to JSONL files with rotation.
//!
//! This module handles:
//! - Snapshotting link state and statistics
//! - Formatting as JSONL (JSON Lines)
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;

pub use logger::{StatsLogger, StatsRecord};
