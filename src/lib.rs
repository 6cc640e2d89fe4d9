//! # RC Link Library
//!
//! Compact command/telemetry link between a ground station and an aircraft
//! over fixed 32-byte radio frames.
//!
//! This library provides:
//! - A CRC-8 protected, versioned, sequenced frame format ([`protocol`])
//! - Link health tracking with failsafe substitution ([`link`])
//! - A serial bridge to a radio adapter ([`serial`])
//! - Configuration and JSONL link statistics logging

pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod serial;
pub mod telemetry;
