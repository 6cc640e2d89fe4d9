//! # Link Module
//!
//! Link health tracking and the role-oriented link facade.
//!
//! This module handles:
//! - Sequence gap and timeout based loss detection
//! - Failsafe hand-off on the aircraft side
//! - Link statistics and link quality
//! - Radio transport and clock abstractions

pub mod facade;
pub mod stats;
pub mod tracker;
pub mod transport;

pub use facade::{RcLink, Role, DEFAULT_FAILSAFE_COMMAND};
pub use stats::LinkStatistics;
pub use tracker::{LinkEvent, LinkTracker, LossReason, TrackerConfig};
pub use transport::{ChannelTransport, Clock, ManualClock, SystemClock, Transport};
