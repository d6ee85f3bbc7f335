//! # Brandvakt Engine
//!
//! Composes threat intelligence, anomaly detection and static rules into one verdict per
//! packet, and runs the packet path: a bounded queue drained by a fixed worker pool,
//! with the threat-intel refresh task alongside.
//!
//! Every failure inside the packet path degrades to `ACCEPT`; only configuration errors
//! surface from [`Firewall::from_config`].

pub mod counters;
pub mod error;
pub mod firewall;
pub mod pipeline;

pub use counters::{CounterSnapshot, PipelineCounters};
pub use error::EngineError;
pub use firewall::{Firewall, RunSummary};
pub use pipeline::DecisionPipeline;
