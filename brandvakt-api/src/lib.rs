//! # Brandvakt Management Services
//!
//! Transport-agnostic management operations over a running `Firewall`: status, rule
//! CRUD, threat-intel inspection and manual edits, detector retraining. Requests and
//! responses are serde types so any front end (CLI, REST, gRPC) can carry them.

pub mod error;
pub mod schema;
pub mod service;

pub use error::ApiError;
pub use schema::{
    DetectorStatusResponse, RuleResponse, StatusResponse, ThreatChange, ThreatsResponse,
};
pub use service::ManagementService;
