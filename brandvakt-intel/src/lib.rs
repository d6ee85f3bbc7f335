//! # Brandvakt Threat Intelligence
//!
//! A concurrently-read set of known-malicious source addresses, periodically rebuilt from
//! external feeds and editable by hand.
//!
//! ### Key Submodules:
//! - `feeds`: `FeedSource` seam and the HTTP feed with its body parsers
//! - `cache`: live set, atomic swap on refresh, manual add/remove
//! - `scheduler`: cancellable timer task driving `refresh_if_due`

pub mod cache;
pub mod feeds;
pub mod scheduler;
pub mod snapshot;

pub use cache::{RefreshError, RefreshReport, ThreatIntelCache};
pub use feeds::{feeds_from_config, FeedError, FeedSource, HttpFeed};
pub use scheduler::{RefreshHandle, RefreshScheduler};
pub use snapshot::ThreatIntelSnapshot;
