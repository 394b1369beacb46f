//! Re-exported here as this crate's public home for the rate-limited
//! logger; the implementation lives in `intent-types` so the Gateway
//! client can share the same suppression window without a dependency
//! cycle back onto this crate.

pub use intent_types::rate_limited_log::{RateLimitedLogger, SHARED};
