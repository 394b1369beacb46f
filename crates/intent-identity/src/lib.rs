//! JWT-tiered validation, rate-limited logging, cross-process locking, and
//! the single-flight DID registration protocol.

pub mod error;
pub mod jwt;
pub mod lock_strategy;
pub mod manager;
pub mod rate_limited_log;

pub use error::IdentityError;
pub use jwt::{extract_org_id_from_api_key, verify_jwt_token, EnvTier};
pub use manager::IdentityManager;
pub use rate_limited_log::{RateLimitedLogger, SHARED};
