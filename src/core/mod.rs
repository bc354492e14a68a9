/*!
 * Core Module
 * Fundamental arbiter types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod id;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use config::{ArbiterConfig, TrustPolicy};
pub use errors::*;
pub use guard::{Guard, GuardDrop, GuardError, GuardMetadata, GuardResult, ResourceGuard};
pub use id::{ArbiterId, GroupId, IntervalId};
pub use types::*;
