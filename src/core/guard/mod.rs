/*!
 * RAII Resource Guards
 *
 * Scoped ownership of reserved intervals with automatic release.
 *
 * ## Example
 *
 * ```rust
 * use interval_arbiter::core::guard::ResourceGuard;
 * use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
 *
 * let registry = Registry::new();
 * let irqs = registry.init("IRQs", DomainKind::Interval, 0, 15).unwrap();
 * irqs.seed(0, 15).unwrap();
 * {
 *     let line = ResourceGuard::new(irqs.reserve(ReserveRequest::at(4, 1)).unwrap());
 *     assert_eq!(line.resource().map(|r| r.start()), Some(4));
 *     // Released on drop
 * }
 * assert!(!irqs.has_allocations());
 * ```
 */

mod resource;
mod traits;

pub use resource::ResourceGuard;
pub use traits::{Guard, GuardDrop};

use crate::core::types::{OwnerId, Size};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub owner: Option<OwnerId>,
    pub size: Size,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            owner: None,
            size: 0,
        }
    }

    #[inline]
    pub fn with_owner(mut self, owner: Option<OwnerId>) -> Self {
        self.owner = owner;
        self
    }

    #[inline]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
