/*!
 * Resource Guards
 *
 * RAII guard that releases a reserved interval when it goes out of scope
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::rman::Resource;

/// Scoped interval reservation with automatic release
///
/// # Example
///
/// ```ignore
/// let guard = ResourceGuard::new(arbiter.reserve(request)?);
/// if let Some(resource) = guard.resource() {
///     resource.activate()?;
/// }
/// // Released on drop
/// ```
pub struct ResourceGuard {
    resource: Option<Resource>,
    metadata: GuardMetadata,
}

impl ResourceGuard {
    pub fn new(resource: Resource) -> Self {
        let metadata = GuardMetadata::new("interval")
            .with_owner(resource.owner().ok().flatten())
            .with_size(resource.size());
        Self {
            resource: Some(resource),
            metadata,
        }
    }

    /// Release now, reporting any failure instead of logging it
    pub fn release_early(mut self) -> GuardResult<()> {
        self.release()
    }

    /// Guarded handle; `None` once released
    #[inline]
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Give up the guard and keep the reservation
    ///
    /// `None` if the guard already released it.
    pub fn into_inner(mut self) -> Option<Resource> {
        self.resource.take()
    }
}

impl Guard for ResourceGuard {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.resource.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let resource = self.resource.take().ok_or(GuardError::AlreadyReleased)?;
        resource
            .release()
            .map_err(|e| GuardError::OperationFailed(e.to_string()))
    }
}

impl GuardDrop for ResourceGuard {
    fn on_drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };
        let description = resource.to_string();
        if let Err(e) = resource.release() {
            log::error!(
                "Resource guard drop failed for {} after {}us: {}",
                description,
                self.metadata.lifetime_micros(),
                e
            );
        }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.on_drop();
    }
}
