/*!
 * Guard Traits
 *
 * Core abstractions for RAII resource guards
 */

use super::{GuardMetadata, GuardResult};

/// Core guard trait
///
/// All guards provide:
/// - Resource type identification
/// - Metadata access
/// - Manual release capability
pub trait Guard: Send {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    fn metadata(&self) -> &GuardMetadata;

    /// Check if guard still holds its resource
    fn is_active(&self) -> bool;

    /// Manually release the resource
    ///
    /// Returns `Err` if already released
    fn release(&mut self) -> GuardResult<()>;
}

/// Guards that can be dropped with custom cleanup
pub trait GuardDrop: Guard {
    /// Perform cleanup on drop
    ///
    /// # Panics
    ///
    /// Should NOT panic. Log errors instead.
    fn on_drop(&mut self);
}
