//! Seams between the synchronization core and whatever talks to the device.
//!
//! [`ControlGateway`] covers discovery, writes, the push-update stream and
//! the connectivity signal. [`ComponentDirectory`] is the cached list of
//! components used for matching. [`QrcClient`](crate::QrcClient) implements
//! both; tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::Error;
use crate::types::{ComponentInfo, Control, ControlUpdate};

/// Remote control gateway consumed by the core.
#[async_trait]
pub trait ControlGateway: Send + Sync {
    /// Fetch every control of one component.
    async fn component_controls(&self, component: &str) -> Result<Vec<Control>, Error>;

    /// Subscribe to the push-update stream.
    ///
    /// Multicast and non-replaying: updates sent before the subscription
    /// are never delivered to it.
    fn control_updates(&self) -> broadcast::Receiver<Arc<ControlUpdate>>;

    /// Set a control's value.
    async fn set_control(&self, component: &str, control: &str, value: f64)
    -> Result<(), Error>;

    /// Set a control's normalized position (0..1).
    async fn set_control_position(
        &self,
        component: &str,
        control: &str,
        position: f64,
    ) -> Result<(), Error>;

    /// Subscribe to connectivity changes.
    fn connection_status(&self) -> watch::Receiver<bool>;

    /// Point-in-time connectivity.
    fn is_connected(&self) -> bool {
        *self.connection_status().borrow()
    }
}

/// Cached snapshot of the device's components.
///
/// Keeping the snapshot fresh is the implementor's job; readers never
/// trigger a fetch.
pub trait ComponentDirectory: Send + Sync {
    fn components(&self) -> Result<Arc<Vec<ComponentInfo>>, Error>;
}

/// A fixed directory, handy for tests and offline tooling.
impl ComponentDirectory for Vec<ComponentInfo> {
    fn components(&self) -> Result<Arc<Vec<ComponentInfo>>, Error> {
        Ok(Arc::new(self.clone()))
    }
}
