//! Control selection and live synchronization on top of `qsync-api`.
//!
//! - **[`SelectionEngine`]** resolves an ordered list of
//!   [`SelectionDirective`]s into a deduplicated entity list, fanning out
//!   one `component_controls` call per matched component. A component
//!   that fails to load is logged and skipped.
//!
//! - **[`SnapshotStore`]** holds a view's entities and publishes a new
//!   `Arc` snapshot on every mutation. [`EntityStream`] is the
//!   subscription handle it vends.
//!
//! - **[`merger`]** patches the store from the gateway's push stream;
//!   updates for controls outside the view are dropped.
//!
//! - **[`ControlWriter`]** routes value/position writes to the device
//!   without touching local state.
//!
//! - **[`ViewController`]** / **[`ViewHandle`]** drive a view through
//!   `Idle -> WaitingForConnection -> Loading -> Ready` and release
//!   everything on disposal.
//!
//! - **[`Controller`]** owns the session with one core and opens views
//!   bound to it.

pub mod config;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod merger;
pub mod model;
pub mod selection;
pub mod store;
pub mod stream;
pub mod writer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, ViewConfig};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use lifecycle::{LifecycleState, ViewController, ViewHandle};
pub use model::{Entity, EntityKey};
pub use selection::{EntityPostProcessor, ExplicitComponent, SelectionDirective, SelectionEngine};
pub use store::SnapshotStore;
pub use stream::{EntityStream, Snapshot};
pub use writer::ControlWriter;
