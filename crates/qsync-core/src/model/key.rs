// ── Entity identity ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a control inside one view: `(component_name, name)`.
///
/// Rendered as `component:name` for logs and tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub component: String,
    pub control: String,
}

impl EntityKey {
    pub fn new(component: impl Into<String>, control: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            control: control.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.control)
    }
}

impl From<&qsync_api::ControlUpdate> for EntityKey {
    fn from(update: &qsync_api::ControlUpdate) -> Self {
        Self::new(update.component.clone(), update.control.clone())
    }
}
