// ── Entity ──

use serde::{Deserialize, Serialize};

use super::EntityKey;
use qsync_api::{Control, ControlUpdate};

/// A single named control, stamped with the component that owns it.
///
/// `value`, `position` and `string` are independently optional; an
/// entity may carry any subset of them. `position` is normalized to
/// `0..=1` by the device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub component_name: String,
    pub control_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

impl Entity {
    /// Convert a fetched control, stamping its owning component.
    pub fn from_control(component: &str, control: Control) -> Self {
        Self {
            name: control.name,
            component_name: component.to_owned(),
            control_type: control.control_type,
            value: control.value,
            position: control.position,
            string: control.string,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.component_name.clone(), self.name.clone())
    }

    /// Entities without a name cannot be addressed and never enter a view.
    pub fn is_admissible(&self) -> bool {
        !self.name.is_empty()
    }

    /// Whether this entity is the target of `update`.
    pub fn matches(&self, update: &ControlUpdate) -> bool {
        self.component_name == update.component && self.name == update.control
    }

    /// Copy every field present in `update`. Returns `true` if anything
    /// was copied.
    pub fn apply(&mut self, update: &ControlUpdate) -> bool {
        let mut touched = false;
        if let Some(value) = update.value {
            self.value = Some(value);
            touched = true;
        }
        if let Some(position) = update.position {
            self.position = Some(position);
            touched = true;
        }
        if let Some(ref string) = update.string {
            self.string = Some(string.clone());
            touched = true;
        }
        touched
    }
}
