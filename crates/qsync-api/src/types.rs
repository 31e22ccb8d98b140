// ── Wire-level data types ──
//
// Field names follow the core's PascalCase JSON. These are transport DTOs;
// `qsync-core` converts them into its own domain types.

use serde::{Deserialize, Serialize};

/// One entry of the component directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentInfo {
    pub name: String,
    #[serde(rename = "Type", default)]
    pub component_type: String,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
        }
    }
}

/// A control as returned by `Component.GetControls`.
///
/// The owning component is not part of the payload; callers stamp it.
/// A missing `Name` deserializes to an empty string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Control {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub control_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

/// A partial change notification for one control.
///
/// Every property is independently optional: `None` means unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlUpdate {
    pub component: String,
    #[serde(rename = "Name")]
    pub control: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

impl ControlUpdate {
    pub fn new(component: impl Into<String>, control: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            control: control.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_string(mut self, string: impl Into<String>) -> Self {
        self.string = Some(string.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_deserializes_from_wire_shape() {
        let json = r#"{
            "Name": "gain",
            "Type": "Float",
            "Value": -12.5,
            "ValueMin": -100.0,
            "ValueMax": 20.0,
            "String": "-12.5dB",
            "Position": 0.69,
            "Direction": "Read/Write"
        }"#;

        let control: Control = serde_json::from_str(json).unwrap();
        assert_eq!(control.name, "gain");
        assert_eq!(control.control_type, "Float");
        assert_eq!(control.value, Some(-12.5));
        assert_eq!(control.position, Some(0.69));
        assert_eq!(control.string.as_deref(), Some("-12.5dB"));
    }

    #[test]
    fn control_without_name_defaults_to_empty() {
        let control: Control = serde_json::from_str(r#"{"Type": "Boolean"}"#).unwrap();
        assert!(control.name.is_empty());
        assert_eq!(control.value, None);
    }

    #[test]
    fn update_keeps_absent_fields_as_none() {
        let update: ControlUpdate =
            serde_json::from_str(r#"{"Component": "Lobby", "Name": "mute", "Value": 1}"#).unwrap();
        assert_eq!(update, ControlUpdate::new("Lobby", "mute").with_value(1.0));
        assert_eq!(update.position, None);
        assert_eq!(update.string, None);
    }

    #[test]
    fn component_info_ignores_properties() {
        let info: ComponentInfo = serde_json::from_str(
            r#"{"Name": "MainLight", "Type": "dimmer", "Properties": [{"Name": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(info, ComponentInfo::new("MainLight", "dimmer"));
    }
}
