// ── Selection directives ──
//
// Declarative rules describing which controls belong to a view. Parsed
// from configuration (TOML or JSON); both `snake_case` and `camelCase`
// field names are accepted.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// One rule of a view's selection.
///
/// Variants are distinguished by which fields are present. Shapes that
/// match none of the known variants land in [`Unknown`](Self::Unknown)
/// and contribute nothing at resolve time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(untagged)]
#[strum(serialize_all = "snake_case")]
pub enum SelectionDirective {
    /// Match components by name, optionally filtering their controls by name.
    ComponentPattern {
        #[serde(alias = "componentPattern")]
        component_pattern: String,
        #[serde(
            default,
            alias = "controlPattern",
            skip_serializing_if = "Option::is_none"
        )]
        control_pattern: Option<String>,
    },
    /// Every control of any component whose type equals `control_type`.
    ControlType {
        #[serde(alias = "controlType")]
        control_type: String,
    },
    /// Every control of components whose declared type equals `component_type`.
    ComponentType {
        #[serde(alias = "componentType")]
        component_type: String,
    },
    /// Named components, with all or a named subset of their controls.
    ExplicitList { components: Vec<ExplicitComponent> },
    /// Anything else. Kept verbatim for diagnostics.
    Unknown(serde_json::Value),
}

impl SelectionDirective {
    pub fn component_pattern(pattern: impl Into<String>) -> Self {
        Self::ComponentPattern {
            component_pattern: pattern.into(),
            control_pattern: None,
        }
    }

    pub fn component_and_control_pattern(
        component: impl Into<String>,
        control: impl Into<String>,
    ) -> Self {
        Self::ComponentPattern {
            component_pattern: component.into(),
            control_pattern: Some(control.into()),
        }
    }

    pub fn control_type(control_type: impl Into<String>) -> Self {
        Self::ControlType {
            control_type: control_type.into(),
        }
    }

    pub fn component_type(component_type: impl Into<String>) -> Self {
        Self::ComponentType {
            component_type: component_type.into(),
        }
    }

    pub fn explicit(components: Vec<ExplicitComponent>) -> Self {
        Self::ExplicitList { components }
    }

    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// One entry of an [`ExplicitList`](SelectionDirective::ExplicitList).
///
/// `controls: None` selects every control of the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitComponent {
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<String>>,
}

impl ExplicitComponent {
    pub fn all(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            controls: None,
        }
    }

    pub fn only<I, S>(component: impl Into<String>, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            component: component.into(),
            controls: Some(controls.into_iter().map(Into::into).collect()),
        }
    }
}
