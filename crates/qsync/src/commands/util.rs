//! Entity rendering shared by `view` and `select`.

use std::sync::Arc;

use tabled::Tabled;

use qsync_core::{Entity, ViewHandle};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct EntityRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Control")]
    control: String,
    #[tabled(rename = "Type")]
    control_type: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "String")]
    string: String,
}

impl From<&Arc<Entity>> for EntityRow {
    fn from(e: &Arc<Entity>) -> Self {
        Self {
            component: e.component_name.clone(),
            control: e.name.clone(),
            control_type: e.control_type.clone(),
            value: e.value.map_or_else(|| "-".into(), |v| format!("{v}")),
            position: e.position.map_or_else(|| "-".into(), |p| format!("{p:.3}")),
            string: e.string.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub fn entity_id(e: &Arc<Entity>) -> String {
    e.key().to_string()
}

/// Wait for the view's first load, then print its entities.
pub async fn print_resolved(handle: &ViewHandle, global: &GlobalOpts) -> Result<(), CliError> {
    let count = handle.wait_until_settled().await?;
    tracing::info!(view = %handle.name(), entities = count, "view resolved");

    let snap = handle.snapshot();
    let out = output::render_list(
        &global.output,
        snap.as_slice(),
        |e| EntityRow::from(e),
        entity_id,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// One-line rendering of a changed entity for `--watch`.
pub fn change_line(e: &Entity, color: bool) -> String {
    let reading = e
        .string
        .clone()
        .or_else(|| e.value.map(|v| format!("{v}")))
        .unwrap_or_else(|| "-".into());
    let position = e
        .position
        .map(|p| format!(" {}", output::muted(&format!("({p:.3})"), color)))
        .unwrap_or_default();
    format!(
        "{} = {reading}{position}",
        output::accent(&e.key().to_string(), color)
    )
}
