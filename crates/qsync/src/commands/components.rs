//! Component directory listing.

use tabled::Tabled;

use qsync_api::ComponentInfo;
use qsync_core::Controller;

use crate::cli::{ComponentsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    component_type: String,
}

impl From<&ComponentInfo> for ComponentRow {
    fn from(c: &ComponentInfo) -> Self {
        Self {
            name: c.name.clone(),
            component_type: c.component_type.clone(),
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: ComponentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let components = controller.components().await?;
    let listed: Vec<ComponentInfo> = components
        .iter()
        .filter(|c| {
            args.component_type
                .as_deref()
                .is_none_or(|t| c.component_type.eq_ignore_ascii_case(t))
        })
        .cloned()
        .collect();

    let out = output::render_list(
        &global.output,
        &listed,
        |c| ComponentRow::from(c),
        |c| c.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
