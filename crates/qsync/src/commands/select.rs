//! Ad-hoc single-directive selection.

use qsync_core::{Controller, SelectionDirective, ViewConfig};

use crate::cli::{GlobalOpts, SelectArgs};
use crate::error::CliError;

use super::util;

fn directive(args: SelectArgs) -> Result<SelectionDirective, CliError> {
    match (
        args.component_pattern,
        args.control_pattern,
        args.control_type,
        args.component_type,
    ) {
        (Some(component), Some(control), None, None) => Ok(
            SelectionDirective::component_and_control_pattern(component, control),
        ),
        (Some(component), None, None, None) => Ok(SelectionDirective::component_pattern(component)),
        (None, None, Some(control_type), None) => Ok(SelectionDirective::control_type(control_type)),
        (None, None, None, Some(component_type)) => {
            Ok(SelectionDirective::component_type(component_type))
        }
        _ => Err(CliError::Validation {
            field: "select".into(),
            reason: "give exactly one of --component-pattern, --control-type, --component-type"
                .into(),
        }),
    }
}

pub async fn handle(
    controller: &Controller,
    args: SelectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let directive = directive(args)?;
    tracing::debug!(kind = directive.kind(), "ad-hoc selection");

    let handle = controller
        .open_view(ViewConfig::new("select", vec![directive]))
        .await?;
    let result = util::print_resolved(&handle, global).await;
    handle.shutdown().await;
    result
}
