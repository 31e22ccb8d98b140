//! Control writes.

use qsync_core::{Controller, CoreError, Entity};

use crate::cli::{GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    controller: &Controller,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let components = controller.components().await?;
    if !components.iter().any(|c| c.name == args.component) {
        return Err(CoreError::ComponentNotFound {
            name: args.component,
        }
        .into());
    }

    let target = Entity {
        name: args.control,
        component_name: args.component,
        ..Entity::default()
    };
    let writer = controller.writer().await?;

    let written = match (args.value, args.position) {
        (Some(value), _) => {
            writer.try_set_value(&target, value).await?;
            format!("value {value}")
        }
        (None, Some(position)) => {
            if !(0.0..=1.0).contains(&position) {
                return Err(CliError::Validation {
                    field: "position".into(),
                    reason: format!("{position} is outside 0.0 - 1.0"),
                });
            }
            writer.try_set_position(&target, position).await?;
            format!("position {position}")
        }
        (None, None) => {
            return Err(CliError::Validation {
                field: "set".into(),
                reason: "give --value or --position".into(),
            });
        }
    };

    let color = output::should_color(&global.color);
    output::print_output(
        &format!(
            "{} {}",
            output::muted("set", color),
            output::accent(&format!("{} -> {written}", target.key()), color)
        ),
        global.quiet,
    );
    Ok(())
}
