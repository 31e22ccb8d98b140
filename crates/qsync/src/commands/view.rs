//! Configured view: one-shot resolve, or `--watch` for live changes.

use std::sync::Arc;

use qsync_core::{Controller, Entity, Snapshot, ViewConfig};

use crate::cli::{GlobalOpts, OutputFormat, ViewArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    controller: &Controller,
    config: ViewConfig,
    args: ViewArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let handle = controller.open_view(config).await?;

    let result = async {
        util::print_resolved(&handle, global).await?;
        if args.watch {
            watch(&handle, global).await?;
        }
        Ok::<(), CliError>(())
    }
    .await;

    handle.shutdown().await;
    result
}

/// Print entities as they change until Ctrl-C.
async fn watch(handle: &qsync_core::ViewHandle, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut stream = handle.subscribe();
    let mut previous = stream.latest();

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::debug!(view = %handle.name(), "interrupted");
                return Ok(());
            }
            next = stream.changed() => {
                let Some(snap) = next else {
                    return Err(CliError::Disconnected);
                };
                for entity in changed_entities(&previous, &snap) {
                    let line = render_change(entity, &global.output, color)?;
                    output::print_output(&line, global.quiet);
                }
                previous = snap;
            }
        }
    }
}

/// Entries of `next` not shared with `prev` at the same position.
///
/// Merged updates swap in a fresh `Arc` for the touched entity only, so
/// pointer identity is enough to find what moved.
fn changed_entities<'a>(prev: &Snapshot, next: &'a Snapshot) -> Vec<&'a Entity> {
    next.iter()
        .enumerate()
        .filter(|(i, e)| prev.get(*i).is_none_or(|p| !Arc::ptr_eq(p, e)))
        .map(|(_, e)| e.as_ref())
        .collect()
}

fn render_change(entity: &Entity, format: &OutputFormat, color: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(util::change_line(entity, color)),
        // One document per change keeps the stream line-delimited.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_single(&OutputFormat::JsonCompact, entity, |_| String::new(), |_| {
                String::new()
            })
        }
    }
}
