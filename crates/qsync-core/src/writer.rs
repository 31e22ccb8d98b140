// ── Write gateway ──
//
// Routes value/position writes for view entities to the device. Local
// state is never touched: the store changes only when the device echoes
// the write back through the live update stream.

use std::sync::Arc;

use qsync_api::ControlGateway;
use tracing::{debug, error, warn};

use crate::error::CoreError;
use crate::model::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Value,
    Position,
}

/// Writes for entities of any view.
#[derive(Clone)]
pub struct ControlWriter {
    gateway: Arc<dyn ControlGateway>,
}

impl ControlWriter {
    pub fn new(gateway: Arc<dyn ControlGateway>) -> Self {
        Self { gateway }
    }

    /// Set an entity's value. Failures are logged, never returned.
    pub async fn set_value(&self, entity: &Entity, value: f64) {
        if let Err(e) = self.try_set_value(entity, value).await {
            log_failure(entity, WriteKind::Value, &e);
        }
    }

    /// Set an entity's normalized position. Failures are logged, never
    /// returned.
    pub async fn set_position(&self, entity: &Entity, position: f64) {
        if let Err(e) = self.try_set_position(entity, position).await {
            log_failure(entity, WriteKind::Position, &e);
        }
    }

    pub async fn try_set_value(&self, entity: &Entity, value: f64) -> Result<(), CoreError> {
        validate(entity)?;
        debug!(component = %entity.component_name, control = %entity.name, value, "set value");
        self.gateway
            .set_control(&entity.component_name, &entity.name, value)
            .await
            .map_err(CoreError::from)
    }

    pub async fn try_set_position(&self, entity: &Entity, position: f64) -> Result<(), CoreError> {
        validate(entity)?;
        debug!(component = %entity.component_name, control = %entity.name, position, "set position");
        self.gateway
            .set_control_position(&entity.component_name, &entity.name, position)
            .await
            .map_err(CoreError::from)
    }
}

fn validate(entity: &Entity) -> Result<(), CoreError> {
    if entity.component_name.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("control '{}' has no component name", entity.name),
        });
    }
    Ok(())
}

fn log_failure(entity: &Entity, kind: WriteKind, err: &CoreError) {
    if matches!(err, CoreError::ValidationFailed { .. }) {
        error!(control = %entity.name, ?kind, error = %err, "write rejected");
    } else {
        warn!(
            component = %entity.component_name,
            control = %entity.name,
            ?kind,
            error = %err,
            "write failed"
        );
    }
}
