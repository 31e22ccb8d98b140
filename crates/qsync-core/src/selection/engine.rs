// ── Selection engine ──
//
// Resolves an ordered list of directives into a deduplicated entity list.
// One `component_controls` call per matched component; a component that
// fails to load is logged and skipped, never aborting the run.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use qsync_api::{ComponentDirectory, ComponentInfo, Control, ControlGateway};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::dedup::dedup;
use super::directive::{ExplicitComponent, SelectionDirective};
use crate::error::CoreError;
use crate::model::Entity;

/// Per-view hook run on the deduplicated result of every resolve.
///
/// The output is deduplicated again, so a processor that adds entities
/// cannot reintroduce duplicates or unnamed controls.
pub trait EntityPostProcessor: Send + Sync {
    fn process(&self, entities: Vec<Entity>) -> Vec<Entity>;
}

impl<F> EntityPostProcessor for F
where
    F: Fn(Vec<Entity>) -> Vec<Entity> + Send + Sync,
{
    fn process(&self, entities: Vec<Entity>) -> Vec<Entity> {
        self(entities)
    }
}

/// Which controls of a fetched component are kept.
#[derive(Clone)]
enum ControlFilter {
    All,
    NamePattern(Regex),
    Type(String),
    Named(Vec<String>),
}

impl ControlFilter {
    fn accepts(&self, control: &Control) -> bool {
        match self {
            Self::All => true,
            Self::NamePattern(re) => re.is_match(&control.name),
            Self::Type(control_type) => control.control_type == *control_type,
            Self::Named(names) => names.iter().any(|n| *n == control.name),
        }
    }
}

/// Components to fetch for one directive, in match order.
type FetchPlan = Vec<(String, ControlFilter)>;

/// Stateless resolver shared by every view of a controller.
#[derive(Clone)]
pub struct SelectionEngine {
    gateway: Arc<dyn ControlGateway>,
    directory: Arc<dyn ComponentDirectory>,
    post_processor: Option<Arc<dyn EntityPostProcessor>>,
    fetch_concurrency: usize,
}

impl SelectionEngine {
    pub fn new(gateway: Arc<dyn ControlGateway>, directory: Arc<dyn ComponentDirectory>) -> Self {
        Self {
            gateway,
            directory,
            post_processor: None,
            fetch_concurrency: 1,
        }
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn EntityPostProcessor>) -> Self {
        self.post_processor = Some(processor);
        self
    }

    /// Allow up to `limit` component fetches in flight within one
    /// directive. Results are still appended in component match order.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }

    /// Resolve `directives` in order.
    ///
    /// The only error is a directory that cannot produce its component
    /// list. Everything else (failed fetches, bad patterns, unknown
    /// directives) is logged and contributes nothing.
    pub async fn resolve(&self, directives: &[SelectionDirective]) -> Result<Vec<Entity>, CoreError> {
        let components = self
            .directory
            .components()
            .map_err(|e| CoreError::DirectoryUnavailable {
                message: e.to_string(),
            })?;

        let mut accumulated = Vec::new();
        for (index, directive) in directives.iter().enumerate() {
            let before = accumulated.len();
            if let Some(plan) = plan_directive(directive, &components) {
                self.fetch_into(plan, &mut accumulated).await;
            }
            debug!(
                index,
                kind = directive.kind(),
                added = accumulated.len() - before,
                "directive resolved"
            );
        }

        let mut entities = dedup(accumulated);
        if let Some(ref processor) = self.post_processor {
            entities = dedup(processor.process(entities));
        }
        Ok(entities)
    }

    async fn fetch_into(&self, plan: FetchPlan, out: &mut Vec<Entity>) {
        let gateway = &self.gateway;
        let mut fetched = stream::iter(plan)
            .map(|(component, filter)| async move {
                let result = gateway.component_controls(&component).await;
                (component, filter, result)
            })
            .buffered(self.fetch_concurrency);

        while let Some((component, filter, result)) = fetched.next().await {
            match result {
                Ok(controls) => out.extend(
                    controls
                        .into_iter()
                        .filter(|c| filter.accepts(c))
                        .map(|c| Entity::from_control(&component, c)),
                ),
                Err(e) => {
                    warn!(component = %component, error = %e, "failed to load controls, skipping component");
                }
            }
        }
    }
}

// ── Planning ─────────────────────────────────────────────────────────

fn plan_directive(directive: &SelectionDirective, components: &[ComponentInfo]) -> Option<FetchPlan> {
    match directive {
        SelectionDirective::ComponentPattern {
            component_pattern,
            control_pattern,
        } => {
            let component_re = compile(component_pattern)?;
            let filter = match control_pattern {
                Some(p) => ControlFilter::NamePattern(compile(p)?),
                None => ControlFilter::All,
            };
            Some(
                components
                    .iter()
                    .filter(|c| component_re.is_match(&c.name))
                    .map(|c| (c.name.clone(), filter.clone()))
                    .collect(),
            )
        }
        SelectionDirective::ControlType { control_type } => Some(
            components
                .iter()
                .map(|c| (c.name.clone(), ControlFilter::Type(control_type.clone())))
                .collect(),
        ),
        SelectionDirective::ComponentType { component_type } => Some(
            components
                .iter()
                .filter(|c| c.component_type == *component_type)
                .map(|c| (c.name.clone(), ControlFilter::All))
                .collect(),
        ),
        SelectionDirective::ExplicitList { components: wanted } => {
            Some(wanted.iter().map(|entry| plan_explicit(entry, components)).collect())
        }
        SelectionDirective::Unknown(raw) => {
            warn!(directive = %raw, "unknown selection directive, ignoring");
            None
        }
    }
}

fn plan_explicit(entry: &ExplicitComponent, components: &[ComponentInfo]) -> (String, ControlFilter) {
    if !components.iter().any(|c| c.name == entry.component) {
        debug!(component = %entry.component, "explicit component not in directory, fetching anyway");
    }
    let filter = match entry.controls {
        Some(ref names) => ControlFilter::Named(names.clone()),
        None => ControlFilter::All,
    };
    (entry.component.clone(), filter)
}

/// Case-insensitive, unanchored pattern. Invalid patterns are logged.
fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "invalid selection pattern, ignoring directive");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directory() -> Vec<ComponentInfo> {
        vec![
            ComponentInfo::new("MainLight", "dimmer"),
            ComponentInfo::new("Lobby", "gain"),
            ComponentInfo::new("StageLight", "dimmer"),
        ]
    }

    fn planned(directive: &SelectionDirective) -> Vec<String> {
        plan_directive(directive, &directory())
            .unwrap_or_default()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    #[test]
    fn pattern_is_case_insensitive_search() {
        assert_eq!(
            planned(&SelectionDirective::component_pattern(".*light.*")),
            vec!["MainLight", "StageLight"]
        );
        assert_eq!(
            planned(&SelectionDirective::component_pattern("LOB")),
            vec!["Lobby"]
        );
    }

    #[test]
    fn invalid_pattern_plans_nothing() {
        assert!(plan_directive(&SelectionDirective::component_pattern("(unclosed"), &directory()).is_none());
        assert!(
            plan_directive(
                &SelectionDirective::component_and_control_pattern(".*", "[z-a]"),
                &directory()
            )
            .is_none()
        );
    }

    #[test]
    fn component_type_matches_exactly() {
        assert_eq!(
            planned(&SelectionDirective::component_type("dimmer")),
            vec!["MainLight", "StageLight"]
        );
        assert!(planned(&SelectionDirective::component_type("Dimmer")).is_empty());
    }

    #[test]
    fn control_type_scans_every_component() {
        assert_eq!(
            planned(&SelectionDirective::control_type("Boolean")),
            vec!["MainLight", "Lobby", "StageLight"]
        );
    }

    #[test]
    fn explicit_list_keeps_unlisted_components() {
        let directive = SelectionDirective::explicit(vec![
            ExplicitComponent::all("Ghost"),
            ExplicitComponent::only("Lobby", ["gain"]),
        ]);
        assert_eq!(planned(&directive), vec!["Ghost", "Lobby"]);
    }

    #[test]
    fn unknown_directive_plans_nothing() {
        let directive = SelectionDirective::Unknown(serde_json::json!({"tag": "x"}));
        assert!(plan_directive(&directive, &directory()).is_none());
    }

    #[test]
    fn filters_accept_expected_controls() {
        let control = Control {
            name: "Level_1".into(),
            control_type: "Float".into(),
            ..Control::default()
        };

        assert!(ControlFilter::All.accepts(&control));
        assert!(ControlFilter::NamePattern(compile("^level").unwrap()).accepts(&control));
        assert!(ControlFilter::Type("Float".into()).accepts(&control));
        assert!(!ControlFilter::Type("float".into()).accepts(&control));
        assert!(ControlFilter::Named(vec!["Level_1".into()]).accepts(&control));
        assert!(!ControlFilter::Named(vec!["level_1".into()]).accepts(&control));
    }
}
