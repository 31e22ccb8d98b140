// ── Selection ──
//
// Directive types, the resolver that fans out to the gateway, and the
// first-wins deduplication pass applied to every result.

mod dedup;
mod directive;
mod engine;

pub use dedup::dedup;
pub use directive::{ExplicitComponent, SelectionDirective};
pub use engine::{EntityPostProcessor, SelectionEngine};
