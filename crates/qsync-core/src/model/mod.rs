// ── Domain model ──
//
// Canonical types the rest of the core works with. Wire DTOs from
// `qsync-api` are converted here so nothing downstream depends on the
// transport's field naming.

mod entity;
mod key;

pub use entity::Entity;
pub use key::EntityKey;
