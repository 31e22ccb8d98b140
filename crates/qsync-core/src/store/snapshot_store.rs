use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Entity, EntityKey};
use crate::stream::EntityStream;
use qsync_api::ControlUpdate;

/// The current entity list of one view.
///
/// Two writers exist: a full replacement after each resolve and a field
/// patch per live update. Both run inside the `watch` channel's modify
/// lock, so a reload can never interleave with a half-applied patch.
pub struct SnapshotStore {
    entities: watch::Sender<Arc<Vec<Arc<Entity>>>>,
    /// Key -> position in the current snapshot. Only touched under the
    /// modify lock.
    index: DashMap<EntityKey, usize>,
    version: watch::Sender<u64>,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (entities, _) = watch::channel(Arc::new(Vec::new()));
        let (version, _) = watch::channel(0u64);
        let (last_full_refresh, _) = watch::channel(None);
        let (last_update, _) = watch::channel(None);

        Self {
            entities,
            index: DashMap::new(),
            version,
            last_full_refresh,
            last_update,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<Entity>>> {
        self.entities.borrow().clone()
    }

    pub fn subscribe(&self) -> EntityStream {
        EntityStream::new(self.entities.subscribe())
    }

    pub fn get(&self, key: &EntityKey) -> Option<Arc<Entity>> {
        let snapshot = self.entities.borrow();
        let position = *self.index.get(key)?;
        snapshot.get(position).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    /// Mutation counter, starting at 0.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    /// Time since the last full resolve.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_full_refresh().map(|t| Utc::now() - t)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the whole entity list with the result of a resolve.
    ///
    /// `entities` is expected to be deduplicated already; if a key still
    /// repeats, the index points at its first occurrence.
    pub fn replace_all(&self, entities: Vec<Entity>) {
        let next: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.entities.send_modify(|snapshot| {
            self.index.clear();
            for (position, entity) in next.iter().enumerate() {
                self.index.entry(entity.key()).or_insert(position);
            }
            *snapshot = Arc::new(next);
        });

        self.bump_version();
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }

    /// Patch the entity addressed by `update`.
    ///
    /// Returns `false` when no entity matches; the update is dropped.
    /// On a hit the entity is rebuilt with every present field copied
    /// and a new snapshot is published.
    pub fn apply_update(&self, update: &ControlUpdate) -> bool {
        let key = EntityKey::from(update);

        let hit = self.entities.send_if_modified(|snapshot| {
            let Some(position) = self.index.get(&key).map(|p| *p) else {
                return false;
            };
            let Some(current) = snapshot.get(position) else {
                return false;
            };

            let mut patched = Entity::clone(current);
            patched.apply(update);

            let mut next = Vec::clone(snapshot);
            if let Some(slot) = next.get_mut(position) {
                *slot = Arc::new(patched);
            }
            *snapshot = Arc::new(next);
            true
        });

        if hit {
            self.bump_version();
            self.last_update.send_replace(Some(Utc::now()));
        }
        hit
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
