// ── Snapshot store ──
//
// Per-view reactive storage. Every mutation publishes a new outer `Arc`
// so observers can detect change by pointer comparison alone.

mod snapshot_store;

pub use snapshot_store::SnapshotStore;
