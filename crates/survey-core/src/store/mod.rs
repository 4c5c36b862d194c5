// ── In-memory entity storage ──

mod collection;

pub use collection::{EntityCollection, Snapshot};
