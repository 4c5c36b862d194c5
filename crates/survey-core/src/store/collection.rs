// ── Reactive entity collection ──
//
// Ordered, copy-on-write storage for one entity type. Every mutation
// builds a new `Vec<Arc<T>>` inside `watch::Sender::send_modify`, so a
// reader sees either the previous snapshot or the next one, never an
// intermediate state.

use std::sync::Arc;

use tokio::sync::watch;

/// Snapshot type handed to readers.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A reactive, ordered collection for a single entity type.
///
/// Concurrent writers are last-write-wins: each mutation applies to
/// whatever snapshot is current when it runs.
pub struct EntityCollection<T: Send + Sync + 'static> {
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// First entity matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        self.snapshot.borrow().iter().find(|e| pred(e)).cloned()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole collection.
    pub fn replace_all(&self, items: Vec<T>) {
        let next: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        self.snapshot.send_replace(Arc::new(next));
    }

    /// Append one entity at the end, returning the stored handle.
    pub fn append(&self, item: T) -> Arc<T> {
        let item = Arc::new(item);
        self.snapshot.send_modify(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&item));
            *current = Arc::new(next);
        });
        item
    }

    /// Replace every entity matching `pred` with `item`. Returns `false`
    /// (and notifies nobody) when nothing matched.
    pub fn replace_where(&self, pred: impl Fn(&T) -> bool, item: Arc<T>) -> bool {
        self.snapshot.send_if_modified(|current| {
            if !current.iter().any(|e| pred(e)) {
                return false;
            }
            let next: Vec<Arc<T>> = current
                .iter()
                .map(|e| {
                    if pred(e) {
                        Arc::clone(&item)
                    } else {
                        Arc::clone(e)
                    }
                })
                .collect();
            *current = Arc::new(next);
            true
        })
    }

    /// Merge `items` into the collection, then look up `pred` in the
    /// result, as one step. An item whose identity (`same`) is already
    /// present replaces that entry in place; the rest are appended in
    /// order. No reader can observe the merged list before the lookup
    /// result is known.
    pub fn merge_and_find(
        &self,
        items: Vec<T>,
        same: impl Fn(&T, &T) -> bool,
        pred: impl Fn(&T) -> bool,
    ) -> Option<Arc<T>> {
        let mut found = None;
        self.snapshot.send_modify(|current| {
            let next = merged(current, items, &same);
            found = next.iter().find(|e| pred(e)).cloned();
            *current = Arc::new(next);
        });
        found
    }

    /// Remove all entities.
    pub fn clear(&self) {
        self.snapshot.send_if_modified(|current| {
            if current.is_empty() {
                return false;
            }
            *current = Arc::new(Vec::new());
            true
        });
    }
}

fn merged<T>(current: &[Arc<T>], items: Vec<T>, same: impl Fn(&T, &T) -> bool) -> Vec<Arc<T>> {
    let mut next = current.to_vec();
    for item in items {
        match next.iter().position(|e| same(e, &item)) {
            Some(at) => next[at] = Arc::new(item),
            None => next.push(Arc::new(item)),
        }
    }
    next
}
