// ── Participant registry ──
//
// The set of providers a reload is waiting on, and the handles through
// which they leave it.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::coordinator::ReloadCoordinator;

/// Opaque identifier of one reload participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(Arc<str>);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// ── ParticipantSet ──────────────────────────────────────────────────

/// Set of participants with an outstanding refetch.
///
/// Each entry remembers the reload epoch it is waiting for. A completion
/// only clears an entry when it was registered at that epoch or later, so
/// a fetch that started before a reload cannot finish it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSet {
    pending: BTreeMap<ParticipantId, u64>,
}

impl ParticipantSet {
    /// Add `id` waiting for `epoch` unless it is already pending.
    /// Returns `true` if the id was not already pending.
    pub fn insert(&mut self, id: ParticipantId, epoch: u64) -> bool {
        match self.pending.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(epoch);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Make `id` wait for `epoch`, replacing whatever it waited for.
    pub fn require(&mut self, id: ParticipantId, epoch: u64) {
        self.pending.insert(id, epoch);
    }

    /// Clear `id` for a completion registered at `epoch`.
    /// Returns `true` if the id was pending and is now gone.
    pub fn remove(&mut self, id: &ParticipantId, epoch: u64) -> bool {
        match self.pending.get(id) {
            Some(&waiting_for) if epoch >= waiting_for => {
                self.pending.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Pending ids in sorted order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.pending.keys().cloned().collect()
    }

    /// Empty the set, returning what was pending.
    pub fn take(&mut self) -> Vec<ParticipantId> {
        std::mem::take(&mut self.pending).into_keys().collect()
    }
}

// ── CompletionHandle ────────────────────────────────────────────────

/// Proof of one registration. Must be consumed with
/// [`report_done`](Self::report_done), on success and on failure alike.
///
/// Dropping an unreported handle is a participant bug: the id stays
/// pending and the reload stalls until the watchdog reports it or the
/// reload is abandoned.
#[must_use = "a registration must be completed with report_done()"]
pub struct CompletionHandle {
    coordinator: ReloadCoordinator,
    id: ParticipantId,
    epoch: u64,
    reported: bool,
}

impl CompletionHandle {
    pub(super) fn new(coordinator: ReloadCoordinator, id: ParticipantId, epoch: u64) -> Self {
        Self {
            coordinator,
            id,
            epoch,
            reported: false,
        }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Reload epoch current when this handle was registered.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Remove this participant from the pending set, unless a newer
    /// reload has started waiting on it since registration.
    pub fn report_done(mut self) {
        self.reported = true;
        self.coordinator.complete(&self.id, self.epoch);
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if !self.reported && self.coordinator.is_pending(&self.id) {
            warn!(
                participant = %self.id,
                "completion handle dropped without report_done; reload cannot finish"
            );
        }
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}

// ── Membership ──────────────────────────────────────────────────────

/// Lifetime registration of a participant.
///
/// Members are added to the pending set when a reload starts, before any
/// signal goes out. Leaving does not touch the pending set: a provider
/// that unmounts mid-reload still has to report completion.
pub struct Membership {
    coordinator: ReloadCoordinator,
    id: ParticipantId,
}

impl Membership {
    pub(super) fn new(coordinator: ReloadCoordinator, id: ParticipantId) -> Self {
        Self { coordinator, id }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.coordinator.leave(&self.id);
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Membership").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = ParticipantSet::default();
        assert!(set.insert("rooms".into(), 0));
        assert!(!set.insert("rooms".into(), 0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut set = ParticipantSet::default();
        set.insert("rooms".into(), 0);
        assert!(!set.remove(&"fixtures".into(), 0));
        assert_eq!(set.ids(), vec![ParticipantId::from("rooms")]);
    }

    #[test]
    fn older_completion_does_not_clear_newer_requirement() {
        let mut set = ParticipantSet::default();
        set.insert("rooms".into(), 0);
        set.require("rooms".into(), 1);

        assert!(!set.remove(&"rooms".into(), 0));
        assert!(set.contains(&"rooms".into()));
        assert!(set.remove(&"rooms".into(), 1));
        assert!(set.is_empty());
    }

    #[test]
    fn take_empties_the_set() {
        let mut set = ParticipantSet::default();
        set.insert("b".into(), 2);
        set.insert("a".into(), 2);
        let taken = set.take();
        assert_eq!(taken, vec![ParticipantId::from("a"), ParticipantId::from("b")]);
        assert!(set.is_empty());
    }
}
