// ── Dataset switch coordinator ──
//
// Owns the reload flag, the participant set and the switch phase. All
// three live behind one mutex so that flag transitions, set mutations and
// the signals they trigger are observed in a single order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use survey_api::Backend;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::{CompletionHandle, Membership, ParticipantId, ParticipantSet};
use super::{ReloadSignal, SwitchPhase, watchdog};
use crate::error::CoreError;
use crate::notify::{NotificationChannel, NotificationKind};

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct ReloadState {
    /// Joined participants and how many live memberships each has.
    members: BTreeMap<ParticipantId, usize>,
    pending: ParticipantSet,
    need_reload: bool,
    epoch: u64,
    dataset: Option<String>,
    stall_reported: Option<u64>,
}

struct CoordinatorInner {
    state: Mutex<ReloadState>,
    phase: watch::Sender<SwitchPhase>,
    signals: broadcast::Sender<ReloadSignal>,
    notifications: NotificationChannel,
}

/// Shared handle to the reload protocol. Cloning is cheap.
#[derive(Clone)]
pub struct ReloadCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ReloadCoordinator {
    pub fn new(notifications: NotificationChannel) -> Self {
        let (phase, _) = watch::channel(SwitchPhase::Idle);
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(ReloadState::default()),
                phase,
                signals,
                notifications,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReloadState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Join as a participant for the lifetime of the returned guard.
    pub fn join(&self, id: impl Into<ParticipantId>) -> Membership {
        let id = id.into();
        *self.lock().members.entry(id.clone()).or_insert(0) += 1;
        debug!(participant = %id, "participant joined");
        Membership::new(self.clone(), id)
    }

    pub(super) fn leave(&self, id: &ParticipantId) {
        let mut st = self.lock();
        if let Some(count) = st.members.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                st.members.remove(id);
            }
        }
        debug!(participant = %id, "participant left");
    }

    /// Add `id` to the pending set. Registering an id that is already
    /// pending has no further effect; a fresh handle is returned either way.
    pub fn register(&self, id: impl Into<ParticipantId>) -> CompletionHandle {
        let id = id.into();
        let (added, epoch) = {
            let mut st = self.lock();
            let epoch = st.epoch;
            (st.pending.insert(id.clone(), epoch), epoch)
        };
        debug!(participant = %id, added, epoch, "participant registered");
        CompletionHandle::new(self.clone(), id, epoch)
    }

    pub(super) fn complete(&self, id: &ParticipantId, epoch: u64) {
        let mut st = self.lock();
        let removed = st.pending.remove(id, epoch);
        debug!(participant = %id, epoch, removed, remaining = st.pending.len(), "participant done");
        self.finish_if_drained(&mut st);
    }

    pub(super) fn is_pending(&self, id: &ParticipantId) -> bool {
        self.lock().pending.contains(id)
    }

    // ── Reload flag ──────────────────────────────────────────────────

    /// Start a reload without a backend call (e.g. the backend already
    /// switched its active building). Returns the reload epoch.
    pub fn signal_reload(&self) -> u64 {
        let mut st = self.lock();
        self.start_reload(&mut st)
    }

    /// Seed the pending set with every member, raise the flag, then
    /// signal. Members are pending before any of them can react.
    fn start_reload(&self, st: &mut ReloadState) -> u64 {
        st.need_reload = true;
        st.epoch += 1;
        let members: Vec<ParticipantId> = st.members.keys().cloned().collect();
        for id in members {
            st.pending.require(id, st.epoch);
        }
        self.inner.phase.send_if_modified(|phase| {
            if phase.is_idle() {
                *phase = SwitchPhase::Reloading;
                true
            } else {
                false
            }
        });

        let epoch = st.epoch;
        info!(epoch, pending = st.pending.len(), "reload requested");
        // No receivers is fine: nothing is mounted yet.
        let _ = self.inner.signals.send(ReloadSignal::Requested { epoch });
        self.finish_if_drained(st);
        epoch
    }

    /// `Reloading → Idle` exactly when the set is empty while the flag is
    /// raised. Evaluated on every mutation.
    fn finish_if_drained(&self, st: &mut ReloadState) {
        if !(st.need_reload && st.pending.is_empty()) {
            return;
        }
        st.need_reload = false;
        self.inner.phase.send_if_modified(|phase| {
            if *phase == SwitchPhase::Reloading {
                *phase = SwitchPhase::Idle;
                true
            } else {
                false
            }
        });
        info!(epoch = st.epoch, dataset = ?st.dataset, "reload finished");
        let _ = self
            .inner
            .signals
            .send(ReloadSignal::Finished { epoch: st.epoch });
    }

    // ── Dataset switch ───────────────────────────────────────────────

    /// Ask the backend to switch datasets, then reload every provider.
    ///
    /// Rejected with [`CoreError::SwitchInFlight`] unless idle. A backend
    /// failure is posted as an error notification, leaves the coordinator
    /// idle, and is returned.
    pub async fn request_switch<B: Backend>(
        &self,
        backend: &B,
        target: &str,
    ) -> Result<(), CoreError> {
        let mut claim = self.claim_switch(target)?;
        info!(target, "dataset switch requested");

        let result = backend.switch_dataset(target).await;
        claim.settled = true;

        match result {
            Ok(()) => {
                let mut st = self.lock();
                st.dataset = Some(target.to_owned());
                self.inner.phase.send_replace(SwitchPhase::Reloading);
                self.start_reload(&mut st);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.release_switch();
                warn!(target, error = %err, "dataset switch failed");
                self.inner
                    .notifications
                    .add(err.to_string(), NotificationKind::Error);
                Err(err)
            }
        }
    }

    fn claim_switch(&self, target: &str) -> Result<SwitchClaim<'_>, CoreError> {
        let _st = self.lock();
        let claimed = self.inner.phase.send_if_modified(|phase| {
            if phase.is_idle() {
                *phase = SwitchPhase::SwitchRequested {
                    target: target.to_owned(),
                };
                true
            } else {
                false
            }
        });
        if claimed {
            Ok(SwitchClaim {
                coordinator: self,
                settled: false,
            })
        } else {
            Err(CoreError::SwitchInFlight)
        }
    }

    /// Leave `SwitchRequested` without starting a reload of our own.
    fn release_switch(&self) {
        let st = self.lock();
        let next = if st.need_reload {
            SwitchPhase::Reloading
        } else {
            SwitchPhase::Idle
        };
        self.inner.phase.send_replace(next);
    }

    // ── Recovery ─────────────────────────────────────────────────────

    /// Give up on the current reload: clear the pending set and the flag,
    /// emit `Finished`, and post a warning naming who never reported.
    /// Returns the abandoned participants.
    pub fn abandon_reload(&self) -> Vec<ParticipantId> {
        let abandoned = {
            let mut st = self.lock();
            if !st.need_reload {
                return Vec::new();
            }
            let abandoned = st.pending.take();
            self.finish_if_drained(&mut st);
            abandoned
        };

        let names = join_ids(&abandoned);
        warn!(abandoned = %names, "reload abandoned");
        self.inner.notifications.add(
            format!("Reload abandoned; never completed: {names}"),
            NotificationKind::Warning,
        );
        abandoned
    }

    /// Report the reload of `epoch` as stalled, once, if it is still
    /// waiting on participants. Returns the pending ids when reported.
    pub(super) fn report_if_stalled(&self, epoch: u64) -> Option<Vec<ParticipantId>> {
        let pending = {
            let mut st = self.lock();
            if !st.need_reload
                || st.epoch != epoch
                || st.pending.is_empty()
                || st.stall_reported == Some(epoch)
            {
                return None;
            }
            st.stall_reported = Some(epoch);
            st.pending.ids()
        };

        let err = CoreError::ReloadStalled {
            pending: pending.iter().map(ToString::to_string).collect(),
        };
        warn!(epoch, error = %err, "reload stalled");
        self.inner
            .notifications
            .add(err.to_string(), NotificationKind::Error);
        Some(pending)
    }

    /// Spawn the stalled-reload watchdog. It stops with `cancel`.
    pub fn spawn_watchdog(&self, timeout: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let signals = self.subscribe();
        let coordinator = self.clone();
        tokio::spawn(watchdog::run(coordinator, signals, timeout, cancel))
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.inner.signals.subscribe()
    }

    pub fn phase(&self) -> SwitchPhase {
        self.inner.phase.borrow().clone()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SwitchPhase> {
        self.inner.phase.subscribe()
    }

    /// `true` while a switch is in flight or providers are still
    /// refetching. Callers gate further switch requests on this.
    pub fn is_loading(&self) -> bool {
        !self.inner.phase.borrow().is_idle()
    }

    pub fn need_reload(&self) -> bool {
        self.lock().need_reload
    }

    /// Epoch of the reload in progress, if any.
    pub fn active_epoch(&self) -> Option<u64> {
        let st = self.lock();
        st.need_reload.then_some(st.epoch)
    }

    pub fn pending(&self) -> Vec<ParticipantId> {
        self.lock().pending.ids()
    }

    pub fn members(&self) -> Vec<ParticipantId> {
        self.lock().members.keys().cloned().collect()
    }

    pub fn current_dataset(&self) -> Option<String> {
        self.lock().dataset.clone()
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.inner.notifications
    }
}

/// Holds `SwitchRequested` for the duration of the backend call. If the
/// request future is dropped mid-call, the phase is released.
struct SwitchClaim<'a> {
    coordinator: &'a ReloadCoordinator,
    settled: bool,
}

impl Drop for SwitchClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("dataset switch cancelled before the backend answered");
            self.coordinator.release_switch();
        }
    }
}

fn join_ids(ids: &[ParticipantId]) -> String {
    ids.iter()
        .map(ParticipantId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    fn coordinator() -> ReloadCoordinator {
        ReloadCoordinator::new(NotificationChannel::new())
    }

    fn drain(rx: &mut broadcast::Receiver<ReloadSignal>) -> Vec<ReloadSignal> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(signal) => out.push(signal),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    #[test]
    fn reload_finishes_only_when_every_participant_reports() {
        let coord = coordinator();
        let mut signals = coord.subscribe();

        let handles: Vec<_> = ["buildings", "rooms", "fixtures"]
            .into_iter()
            .map(|id| coord.register(id))
            .collect();
        coord.signal_reload();

        let mut handles = handles.into_iter();
        handles.next().expect("buildings").report_done();
        handles.next().expect("rooms").report_done();
        assert!(coord.need_reload());
        assert_eq!(coord.pending(), vec![ParticipantId::from("fixtures")]);

        handles.next().expect("fixtures").report_done();
        assert!(!coord.need_reload());
        assert!(!coord.is_loading());

        let finished: Vec<_> = drain(&mut signals)
            .into_iter()
            .filter(|s| matches!(s, ReloadSignal::Finished { .. }))
            .collect();
        assert_eq!(finished, vec![ReloadSignal::Finished { epoch: 1 }]);
    }

    #[test]
    fn double_registration_is_cleared_by_one_report() {
        let coord = coordinator();
        let first = coord.register("rooms");
        let second = coord.register("rooms");
        coord.signal_reload();

        first.report_done();
        assert!(coord.pending().is_empty());
        assert!(!coord.need_reload());

        // The stale handle reporting later is harmless.
        second.report_done();
        assert!(coord.pending().is_empty());
    }

    #[test]
    fn members_are_pending_before_the_signal_goes_out() {
        let coord = coordinator();
        let _rooms = coord.join("rooms");
        let _fixtures = coord.join("fixtures");

        coord.signal_reload();
        assert_eq!(
            coord.pending(),
            vec![ParticipantId::from("fixtures"), ParticipantId::from("rooms")]
        );

        // A fast provider finishing first cannot end the reload early.
        coord.register("rooms").report_done();
        assert!(coord.need_reload());
        coord.register("fixtures").report_done();
        assert!(!coord.need_reload());
    }

    #[test]
    fn fetch_started_before_a_reload_cannot_finish_it() {
        let coord = coordinator();
        let _rooms = coord.join("rooms");
        let initial = coord.register("rooms");

        coord.signal_reload();
        initial.report_done();
        assert!(coord.need_reload());
        assert_eq!(coord.pending(), vec![ParticipantId::from("rooms")]);

        let reload = coord.register("rooms");
        assert_eq!(reload.epoch(), 1);
        reload.report_done();
        assert!(!coord.need_reload());
    }

    #[test]
    fn reload_without_participants_finishes_immediately() {
        let coord = coordinator();
        let mut signals = coord.subscribe();

        coord.signal_reload();
        assert!(!coord.need_reload());
        assert_eq!(
            drain(&mut signals),
            vec![
                ReloadSignal::Requested { epoch: 1 },
                ReloadSignal::Finished { epoch: 1 }
            ]
        );
    }

    #[test]
    fn remount_shares_one_membership_entry() {
        let coord = coordinator();
        let old = coord.join("rooms");
        let new = coord.join("rooms");
        drop(old);
        assert_eq!(coord.members(), vec![ParticipantId::from("rooms")]);
        drop(new);
        assert!(coord.members().is_empty());
    }

    #[test]
    fn dropped_handle_leaves_reload_stuck() {
        let coord = coordinator();
        let handle = coord.register("utilities");
        coord.signal_reload();

        drop(handle);
        assert!(coord.need_reload());
        assert!(coord.is_loading());
        assert_eq!(coord.pending(), vec![ParticipantId::from("utilities")]);
    }

    #[test]
    fn abandon_clears_a_stuck_reload() {
        let coord = coordinator();
        let mut signals = coord.subscribe();
        let _handle = coord.register("utilities");
        coord.signal_reload();

        let abandoned = coord.abandon_reload();
        assert_eq!(abandoned, vec![ParticipantId::from("utilities")]);
        assert!(!coord.need_reload());
        assert!(
            drain(&mut signals).contains(&ReloadSignal::Finished { epoch: 1 }),
            "abandon must emit Finished"
        );
        assert_eq!(coord.notifications().len(), 1);
    }

    #[test]
    fn abandon_when_idle_is_noop() {
        let coord = coordinator();
        assert!(coord.abandon_reload().is_empty());
        assert!(coord.notifications().is_empty());
    }

    #[test]
    fn stall_is_reported_once_per_epoch() {
        let coord = coordinator();
        let _handle = coord.register("photovoltaic");
        let epoch = coord.signal_reload();

        assert_eq!(
            coord.report_if_stalled(epoch),
            Some(vec![ParticipantId::from("photovoltaic")])
        );
        assert_eq!(coord.report_if_stalled(epoch), None);
        assert!(coord.need_reload(), "the watchdog never clears the flag");

        let snapshot = coord.notifications().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot[0].message,
            "Reload stalled waiting for: photovoltaic"
        );
    }
}
