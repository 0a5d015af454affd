//! The session keeper task and its consumer handle.

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::activity::ActivityTracker;
use crate::backup::BackupStore;
use crate::config::KeeperConfig;
use crate::gateway::AuthGateway;
use crate::scheduler::RefreshScheduler;
use crate::session::Session;

use super::state::{KeeperState, Phase, SessionSnapshot};

/// Buffer size for the external-signal channel.
/// Signals coalesce after every check, so a small buffer is plenty.
const SIGNAL_BUFFER_SIZE: usize = 16;

/// Environment events that request an immediate re-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The window regained focus.
    Focus,
    /// Network connectivity was restored.
    Online,
}

/// What prompted a re-validation pass. Logged for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Startup,
    Periodic,
    ScheduledRefresh,
    ActivityStale,
    Signal(Signal),
}

/// Outcome of a backup-restoration attempt.
enum Restored {
    /// The backend accepted the backup pair and returned a session.
    Session(Session),
    /// The backend explicitly rejected the pair; the record is dead.
    Rejected,
    /// No record, or the backend was unreachable; the record (if any) may
    /// still be good next time.
    Unavailable,
}

/// The session keeper task.
///
/// Owns the current session state and every timer. Construct with
/// [`SessionKeeper::new`], then drive it by spawning [`SessionKeeper::run`];
/// all interaction happens through the returned [`KeeperHandle`].
pub struct SessionKeeper<G, B> {
    config: KeeperConfig,
    gateway: G,
    backup: B,
    activity: ActivityTracker,
    scheduler: RefreshScheduler,
    state: KeeperState,
    signal_rx: mpsc::Receiver<Signal>,
    signals_closed: bool,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Consumer-facing handle to a running keeper.
///
/// Clones share the same keeper. Dropping every handle stops the keeper,
/// since nothing is left that could observe or signal it.
#[derive(Clone)]
pub struct KeeperHandle {
    activity: ActivityTracker,
    signal_tx: mpsc::Sender<Signal>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    shutdown_tx: watch::Sender<bool>,
}

impl<G: AuthGateway, B: BackupStore> SessionKeeper<G, B> {
    pub fn new(config: KeeperConfig, gateway: G, backup: B) -> (Self, KeeperHandle) {
        let config = config.validated();
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER_SIZE);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::empty());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let activity = ActivityTracker::new();
        let scheduler = RefreshScheduler::new(config.refresh_lead());

        let keeper = Self {
            config,
            gateway,
            backup,
            activity: activity.clone(),
            scheduler,
            state: KeeperState::new(),
            signal_rx,
            signals_closed: false,
            snapshot_tx,
            shutdown_rx,
        };
        let handle = KeeperHandle {
            activity,
            signal_tx,
            snapshot_rx,
            shutdown_tx,
        };
        (keeper, handle)
    }

    /// Run the keeper until shutdown.
    ///
    /// Performs the startup check, then serves all triggers from one
    /// `select!` loop. Re-validation is awaited inline, so at most one
    /// gateway call is ever in flight; triggers firing during a check
    /// coalesce into the next loop turn.
    pub async fn run(mut self) {
        info!("session keeper starting");
        self.revalidate(Trigger::Startup).await;

        let periodic_every = self.config.periodic_interval();
        let mut periodic = time::interval_at(time::Instant::now() + periodic_every, periodic_every);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let poll_every = self.config.activity_poll();
        let mut activity_poll = time::interval_at(time::Instant::now() + poll_every, poll_every);
        activity_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    match changed {
                        Ok(()) => {
                            if *self.shutdown_rx.borrow() {
                                break;
                            }
                        }
                        // Every handle was dropped: nothing left to observe
                        // or signal this keeper.
                        Err(_) => break,
                    }
                }
                maybe_signal = self.signal_rx.recv(), if !self.signals_closed => {
                    match maybe_signal {
                        Some(signal) => {
                            debug!(?signal, "external signal received");
                            self.revalidate(Trigger::Signal(signal)).await;
                        }
                        None => self.signals_closed = true,
                    }
                }
                _ = periodic.tick() => {
                    self.revalidate(Trigger::Periodic).await;
                }
                _ = activity_poll.tick() => {
                    if self.state.has_session()
                        && self.activity.stale_for(self.config.activity_threshold())
                    {
                        debug!(
                            idle_secs = self.activity.idle_for().as_secs(),
                            "inactivity threshold crossed"
                        );
                        self.revalidate(Trigger::ActivityStale).await;
                    }
                }
                _ = self.scheduler.wait() => {
                    self.revalidate(Trigger::ScheduledRefresh).await;
                }
            }

            if self.shutting_down() {
                break;
            }
        }

        self.scheduler.cancel();
        info!("session keeper stopped");
    }

    /// The unified re-validation routine every trigger funnels into.
    ///
    /// Never fails: gateway and backup failures only drive state
    /// transitions, and `Unauthenticated` is always reachable and safe.
    async fn revalidate(&mut self, trigger: Trigger) {
        if self.tripped() {
            debug!(
                checks = self.state.check_count,
                "circuit breaker open, skipping re-validation"
            );
            return;
        }
        self.state.check_count += 1;
        if self.tripped() {
            warn!(
                checks = self.state.check_count,
                "circuit breaker tripped, suspending re-validation until a successful check"
            );
            return;
        }

        debug!(?trigger, check = self.state.check_count, "re-validating session");

        let direct = match trigger {
            Trigger::ScheduledRefresh => self.try_refresh().await,
            _ => self.try_get().await,
        };
        if self.shutting_down() {
            debug!("discarding re-validation result after shutdown");
            return;
        }

        if let Some(session) = direct {
            self.observe_session(session, Phase::Authenticated);
            self.drain_signals();
            return;
        }

        let restored = self.try_restore().await;
        if self.shutting_down() {
            debug!("discarding restoration result after shutdown");
            return;
        }

        match restored {
            Restored::Session(session) => self.observe_session(session, Phase::Degraded),
            Restored::Rejected => {
                self.backup.clear();
                debug!("backup record cleared after explicit rejection");
                self.enter_unauthenticated();
            }
            Restored::Unavailable => self.enter_unauthenticated(),
        }
        self.drain_signals();
    }

    async fn try_get(&mut self) -> Option<Session> {
        match self.gateway.get_session().await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!("no active session at the auth backend");
                None
            }
            Err(e) => {
                warn!(error = %e, "session check failed");
                None
            }
        }
    }

    async fn try_refresh(&mut self) -> Option<Session> {
        match self.gateway.refresh_session().await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!("refresh produced no session");
                None
            }
            Err(e) if e.is_terminal() => {
                warn!(error = %e, "refresh token no longer valid");
                None
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                None
            }
        }
    }

    async fn try_restore(&mut self) -> Restored {
        let Some(pair) = self.backup.load() else {
            debug!("no backup record available");
            return Restored::Unavailable;
        };

        match self.gateway.set_session(&pair).await {
            Ok(Some(session)) => {
                info!(identity = %session.identity, "session restored from backup");
                Restored::Session(session)
            }
            Ok(None) => {
                warn!("auth backend rejected the backup credential");
                Restored::Rejected
            }
            Err(e) if e.is_terminal() => {
                warn!(error = %e, "backup credential no longer valid");
                Restored::Rejected
            }
            Err(e) => {
                warn!(error = %e, "backup restoration failed");
                Restored::Unavailable
            }
        }
    }

    /// Apply a successfully observed session: reset the breaker, rewrite
    /// the backup, re-arm the pre-expiry refresh, publish the snapshot.
    fn observe_session(&mut self, session: Session, phase: Phase) {
        self.state.check_count = 0;
        self.backup.save(&session.token_pair());
        self.scheduler.arm(session.expires_at);
        info!(
            identity = %session.identity,
            ?phase,
            expires_in_secs = session.seconds_until_expiry(),
            "session observed"
        );
        self.state.phase = phase;
        self.state.current = Some(session);
        self.publish();
    }

    fn enter_unauthenticated(&mut self) {
        if self.state.phase != Phase::Unauthenticated {
            info!("session lost, entering unauthenticated state");
        }
        self.state.phase = Phase::Unauthenticated;
        self.state.current = None;
        self.scheduler.cancel();
        self.publish();
    }

    fn publish(&self) {
        // send_replace succeeds even with no receivers left
        self.snapshot_tx.send_replace(self.state.snapshot());
    }

    /// Drop signals that queued up while a check was in flight; the check
    /// that just ran already covers them.
    fn drain_signals(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            debug!(?signal, "signal coalesced into completed check");
        }
    }

    fn tripped(&self) -> bool {
        self.state.check_count > self.config.max_checks
    }

    fn shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}

impl KeeperHandle {
    /// The current session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn has_session(&self) -> bool {
        self.snapshot_rx.borrow().has_session
    }

    pub fn identity(&self) -> Option<String> {
        self.snapshot_rx.borrow().identity.clone()
    }

    /// Record a user interaction (pointer press, key press, touch, scroll).
    pub fn mark_activity(&self) {
        self.activity.mark();
    }

    /// The window regained focus; re-validate soon.
    pub fn notify_focus(&self) {
        self.send_signal(Signal::Focus);
    }

    /// Network connectivity came back; re-validate soon.
    pub fn notify_online(&self) {
        self.send_signal(Signal::Online);
    }

    fn send_signal(&self, signal: Signal) {
        // A full buffer means checks are already pending; dropping the
        // signal loses nothing.
        if let Err(e) = self.signal_tx.try_send(signal) {
            debug!(?signal, error = %e, "signal dropped");
        }
    }

    /// Stop the keeper. Timers are disarmed; a check already in flight
    /// resolves but its result is discarded.
    pub fn shutdown(&self) {
        // Err here means the keeper already stopped.
        let _ = self.shutdown_tx.send(true);
    }
}
