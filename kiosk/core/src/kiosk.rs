//! Kiosk - The Event Loop
//!
//! Owns the two coordinators, the scan buffer, and every in-flight backend
//! call. All state changes happen on one task: network calls run as futures
//! in a [`FuturesUnordered`] and their results are applied in completion
//! order from inside [`Kiosk::run`].
//!
//! ```text
//!  surface events ─┐                         ┌─► KioskMessage ─► surface
//!  push events ────┤                         │
//!  agent scans ────┼─► Kiosk ─► coordinators ┤
//!  poll timers ────┤     ▲                   │
//!  scan deadline ──┘     │                   └─► backend calls
//!                        └──── completions ◄──────────┘
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{KioskConfig, MalformedPayloadPolicy};
use crate::coordinator::{AnimationCoordinator, CommittedView, CoordinatorEffect};
use crate::events::KioskEvent;
use crate::messages::{KioskMessage, NoticeLevel};
use crate::model::{
    DevEnqueueOutcome, HistoryEntry, KioskStatus, LeaveOutcome, Player, PlayerId, PlayerUpdate,
    QueueSnapshot, ScanOutcome, SessionStart, StatusReport,
};
use crate::scan::ScanBuffer;
use crate::source::{FetchError, KioskActions, PushEvent, RemoteQueueSource};
use crate::status::{StatusCoordinator, StatusEffect};

/// Result of one backend call, applied back on the event loop
#[derive(Debug)]
pub enum Completion {
    /// Queue fetch `seq` finished
    Snapshot {
        /// Issue order of the fetch
        seq: u64,
        /// Fetched snapshot
        result: Result<QueueSnapshot, FetchError>,
    },
    /// Status fetch finished
    Status(Result<StatusReport, FetchError>),
    /// Scan submission finished (player looked up when known)
    Scan(Result<(ScanOutcome, Option<Player>), FetchError>),
    /// Start request finished
    SessionStart(Result<SessionStart, FetchError>),
    /// Dev enqueue finished (player looked up when queued)
    DevEnqueue(Result<(DevEnqueueOutcome, Option<Player>), FetchError>),
    /// Profile lookup finished
    Profile(Result<(Player, Vec<HistoryEntry>), FetchError>),
    /// Leave request finished
    Leave {
        /// Player who asked to leave
        player_id: PlayerId,
        /// Backend answer
        result: Result<LeaveOutcome, FetchError>,
    },
    /// Profile change finished
    PlayerUpdated {
        /// The change that was asked for
        update: PlayerUpdate,
        /// The player as stored afterwards
        result: Result<Player, FetchError>,
    },
}

/// The kiosk core
pub struct Kiosk<B> {
    backend: Arc<B>,
    config: KioskConfig,
    tx: mpsc::UnboundedSender<KioskMessage>,
    coordinator: AnimationCoordinator,
    status: StatusCoordinator,
    scans: ScanBuffer,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    /// Issue counter for queue fetches
    queue_seq: u64,
    /// Newest queue fetch whose result was applied
    applied_seq: u64,
    modes: Vec<String>,
    selected_mode: usize,
    running: bool,
}

impl<B> Kiosk<B>
where
    B: RemoteQueueSource + KioskActions + 'static,
{
    /// Create a kiosk core sending to `tx`
    pub fn new(backend: B, config: KioskConfig, tx: mpsc::UnboundedSender<KioskMessage>) -> Self {
        let capacity = config.queue.capacity;
        let quiet = config.scanner.quiet_period;
        Self {
            backend: Arc::new(backend),
            config,
            tx,
            coordinator: AnimationCoordinator::new(capacity),
            status: StatusCoordinator::new(),
            scans: ScanBuffer::new(quiet),
            in_flight: FuturesUnordered::new(),
            queue_seq: 0,
            applied_seq: 0,
            modes: Vec::new(),
            selected_mode: 0,
            running: true,
        }
    }

    /// Watch every committed queue
    pub fn subscribe_commits(&self) -> watch::Receiver<Option<CommittedView>> {
        self.coordinator.subscribe()
    }

    /// Queue coordinator (read-only)
    pub fn coordinator(&self) -> &AnimationCoordinator {
        &self.coordinator
    }

    /// Last known session status
    pub fn status(&self) -> KioskStatus {
        self.status.status()
    }

    /// Mode a start request would use
    pub fn selected_mode(&self) -> Option<&str> {
        self.modes.get(self.selected_mode).map(String::as_str)
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Backend calls not yet applied
    pub fn pending_calls(&self) -> usize {
        self.in_flight.len()
    }

    // ============================================
    // Event Loop
    // ============================================

    /// Run until the surface shuts down or its channel closes
    ///
    /// `push` and `scans` are optional sources; a closed source is dropped
    /// from the loop.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<KioskEvent>,
        mut push: Option<mpsc::Receiver<PushEvent>>,
        mut scans: Option<mpsc::Receiver<String>>,
    ) -> anyhow::Result<()> {
        let mut queue_poll = tokio::time::interval(self.config.queue.poll_interval);
        queue_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_poll = tokio::time::interval(self.config.queue.status_poll_interval);
        status_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            kiosk = %self.config.backend.kiosk_id,
            capacity = self.config.queue.capacity,
            "kiosk started"
        );

        while self.running {
            let scan_deadline = self.scans.deadline().map(Instant::from_std);

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        info!("surface channel closed");
                        self.running = false;
                    }
                },
                event = recv_from(&mut push) => self.handle_push(event),
                uid = recv_from(&mut scans) => self.submit_scan(uid),
                _ = queue_poll.tick() => self.fetch_queue(),
                _ = status_poll.tick() => self.fetch_status(),
                () = sleep_until_some(scan_deadline), if scan_deadline.is_some() => {
                    if let Some(uid) = self.scans.flush_if_due(now()) {
                        self.submit_scan(uid);
                    }
                }
                Some(done) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.handle_completion(done);
                }
            }
        }

        self.send(KioskMessage::Shutdown);
        info!("kiosk stopped");
        Ok(())
    }

    /// Await and apply every in-flight call, including ones they trigger
    pub async fn drain(&mut self) {
        while let Some(done) = self.in_flight.next().await {
            self.handle_completion(done);
        }
    }

    /// Fetch queue and status now
    pub fn request_refresh(&mut self) {
        self.fetch_queue();
        self.fetch_status();
    }

    // ============================================
    // Inputs
    // ============================================

    /// Apply one surface event
    pub fn handle_event(&mut self, event: KioskEvent) {
        match event {
            KioskEvent::ArrivalFinished { ticket } => {
                match self.coordinator.complete_arrival(ticket) {
                    Ok(effects) => self.apply_effects(effects),
                    Err(e) => warn!(error = %e, "ignoring arrival completion"),
                }
            }
            KioskEvent::WedgeKey(key) => {
                if let Some(uid) = self.scans.push(key, now()) {
                    self.submit_scan(uid);
                }
            }
            KioskEvent::Scan { uid } => self.submit_scan(uid),
            KioskEvent::StartPressed => self.start_game(),
            KioskEvent::SelectMode { index } => self.select_mode(index),
            KioskEvent::DevEnqueue => self.dev_enqueue(),
            KioskEvent::OpenProfile { player_id } => self.open_profile(player_id),
            KioskEvent::LeaveQueue { player_id } => self.leave_queue(player_id),
            KioskEvent::UpdatePlayer { player_id, update } => self.update_player(player_id, update),
            KioskEvent::RefreshRequested => self.request_refresh(),
            KioskEvent::Shutdown => {
                info!("surface requested shutdown");
                self.running = false;
            }
        }
    }

    /// Apply one push channel event
    pub fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                self.send(KioskMessage::PushChannel { connected: true });
                self.request_refresh();
            }
            PushEvent::Disconnected => {
                self.send(KioskMessage::PushChannel { connected: false });
            }
            PushEvent::Notification(notification) => {
                debug!(?notification, "push notification");
                self.fetch_queue();
                if notification.affects_status() {
                    self.fetch_status();
                }
            }
        }
    }

    /// Apply the result of one backend call
    pub fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Snapshot { seq, result } => self.on_snapshot(seq, result),
            Completion::Status(result) => self.on_status(result),
            Completion::Scan(result) => self.on_scan(result),
            Completion::SessionStart(result) => self.on_session_start(result),
            Completion::DevEnqueue(result) => self.on_dev_enqueue(result),
            Completion::Profile(result) => self.on_profile(result),
            Completion::Leave { player_id, result } => self.on_leave(player_id, result),
            Completion::PlayerUpdated { update, result } => self.on_player_updated(&update, result),
        }
    }

    // ============================================
    // Backend Calls
    // ============================================

    fn spawn_call<F>(&mut self, call: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        self.in_flight.push(call.boxed());
    }

    fn fetch_queue(&mut self) {
        self.queue_seq += 1;
        let seq = self.queue_seq;
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Completion::Snapshot {
                seq,
                result: backend.fetch_snapshot().await,
            }
        });
    }

    fn fetch_status(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move { Completion::Status(backend.fetch_status().await) });
    }

    fn submit_scan(&mut self, uid: String) {
        info!(%uid, "band scanned");
        self.notice(NoticeLevel::Info, format!("Scanned: {uid}"));
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Completion::Scan(scan_and_lookup(backend.as_ref(), &uid).await)
        });
    }

    fn start_game(&mut self) {
        if self.status.status().is_running() {
            self.notice(NoticeLevel::Warning, "A game is already in progress.");
            return;
        }
        let mode = self.selected_mode().map(str::to_string);
        info!(?mode, "starting game");
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Completion::SessionStart(backend.start_session(mode.as_deref()).await)
        });
    }

    fn dev_enqueue(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Completion::DevEnqueue(enqueue_and_lookup(backend.as_ref()).await)
        });
    }

    fn open_profile(&mut self, player_id: PlayerId) {
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            let result = futures::try_join!(
                backend.player(player_id),
                backend.player_history(player_id)
            );
            Completion::Profile(result)
        });
    }

    fn leave_queue(&mut self, player_id: PlayerId) {
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Completion::Leave {
                player_id,
                result: backend.leave_queue(player_id).await,
            }
        });
    }

    fn update_player(&mut self, player_id: PlayerId, update: PlayerUpdate) {
        let update = match update {
            PlayerUpdate::Rename(name) => match PlayerUpdate::rename(&name) {
                Some(update) => update,
                None => {
                    self.notice(NoticeLevel::Warning, "Name cannot be empty.");
                    return;
                }
            },
            PlayerUpdate::RandomAvatar => PlayerUpdate::RandomAvatar,
        };
        info!(player = %player_id, ?update, "updating profile");
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            let result = backend.update_player(player_id, &update).await;
            Completion::PlayerUpdated { update, result }
        });
    }

    fn select_mode(&mut self, index: usize) {
        if index >= self.modes.len() {
            debug!(index, offered = self.modes.len(), "ignoring unknown mode");
            return;
        }
        self.selected_mode = index;
        self.send_selected_mode();
    }

    // ============================================
    // Completions
    // ============================================

    fn on_snapshot(&mut self, seq: u64, result: Result<QueueSnapshot, FetchError>) {
        if seq <= self.applied_seq {
            debug!(seq, applied = self.applied_seq, "dropping superseded queue fetch");
            return;
        }
        self.applied_seq = seq;

        match result {
            Ok(snapshot) => {
                let effects = self.coordinator.apply_snapshot(snapshot);
                self.apply_effects(effects);
            }
            Err(e) if e.is_malformed() => match self.config.queue.malformed_payload {
                MalformedPayloadPolicy::Skip => {
                    warn!(error = %e, "skipping malformed queue payload");
                }
                MalformedPayloadPolicy::TreatAsEmpty => {
                    warn!(error = %e, "malformed queue payload, applying empty queue");
                    let effects = self.coordinator.apply_snapshot(QueueSnapshot::empty());
                    self.apply_effects(effects);
                }
                MalformedPayloadPolicy::Surface => {
                    warn!(error = %e, "malformed queue payload");
                    self.notice(NoticeLevel::Error, "Queue data from the server is unreadable.");
                }
            },
            Err(e) => warn!(error = %e, "queue fetch failed"),
        }
    }

    fn on_status(&mut self, result: Result<StatusReport, FetchError>) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "status fetch failed");
                return;
            }
        };

        let effects = self.status.apply_status(report.status);
        self.apply_status_effects(effects);

        let modes = report.modes();
        if modes != self.modes {
            let keep = self
                .selected_mode()
                .and_then(|current| modes.iter().position(|m| m == current));
            self.selected_mode = keep.unwrap_or(0);
            self.modes = modes;
            self.send_selected_mode();
        }

        self.send(KioskMessage::KioskInfo {
            modes: self.modes.clone(),
            objectives: report.objectives.clone(),
            traits: report.visible_traits(),
        });
    }

    fn on_scan(&mut self, result: Result<(ScanOutcome, Option<Player>), FetchError>) {
        match result {
            Ok((ScanOutcome::Known { player_id }, player)) => {
                self.notice(NoticeLevel::Success, format!("Queued player #{player_id}"));
                if let Some(player) = player {
                    self.splash(&player);
                }
                self.fetch_queue();
            }
            Ok((ScanOutcome::Unknown { message }, _)) => {
                self.notice(NoticeLevel::Warning, message);
            }
            Err(FetchError::Unauthorized) => {
                self.notice(
                    NoticeLevel::Error,
                    "Unauthorized kiosk (API key). Check configuration.",
                );
            }
            Err(e) => {
                warn!(error = %e, "scan submission failed");
                self.notice(NoticeLevel::Error, format!("Scan failed: {e}"));
            }
        }
    }

    fn on_session_start(&mut self, result: Result<SessionStart, FetchError>) {
        match result {
            Ok(session) if session.is_running() => {
                info!(session = session.id, "game started");
                self.notice(
                    NoticeLevel::Success,
                    format!("Game started (session #{}).", session.id),
                );
            }
            Ok(_) => self.notice(NoticeLevel::Info, "Waiting for current game..."),
            Err(FetchError::Status { detail, .. }) => {
                self.notice(NoticeLevel::Error, format!("Error: {detail}"));
                return;
            }
            Err(e) => {
                warn!(error = %e, "start request failed");
                self.notice(NoticeLevel::Error, format!("Error: {e}"));
                return;
            }
        }
        self.request_refresh();
    }

    fn on_dev_enqueue(&mut self, result: Result<(DevEnqueueOutcome, Option<Player>), FetchError>) {
        match result {
            Ok((DevEnqueueOutcome::Queued { player_id }, player)) => {
                debug!(player = %player_id, "dev player queued");
                if let Some(player) = player {
                    self.splash(&player);
                }
                self.fetch_queue();
            }
            Ok((DevEnqueueOutcome::Rejected { detail }, _)) => {
                self.notice(NoticeLevel::Warning, detail);
            }
            Err(e) => {
                warn!(error = %e, "dev enqueue failed");
                self.notice(NoticeLevel::Error, "Error while queuing test player");
            }
        }
    }

    fn on_profile(&mut self, result: Result<(Player, Vec<HistoryEntry>), FetchError>) {
        match result {
            Ok((player, history)) => {
                let queued = self
                    .coordinator
                    .committed()
                    .is_some_and(|view| view.snapshot.contains(player.id));
                self.send(KioskMessage::Profile {
                    player,
                    history,
                    queued,
                });
            }
            Err(e) => {
                warn!(error = %e, "profile lookup failed");
                self.notice(NoticeLevel::Error, "Failed to load history.");
            }
        }
    }

    fn on_leave(&mut self, player_id: PlayerId, result: Result<LeaveOutcome, FetchError>) {
        match result {
            Ok(LeaveOutcome::Left) => {
                let name = self
                    .coordinator
                    .committed()
                    .and_then(|view| view.snapshot.players().find(|p| p.id == player_id))
                    .map_or_else(
                        || format!("Player #{player_id}"),
                        |p| p.display_name().to_string(),
                    );
                self.notice(NoticeLevel::Info, format!("{name} has left the game."));
                self.request_refresh();
            }
            Ok(LeaveOutcome::Refused { detail }) => {
                self.notice(NoticeLevel::Warning, detail);
                self.fetch_queue();
            }
            Err(e) => {
                warn!(error = %e, "leave request failed");
                self.notice(NoticeLevel::Error, "Error while leaving queue.");
            }
        }
    }

    fn on_player_updated(&mut self, update: &PlayerUpdate, result: Result<Player, FetchError>) {
        let (done, failed) = match update {
            PlayerUpdate::Rename(_) => ("Profile updated!", "Failed to update username."),
            PlayerUpdate::RandomAvatar => ("Avatar updated!", "Failed to update avatar."),
        };
        match result {
            Ok(player) => {
                debug!(player = %player.id, "profile updated");
                self.notice(NoticeLevel::Success, done);
                self.send(KioskMessage::ProfileUpdated { player });
                self.fetch_queue();
            }
            Err(FetchError::Status { detail, .. }) => self.notice(NoticeLevel::Error, detail),
            Err(FetchError::Unauthorized) => {
                self.notice(
                    NoticeLevel::Error,
                    "Unauthorized kiosk (API key). Check configuration.",
                );
            }
            Err(e) => {
                warn!(error = %e, "profile update failed");
                self.notice(NoticeLevel::Error, failed);
            }
        }
    }

    // ============================================
    // Effects
    // ============================================

    fn apply_effects(&mut self, effects: Vec<CoordinatorEffect>) {
        for effect in effects {
            match effect {
                CoordinatorEffect::Render(view) => self.send(KioskMessage::QueueRendered { view }),
                CoordinatorEffect::PlayArrival(request) => {
                    self.send(KioskMessage::PlayArrival(request));
                }
                CoordinatorEffect::Committed(view) => {
                    let effects = self.status.observe_queue_count(view.last_count);
                    self.apply_status_effects(effects);
                }
            }
        }
    }

    fn apply_status_effects(&mut self, effects: Vec<StatusEffect>) {
        for effect in effects {
            match effect {
                StatusEffect::WaitingChanged { waiting } => {
                    self.send(KioskMessage::WaitingForGame { waiting });
                }
                StatusEffect::StartEligibility { eligible } => {
                    self.send(KioskMessage::StartEligibility { eligible });
                }
            }
        }
    }

    fn send_selected_mode(&self) {
        if let Some(mode) = self.selected_mode() {
            self.send(KioskMessage::ModeSelected {
                index: self.selected_mode,
                mode: mode.to_string(),
            });
        }
    }

    fn splash(&self, player: &Player) {
        self.send(KioskMessage::Splash {
            text: format!("{} joined!", player.display_name()),
        });
    }

    fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        self.send(KioskMessage::Notice {
            level,
            text: text.into(),
        });
    }

    /// Send a message to the surface
    fn send(&self, msg: KioskMessage) {
        if self.tx.send(msg).is_err() {
            debug!("surface gone, dropping message");
        }
    }
}

/// Submit a scan, then look up the player it queued
async fn scan_and_lookup<B: KioskActions>(
    backend: &B,
    uid: &str,
) -> Result<(ScanOutcome, Option<Player>), FetchError> {
    let outcome = backend.submit_scan(uid).await?;
    let player = match outcome {
        ScanOutcome::Known { player_id } => backend.player(player_id).await.ok(),
        ScanOutcome::Unknown { .. } => None,
    };
    Ok((outcome, player))
}

/// Queue a dev player, then look them up for the splash
async fn enqueue_and_lookup<B: KioskActions>(
    backend: &B,
) -> Result<(DevEnqueueOutcome, Option<Player>), FetchError> {
    let outcome = backend.enqueue_dev_player().await?;
    let player = match outcome {
        DevEnqueueOutcome::Queued { player_id } => backend.player(player_id).await.ok(),
        DevEnqueueOutcome::Rejected { .. } => None,
    };
    Ok((outcome, player))
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

/// Receive from an optional source; pends forever once it is absent or closed
async fn recv_from<T>(rx: &mut Option<mpsc::Receiver<T>>) -> T {
    if let Some(inner) = rx.as_mut() {
        if let Some(value) = inner.recv().await {
            return value;
        }
        *rx = None;
    }
    std::future::pending().await
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubBackend {
        queue: Mutex<Vec<QueueSnapshot>>,
    }

    #[async_trait]
    impl RemoteQueueSource for StubBackend {
        async fn fetch_snapshot(&self) -> Result<QueueSnapshot, FetchError> {
            let mut queue = self.queue.lock().unwrap();
            if queue.len() > 1 {
                Ok(queue.remove(0))
            } else {
                queue
                    .first()
                    .cloned()
                    .ok_or_else(|| FetchError::Malformed("no queue".into()))
            }
        }

        async fn fetch_status(&self) -> Result<StatusReport, FetchError> {
            Ok(StatusReport::default())
        }
    }

    #[async_trait]
    impl KioskActions for StubBackend {
        async fn submit_scan(&self, _uid: &str) -> Result<ScanOutcome, FetchError> {
            Err(FetchError::Unauthorized)
        }
        async fn start_session(&self, _mode: Option<&str>) -> Result<SessionStart, FetchError> {
            Err(FetchError::Request("offline".into()))
        }
        async fn enqueue_dev_player(&self) -> Result<DevEnqueueOutcome, FetchError> {
            Err(FetchError::Request("offline".into()))
        }
        async fn leave_queue(&self, _player_id: PlayerId) -> Result<LeaveOutcome, FetchError> {
            Ok(LeaveOutcome::Refused {
                detail: "Player not in queue".into(),
            })
        }
        async fn player(&self, _player_id: PlayerId) -> Result<Player, FetchError> {
            Err(FetchError::Request("offline".into()))
        }
        async fn player_history(&self, _id: PlayerId) -> Result<Vec<HistoryEntry>, FetchError> {
            Ok(Vec::new())
        }
        async fn update_player(
            &self,
            _player_id: PlayerId,
            _update: &PlayerUpdate,
        ) -> Result<Player, FetchError> {
            Err(FetchError::Status {
                status: 422,
                detail: "Name already taken".into(),
            })
        }
    }

    fn kiosk(
        backend: StubBackend,
        policy: MalformedPayloadPolicy,
    ) -> (Kiosk<StubBackend>, mpsc::UnboundedReceiver<KioskMessage>) {
        let mut config = KioskConfig::default();
        config.queue.malformed_payload = policy;
        let (tx, rx) = mpsc::unbounded_channel();
        (Kiosk::new(backend, config, tx), rx)
    }

    fn drain_messages(rx: &mut mpsc::UnboundedReceiver<KioskMessage>) -> Vec<KioskMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_superseded_fetch_is_dropped() {
        let (mut kiosk, _rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        let newer = QueueSnapshot::from_players([Player::new(1, "a"), Player::new(2, "b")]);

        kiosk.handle_completion(Completion::Snapshot {
            seq: 2,
            result: Ok(newer.clone()),
        });
        kiosk.handle_completion(Completion::Snapshot {
            seq: 1,
            result: Ok(QueueSnapshot::empty()),
        });

        assert_eq!(kiosk.coordinator().committed().map(|v| &v.snapshot), Some(&newer));
    }

    #[test]
    fn test_malformed_skip_keeps_display() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_completion(Completion::Snapshot {
            seq: 1,
            result: Err(FetchError::Malformed("missing queue".into())),
        });
        assert!(kiosk.coordinator().committed().is_none());
        assert!(drain_messages(&mut rx).is_empty());
    }

    #[test]
    fn test_malformed_treat_as_empty_commits_empty() {
        let (mut kiosk, _rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::TreatAsEmpty);
        kiosk.handle_completion(Completion::Snapshot {
            seq: 1,
            result: Ok(QueueSnapshot::from_players([Player::new(1, "a")])),
        });
        kiosk.handle_completion(Completion::Snapshot {
            seq: 2,
            result: Err(FetchError::Malformed("missing queue".into())),
        });
        assert_eq!(kiosk.coordinator().last_count(), 0);
    }

    #[test]
    fn test_malformed_surface_emits_error_notice() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Surface);
        kiosk.handle_completion(Completion::Snapshot {
            seq: 1,
            result: Err(FetchError::Malformed("missing queue".into())),
        });
        let messages = drain_messages(&mut rx);
        assert!(matches!(
            messages.as_slice(),
            [KioskMessage::Notice {
                level: NoticeLevel::Error,
                ..
            }]
        ));
    }

    #[test]
    fn test_start_refused_while_running() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_completion(Completion::Status(Ok(StatusReport {
            status: KioskStatus::Running,
            ..StatusReport::default()
        })));
        drain_messages(&mut rx);

        kiosk.handle_event(KioskEvent::StartPressed);
        assert_eq!(kiosk.pending_calls(), 0);
        assert!(matches!(
            drain_messages(&mut rx).as_slice(),
            [KioskMessage::Notice {
                level: NoticeLevel::Warning,
                ..
            }]
        ));
    }

    #[test]
    fn test_mode_selection_survives_refresh() {
        let (mut kiosk, _rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        let report = |modes: &[&str]| StatusReport {
            modes: modes.iter().map(|m| m.to_string()).collect(),
            ..StatusReport::default()
        };

        kiosk.handle_completion(Completion::Status(Ok(report(&["solo", "team"]))));
        kiosk.handle_event(KioskEvent::SelectMode { index: 1 });
        assert_eq!(kiosk.selected_mode(), Some("team"));

        kiosk.handle_completion(Completion::Status(Ok(report(&["team", "relay"]))));
        assert_eq!(kiosk.selected_mode(), Some("team"));

        kiosk.handle_completion(Completion::Status(Ok(report(&["relay"]))));
        assert_eq!(kiosk.selected_mode(), Some("relay"));
    }

    #[test]
    fn test_unknown_mode_index_ignored() {
        let (mut kiosk, _rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_completion(Completion::Status(Ok(StatusReport::default())));
        kiosk.handle_event(KioskEvent::SelectMode { index: 4 });
        assert_eq!(kiosk.selected_mode(), Some("default"));
    }

    #[test]
    fn test_shutdown_event_stops_loop() {
        let (mut kiosk, _rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        assert!(kiosk.is_running());
        kiosk.handle_event(KioskEvent::Shutdown);
        assert!(!kiosk.is_running());
    }

    #[tokio::test]
    async fn test_unauthorized_scan_notice() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_event(KioskEvent::Scan {
            uid: "04AABB".into(),
        });
        kiosk.drain().await;

        let texts: Vec<String> = drain_messages(&mut rx)
            .into_iter()
            .filter_map(|m| match m {
                KioskMessage::Notice { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Scanned: 04AABB".to_string(),
                "Unauthorized kiosk (API key). Check configuration.".to_string(),
            ]
        );
    }

    fn notices(rx: &mut mpsc::UnboundedReceiver<KioskMessage>) -> Vec<String> {
        drain_messages(rx)
            .into_iter()
            .filter_map(|m| match m {
                KioskMessage::Notice { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_refused_leave_shows_backend_detail() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_event(KioskEvent::LeaveQueue {
            player_id: PlayerId(4),
        });
        kiosk.drain().await;
        assert_eq!(notices(&mut rx), vec!["Player not in queue".to_string()]);
    }

    #[test]
    fn test_blank_rename_never_reaches_backend() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_event(KioskEvent::UpdatePlayer {
            player_id: PlayerId(4),
            update: PlayerUpdate::Rename("   ".into()),
        });
        assert_eq!(kiosk.pending_calls(), 0);
        assert_eq!(notices(&mut rx), vec!["Name cannot be empty.".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_rename_shows_backend_detail() {
        let (mut kiosk, mut rx) = kiosk(StubBackend::default(), MalformedPayloadPolicy::Skip);
        kiosk.handle_event(KioskEvent::UpdatePlayer {
            player_id: PlayerId(4),
            update: PlayerUpdate::Rename("Ada".into()),
        });
        kiosk.drain().await;
        assert_eq!(notices(&mut rx), vec!["Name already taken".to_string()]);
    }

    #[test]
    fn test_absent_source_pends_forever() {
        let mut absent: Option<mpsc::Receiver<u8>> = None;
        let mut recv = tokio_test::task::spawn(recv_from(&mut absent));
        tokio_test::assert_pending!(recv.poll());
    }

    #[test]
    fn test_closed_source_is_dropped() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        drop(tx);
        let mut source = Some(rx);
        {
            let mut recv = tokio_test::task::spawn(recv_from(&mut source));
            tokio_test::assert_pending!(recv.poll());
        }
        assert!(source.is_none());
    }
}
