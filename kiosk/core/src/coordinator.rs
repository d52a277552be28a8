//! Animation Coordinator
//!
//! Reconciles the backend's queue snapshots with the locally rendered queue.
//! The backend is the source of truth and changes faster than arrival
//! animations can play, so the coordinator:
//!
//! - plays at most one arrival animation at a time
//! - folds every snapshot seen during an animation into a single pending slot
//! - renders either a committed snapshot or a pre-arrival prefix, never a mix
//! - converges on the latest snapshot once the in-flight animation completes
//!
//! # State Machine
//!
//! ```text
//!                 first snapshot
//!  Uninitialized ───────────────► Committed ◄───────────────┐
//!                                   │   ▲                   │
//!                         growth    │   │ shrink/unchanged  │ complete_arrival
//!                   (arrival known) │   └───────────────────┤ (commit pending)
//!                                   ▼                       │
//!                               Animating ──────────────────┘
//!                          (snapshots overwrite pending)
//! ```
//!
//! The coordinator is sans-IO: every input returns the effects the caller must
//! carry out, in order. Nothing else in the crate mutates the committed view.

use tokio::sync::watch;
use tracing::{debug, error};

use crate::model::{Player, QueueSnapshot};
use crate::renderer::{self, QueueView};

/// Errors from driving the coordinator
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Completion for an animation that is not in flight
    #[error("arrival ticket #{ticket} does not match the animation in flight")]
    StaleTicket {
        /// Id of the rejected ticket
        ticket: u64,
    },
}

/// Proof of a single in-flight arrival animation
///
/// Deliberately neither `Clone` nor `Copy`: handing it back through
/// [`AnimationCoordinator::complete_arrival`] consumes it, so each animation
/// completes at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ArrivalTicket {
    id: u64,
}

impl ArrivalTicket {
    /// Ticket number (for logs)
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Request to the presentation layer to play one arrival animation
#[derive(Debug)]
pub struct ArrivalRequest {
    /// Must be returned exactly once when the animation ends
    pub ticket: ArrivalTicket,
    /// The arriving player
    pub player: Player,
    /// Slot the player lands in
    pub slot: usize,
}

/// The snapshot currently committed to the display
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommittedView {
    /// Committed snapshot
    pub snapshot: QueueSnapshot,
    /// Occupant count of `snapshot`
    pub last_count: usize,
}

/// Side effects requested by the coordinator, to be applied in order
#[derive(Debug)]
pub enum CoordinatorEffect {
    /// Replace the rendered queue
    Render(QueueView),
    /// Start the single-shot arrival animation
    PlayArrival(ArrivalRequest),
    /// A new baseline was committed
    Committed(CommittedView),
}

/// Coordinator phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot seen yet
    Uninitialized,
    /// Display shows the committed snapshot
    Committed,
    /// An arrival animation is in flight
    Animating {
        /// Ticket of the in-flight animation
        ticket: u64,
    },
}

/// Single-flight reconciliation of remote snapshots into the rendered queue
pub struct AnimationCoordinator {
    capacity: usize,
    phase: Phase,
    pending: Option<QueueSnapshot>,
    committed: CommittedView,
    rendered: QueueView,
    next_ticket: u64,
    observers: watch::Sender<Option<CommittedView>>,
}

impl AnimationCoordinator {
    /// Create a coordinator for a queue with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        let (observers, _) = watch::channel(None);
        Self {
            capacity,
            phase: Phase::Uninitialized,
            pending: None,
            committed: CommittedView::default(),
            rendered: renderer::render(&[], capacity),
            next_ticket: 1,
            observers,
        }
    }

    /// Slot count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether an arrival animation is in flight
    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating { .. })
    }

    /// Occupant count of the last committed snapshot
    pub fn last_count(&self) -> usize {
        self.committed.last_count
    }

    /// Last committed view (None before the first snapshot)
    pub fn committed(&self) -> Option<&CommittedView> {
        match self.phase {
            Phase::Uninitialized => None,
            _ => Some(&self.committed),
        }
    }

    /// Snapshot held back while animating
    pub fn pending(&self) -> Option<&QueueSnapshot> {
        self.pending.as_ref()
    }

    /// What the display currently shows
    pub fn rendered(&self) -> &QueueView {
        &self.rendered
    }

    /// Subscribe to commits
    ///
    /// The receiver always holds the latest committed view, so collaborators
    /// (profile taps, start eligibility) read identities without polling.
    pub fn subscribe(&self) -> watch::Receiver<Option<CommittedView>> {
        self.observers.subscribe()
    }

    /// Feed a freshly fetched snapshot
    pub fn apply_snapshot(&mut self, snapshot: QueueSnapshot) -> Vec<CoordinatorEffect> {
        let snapshot = snapshot.truncated(self.capacity);
        let count = snapshot.occupant_count();

        match self.phase {
            Phase::Uninitialized => {
                debug!(count, "initial queue snapshot");
                self.commit(snapshot)
            }
            Phase::Animating { ticket } => {
                debug!(ticket, count, "snapshot held pending while animating");
                self.pending = Some(snapshot);
                Vec::new()
            }
            Phase::Committed if count > self.committed.last_count => self.begin_arrival(snapshot),
            Phase::Committed => self.commit(snapshot),
        }
    }

    /// The presentation layer finished the arrival animation for `ticket`
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleTicket`] if `ticket` is not the
    /// animation in flight; the coordinator is left untouched.
    pub fn complete_arrival(
        &mut self,
        ticket: ArrivalTicket,
    ) -> Result<Vec<CoordinatorEffect>, CoordinatorError> {
        match self.phase {
            Phase::Animating { ticket: current } if current == ticket.id => {}
            _ => {
                error!(ticket = ticket.id, phase = ?self.phase, "arrival completion for unknown ticket");
                return Err(CoordinatorError::StaleTicket { ticket: ticket.id });
            }
        }

        // Pending is always set on entry to Animating; the committed snapshot
        // is the fallback only if that invariant is ever broken.
        let latest = self
            .pending
            .take()
            .unwrap_or_else(|| self.committed.snapshot.clone());
        debug!(
            ticket = ticket.id,
            count = latest.occupant_count(),
            "arrival complete, committing latest snapshot"
        );
        Ok(self.commit(latest))
    }

    fn begin_arrival(&mut self, snapshot: QueueSnapshot) -> Vec<CoordinatorEffect> {
        let last_count = self.committed.last_count;
        let Some(player) = snapshot.entry(last_count).cloned() else {
            debug!(
                last_count,
                "expected arrival already gone, committing without animation"
            );
            return self.commit(snapshot);
        };

        let ticket = ArrivalTicket {
            id: self.next_ticket,
        };
        self.next_ticket += 1;

        debug!(
            ticket = ticket.id,
            player = %player.id,
            slot = last_count,
            "animating arrival"
        );

        let pre_arrival = snapshot.prefix(last_count);
        self.rendered = renderer::render(pre_arrival.entries(), self.capacity);
        self.phase = Phase::Animating { ticket: ticket.id };
        self.pending = Some(snapshot);

        vec![
            CoordinatorEffect::Render(self.rendered.clone()),
            CoordinatorEffect::PlayArrival(ArrivalRequest {
                ticket,
                player,
                slot: last_count,
            }),
        ]
    }

    /// The only place the committed baseline changes
    fn commit(&mut self, snapshot: QueueSnapshot) -> Vec<CoordinatorEffect> {
        self.rendered = renderer::render(snapshot.entries(), self.capacity);
        self.committed = CommittedView {
            last_count: snapshot.occupant_count(),
            snapshot,
        };
        self.pending = None;
        self.phase = Phase::Committed;
        self.observers.send_replace(Some(self.committed.clone()));

        vec![
            CoordinatorEffect::Render(self.rendered.clone()),
            CoordinatorEffect::Committed(self.committed.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerId;
    use pretty_assertions::assert_eq;

    fn p(id: i64) -> Player {
        Player::new(id, format!("player_{id}"))
    }

    fn queue(ids: &[i64]) -> QueueSnapshot {
        QueueSnapshot::from_players(ids.iter().copied().map(p))
    }

    fn take_arrival(effects: Vec<CoordinatorEffect>) -> ArrivalRequest {
        effects
            .into_iter()
            .find_map(|e| match e {
                CoordinatorEffect::PlayArrival(req) => Some(req),
                _ => None,
            })
            .expect("expected an arrival request")
    }

    #[test]
    fn test_first_snapshot_commits_without_animation() {
        let mut coord = AnimationCoordinator::new(6);
        let effects = coord.apply_snapshot(queue(&[1, 2]));

        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], CoordinatorEffect::Render(_)));
        assert!(matches!(effects[1], CoordinatorEffect::Committed(_)));
        assert_eq!(coord.phase(), Phase::Committed);
        assert_eq!(coord.last_count(), 2);
        assert_eq!(coord.rendered().occupied(), 2);
    }

    #[test]
    fn test_growth_renders_prefix_and_holds_pending() {
        let mut coord = AnimationCoordinator::new(6);
        coord.apply_snapshot(queue(&[1]));

        let effects = coord.apply_snapshot(queue(&[1, 2]));
        assert_eq!(coord.rendered().occupied(), 1);
        assert_eq!(coord.last_count(), 1);
        assert_eq!(coord.pending(), Some(&queue(&[1, 2])));

        let request = take_arrival(effects);
        assert_eq!(request.player.id, PlayerId(2));
        assert_eq!(request.slot, 1);
    }

    #[test]
    fn test_snapshots_while_animating_are_folded() {
        let mut coord = AnimationCoordinator::new(6);
        coord.apply_snapshot(queue(&[1]));
        let request = take_arrival(coord.apply_snapshot(queue(&[1, 2])));

        assert!(coord.apply_snapshot(queue(&[1, 2, 3])).is_empty());
        assert!(coord.apply_snapshot(queue(&[1, 2, 3, 4])).is_empty());
        assert_eq!(coord.pending(), Some(&queue(&[1, 2, 3, 4])));

        let effects = coord.complete_arrival(request.ticket).unwrap();
        assert!(effects
            .iter()
            .all(|e| !matches!(e, CoordinatorEffect::PlayArrival(_))));
        assert_eq!(coord.last_count(), 4);
        assert!(coord.pending().is_none());
    }

    #[test]
    fn test_shrink_while_animating_commits_shrunk_queue() {
        let mut coord = AnimationCoordinator::new(6);
        coord.apply_snapshot(queue(&[1]));
        let request = take_arrival(coord.apply_snapshot(queue(&[1, 2])));
        coord.apply_snapshot(queue(&[]));

        coord.complete_arrival(request.ticket).unwrap();
        assert_eq!(coord.last_count(), 0);
        assert_eq!(coord.rendered().occupied(), 0);
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let mut coord = AnimationCoordinator::new(6);
        coord.apply_snapshot(queue(&[]));
        let result = coord.complete_arrival(ArrivalTicket { id: 42 });

        assert!(matches!(
            result,
            Err(CoordinatorError::StaleTicket { ticket: 42 })
        ));
        assert_eq!(coord.phase(), Phase::Committed);
    }

    #[test]
    fn test_snapshot_truncated_to_capacity() {
        let mut coord = AnimationCoordinator::new(3);
        coord.apply_snapshot(queue(&[1, 2, 3, 4, 5]));
        assert_eq!(coord.last_count(), 3);
        assert_eq!(coord.rendered().capacity(), 3);
    }

    #[test]
    fn test_subscribers_see_each_commit() {
        let mut coord = AnimationCoordinator::new(6);
        let rx = coord.subscribe();
        assert!(rx.borrow().is_none());

        coord.apply_snapshot(queue(&[7]));
        let seen = rx.borrow().clone().unwrap();
        assert_eq!(seen.last_count, 1);
        assert!(seen.snapshot.contains(PlayerId(7)));
    }

    #[test]
    fn test_subscribers_not_notified_of_pre_arrival_render() {
        let mut coord = AnimationCoordinator::new(6);
        let mut rx = coord.subscribe();
        coord.apply_snapshot(queue(&[1]));
        rx.borrow_and_update();

        let _request = take_arrival(coord.apply_snapshot(queue(&[1, 2])));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow().as_ref().map(|v| v.last_count), Some(1));
    }
}
