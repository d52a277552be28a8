//! Coordinator scenario and property tests
//!
//! Drives the animation coordinator the way a display surface would: every
//! `PlayArrival` is parked in a mock presentation layer that hands its ticket
//! back exactly once.
//!
//! Tests cover:
//! - The four reference scenarios (first arrival, folded arrivals, shrink,
//!   vanished arrival)
//! - Idempotent commits
//! - Single-flight, convergence, and monotonic commit over random sequences

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use kiosk_core::coordinator::{
    AnimationCoordinator, ArrivalRequest, CoordinatorEffect, CoordinatorError, Phase,
};
use kiosk_core::model::{Player, PlayerId, QueueSnapshot};
use kiosk_core::renderer::{self, SlotVisual};

const CAPACITY: usize = 6;

fn p(id: i64) -> Player {
    Player::new(id, format!("player_{id}"))
}

fn queue(ids: &[i64]) -> QueueSnapshot {
    QueueSnapshot::from_players(ids.iter().copied().map(p))
}

/// Presentation layer stand-in that records everything the coordinator asks
#[derive(Default)]
struct MockSurface {
    renders: Vec<Vec<Option<PlayerId>>>,
    in_flight: Option<ArrivalRequest>,
    arrivals_started: usize,
    commits: Vec<usize>,
}

impl MockSurface {
    fn apply(&mut self, effects: Vec<CoordinatorEffect>) {
        for effect in effects {
            match effect {
                CoordinatorEffect::Render(view) => self
                    .renders
                    .push(view.slots.iter().map(SlotVisual::player_id).collect()),
                CoordinatorEffect::PlayArrival(request) => {
                    assert!(
                        self.in_flight.is_none(),
                        "second arrival requested while one is in flight"
                    );
                    self.arrivals_started += 1;
                    self.in_flight = Some(request);
                }
                CoordinatorEffect::Committed(view) => self.commits.push(view.last_count),
            }
        }
    }

    /// Finish the in-flight animation, handing its ticket back exactly once
    fn finish(&mut self, coord: &mut AnimationCoordinator) -> bool {
        match self.in_flight.take() {
            Some(request) => {
                let effects = coord
                    .complete_arrival(request.ticket)
                    .expect("in-flight ticket must be accepted");
                self.apply(effects);
                true
            }
            None => false,
        }
    }

    fn last_render(&self) -> &[Option<PlayerId>] {
        self.renders.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

fn occupants(render: &[Option<PlayerId>]) -> usize {
    render.iter().filter(|slot| slot.is_some()).count()
}

fn ids(render: &[Option<PlayerId>]) -> Vec<i64> {
    render.iter().flatten().map(|id| id.0).collect()
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn scenario_a_first_arrival_into_empty_queue() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[])));

    surface.apply(coord.apply_snapshot(queue(&[1])));
    assert_eq!(occupants(surface.last_render()), 0);
    let request = surface.in_flight.as_ref().unwrap();
    assert_eq!(request.player.id, PlayerId(1));
    assert_eq!(request.slot, 0);

    assert!(surface.finish(&mut coord));
    assert_eq!(surface.last_render()[0], Some(PlayerId(1)));
    assert_eq!(coord.last_count(), 1);
    assert_eq!(coord.phase(), Phase::Committed);
}

#[test]
fn scenario_b_arrivals_during_animation_are_folded() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[1])));
    assert_eq!(coord.last_count(), 1);

    surface.apply(coord.apply_snapshot(queue(&[1, 2])));
    assert_eq!(surface.arrivals_started, 1);

    surface.apply(coord.apply_snapshot(queue(&[1, 2, 3])));
    surface.apply(coord.apply_snapshot(queue(&[1, 2, 3, 4])));
    assert_eq!(coord.pending(), Some(&queue(&[1, 2, 3, 4])));

    assert!(surface.finish(&mut coord));
    assert_eq!(ids(surface.last_render()), vec![1, 2, 3, 4]);
    assert_eq!(coord.last_count(), 4);
    assert_eq!(surface.arrivals_started, 1);
    assert!(surface.in_flight.is_none());
}

#[test]
fn scenario_c_shrink_renders_immediately() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[1, 2, 3])));

    surface.apply(coord.apply_snapshot(queue(&[1])));
    assert_eq!(ids(surface.last_render()), vec![1]);
    assert_eq!(coord.last_count(), 1);
    assert_eq!(surface.arrivals_started, 0);
}

#[test]
fn scenario_d_vanished_arrival_skips_animation() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[1])));

    // Two entries, but the one at index lastCount is an open slot
    let snapshot = QueueSnapshot::new(vec![Some(p(1)), None, Some(p(3))]);
    surface.apply(coord.apply_snapshot(snapshot));

    assert_eq!(surface.arrivals_started, 0);
    assert_eq!(surface.last_render()[0], Some(PlayerId(1)));
    assert_eq!(surface.last_render()[1], None);
    assert_eq!(surface.last_render()[2], Some(PlayerId(3)));
    assert_eq!(coord.last_count(), 2);
}

// =============================================================================
// Contract Tests
// =============================================================================

#[test]
fn committing_same_snapshot_twice_is_idempotent() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    let snapshot = QueueSnapshot::from_players([
        p(1).with_name("Ada Lovelace"),
        p(2).with_avatar("/static/avatars/2.png"),
    ]);

    surface.apply(coord.apply_snapshot(snapshot.clone()));
    let first = coord.rendered().clone();
    surface.apply(coord.apply_snapshot(snapshot.clone()));

    assert_eq!(coord.rendered(), &first);
    assert_eq!(first, renderer::render(snapshot.entries(), CAPACITY));
}

#[test]
fn never_completed_animation_holds_coordinator() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[])));
    surface.apply(coord.apply_snapshot(queue(&[1])));

    for n in 2..=5 {
        let ids: Vec<i64> = (1..=n).collect();
        surface.apply(coord.apply_snapshot(queue(&ids)));
    }

    assert!(coord.is_animating());
    assert_eq!(coord.last_count(), 0);
    assert_eq!(occupants(surface.last_render()), 0);
    assert_eq!(surface.arrivals_started, 1);
}

#[test]
fn ticket_from_finished_animation_cannot_be_replayed() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    surface.apply(coord.apply_snapshot(queue(&[])));
    surface.apply(coord.apply_snapshot(queue(&[1])));
    let first = surface.in_flight.take().unwrap();
    let first_id = first.ticket.id();
    surface.apply(coord.complete_arrival(first.ticket).unwrap());

    surface.apply(coord.apply_snapshot(queue(&[1, 2])));
    let second = surface.in_flight.take().unwrap();
    assert_ne!(second.ticket.id(), first_id);

    // Completing the current one twice is impossible: the ticket moved
    surface.apply(coord.complete_arrival(second.ticket).unwrap());
    assert_eq!(coord.last_count(), 2);
}

#[test]
fn completion_while_committed_is_rejected() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut other = AnimationCoordinator::new(CAPACITY);
    other.apply_snapshot(queue(&[]));
    let foreign = match other.apply_snapshot(queue(&[9])).into_iter().nth(1) {
        Some(CoordinatorEffect::PlayArrival(request)) => request.ticket,
        _ => panic!("expected an arrival request"),
    };

    coord.apply_snapshot(queue(&[1, 2]));
    let before = coord.rendered().clone();
    let result = coord.complete_arrival(foreign);

    assert!(matches!(result, Err(CoordinatorError::StaleTicket { .. })));
    assert_eq!(coord.rendered(), &before);
    assert_eq!(coord.last_count(), 2);
}

#[test]
fn commit_observer_reads_committed_identities() {
    let mut coord = AnimationCoordinator::new(CAPACITY);
    let mut surface = MockSurface::default();
    let rx = coord.subscribe();

    surface.apply(coord.apply_snapshot(queue(&[4, 5])));
    surface.apply(coord.apply_snapshot(queue(&[4, 5, 6])));
    assert!(!rx.borrow().as_ref().unwrap().snapshot.contains(PlayerId(6)));

    surface.finish(&mut coord);
    assert!(rx.borrow().as_ref().unwrap().snapshot.contains(PlayerId(6)));
}

// =============================================================================
// Properties
// =============================================================================

/// One step of a generated run: a snapshot, or the surface finishing
#[derive(Clone, Debug)]
enum Step {
    Snapshot(Vec<Option<i64>>),
    Finish,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => prop::collection::vec(prop::option::weighted(0.85, 1i64..20), 0..9)
            .prop_map(Step::Snapshot),
        1 => Just(Step::Finish),
    ]
}

fn to_snapshot(entries: &[Option<i64>]) -> QueueSnapshot {
    QueueSnapshot::new(entries.iter().map(|e| e.map(p)).collect())
}

proptest! {
    /// Property: single-flight, monotonic commit, and convergence.
    ///
    /// The mock surface panics if a second arrival is requested while one is
    /// in flight; lastCount must only move on commits and match each commit;
    /// after draining animations the display equals the final snapshot.
    #[test]
    fn reconciliation_properties(
        steps in prop::collection::vec(step(), 1..60),
        last in prop::collection::vec(prop::option::weighted(0.85, 1i64..20), 0..9),
    ) {
        let mut coord = AnimationCoordinator::new(CAPACITY);
        let mut surface = MockSurface::default();

        for step in &steps {
            let before = coord.last_count();
            let commits_before = surface.commits.len();
            match step {
                Step::Snapshot(entries) => surface.apply(coord.apply_snapshot(to_snapshot(entries))),
                Step::Finish => { surface.finish(&mut coord); }
            }
            if surface.commits.len() == commits_before {
                prop_assert_eq!(coord.last_count(), before);
            } else {
                prop_assert_eq!(Some(&coord.last_count()), surface.commits.last());
            }
            prop_assert_eq!(coord.is_animating(), surface.in_flight.is_some());
        }

        let final_snapshot = to_snapshot(&last).truncated(CAPACITY);
        surface.apply(coord.apply_snapshot(final_snapshot.clone()));
        while surface.finish(&mut coord) {
            surface.apply(coord.apply_snapshot(final_snapshot.clone()));
        }

        prop_assert_eq!(coord.rendered(), &renderer::render(final_snapshot.entries(), CAPACITY));
        prop_assert_eq!(coord.last_count(), final_snapshot.occupant_count());
        prop_assert_eq!(coord.committed().map(|v| &v.snapshot), Some(&final_snapshot));
    }
}
