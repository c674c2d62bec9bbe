//! Per-surface visual transitions as cancellable futures.
//!
//! The coordinator keeps at most one pending transition per surface. Starting another transition
//! on the same surface supersedes the pending one: its styling is stripped, its [`Transition`]
//! resolves as [`TransitionOutcome::Superseded`] and its teardown callback is dropped. A pending
//! transition settles exactly once, through whichever comes first of
//! [`AnimationCoordinator::complete`] (the host echoing the [`TransitionToken`] it was handed) or
//! [`AnimationCoordinator::poll_timers`] (the fallback deadline, nominal duration plus grace).
//!
//! Every settlement is also queued as a [`SettledTransition`] so an owner can finish lifecycle
//! steps without holding the futures.

use std::{
    collections::{BTreeMap, VecDeque},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
    time::Duration,
};

use futures::channel::oneshot;
use platform_host::{Clock, SurfaceId, TransitionEffect, TransitionToken, VisualSurface};
use serde::{Deserialize, Serialize};

use crate::config::AnimationSettings;

/// Teardown callback run when a close or minimize transition settles.
pub type Teardown = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Open,
    Close,
    Focus,
    Blur,
    Minimize,
    Restore,
}

impl TransitionKind {
    pub const fn effect(self) -> TransitionEffect {
        match self {
            Self::Open => TransitionEffect::SlideIn,
            Self::Close => TransitionEffect::SlideOut,
            Self::Focus => TransitionEffect::FocusIn,
            Self::Blur => TransitionEffect::FocusOut,
            Self::Minimize => TransitionEffect::Minimize,
            Self::Restore => TransitionEffect::Restore,
        }
    }

    /// Whether the terminal state of this transition takes the surface out of view.
    pub const fn hides_surface(self) -> bool {
        matches!(self, Self::Close | Self::Minimize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a transition settled.
pub enum TransitionOutcome {
    /// The host reported natural completion.
    Completed,
    /// The fallback deadline passed without a completion report.
    TimedOut,
    /// A later request on the same surface, or a cancel, replaced this one.
    Superseded,
    /// The surface was already detached; nothing was played.
    Skipped,
}

impl TransitionOutcome {
    /// Whether the transition reached its terminal state through its own path.
    pub const fn finished(self) -> bool {
        !matches!(self, Self::Superseded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Settlement report queued for the coordinator's owner.
pub struct SettledTransition {
    pub surface_id: SurfaceId,
    pub generation: u64,
    pub kind: TransitionKind,
    pub outcome: TransitionOutcome,
}

/// Awaitable handle for one transition request.
///
/// Resolves exactly once. Dropping it does not cancel the transition.
#[derive(Debug)]
pub struct Transition {
    state: TransitionState,
}

#[derive(Debug)]
enum TransitionState {
    Settled(TransitionOutcome),
    Pending(oneshot::Receiver<TransitionOutcome>),
}

impl Transition {
    /// A transition that is already settled.
    pub fn settled(outcome: TransitionOutcome) -> Self {
        Self {
            state: TransitionState::Settled(outcome),
        }
    }

    fn pending(receiver: oneshot::Receiver<TransitionOutcome>) -> Self {
        Self {
            state: TransitionState::Pending(receiver),
        }
    }
}

impl Future for Transition {
    type Output = TransitionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            TransitionState::Settled(outcome) => Poll::Ready(*outcome),
            TransitionState::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                // Sender dropped without a report: cancelled.
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(TransitionOutcome::Superseded),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

struct PendingTransition {
    generation: u64,
    kind: TransitionKind,
    surface: Rc<dyn VisualSurface>,
    deadline_ms: u64,
    sender: oneshot::Sender<TransitionOutcome>,
    on_complete: Option<Teardown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Snapshot of coordinator activity.
pub struct AnimationMetrics {
    pub active_transitions: usize,
    pub open_ms: u64,
    pub close_ms: u64,
    pub focus_ms: u64,
    pub minimize_ms: u64,
    pub fallback_grace_ms: u64,
    pub reduced_motion: bool,
}

pub struct AnimationCoordinator {
    settings: AnimationSettings,
    clock: Rc<dyn Clock>,
    next_generation: u64,
    pending: BTreeMap<SurfaceId, PendingTransition>,
    settled: VecDeque<SettledTransition>,
}

impl AnimationCoordinator {
    pub fn new(settings: AnimationSettings, clock: Rc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            next_generation: 1,
            pending: BTreeMap::new(),
            settled: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        self.settings.reduced_motion = reduced_motion;
    }

    /// Entrance transition.
    pub fn open(&mut self, surface: &Rc<dyn VisualSurface>) -> Transition {
        self.start(surface, TransitionKind::Open, None)
    }

    /// Exit transition; `on_complete` runs before the returned future resolves.
    pub fn close(&mut self, surface: &Rc<dyn VisualSurface>, on_complete: Option<Teardown>) -> Transition {
        self.start(surface, TransitionKind::Close, on_complete)
    }

    pub fn focus(&mut self, surface: &Rc<dyn VisualSurface>) -> Transition {
        self.start(surface, TransitionKind::Focus, None)
    }

    pub fn blur(&mut self, surface: &Rc<dyn VisualSurface>) -> Transition {
        self.start(surface, TransitionKind::Blur, None)
    }

    /// Scale-to-vanish; the surface is hidden once it settles.
    pub fn minimize(
        &mut self,
        surface: &Rc<dyn VisualSurface>,
        on_complete: Option<Teardown>,
    ) -> Transition {
        self.start(surface, TransitionKind::Minimize, on_complete)
    }

    /// Shows the surface, then plays the inverse of minimize.
    pub fn restore(&mut self, surface: &Rc<dyn VisualSurface>) -> Transition {
        self.start(surface, TransitionKind::Restore, None)
    }

    /// Starts `kind` on `surface`, superseding whatever is pending there.
    pub fn start(
        &mut self,
        surface: &Rc<dyn VisualSurface>,
        kind: TransitionKind,
        on_complete: Option<Teardown>,
    ) -> Transition {
        let surface_id = surface.id();
        self.supersede(surface_id);

        let generation = self.next_generation;
        self.next_generation += 1;

        if !surface.is_attached() {
            if let Some(teardown) = on_complete {
                teardown();
            }
            return self.settle_immediately(surface_id, generation, kind, TransitionOutcome::Skipped);
        }

        if kind == TransitionKind::Restore {
            surface.show();
        }

        if self.settings.reduced_motion {
            apply_terminal_state(surface.as_ref(), kind);
            if let Some(teardown) = on_complete {
                teardown();
            }
            return self.settle_immediately(
                surface_id,
                generation,
                kind,
                TransitionOutcome::Completed,
            );
        }

        let duration = self.duration_for(kind);
        let token = TransitionToken {
            surface_id,
            generation,
        };
        surface.play_transition(token, kind.effect(), duration);

        let (sender, receiver) = oneshot::channel();
        let grace = self.settings.fallback_grace_ms;
        self.pending.insert(
            surface_id,
            PendingTransition {
                generation,
                kind,
                surface: Rc::clone(surface),
                deadline_ms: self
                    .clock
                    .now_ms()
                    .saturating_add(duration_ms(duration))
                    .saturating_add(grace),
                sender,
                on_complete,
            },
        );
        Transition::pending(receiver)
    }

    /// Handles a host completion report. Returns `false` for stale or unknown tokens.
    pub fn complete(&mut self, token: TransitionToken) -> bool {
        let current = self
            .pending
            .get(&token.surface_id)
            .is_some_and(|pending| pending.generation == token.generation);
        if current {
            self.settle(token.surface_id, TransitionOutcome::Completed);
        }
        current
    }

    /// Force-settles every transition whose fallback deadline has passed. Returns how many fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<SurfaceId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline_ms <= now)
            .map(|(surface_id, _)| *surface_id)
            .collect();
        for surface_id in &expired {
            self.settle(*surface_id, TransitionOutcome::TimedOut);
        }
        expired.len()
    }

    /// Drops the pending transition on `surface_id` without replacement.
    ///
    /// Styling is stripped, the teardown callback does not run, and the transition's future
    /// resolves as superseded.
    pub fn cancel_animation(&mut self, surface_id: SurfaceId) -> bool {
        self.supersede(surface_id)
    }

    pub fn cancel_all(&mut self) {
        let surfaces: Vec<SurfaceId> = self.pending.keys().copied().collect();
        for surface_id in surfaces {
            self.supersede(surface_id);
        }
    }

    pub fn is_animating(&self, surface_id: SurfaceId) -> bool {
        self.pending.contains_key(&surface_id)
    }

    /// Token of the pending transition on `surface_id`.
    pub fn pending_token(&self, surface_id: SurfaceId) -> Option<TransitionToken> {
        self.pending.get(&surface_id).map(|pending| TransitionToken {
            surface_id,
            generation: pending.generation,
        })
    }

    pub fn pending_kind(&self, surface_id: SurfaceId) -> Option<TransitionKind> {
        self.pending.get(&surface_id).map(|pending| pending.kind)
    }

    /// Drains queued settlement reports, oldest first.
    pub fn take_settled(&mut self) -> Vec<SettledTransition> {
        self.settled.drain(..).collect()
    }

    pub fn metrics(&self) -> AnimationMetrics {
        AnimationMetrics {
            active_transitions: self.pending.len(),
            open_ms: self.settings.open_ms,
            close_ms: self.settings.close_ms,
            focus_ms: self.settings.focus_ms,
            minimize_ms: self.settings.minimize_ms,
            fallback_grace_ms: self.settings.fallback_grace_ms,
            reduced_motion: self.settings.reduced_motion,
        }
    }

    fn duration_for(&self, kind: TransitionKind) -> Duration {
        match kind {
            TransitionKind::Open => self.settings.open(),
            TransitionKind::Close => self.settings.close(),
            TransitionKind::Focus | TransitionKind::Blur => self.settings.focus(),
            TransitionKind::Minimize | TransitionKind::Restore => self.settings.minimize(),
        }
    }

    fn supersede(&mut self, surface_id: SurfaceId) -> bool {
        let Some(pending) = self.pending.remove(&surface_id) else {
            return false;
        };
        pending.surface.clear_transition();
        let _ = pending.sender.send(TransitionOutcome::Superseded);
        self.settled.push_back(SettledTransition {
            surface_id,
            generation: pending.generation,
            kind: pending.kind,
            outcome: TransitionOutcome::Superseded,
        });
        true
    }

    fn settle(&mut self, surface_id: SurfaceId, outcome: TransitionOutcome) {
        let Some(pending) = self.pending.remove(&surface_id) else {
            return;
        };
        apply_terminal_state(pending.surface.as_ref(), pending.kind);
        if let Some(teardown) = pending.on_complete {
            teardown();
        }
        // The caller may have dropped the future.
        let _ = pending.sender.send(outcome);
        self.settled.push_back(SettledTransition {
            surface_id,
            generation: pending.generation,
            kind: pending.kind,
            outcome,
        });
    }

    fn settle_immediately(
        &mut self,
        surface_id: SurfaceId,
        generation: u64,
        kind: TransitionKind,
        outcome: TransitionOutcome,
    ) -> Transition {
        self.settled.push_back(SettledTransition {
            surface_id,
            generation,
            kind,
            outcome,
        });
        Transition::settled(outcome)
    }
}

fn apply_terminal_state(surface: &dyn VisualSurface, kind: TransitionKind) {
    surface.clear_transition();
    if kind.hides_surface() {
        surface.hide();
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::FutureExt;
    use platform_host::{ManualClock, MemorySurface};
    use pretty_assertions::assert_eq;

    use super::*;

    fn coordinator() -> (AnimationCoordinator, ManualClock) {
        let clock = ManualClock::new(0);
        (
            AnimationCoordinator::new(AnimationSettings::default(), Rc::new(clock.clone())),
            clock,
        )
    }

    fn surface(id: u64) -> (MemorySurface, Rc<dyn VisualSurface>) {
        let surface = MemorySurface::new(SurfaceId(id), "Test");
        let handle: Rc<dyn VisualSurface> = Rc::new(surface.clone());
        (surface, handle)
    }

    #[test]
    fn completion_report_resolves_and_clears_styling() {
        let (mut animations, _) = coordinator();
        let (observer, handle) = surface(1);

        let mut transition = animations.open(&handle);
        assert_eq!((&mut transition).now_or_never(), None);
        let token = observer.running_token().expect("running");

        assert!(animations.complete(token));
        assert_eq!(transition.now_or_never(), Some(TransitionOutcome::Completed));
        assert_eq!(observer.snapshot().transition, None);
        assert!(observer.snapshot().visible);
        assert!(!animations.is_animating(SurfaceId(1)));
    }

    #[test]
    fn second_request_supersedes_the_first() {
        let (mut animations, _) = coordinator();
        let (observer, handle) = surface(1);

        let first = animations.open(&handle);
        let stale = observer.running_token().expect("first token");
        let second = animations.focus(&handle);

        assert_eq!(first.now_or_never(), Some(TransitionOutcome::Superseded));
        assert!(!animations.complete(stale));
        assert!(animations.is_animating(SurfaceId(1)));
        assert_eq!(animations.pending_kind(SurfaceId(1)), Some(TransitionKind::Focus));

        let token = observer.running_token().expect("second token");
        assert!(animations.complete(token));
        assert_eq!(second.now_or_never(), Some(TransitionOutcome::Completed));

        let outcomes: Vec<_> = animations
            .take_settled()
            .into_iter()
            .map(|settled| (settled.kind, settled.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (TransitionKind::Open, TransitionOutcome::Superseded),
                (TransitionKind::Focus, TransitionOutcome::Completed),
            ]
        );
    }

    #[test]
    fn superseded_close_never_runs_its_teardown() {
        let (mut animations, _) = coordinator();
        let (_, handle) = surface(1);
        let torn_down = Rc::new(Cell::new(false));
        let flag = Rc::clone(&torn_down);

        let _close = animations.close(&handle, Some(Box::new(move || flag.set(true))));
        let _open = animations.open(&handle);
        animations.cancel_all();

        assert!(!torn_down.get());
    }

    #[test]
    fn fallback_timer_fires_after_duration_plus_grace() {
        let (mut animations, clock) = coordinator();
        let (observer, handle) = surface(1);
        let torn_down = Rc::new(Cell::new(false));
        let flag = Rc::clone(&torn_down);

        let transition = animations.minimize(&handle, Some(Box::new(move || flag.set(true))));

        clock.advance(349);
        assert_eq!(animations.poll_timers(), 0);
        clock.advance(1);
        assert_eq!(animations.poll_timers(), 1);

        assert_eq!(transition.now_or_never(), Some(TransitionOutcome::TimedOut));
        assert!(torn_down.get());
        let snapshot = observer.snapshot();
        assert!(!snapshot.visible);
        assert_eq!(snapshot.transition, None);
    }

    #[test]
    fn detached_surface_settles_immediately() {
        let (mut animations, _) = coordinator();
        let (observer, handle) = surface(1);
        observer.detach();
        let torn_down = Rc::new(Cell::new(false));
        let flag = Rc::clone(&torn_down);

        let transition = animations.close(&handle, Some(Box::new(move || flag.set(true))));

        assert_eq!(transition.now_or_never(), Some(TransitionOutcome::Skipped));
        assert!(torn_down.get());
        assert!(observer.snapshot().history.is_empty());
        assert_eq!(animations.metrics().active_transitions, 0);
    }

    #[test]
    fn restore_shows_surface_before_playing() {
        let (mut animations, _) = coordinator();
        let (observer, handle) = surface(1);
        handle.hide();

        let _restore = animations.restore(&handle);

        let snapshot = observer.snapshot();
        assert!(snapshot.visible);
        assert_eq!(snapshot.history, vec![TransitionEffect::Restore]);
    }

    #[test]
    fn reduced_motion_applies_terminal_state_without_playing() {
        let (mut animations, _) = coordinator();
        animations.set_reduced_motion(true);
        let (observer, handle) = surface(1);

        let transition = animations.minimize(&handle, None);

        assert_eq!(transition.now_or_never(), Some(TransitionOutcome::Completed));
        assert!(!observer.snapshot().visible);
        assert!(observer.snapshot().history.is_empty());
    }

    #[test]
    fn cancel_strips_styling_and_reports_superseded() {
        let (mut animations, _) = coordinator();
        let (observer, handle) = surface(3);

        let transition = animations.blur(&handle);
        assert!(animations.cancel_animation(SurfaceId(3)));
        assert!(!animations.cancel_animation(SurfaceId(3)));

        assert_eq!(transition.now_or_never(), Some(TransitionOutcome::Superseded));
        assert_eq!(observer.snapshot().transition, None);
    }

    #[test]
    fn transitions_on_different_surfaces_are_independent() {
        let (mut animations, _) = coordinator();
        let (first_observer, first) = surface(1);
        let (_, second) = surface(2);

        let open_first = animations.open(&first);
        let _open_second = animations.open(&second);
        assert_eq!(animations.metrics().active_transitions, 2);

        let token = first_observer.running_token().expect("token");
        assert!(animations.complete(token));
        assert_eq!(open_first.now_or_never(), Some(TransitionOutcome::Completed));
        assert!(animations.is_animating(SurfaceId(2)));
    }
}
