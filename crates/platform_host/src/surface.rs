//! Visual surface contract for runtime-managed windows.
//!
//! A surface is the host's rendering of one window: it can be shown or hidden, play a named
//! transition for a duration, and accept geometry/stacking updates. The runtime reports
//! completion of a transition back through the [`TransitionToken`] it handed to the surface, so
//! hosts never need to know which transition is current.

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc, time::Duration};

use serde::{Deserialize, Serialize};

/// Stable identity of a window's visual surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Named transition effects a surface knows how to play.
pub enum TransitionEffect {
    /// Scale, fade and translate in.
    SlideIn,
    /// Scale, fade and translate out.
    SlideOut,
    /// Subtle scale-up with accent glow.
    FocusIn,
    /// Inverse of [`TransitionEffect::FocusIn`].
    FocusOut,
    /// Scale down to vanish.
    Minimize,
    /// Inverse of [`TransitionEffect::Minimize`].
    Restore,
}

impl TransitionEffect {
    /// Returns the keyframe name hosts bind this effect to.
    pub const fn keyframes(self) -> &'static str {
        match self {
            Self::SlideIn => "windowSlideIn",
            Self::SlideOut => "windowSlideOut",
            Self::FocusIn => "windowFocusIn",
            Self::FocusOut => "windowFocusOut",
            Self::Minimize => "windowMinimize",
            Self::Restore => "windowRestore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifies one transition request on one surface.
///
/// Hosts echo the token back when the transition naturally completes; a token whose generation
/// is no longer current belongs to a superseded transition.
pub struct TransitionToken {
    /// Surface the transition runs on.
    pub surface_id: SurfaceId,
    /// Monotonic request generation.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Surface placement in desktop pixels.
pub struct SurfaceRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

/// Host rendering of a single window.
///
/// Methods take `&self`; implementations hold their own interior state so the runtime can keep
/// shared handles for pending transitions.
pub trait VisualSurface {
    /// Returns the surface identity.
    fn id(&self) -> SurfaceId;

    /// Returns `false` once the host has removed the surface.
    fn is_attached(&self) -> bool;

    /// Makes the surface visible.
    fn show(&self);

    /// Hides the surface without destroying it.
    fn hide(&self);

    /// Starts playing `effect` for `duration`, replacing any running effect.
    fn play_transition(&self, token: TransitionToken, effect: TransitionEffect, duration: Duration);

    /// Strips any transition styling, leaving the surface in a static state.
    fn clear_transition(&self);

    /// Applies position and size.
    fn set_rect(&self, rect: SurfaceRect);

    /// Applies stacking order.
    fn set_z_index(&self, z_index: u32);

    /// Applies the active/inactive decoration.
    fn set_active(&self, active: bool);
}

/// Allocates and releases surfaces for windows.
pub trait SurfaceFactory {
    /// Creates the surface backing a new window.
    fn create_surface(&mut self, surface_id: SurfaceId, title: &str) -> Rc<dyn VisualSurface>;

    /// Removes the surface of a destroyed window.
    fn destroy_surface(&mut self, surface_id: SurfaceId);
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Observable state of a [`MemorySurface`].
pub struct SurfaceSnapshot {
    /// Title the surface was created with.
    pub title: String,
    /// Whether the host still holds the surface.
    pub attached: bool,
    /// Whether the surface is shown.
    pub visible: bool,
    /// Currently running transition, if any.
    pub transition: Option<(TransitionToken, TransitionEffect, Duration)>,
    /// Last applied geometry.
    pub rect: SurfaceRect,
    /// Last applied stacking order.
    pub z_index: u32,
    /// Last applied active decoration.
    pub active: bool,
    /// Every effect started on this surface, oldest first.
    pub history: Vec<TransitionEffect>,
}

#[derive(Debug, Clone)]
/// In-memory surface recording everything the runtime asks of it.
pub struct MemorySurface {
    id: SurfaceId,
    inner: Rc<RefCell<SurfaceSnapshot>>,
}

impl MemorySurface {
    /// Creates an attached, visible surface.
    pub fn new(id: SurfaceId, title: impl Into<String>) -> Self {
        Self {
            id,
            inner: Rc::new(RefCell::new(SurfaceSnapshot {
                title: title.into(),
                attached: true,
                visible: true,
                transition: None,
                rect: SurfaceRect::default(),
                z_index: 0,
                active: false,
                history: Vec::new(),
            })),
        }
    }

    /// Returns a copy of the current surface state.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.inner.borrow().clone()
    }

    /// Returns the token of the running transition, as a host would report on completion.
    pub fn running_token(&self) -> Option<TransitionToken> {
        self.inner
            .borrow()
            .transition
            .map(|(token, _, _)| token)
    }

    /// Simulates the host removing the surface out from under the runtime.
    pub fn detach(&self) {
        let mut state = self.inner.borrow_mut();
        state.attached = false;
        state.transition = None;
    }
}

impl VisualSurface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    fn show(&self) {
        self.inner.borrow_mut().visible = true;
    }

    fn hide(&self) {
        self.inner.borrow_mut().visible = false;
    }

    fn play_transition(&self, token: TransitionToken, effect: TransitionEffect, duration: Duration) {
        let mut state = self.inner.borrow_mut();
        state.transition = Some((token, effect, duration));
        state.history.push(effect);
    }

    fn clear_transition(&self) {
        self.inner.borrow_mut().transition = None;
    }

    fn set_rect(&self, rect: SurfaceRect) {
        self.inner.borrow_mut().rect = rect;
    }

    fn set_z_index(&self, z_index: u32) {
        self.inner.borrow_mut().z_index = z_index;
    }

    fn set_active(&self, active: bool) {
        self.inner.borrow_mut().active = active;
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory [`SurfaceFactory`] keeping every live surface inspectable.
///
/// Clones share the same surface table.
pub struct MemorySurfaceHost {
    surfaces: Rc<RefCell<BTreeMap<SurfaceId, MemorySurface>>>,
}

impl MemorySurfaceHost {
    /// Returns the live surface with `surface_id`.
    pub fn surface(&self, surface_id: SurfaceId) -> Option<MemorySurface> {
        self.surfaces.borrow().get(&surface_id).cloned()
    }

    /// Returns the number of live surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.borrow().len()
    }

    /// Returns `true` when no surface is live.
    pub fn is_empty(&self) -> bool {
        self.surfaces.borrow().is_empty()
    }
}

impl SurfaceFactory for MemorySurfaceHost {
    fn create_surface(&mut self, surface_id: SurfaceId, title: &str) -> Rc<dyn VisualSurface> {
        let surface = MemorySurface::new(surface_id, title);
        self.surfaces.borrow_mut().insert(surface_id, surface.clone());
        Rc::new(surface)
    }

    fn destroy_surface(&mut self, surface_id: SurfaceId) {
        if let Some(surface) = self.surfaces.borrow_mut().remove(&surface_id) {
            surface.detach();
        }
    }
}
