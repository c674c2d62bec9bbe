//! Window lifecycle orchestration: creation, focus and stacking, minimize/maximize, drag, close.
//!
//! The manager owns the window registry, the active-window id and the z-order counter. Visual
//! transitions go through the [`AnimationCoordinator`]; their settlement reports are drained by
//! [`WindowLifecycleManager::pump`] to finish the lifecycle step each one was started for. A
//! per-window [`WindowPhase`] keeps a superseded or late transition from finishing a step twice.
//!
//! Operations on unknown ids are silent no-ops.

use std::{collections::BTreeMap, rc::Rc};

use desktop_app_contract::{ApplicationId, ContentHandle, ContentHost};
use leptos::logging;
use platform_host::{Clock, SurfaceFactory, SurfaceId, TransitionToken, VisualSurface};
use serde::{Deserialize, Serialize};

use crate::{
    animation::{
        AnimationCoordinator, SettledTransition, Transition, TransitionKind, TransitionOutcome,
    },
    config::DesktopConfig,
    model::{
        DragSession, PointerPosition, WindowId, WindowModel, WindowOptions, WindowRecord,
        DEFAULT_WINDOW_TITLE, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle step a window is in.
pub enum WindowPhase {
    /// Entrance transition pending.
    Opening,
    /// No lifecycle transition pending. Focus visuals only play in this phase.
    Idle,
    Minimizing,
    Restoring,
    /// Exit transition pending; every further operation is ignored.
    Closing,
}

struct ManagedWindow {
    model: WindowModel,
    surface: Rc<dyn VisualSurface>,
    phase: WindowPhase,
}

impl ManagedWindow {
    fn sync_rect(&self) {
        self.surface.set_rect(self.model.bounds().into());
    }

    /// Still on screen and staying there.
    fn is_promotable(&self) -> bool {
        self.model.is_visible()
            && !matches!(self.phase, WindowPhase::Closing | WindowPhase::Minimizing)
    }
}

pub struct WindowLifecycleManager {
    config: DesktopConfig,
    windows: BTreeMap<WindowId, ManagedWindow>,
    active: Option<WindowId>,
    next_window_id: u64,
    max_z_index: u32,
    drag: Option<DragSession>,
    animations: AnimationCoordinator,
    surfaces: Box<dyn SurfaceFactory>,
    content: Box<dyn ContentHost>,
    clock: Rc<dyn Clock>,
}

impl WindowLifecycleManager {
    pub fn new(
        config: DesktopConfig,
        surfaces: Box<dyn SurfaceFactory>,
        content: Box<dyn ContentHost>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                logging::warn!("{err}; falling back to the default desktop config");
                DesktopConfig::default()
            }
        };
        let animations = AnimationCoordinator::new(config.animation.clone(), Rc::clone(&clock));
        Self {
            max_z_index: config.desktop.initial_z_index,
            config,
            windows: BTreeMap::new(),
            active: None,
            next_window_id: 1,
            drag: None,
            animations,
            surfaces,
            content,
            clock,
        }
    }

    pub fn config(&self) -> &DesktopConfig {
        &self.config
    }

    /// Creates, opens and focuses a window.
    pub fn create_window(&mut self, options: WindowOptions) -> &WindowModel {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;

        let defaults = &self.config.window;
        let offset = defaults.cascade_offset(self.windows.len());
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string());
        let model = WindowModel::new(
            id,
            offset,
            offset,
            options.width.unwrap_or(defaults.width),
            options.height.unwrap_or(defaults.height),
        )
        .with_title(title)
        .with_app(options.app_id.clone())
        .with_capabilities(options.capabilities)
        .with_created_at(self.clock.now_ms());

        let surface = self.surfaces.create_surface(id.surface_id(), model.title());
        surface.set_rect(model.bounds().into());
        surface.set_z_index(model.z_index());
        surface.show();
        logging::log!("created {id} \"{}\"", model.title());
        self.windows.insert(
            id,
            ManagedWindow {
                model,
                surface: Rc::clone(&surface),
                phase: WindowPhase::Opening,
            },
        );

        if let Some(app_id) = options.app_id {
            self.attach_content(id, &app_id);
        }
        self.focus_internal(id);
        let _ = self.animations.open(&surface);
        self.pump();

        &self.windows[&id].model
    }

    /// Plays the exit transition, then destroys the window. Requires the `closable` capability.
    pub fn close_window(&mut self, id: WindowId) -> Transition {
        let closable = self.windows.get(&id).is_some_and(|window| {
            window.phase != WindowPhase::Closing && window.model.capabilities().closable
        });
        if !closable {
            return Transition::settled(TransitionOutcome::Skipped);
        }
        let transition = self.begin_close(id);
        self.pump();
        transition
    }

    /// Closes every window, ignoring the `closable` capability.
    pub fn close_all_windows(&mut self) {
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            let open = self
                .windows
                .get(&id)
                .is_some_and(|window| window.phase != WindowPhase::Closing);
            if open {
                let _ = self.begin_close(id);
            }
        }
        self.pump();
    }

    /// Tears the window down immediately: detaches content, destroys its surface, unregisters it
    /// and promotes another window if it was active.
    pub fn destroy_window(&mut self, id: WindowId) -> bool {
        let Some(mut window) = self.windows.remove(&id) else {
            return false;
        };
        self.animations.cancel_animation(id.surface_id());
        if let Some(handle) = window.model.detach_content() {
            self.content.detach(handle);
        }
        self.surfaces.destroy_surface(id.surface_id());
        self.end_drag_of(id);
        logging::log!("destroyed {id}");

        if self.active == Some(id) {
            self.active = None;
            self.promote_visible();
        }
        true
    }

    /// Plays the minimize transition; the window is flagged minimized once it settles.
    pub fn minimize_window(&mut self, id: WindowId) -> Transition {
        let Some(window) = self.windows.get_mut(&id) else {
            return Transition::settled(TransitionOutcome::Skipped);
        };
        let allowed = window.model.capabilities().minimizable
            && match window.phase {
                WindowPhase::Closing | WindowPhase::Minimizing => false,
                WindowPhase::Restoring => true,
                WindowPhase::Opening | WindowPhase::Idle => !window.model.is_minimized(),
            };
        if !allowed {
            return Transition::settled(TransitionOutcome::Skipped);
        }

        window.phase = WindowPhase::Minimizing;
        let surface = Rc::clone(&window.surface);
        self.end_drag_of(id);
        let transition = self.animations.minimize(&surface, None);
        self.pump();
        transition
    }

    /// Plays the restore transition; the window is shown and focused once it settles.
    ///
    /// Restoring a window that is still minimizing supersedes the minimize.
    pub fn restore_window(&mut self, id: WindowId) -> Transition {
        let transition = self.begin_restore(id);
        self.pump();
        transition
    }

    /// Maximizes to the desktop work area, or returns to the saved bounds.
    pub fn toggle_maximize(&mut self, id: WindowId) -> bool {
        let area = self.config.desktop.work_area();
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.phase == WindowPhase::Closing || !window.model.capabilities().maximizable {
            return false;
        }
        window.model.toggle_maximize(area);
        window.sync_rect();
        true
    }

    /// Activates and raises the window, blurring the previously active one.
    ///
    /// Focusing a minimized window restores it.
    pub fn focus_window(&mut self, id: WindowId) {
        self.focus_internal(id);
        self.pump();
    }

    /// Sets the window origin. No transition, no stacking change.
    pub fn move_window(&mut self, id: WindowId, x: i32, y: i32) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.phase == WindowPhase::Closing {
            return false;
        }
        window.model.set_position(x, y);
        window.sync_rect();
        true
    }

    /// Starts a header drag at `pointer`. Refused while another drag is in progress.
    pub fn begin_drag(&mut self, id: WindowId, pointer: PointerPosition) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let Some(window) = self.windows.get(&id) else {
            return false;
        };
        if !window.is_promotable() {
            return false;
        }
        self.drag = Some(DragSession::begin(id, pointer, window.model.origin()));
        self.focus_window(id);
        true
    }

    /// Moves the dragged window so the grab point follows `pointer`.
    pub fn drag_to(&mut self, pointer: PointerPosition) -> bool {
        let Some(session) = self.drag else {
            return false;
        };
        let origin = session.origin_for(pointer);
        self.move_window(session.window_id(), origin.x, origin.y)
    }

    /// Ends the drag session, returning the window that was being dragged.
    pub fn end_drag(&mut self) -> Option<WindowId> {
        self.drag.take().map(|session| session.window_id())
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Mounts `app_id` into the window, replacing any content it already hosts.
    pub fn attach_content(&mut self, id: WindowId, app_id: &ApplicationId) -> Option<ContentHandle> {
        let window = self.windows.get_mut(&id)?;
        if window.phase == WindowPhase::Closing {
            return None;
        }
        if let Some(previous) = window.model.detach_content() {
            self.content.detach(previous);
        }
        let handle = self.content.attach(id.runtime_id(), app_id)?;
        window.model.attach_content(handle);
        Some(handle)
    }

    /// Resizes the desktop; maximized windows follow the new work area.
    pub fn set_viewport(&mut self, width: i32, height: i32) {
        let desktop = &mut self.config.desktop;
        desktop.viewport_width = width.max(MIN_WINDOW_WIDTH);
        desktop.viewport_height =
            height.max(MIN_WINDOW_HEIGHT.saturating_add(desktop.taskbar_height));
        let area = desktop.work_area();
        for window in self.windows.values_mut() {
            if window.model.is_maximized() {
                window.model.set_position(area.x, area.y).set_size(area.w, area.h);
                window.sync_rect();
            }
        }
    }

    /// Host report that the transition identified by `token` finished playing.
    pub fn transition_finished(&mut self, token: TransitionToken) -> bool {
        let current = self.animations.complete(token);
        self.pump();
        current
    }

    /// Fires overdue fallback timers. Returns how many transitions were force-settled.
    pub fn tick(&mut self) -> usize {
        let fired = self.animations.poll_timers();
        self.pump();
        fired
    }

    /// Finishes the lifecycle steps of every settled transition.
    pub fn pump(&mut self) {
        loop {
            let settled = self.animations.take_settled();
            if settled.is_empty() {
                break;
            }
            for report in settled {
                self.apply_settlement(report);
            }
        }
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowModel> {
        self.windows.get(&id).map(|window| &window.model)
    }

    /// Live windows in creation order.
    pub fn windows(&self) -> impl Iterator<Item = &WindowModel> + '_ {
        self.windows.values().map(|window| &window.model)
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub fn records(&self) -> Vec<WindowRecord> {
        self.windows().map(WindowModel::to_record).collect()
    }

    pub fn phase(&self, id: WindowId) -> Option<WindowPhase> {
        self.windows.get(&id).map(|window| window.phase)
    }

    pub fn active_window_id(&self) -> Option<WindowId> {
        self.active
    }

    pub fn active_window(&self) -> Option<&WindowModel> {
        self.active.and_then(|id| self.window(id))
    }

    pub fn is_visible(&self, id: WindowId) -> bool {
        self.window(id).is_some_and(WindowModel::is_visible)
    }

    pub fn max_z_index(&self) -> u32 {
        self.max_z_index
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn animations(&self) -> &AnimationCoordinator {
        &self.animations
    }

    /// Token of the transition currently playing on the window's surface.
    pub fn pending_transition(&self, id: WindowId) -> Option<TransitionToken> {
        self.animations.pending_token(id.surface_id())
    }

    fn focus_internal(&mut self, id: WindowId) {
        let Some((phase, minimized)) = self
            .windows
            .get(&id)
            .map(|window| (window.phase, window.model.is_minimized()))
        else {
            return;
        };
        match phase {
            WindowPhase::Closing | WindowPhase::Restoring => return,
            WindowPhase::Minimizing => {
                let _ = self.begin_restore(id);
                return;
            }
            WindowPhase::Opening | WindowPhase::Idle if minimized => {
                let _ = self.begin_restore(id);
                return;
            }
            WindowPhase::Opening | WindowPhase::Idle => {}
        }

        if let Some(previous) = self.active.filter(|previous| *previous != id) {
            if let Some(previous) = self.windows.get_mut(&previous) {
                previous.model.set_active(false);
                previous.surface.set_active(false);
                if previous.phase == WindowPhase::Idle {
                    let _ = self.animations.blur(&previous.surface);
                }
            }
        }

        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        let already_focused_top =
            self.active == Some(id) && window.model.z_index() == self.max_z_index;
        if !already_focused_top {
            self.max_z_index += 1;
            window.model.set_z_index(self.max_z_index);
            window.surface.set_z_index(self.max_z_index);
        }
        window.model.set_active(true);
        window.surface.set_active(true);
        self.active = Some(id);

        if window.phase == WindowPhase::Idle {
            let _ = self.animations.focus(&window.surface);
        }
        if let Some(handle) = window.model.content() {
            self.content.focus_content(handle);
        }
    }

    fn begin_close(&mut self, id: WindowId) -> Transition {
        let Some(window) = self.windows.get_mut(&id) else {
            return Transition::settled(TransitionOutcome::Skipped);
        };
        window.phase = WindowPhase::Closing;
        let surface = Rc::clone(&window.surface);
        self.end_drag_of(id);
        self.animations.close(&surface, None)
    }

    fn begin_restore(&mut self, id: WindowId) -> Transition {
        let Some(window) = self.windows.get_mut(&id) else {
            return Transition::settled(TransitionOutcome::Skipped);
        };
        let restorable = match window.phase {
            WindowPhase::Minimizing => true,
            WindowPhase::Opening | WindowPhase::Idle => window.model.is_minimized(),
            WindowPhase::Restoring | WindowPhase::Closing => false,
        };
        if !restorable {
            return Transition::settled(TransitionOutcome::Skipped);
        }
        window.phase = WindowPhase::Restoring;
        let surface = Rc::clone(&window.surface);
        self.animations.restore(&surface)
    }

    fn apply_settlement(&mut self, report: SettledTransition) {
        if !report.outcome.finished() {
            return;
        }
        let id = window_id_of(report.surface_id);
        let Some(phase) = self.phase(id) else {
            return;
        };
        match (report.kind, phase) {
            (TransitionKind::Open, WindowPhase::Opening) => self.set_phase(id, WindowPhase::Idle),
            (TransitionKind::Close, WindowPhase::Closing) => {
                self.destroy_window(id);
            }
            (TransitionKind::Minimize, WindowPhase::Minimizing) => self.finish_minimize(id),
            (TransitionKind::Restore, WindowPhase::Restoring) => self.finish_restore(id),
            _ => {}
        }
    }

    fn finish_minimize(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        window.model.minimize();
        window.surface.set_active(false);
        window.phase = WindowPhase::Idle;

        if self.active == Some(id) {
            self.active = None;
        }
        self.promote_visible();
    }

    fn finish_restore(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        window.model.restore();
        window.phase = WindowPhase::Idle;
        self.focus_internal(id);
    }

    /// Focuses the most recently created window that is still on screen, or clears focus.
    fn promote_visible(&mut self) {
        let candidate = self
            .windows
            .iter()
            .rev()
            .find(|(_, window)| window.is_promotable())
            .map(|(id, _)| *id);
        match candidate {
            Some(id) => self.focus_internal(id),
            None => self.active = None,
        }
    }

    fn set_phase(&mut self, id: WindowId, phase: WindowPhase) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.phase = phase;
        }
    }

    fn end_drag_of(&mut self, id: WindowId) {
        if self.drag.is_some_and(|drag| drag.window_id() == id) {
            self.drag = None;
        }
    }
}

fn window_id_of(surface_id: SurfaceId) -> WindowId {
    WindowId(surface_id.0)
}
