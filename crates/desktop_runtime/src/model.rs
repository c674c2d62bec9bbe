//! Window entity model: geometry, stacking, flags and the owned content handle of one window.
//!
//! Every mutator enforces its own invariant and returns `&mut Self` for chaining. Out-of-range
//! geometry is clamped, never rejected.

use std::fmt;

use desktop_app_contract::{ApplicationId, ContentHandle, WindowRuntimeId};
use platform_host::{SurfaceId, SurfaceRect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum managed window width.
pub const MIN_WINDOW_WIDTH: i32 = 300;
/// Minimum managed window height.
pub const MIN_WINDOW_HEIGHT: i32 = 200;
/// Stacking value of a window that has never been focused.
pub const DEFAULT_Z_INDEX: u32 = 10;
/// Title used when neither the caller nor the hosted app names the window.
pub const DEFAULT_WINDOW_TITLE: &str = "Window";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl WindowId {
    /// Identity of the visual surface backing this window.
    pub fn surface_id(self) -> SurfaceId {
        SurfaceId(self.0)
    }

    /// Identity handed to hosted content.
    pub fn runtime_id(self) -> WindowRuntimeId {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl WindowRect {
    pub fn clamped_min(self, min_w: i32, min_h: i32) -> Self {
        Self {
            w: self.w.max(min_w),
            h: self.h.max(min_h),
            ..self
        }
    }

    pub fn clamped_origin(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
            ..self
        }
    }
}

impl From<WindowRect> for SurfaceRect {
    fn from(rect: WindowRect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.w,
            height: rect.h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Per-window capabilities, fixed at creation.
pub struct WindowCapabilities {
    pub resizable: bool,
    pub minimizable: bool,
    pub maximizable: bool,
    pub closable: bool,
}

impl Default for WindowCapabilities {
    fn default() -> Self {
        Self {
            resizable: true,
            minimizable: true,
            maximizable: true,
            closable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

/// An in-progress header drag of one window.
///
/// The session remembers where inside the window the pointer grabbed it, so every later pointer
/// position maps to a window origin without accumulating drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    window_id: WindowId,
    grab_offset: PointerPosition,
}

impl DragSession {
    pub fn begin(
        window_id: WindowId,
        pointer: PointerPosition,
        window_origin: PointerPosition,
    ) -> Self {
        Self {
            window_id,
            grab_offset: PointerPosition {
                x: pointer.x.saturating_sub(window_origin.x),
                y: pointer.y.saturating_sub(window_origin.y),
            },
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn grab_offset(&self) -> PointerPosition {
        self.grab_offset
    }

    /// Window origin that keeps the grab point under `pointer`.
    pub fn origin_for(&self, pointer: PointerPosition) -> PointerPosition {
        PointerPosition {
            x: pointer.x.saturating_sub(self.grab_offset.x),
            y: pointer.y.saturating_sub(self.grab_offset.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
/// Window creation request accepted from the taskbar/launcher.
///
/// Missing geometry falls back to the configured defaults; capabilities default to enabled.
pub struct WindowOptions {
    pub title: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    #[serde(flatten)]
    pub capabilities: WindowCapabilities,
    /// Application mounted into the window on creation.
    pub app_id: Option<ApplicationId>,
}

impl WindowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_app(app_id: ApplicationId) -> Self {
        Self {
            app_id: Some(app_id),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_capabilities(mut self, capabilities: WindowCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Plain serializable record of a [`WindowModel`], used for inspection and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_z_index")]
    pub z_index: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub is_maximized: bool,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub app_id: Option<ApplicationId>,
    #[serde(flatten)]
    pub capabilities: WindowCapabilities,
    #[serde(default)]
    pub saved_bounds: Option<WindowRect>,
    #[serde(default)]
    pub content: Option<ContentHandle>,
    #[serde(default)]
    pub created_at_unix_ms: u64,
}

fn default_z_index() -> u32 {
    DEFAULT_Z_INDEX
}

fn default_title() -> String {
    DEFAULT_WINDOW_TITLE.to_string()
}

impl WindowRecord {
    /// Returns `true` when the record describes a window with positive size.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowModel {
    id: WindowId,
    title: String,
    app_id: Option<ApplicationId>,
    rect: WindowRect,
    z_index: u32,
    active: bool,
    minimized: bool,
    maximized: bool,
    capabilities: WindowCapabilities,
    saved_bounds: Option<WindowRect>,
    content: Option<ContentHandle>,
    created_at_unix_ms: u64,
}

impl WindowModel {
    pub fn new(id: WindowId, x: i32, y: i32, width: i32, height: i32) -> Self {
        let mut model = Self {
            id,
            title: DEFAULT_WINDOW_TITLE.to_string(),
            app_id: None,
            rect: WindowRect { x: 0, y: 0, w: 0, h: 0 },
            z_index: DEFAULT_Z_INDEX,
            active: false,
            minimized: false,
            maximized: false,
            capabilities: WindowCapabilities::default(),
            saved_bounds: None,
            content: None,
            created_at_unix_ms: 0,
        };
        model.set_position(x, y).set_size(width, height);
        model
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_app(mut self, app_id: Option<ApplicationId>) -> Self {
        self.app_id = app_id;
        self
    }

    pub fn with_capabilities(mut self, capabilities: WindowCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_created_at(mut self, created_at_unix_ms: u64) -> Self {
        self.created_at_unix_ms = created_at_unix_ms;
        self
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn app_id(&self) -> Option<&ApplicationId> {
        self.app_id.as_ref()
    }

    pub fn bounds(&self) -> WindowRect {
        self.rect
    }

    pub fn origin(&self) -> PointerPosition {
        PointerPosition {
            x: self.rect.x,
            y: self.rect.y,
        }
    }

    pub fn z_index(&self) -> u32 {
        self.z_index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// A window is visible unless minimized.
    pub fn is_visible(&self) -> bool {
        !self.minimized
    }

    pub fn capabilities(&self) -> WindowCapabilities {
        self.capabilities
    }

    /// Geometry remembered while maximized.
    pub fn saved_bounds(&self) -> Option<WindowRect> {
        self.saved_bounds
    }

    pub fn content(&self) -> Option<ContentHandle> {
        self.content
    }

    pub fn created_at_unix_ms(&self) -> u64 {
        self.created_at_unix_ms
    }

    /// Moves the window; negative coordinates clamp to zero.
    pub fn set_position(&mut self, x: i32, y: i32) -> &mut Self {
        self.rect.x = x.max(0);
        self.rect.y = y.max(0);
        self
    }

    /// Resizes the window; sizes below the floor clamp up to it.
    pub fn set_size(&mut self, width: i32, height: i32) -> &mut Self {
        self.rect.w = width.max(MIN_WINDOW_WIDTH);
        self.rect.h = height.max(MIN_WINDOW_HEIGHT);
        self
    }

    pub fn set_z_index(&mut self, z_index: u32) -> &mut Self {
        self.z_index = z_index;
        self
    }

    /// Sets the active flag. A minimized window stays inactive.
    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.active = active && !self.minimized;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    /// Minimizes the window, dropping its active flag.
    pub fn minimize(&mut self) -> &mut Self {
        self.minimized = true;
        self.active = false;
        self
    }

    pub fn restore(&mut self) -> &mut Self {
        self.minimized = false;
        self
    }

    /// Fills `area`, remembering the current bounds. Already maximized windows are unchanged.
    pub fn maximize(&mut self, area: WindowRect) -> &mut Self {
        if !self.maximized {
            self.saved_bounds = Some(self.rect);
            self.maximized = true;
            self.set_position(area.x, area.y).set_size(area.w, area.h);
        }
        self
    }

    /// Returns to the bounds remembered by [`WindowModel::maximize`].
    pub fn unmaximize(&mut self) -> &mut Self {
        if self.maximized {
            self.maximized = false;
            if let Some(saved) = self.saved_bounds.take() {
                self.set_position(saved.x, saved.y).set_size(saved.w, saved.h);
            }
        }
        self
    }

    pub fn toggle_maximize(&mut self, area: WindowRect) -> &mut Self {
        if self.maximized {
            self.unmaximize()
        } else {
            self.maximize(area)
        }
    }

    pub fn attach_content(&mut self, handle: ContentHandle) -> &mut Self {
        self.content = Some(handle);
        self
    }

    /// Releases the content handle so the caller can detach it.
    pub fn detach_content(&mut self) -> Option<ContentHandle> {
        self.content.take()
    }

    pub fn to_record(&self) -> WindowRecord {
        WindowRecord {
            id: self.id,
            x: self.rect.x,
            y: self.rect.y,
            width: self.rect.w,
            height: self.rect.h,
            z_index: self.z_index,
            is_active: self.active,
            is_minimized: self.minimized,
            is_maximized: self.maximized,
            title: self.title.clone(),
            app_id: self.app_id.clone(),
            capabilities: self.capabilities,
            saved_bounds: self.saved_bounds,
            content: self.content,
            created_at_unix_ms: self.created_at_unix_ms,
        }
    }

    /// Rebuilds a model from a record, clamping geometry to the model invariants.
    pub fn from_record(record: WindowRecord) -> Self {
        let mut model = Self::new(record.id, record.x, record.y, record.width, record.height)
            .with_title(record.title)
            .with_app(record.app_id)
            .with_capabilities(record.capabilities)
            .with_created_at(record.created_at_unix_ms);
        model.z_index = record.z_index;
        model.minimized = record.is_minimized;
        model.maximized = record.is_maximized;
        model.saved_bounds = record
            .saved_bounds
            .map(|rect| rect.clamped_origin().clamped_min(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT));
        model.content = record.content;
        model.set_active(record.is_active);
        model
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.to_record())
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<WindowRecord>(value).map(Self::from_record)
    }
}
