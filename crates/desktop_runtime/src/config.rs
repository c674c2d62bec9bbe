//! Typed desktop configuration loaded from TOML.
//!
//! Every field has a default, so an empty document yields [`DesktopConfig::default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{WindowRect, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};

/// Longest transition duration accepted from configuration.
pub const MAX_TRANSITION_MS: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Configuration loading errors.
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse desktop config: {0}")]
    Parse(String),
    /// The document parsed but a value is out of range.
    #[error("invalid desktop config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDefaults {
    pub width: i32,
    pub height: i32,
    pub cascade_base: i32,
    pub cascade_step: i32,
    pub cascade_wrap: i32,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
            cascade_base: 100,
            cascade_step: 30,
            cascade_wrap: 200,
        }
    }
}

impl WindowDefaults {
    /// Cascade offset for the window created after `existing` others. A non-positive wrap
    /// collapses the cascade onto the base offset.
    pub fn cascade_offset(&self, existing: usize) -> i32 {
        let existing = i32::try_from(existing).unwrap_or(i32::MAX);
        let step = existing
            .wrapping_mul(self.cascade_step)
            .checked_rem_euclid(self.cascade_wrap)
            .unwrap_or(0);
        self.cascade_base.saturating_add(step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopArea {
    pub viewport_width: i32,
    pub viewport_height: i32,
    /// Space reserved at the bottom of the viewport for the taskbar.
    pub taskbar_height: i32,
    pub initial_z_index: u32,
}

impl Default for DesktopArea {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 800,
            taskbar_height: 48,
            initial_z_index: 10,
        }
    }
}

impl DesktopArea {
    /// Area a maximized window fills.
    pub fn work_area(&self) -> WindowRect {
        WindowRect {
            x: 0,
            y: 0,
            w: self.viewport_width,
            h: self.viewport_height.saturating_sub(self.taskbar_height).max(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub open_ms: u64,
    pub close_ms: u64,
    pub focus_ms: u64,
    pub minimize_ms: u64,
    /// Extra time granted before a transition is force-settled.
    pub fallback_grace_ms: u64,
    /// Settle every transition immediately, applying only its terminal state.
    pub reduced_motion: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            open_ms: 300,
            close_ms: 200,
            focus_ms: 150,
            minimize_ms: 300,
            fallback_grace_ms: 50,
            reduced_motion: false,
        }
    }
}

impl AnimationSettings {
    pub fn open(&self) -> Duration {
        Duration::from_millis(self.open_ms)
    }

    pub fn close(&self) -> Duration {
        Duration::from_millis(self.close_ms)
    }

    pub fn focus(&self) -> Duration {
        Duration::from_millis(self.focus_ms)
    }

    pub fn minimize(&self) -> Duration {
        Duration::from_millis(self.minimize_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyBindings {
    pub new_terminal: String,
    pub close_window: String,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            new_terminal: "ctrl+alt+t".to_string(),
            close_window: "alt+f4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
/// Complete desktop configuration.
pub struct DesktopConfig {
    pub window: WindowDefaults,
    pub desktop: DesktopArea,
    pub animation: AnimationSettings,
    pub hotkeys: HotkeyBindings,
}

impl DesktopConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and [`ConfigError::Invalid`] for
    /// out-of-range values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("animation.open_ms", self.animation.open_ms),
            ("animation.close_ms", self.animation.close_ms),
            ("animation.focus_ms", self.animation.focus_ms),
            ("animation.minimize_ms", self.animation.minimize_ms),
            ("animation.fallback_grace_ms", self.animation.fallback_grace_ms),
        ];
        if let Some((name, value)) = durations.iter().find(|(_, ms)| *ms > MAX_TRANSITION_MS) {
            return Err(ConfigError::Invalid(format!(
                "{name} is {value}ms; the limit is {MAX_TRANSITION_MS}ms"
            )));
        }

        if self.desktop.taskbar_height < 0 {
            return Err(ConfigError::Invalid(
                "desktop.taskbar_height must not be negative".to_string(),
            ));
        }
        if self.desktop.viewport_width < MIN_WINDOW_WIDTH
            || self.desktop.work_area().h < MIN_WINDOW_HEIGHT
        {
            return Err(ConfigError::Invalid(format!(
                "desktop work area must fit a {MIN_WINDOW_WIDTH}x{MIN_WINDOW_HEIGHT} window"
            )));
        }

        if self.window.cascade_step == 0 || self.window.cascade_wrap <= 0 {
            return Err(ConfigError::Invalid(
                "window.cascade_step must be non-zero and window.cascade_wrap positive".to_string(),
            ));
        }

        Ok(())
    }
}
