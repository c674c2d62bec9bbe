//! Global key-chord registry and dispatcher.
//!
//! Chords are normalized on registration (`"Ctrl+ALT+t"` and `"alt+ctrl+t"` are the same chord)
//! and matched against [`KeyInput`] events from the host. Handlers receive a caller-chosen
//! context, usually the desktop shell, so they can drive window operations without capturing it.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use leptos::logging;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of chords returned by [`HotkeyDispatcher::suggest_alternatives`].
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Hotkey registration errors.
pub enum HotkeyError {
    /// The chord text is malformed.
    #[error("invalid key combination `{chord}`: {reason}")]
    Validation {
        /// Chord text as supplied.
        chord: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The chord is taken and the conflict policy forbids replacing it.
    #[error("hotkey conflict: `{0}` is already registered")]
    Conflict(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Alt,
    Ctrl,
    Meta,
    Shift,
}

impl Modifier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alt => "alt",
            Self::Ctrl => "ctrl",
            Self::Meta => "meta",
            Self::Shift => "shift",
        }
    }

    fn parse(part: &str) -> Option<Self> {
        match part {
            "alt" | "option" => Some(Self::Alt),
            "ctrl" | "control" => Some(Self::Ctrl),
            "meta" | "cmd" | "super" => Some(Self::Meta),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Normalized key combination: a set of modifiers plus exactly one primary key.
pub struct Chord {
    modifiers: BTreeSet<Modifier>,
    key: String,
}

impl Chord {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: impl Into<String>) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key: key.into().to_lowercase(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Returns this chord with `extra` modifiers added.
    pub fn with_modifiers(&self, extra: &[Modifier]) -> Self {
        let mut chord = self.clone();
        chord.modifiers.extend(extra.iter().copied());
        chord
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        f.write_str(&self.key)
    }
}

impl FromStr for Chord {
    type Err = HotkeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| HotkeyError::Validation {
            chord: raw.to_string(),
            reason,
        };

        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(invalid("empty chord"));
        }

        let mut modifiers = BTreeSet::new();
        let mut key = None;
        for part in normalized.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(invalid("empty key segment"));
            }
            if let Some(modifier) = Modifier::parse(part) {
                if !modifiers.insert(modifier) {
                    return Err(invalid("duplicate modifier"));
                }
            } else if key.replace(part.to_string()).is_some() {
                return Err(invalid("more than one non-modifier key"));
            }
        }

        let key = key.ok_or_else(|| invalid("missing non-modifier key"))?;
        Ok(Self { modifiers, key })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// What [`HotkeyDispatcher::register_with`] does when the chord is already taken.
pub enum ConflictPolicy {
    /// Fail with [`HotkeyError::Conflict`].
    Error,
    /// Keep the existing handler.
    Ignore,
    /// Overwrite quietly apart from a log line.
    Replace,
    /// Overwrite and warn.
    #[default]
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    Replaced,
    /// The chord was taken and left untouched.
    Ignored,
}

impl Registration {
    /// Whether the new handler is now the one bound to the chord.
    pub fn is_bound(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Raw key-down event from the host, plus the flags dispatch sets on it.
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// Set once a dispatcher handled the event; later dispatchers skip it.
    pub consumed: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Chord pressed by this event, or `None` for a lone modifier press.
    pub fn chord(&self) -> Option<Chord> {
        let key = self.key.trim().to_lowercase();
        if key.is_empty() || Modifier::parse(&key).is_some() {
            return None;
        }
        let modifiers = [
            (self.alt, Modifier::Alt),
            (self.ctrl, Modifier::Ctrl),
            (self.meta, Modifier::Meta),
            (self.shift, Modifier::Shift),
        ]
        .into_iter()
        .filter_map(|(pressed, modifier)| pressed.then_some(modifier));
        Some(Chord::new(modifiers, key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyDebugInfo {
    pub enabled: bool,
    pub hotkey_count: usize,
    pub registered_hotkeys: Vec<String>,
}

type Handler<C> = Box<dyn FnMut(&mut C)>;

/// Chord registry with an enable gate.
///
/// `C` is the context handed to handlers on dispatch.
pub struct HotkeyDispatcher<C = ()> {
    handlers: BTreeMap<Chord, Handler<C>>,
    enabled: bool,
}

impl<C> Default for HotkeyDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> HotkeyDispatcher<C> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Registers `handler` under `chord`, replacing any existing binding with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`HotkeyError::Validation`] for malformed chords.
    pub fn register<F>(&mut self, chord: &str, handler: F) -> Result<Registration, HotkeyError>
    where
        F: FnMut(&mut C) + 'static,
    {
        self.register_with(chord, handler, ConflictPolicy::default())
    }

    /// Registers `handler` under `chord`, resolving an existing binding per `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`HotkeyError::Validation`] for malformed chords and [`HotkeyError::Conflict`]
    /// when the chord is taken under [`ConflictPolicy::Error`]. Under [`ConflictPolicy::Ignore`]
    /// a taken chord is refused without an error: the result is [`Registration::Ignored`], whose
    /// [`Registration::is_bound`] is `false`.
    pub fn register_with<F>(
        &mut self,
        chord: &str,
        handler: F,
        policy: ConflictPolicy,
    ) -> Result<Registration, HotkeyError>
    where
        F: FnMut(&mut C) + 'static,
    {
        let parsed: Chord = chord.parse()?;

        let registration = if self.handlers.contains_key(&parsed) {
            match policy {
                ConflictPolicy::Error => return Err(HotkeyError::Conflict(parsed.to_string())),
                ConflictPolicy::Ignore => {
                    logging::log!("ignoring duplicate hotkey registration: {parsed}");
                    return Ok(Registration::Ignored);
                }
                ConflictPolicy::Replace => {
                    logging::warn!("replacing existing hotkey: {parsed}");
                    Registration::Replaced
                }
                ConflictPolicy::Warn => {
                    logging::warn!(
                        "hotkey conflict detected: {parsed} is already registered; replacing existing handler"
                    );
                    Registration::Replaced
                }
            }
        } else {
            Registration::Added
        };

        logging::log!("registered hotkey: {parsed}");
        self.handlers.insert(parsed, Box::new(handler));
        Ok(registration)
    }

    /// Removes the binding for `chord`. Returns whether one existed.
    pub fn unregister(&mut self, chord: &str) -> bool {
        let removed = chord
            .parse::<Chord>()
            .ok()
            .and_then(|parsed| self.handlers.remove(&parsed))
            .is_some();
        if removed {
            logging::log!("unregistered hotkey: {chord}");
        } else {
            logging::warn!("attempted to unregister non-existent hotkey: {chord}");
        }
        removed
    }

    /// Runs the handler bound to the chord pressed by `input`.
    ///
    /// Returns `true` when a handler ran; the input is then marked default-prevented, stopped and
    /// consumed. Disabled dispatchers and already-consumed inputs are left untouched.
    pub fn dispatch(&mut self, input: &mut KeyInput, context: &mut C) -> bool {
        if !self.enabled || input.consumed {
            return false;
        }
        let Some(chord) = input.chord() else {
            return false;
        };
        let Some(handler) = self.handlers.get_mut(&chord) else {
            return false;
        };

        input.default_prevented = true;
        input.propagation_stopped = true;
        input.consumed = true;
        handler(context);
        true
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_registered(&self, chord: &str) -> bool {
        chord
            .parse::<Chord>()
            .is_ok_and(|parsed| self.handlers.contains_key(&parsed))
    }

    /// Registered chords in normalized form, sorted.
    pub fn chords(&self) -> Vec<String> {
        let mut chords: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        chords.sort();
        chords
    }

    /// Registered chords equal to `chord` after normalization.
    pub fn conflicts(&self, chord: &str) -> Vec<String> {
        chord
            .parse::<Chord>()
            .ok()
            .filter(|parsed| self.handlers.contains_key(parsed))
            .map(|parsed| vec![parsed.to_string()])
            .unwrap_or_default()
    }

    /// Suggests up to [`MAX_SUGGESTIONS`] free chords built by adding modifiers to `chord`.
    pub fn suggest_alternatives(&self, chord: &str) -> Vec<String> {
        const EXTRA_MODIFIERS: [&[Modifier]; 7] = [
            &[Modifier::Ctrl],
            &[Modifier::Alt],
            &[Modifier::Shift],
            &[Modifier::Ctrl, Modifier::Alt],
            &[Modifier::Ctrl, Modifier::Shift],
            &[Modifier::Alt, Modifier::Shift],
            &[Modifier::Ctrl, Modifier::Alt, Modifier::Shift],
        ];

        let Ok(parsed) = chord.parse::<Chord>() else {
            return Vec::new();
        };
        let mut suggestions: Vec<Chord> = Vec::new();
        for extra in EXTRA_MODIFIERS {
            let candidate = parsed.with_modifiers(extra);
            if candidate != parsed
                && !self.handlers.contains_key(&candidate)
                && !suggestions.contains(&candidate)
            {
                suggestions.push(candidate);
            }
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
        }
        suggestions.iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn debug_info(&self) -> HotkeyDebugInfo {
        HotkeyDebugInfo {
            enabled: self.enabled,
            hotkey_count: self.handlers.len(),
            registered_hotkeys: self.chords(),
        }
    }

    /// Drops every binding and stops dispatching.
    pub fn destroy(&mut self) {
        self.clear();
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ctrl_alt_t() -> KeyInput {
        KeyInput::new("t").with_ctrl().with_alt()
    }

    #[test]
    fn chords_normalize_case_and_modifier_order() {
        let a: Chord = "Ctrl+ALT+T".parse().expect("chord");
        let b: Chord = "alt + control + t".parse().expect("chord");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "alt+ctrl+t");
    }

    #[test]
    fn malformed_chords_are_validation_errors() {
        for raw in ["", "ctrl++", "ctrl+", "ctrl+ctrl+t", "ctrl+a+b", "ctrl+alt"] {
            let err = raw.parse::<Chord>().unwrap_err();
            assert!(
                matches!(err, HotkeyError::Validation { .. }),
                "{raw} should be invalid"
            );
        }
    }

    #[test]
    fn default_policy_replaces_existing_handler() {
        let mut hotkeys = HotkeyDispatcher::<Vec<&'static str>>::new();
        assert_eq!(
            hotkeys.register("ctrl+alt+t", |calls| calls.push("h1")),
            Ok(Registration::Added)
        );
        assert_eq!(
            hotkeys.register("alt+ctrl+t", |calls| calls.push("h2")),
            Ok(Registration::Replaced)
        );

        let mut calls = Vec::new();
        assert!(hotkeys.dispatch(&mut ctrl_alt_t(), &mut calls));
        assert_eq!(calls, vec!["h2"]);
    }

    #[test]
    fn strict_and_ignore_policies_keep_existing_handler() {
        let mut hotkeys = HotkeyDispatcher::<Vec<&'static str>>::new();
        hotkeys
            .register("ctrl+alt+t", |calls| calls.push("h1"))
            .expect("register");

        assert_eq!(
            hotkeys.register_with("ctrl+alt+t", |calls| calls.push("h3"), ConflictPolicy::Error),
            Err(HotkeyError::Conflict("alt+ctrl+t".to_string()))
        );
        let ignored =
            hotkeys.register_with("ctrl+alt+t", |calls| calls.push("h4"), ConflictPolicy::Ignore);
        assert_eq!(ignored, Ok(Registration::Ignored));
        assert_eq!(ignored.map(Registration::is_bound), Ok(false));

        let mut calls = Vec::new();
        hotkeys.dispatch(&mut ctrl_alt_t(), &mut calls);
        assert_eq!(calls, vec!["h1"]);
    }

    #[test]
    fn validation_runs_before_conflict_check() {
        let mut hotkeys = HotkeyDispatcher::<()>::new();
        let err = hotkeys
            .register_with("ctrl++", |_| {}, ConflictPolicy::Error)
            .unwrap_err();
        assert!(matches!(err, HotkeyError::Validation { .. }));
        assert!(hotkeys.is_empty());
    }

    #[test]
    fn dispatch_marks_input_and_ignores_consumed_events() {
        let mut hotkeys = HotkeyDispatcher::<u32>::new();
        hotkeys.register("alt+f4", |count| *count += 1).expect("register");

        let mut count = 0;
        let mut input = KeyInput::new("F4").with_alt();
        assert!(hotkeys.dispatch(&mut input, &mut count));
        assert!(input.default_prevented && input.propagation_stopped && input.consumed);

        assert!(!hotkeys.dispatch(&mut input, &mut count));
        assert_eq!(count, 1);
    }

    #[test]
    fn unmatched_input_is_left_untouched() {
        let mut hotkeys = HotkeyDispatcher::<u32>::new();
        hotkeys.register("alt+f4", |count| *count += 1).expect("register");

        let mut count = 0;
        let mut input = KeyInput::new("F4").with_alt().with_shift();
        assert!(!hotkeys.dispatch(&mut input, &mut count));
        assert_eq!(input, KeyInput::new("F4").with_alt().with_shift());

        let mut modifier_only = KeyInput::new("Control").with_ctrl();
        assert_eq!(modifier_only.chord(), None);
        assert!(!hotkeys.dispatch(&mut modifier_only, &mut count));
    }

    #[test]
    fn disabled_dispatcher_ignores_input() {
        let mut hotkeys = HotkeyDispatcher::<u32>::new();
        hotkeys.register("alt+f4", |count| *count += 1).expect("register");
        hotkeys.disable();

        let mut count = 0;
        assert!(!hotkeys.dispatch(&mut KeyInput::new("f4").with_alt(), &mut count));
        hotkeys.enable();
        assert!(hotkeys.dispatch(&mut KeyInput::new("f4").with_alt(), &mut count));
        assert_eq!(count, 1);
    }

    #[test]
    fn unregister_reports_whether_binding_existed() {
        let mut hotkeys = HotkeyDispatcher::<()>::new();
        hotkeys.register("ctrl+w", |_| {}).expect("register");
        assert!(hotkeys.is_registered("CTRL+W"));
        assert_eq!(hotkeys.conflicts("ctrl+w"), vec!["ctrl+w".to_string()]);

        assert!(hotkeys.unregister("ctrl+w"));
        assert!(!hotkeys.unregister("ctrl+w"));
        assert!(!hotkeys.unregister("not++valid"));
        assert!(hotkeys.conflicts("ctrl+w").is_empty());
    }

    #[test]
    fn alternatives_skip_taken_and_identical_chords() {
        let mut hotkeys = HotkeyDispatcher::<()>::new();
        hotkeys.register("ctrl+alt+t", |_| {}).expect("register");
        hotkeys.register("alt+ctrl+shift+t", |_| {}).expect("register");

        assert_eq!(hotkeys.suggest_alternatives("ctrl+alt+t"), Vec::<String>::new());
        assert_eq!(
            hotkeys.suggest_alternatives("t"),
            vec!["ctrl+t".to_string(), "alt+t".to_string(), "shift+t".to_string()]
        );
    }

    #[test]
    fn destroy_clears_and_disables() {
        let mut hotkeys = HotkeyDispatcher::<()>::new();
        hotkeys.register("ctrl+alt+t", |_| {}).expect("register");
        hotkeys.register("alt+f4", |_| {}).expect("register");
        assert_eq!(
            hotkeys.debug_info(),
            HotkeyDebugInfo {
                enabled: true,
                hotkey_count: 2,
                registered_hotkeys: vec!["alt+ctrl+t".to_string(), "alt+f4".to_string()],
            }
        );

        hotkeys.destroy();
        assert_eq!(
            hotkeys.debug_info(),
            HotkeyDebugInfo {
                enabled: false,
                hotkey_count: 0,
                registered_hotkeys: Vec::new(),
            }
        );
    }
}
