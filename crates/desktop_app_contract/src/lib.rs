//! Shared contract types between the window lifecycle manager and hosted content.
//!
//! The manager never inspects what runs inside a window. It asks a [`ContentHost`] to attach
//! content for a window, keeps the opaque [`ContentHandle`] it gets back, forwards input focus,
//! and detaches before the window is destroyed. Each kind of content (terminal, calculator,
//! help, ...) is an independent [`HostedContent`] implementation.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a runtime-managed window.
pub type WindowRuntimeId = u64;

/// Stable identifier for an app package/module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Returns an app identifier when `raw` conforms to the `segment.segment...` policy.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if is_valid_application_id(&raw) {
            Ok(Self(raw))
        } else {
            Err(format!(
                "invalid application id `{raw}`; expected namespaced dotted segments"
            ))
        }
    }

    /// Returns the string form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates an id without validation for compile-time/runtime trusted constants.
    pub fn trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the last dotted segment (`system.terminal` -> `terminal`).
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid_application_id(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > 120 {
        return false;
    }

    let mut count = 0usize;
    for part in raw.split('.') {
        count += 1;
        if part.is_empty() || part.len() > 32 {
            return false;
        }
        let bytes = part.as_bytes();
        if !bytes[0].is_ascii_lowercase() {
            return false;
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        {
            return false;
        }
        if part.ends_with('-') {
            return false;
        }
    }

    count >= 2
}

/// Opaque reference to a content instance attached to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHandle(pub u64);

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Failure raised by a content instance while initializing.
pub struct ContentError {
    message: String,
}

impl ContentError {
    /// Creates an error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ContentError {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Mount information handed to content on initialization.
pub struct ContentContext {
    /// Window the content is mounted into.
    pub window_id: WindowRuntimeId,
    /// Application the content belongs to.
    pub app_id: ApplicationId,
}

/// Capability interface implemented by every kind of hosted content.
///
/// Only `init` and `destroy` are mandatory; content that takes typed commands or keyboard focus
/// overrides the defaults.
pub trait HostedContent {
    /// Prepares the content for its window.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] when the content cannot be mounted.
    fn init(&mut self, context: &ContentContext) -> Result<(), ContentError>;

    /// Handles one line of command input, returning the textual reply when the content accepts
    /// commands.
    fn process_command(&mut self, _command: &str) -> Option<String> {
        None
    }

    /// Takes input focus.
    fn focus(&mut self) {}

    /// Releases everything the content holds. Called exactly once.
    fn destroy(&mut self);
}

/// Attach/focus/detach boundary the window lifecycle manager calls into.
pub trait ContentHost {
    /// Mounts `app_id` into `window_id`, returning a handle, or `None` when nothing could be
    /// mounted.
    fn attach(&mut self, window_id: WindowRuntimeId, app_id: &ApplicationId)
        -> Option<ContentHandle>;

    /// Gives input focus to attached content.
    fn focus_content(&mut self, handle: ContentHandle);

    /// Destroys attached content. Unknown handles are ignored.
    fn detach(&mut self, handle: ContentHandle);
}

#[derive(Debug, Clone, Copy, Default)]
/// [`ContentHost`] that never mounts anything.
pub struct NoopContentHost;

impl ContentHost for NoopContentHost {
    fn attach(&mut self, _: WindowRuntimeId, _: &ApplicationId) -> Option<ContentHandle> {
        None
    }

    fn focus_content(&mut self, _: ContentHandle) {}

    fn detach(&mut self, _: ContentHandle) {}
}
