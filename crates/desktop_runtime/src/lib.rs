//! Window lifecycle core of the desktop: window model, transition coordinator, hotkey dispatcher,
//! lifecycle manager and the shell that wires them together.

pub mod animation;
pub mod apps;
pub mod config;
pub mod hotkeys;
pub mod model;
pub mod shell;
pub mod window_manager;

pub use animation::{
    AnimationCoordinator, AnimationMetrics, SettledTransition, Teardown, Transition,
    TransitionKind, TransitionOutcome,
};
pub use apps::{AppDescriptor, AppRegistry, RegistryContentHost};
pub use config::{ConfigError, DesktopConfig};
pub use hotkeys::{
    Chord, ConflictPolicy, HotkeyDebugInfo, HotkeyDispatcher, HotkeyError, KeyInput, Modifier,
    Registration,
};
pub use model::*;
pub use shell::{DesktopShell, ShellAction};
pub use window_manager::{WindowLifecycleManager, WindowPhase};
