//! Application registry and the content host that mounts registered apps into windows.

mod placeholders;

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use desktop_app_contract::{
    ApplicationId, ContentContext, ContentHandle, ContentHost, HostedContent, WindowRuntimeId,
};
use leptos::logging;

pub use placeholders::{CalculatorContent, HelpContent, TerminalContent, HELP_TEXT};

/// Builds a fresh content instance for one window.
pub type ContentFactory = fn() -> Box<dyn HostedContent>;

pub const TERMINAL_APP_ID: &str = "system.terminal";
pub const CALCULATOR_APP_ID: &str = "system.calculator";
pub const HELP_APP_ID: &str = "system.help";

const DEFAULT_APP_ICON: &str = "⚡";

#[derive(Debug, Clone)]
pub struct AppDescriptor {
    pub app_id: ApplicationId,
    pub title: String,
    pub icon: String,
    /// Window size requested when the app is launched; `None` uses the configured default.
    pub default_size: Option<(i32, i32)>,
    factory: ContentFactory,
}

impl AppDescriptor {
    /// Creates a descriptor titled after the capitalized last id segment.
    pub fn new(app_id: ApplicationId, factory: ContentFactory) -> Self {
        Self {
            title: capitalize(app_id.short_name()),
            app_id,
            icon: DEFAULT_APP_ICON.to_string(),
            default_size: None,
            factory,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_default_size(mut self, width: i32, height: i32) -> Self {
        self.default_size = Some((width, height));
        self
    }

    pub fn instantiate(&self) -> Box<dyn HostedContent> {
        (self.factory)()
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Registered apps in registration order.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: Vec<AppDescriptor>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the terminal, calculator and help apps.
    pub fn with_builtin_apps() -> Self {
        let mut registry = Self::new();
        registry.register(
            AppDescriptor::new(ApplicationId::trusted(TERMINAL_APP_ID), || {
                Box::new(TerminalContent::default())
            })
            .with_default_size(800, 600),
        );
        registry.register(
            AppDescriptor::new(ApplicationId::trusted(CALCULATOR_APP_ID), || {
                Box::new(CalculatorContent::default())
            })
            .with_icon("🔢"),
        );
        registry.register(
            AppDescriptor::new(ApplicationId::trusted(HELP_APP_ID), || {
                Box::new(HelpContent::default())
            })
            .with_icon("❓"),
        );
        registry
    }

    /// Adds `descriptor`, replacing any app registered under the same id in place.
    pub fn register(&mut self, descriptor: AppDescriptor) {
        match self
            .apps
            .iter_mut()
            .find(|entry| entry.app_id == descriptor.app_id)
        {
            Some(existing) => *existing = descriptor,
            None => self.apps.push(descriptor),
        }
    }

    pub fn get(&self, app_id: &ApplicationId) -> Option<&AppDescriptor> {
        self.apps.iter().find(|entry| &entry.app_id == app_id)
    }

    pub fn contains(&self, app_id: &ApplicationId) -> bool {
        self.get(app_id).is_some()
    }

    pub fn apps(&self) -> &[AppDescriptor] {
        &self.apps
    }

    pub fn unregister(&mut self, app_id: &ApplicationId) -> Option<AppDescriptor> {
        let index = self.apps.iter().position(|entry| &entry.app_id == app_id)?;
        Some(self.apps.remove(index))
    }
}

struct MountedContent {
    window_id: WindowRuntimeId,
    app_id: ApplicationId,
    content: Box<dyn HostedContent>,
}

/// [`ContentHost`] instantiating apps from a shared [`AppRegistry`].
///
/// Clones share the registry and the mounted instances, so the shell can keep a handle for
/// command routing while the window manager owns another.
#[derive(Clone)]
pub struct RegistryContentHost {
    registry: Rc<RefCell<AppRegistry>>,
    mounted: Rc<RefCell<BTreeMap<ContentHandle, MountedContent>>>,
    next_handle: Rc<Cell<u64>>,
}

impl RegistryContentHost {
    pub fn new(registry: Rc<RefCell<AppRegistry>>) -> Self {
        Self {
            registry,
            mounted: Rc::new(RefCell::new(BTreeMap::new())),
            next_handle: Rc::new(Cell::new(1)),
        }
    }

    /// Routes one command line to mounted content.
    pub fn process_command(&self, handle: ContentHandle, command: &str) -> Option<String> {
        self.mounted
            .borrow_mut()
            .get_mut(&handle)
            .and_then(|mounted| mounted.content.process_command(command))
    }

    pub fn app_of(&self, handle: ContentHandle) -> Option<ApplicationId> {
        self.mounted
            .borrow()
            .get(&handle)
            .map(|mounted| mounted.app_id.clone())
    }

    pub fn window_of(&self, handle: ContentHandle) -> Option<WindowRuntimeId> {
        self.mounted.borrow().get(&handle).map(|mounted| mounted.window_id)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.borrow().len()
    }
}

impl ContentHost for RegistryContentHost {
    fn attach(
        &mut self,
        window_id: WindowRuntimeId,
        app_id: &ApplicationId,
    ) -> Option<ContentHandle> {
        let instance = self.registry.borrow().get(app_id).map(AppDescriptor::instantiate);
        let Some(mut content) = instance else {
            logging::warn!("no app registered for {app_id}");
            return None;
        };

        let context = ContentContext {
            window_id,
            app_id: app_id.clone(),
        };
        if let Err(err) = content.init(&context) {
            logging::warn!("{app_id} failed to initialize in window {window_id}: {err}");
            content.destroy();
            return None;
        }

        let handle = ContentHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.mounted.borrow_mut().insert(
            handle,
            MountedContent {
                window_id,
                app_id: app_id.clone(),
                content,
            },
        );
        Some(handle)
    }

    fn focus_content(&mut self, handle: ContentHandle) {
        if let Some(mounted) = self.mounted.borrow_mut().get_mut(&handle) {
            mounted.content.focus();
        }
    }

    fn detach(&mut self, handle: ContentHandle) {
        let removed = self.mounted.borrow_mut().remove(&handle);
        if let Some(mut mounted) = removed {
            mounted.content.destroy();
        }
    }
}
