//! Desktop shell: owns the window manager, the hotkey dispatcher and the app registry, and turns
//! hotkeys and launcher requests into window operations.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use desktop_app_contract::ApplicationId;
use leptos::logging;
use platform_host::{Clock, SurfaceFactory, TransitionToken};

use crate::{
    apps::{AppDescriptor, AppRegistry, RegistryContentHost, TERMINAL_APP_ID},
    config::DesktopConfig,
    hotkeys::{HotkeyDispatcher, HotkeyError, KeyInput},
    model::{WindowId, WindowOptions},
    window_manager::WindowLifecycleManager,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Work requested by a hotkey handler, applied by the shell once dispatch returns.
pub enum ShellAction {
    OpenTerminal,
    CloseActiveWindow,
    Launch(ApplicationId),
}

pub struct DesktopShell {
    manager: WindowLifecycleManager,
    hotkeys: HotkeyDispatcher<Vec<ShellAction>>,
    registry: Rc<RefCell<AppRegistry>>,
    content: RegistryContentHost,
    initialized: bool,
}

impl DesktopShell {
    /// Builds a shell with the built-in apps registered. Call [`DesktopShell::init`] before use.
    pub fn new(
        config: DesktopConfig,
        surfaces: Box<dyn SurfaceFactory>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let registry = Rc::new(RefCell::new(AppRegistry::with_builtin_apps()));
        let content = RegistryContentHost::new(Rc::clone(&registry));
        let manager =
            WindowLifecycleManager::new(config, surfaces, Box::new(content.clone()), clock);
        Self {
            manager,
            hotkeys: HotkeyDispatcher::new(),
            registry,
            content,
            initialized: false,
        }
    }

    /// Registers the configured default hotkeys.
    ///
    /// # Errors
    ///
    /// Returns [`HotkeyError::Validation`] when a configured chord is malformed.
    pub fn init(&mut self) -> Result<(), HotkeyError> {
        if self.initialized {
            return Ok(());
        }
        let bindings = self.manager.config().hotkeys.clone();
        self.hotkeys.enable();
        self.hotkeys.register(&bindings.new_terminal, |actions| {
            actions.push(ShellAction::OpenTerminal)
        })?;
        self.hotkeys.register(&bindings.close_window, |actions| {
            actions.push(ShellAction::CloseActiveWindow)
        })?;
        self.initialized = true;
        logging::log!("desktop shell initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Routes a key-down event through the hotkey dispatcher. Returns whether a hotkey fired.
    pub fn handle_key(&mut self, input: &mut KeyInput) -> bool {
        let mut actions = Vec::new();
        let handled = self.hotkeys.dispatch(input, &mut actions);
        for action in actions {
            self.apply(action);
        }
        handled
    }

    pub fn apply(&mut self, action: ShellAction) {
        match action {
            ShellAction::OpenTerminal => {
                self.open_terminal();
            }
            ShellAction::CloseActiveWindow => {
                if let Some(id) = self.manager.active_window_id() {
                    let _ = self.manager.close_window(id);
                }
            }
            ShellAction::Launch(app_id) => {
                self.launch_app(&app_id);
            }
        }
    }

    pub fn open_terminal(&mut self) -> Option<WindowId> {
        self.launch_app(&ApplicationId::trusted(TERMINAL_APP_ID))
    }

    /// Opens a window hosting `app_id`. Refused before [`DesktopShell::init`] and for unknown apps.
    pub fn launch_app(&mut self, app_id: &ApplicationId) -> Option<WindowId> {
        if !self.initialized {
            logging::warn!("desktop shell not initialized; ignoring launch of {app_id}");
            return None;
        }
        let Some(options) = self.registry.borrow().get(app_id).map(launch_options) else {
            logging::warn!("cannot launch unregistered app {app_id}");
            return None;
        };
        let id = self.manager.create_window(options).id();
        logging::log!("launched {app_id} in {id}");
        Some(id)
    }

    /// Sends one command line to the content hosted by `window_id`.
    pub fn run_command(&mut self, window_id: WindowId, command: &str) -> Option<String> {
        let handle = self.manager.window(window_id)?.content()?;
        self.content.process_command(handle, command)
    }

    pub fn register_app(&mut self, descriptor: AppDescriptor) {
        self.registry.borrow_mut().register(descriptor);
    }

    pub fn registry(&self) -> Ref<'_, AppRegistry> {
        self.registry.borrow()
    }

    pub fn content_host(&self) -> &RegistryContentHost {
        &self.content
    }

    pub fn manager(&self) -> &WindowLifecycleManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut WindowLifecycleManager {
        &mut self.manager
    }

    pub fn hotkeys(&self) -> &HotkeyDispatcher<Vec<ShellAction>> {
        &self.hotkeys
    }

    pub fn hotkeys_mut(&mut self) -> &mut HotkeyDispatcher<Vec<ShellAction>> {
        &mut self.hotkeys
    }

    /// Host report that a surface finished its transition.
    pub fn transition_finished(&mut self, token: TransitionToken) -> bool {
        self.manager.transition_finished(token)
    }

    pub fn tick(&mut self) -> usize {
        self.manager.tick()
    }

    /// Drops every hotkey and closes every window.
    pub fn shutdown(&mut self) {
        self.hotkeys.destroy();
        self.manager.close_all_windows();
        self.initialized = false;
        logging::log!("desktop shell shut down");
    }
}

fn launch_options(descriptor: &AppDescriptor) -> WindowOptions {
    let options =
        WindowOptions::for_app(descriptor.app_id.clone()).with_title(descriptor.title.clone());
    match descriptor.default_size {
        Some((width, height)) => options.with_size(width, height),
        None => options,
    }
}
