use std::{cell::RefCell, rc::Rc, time::Duration};

use desktop_app_contract::NoopContentHost;
use desktop_runtime::{
    AnimationCoordinator, ConflictPolicy, DesktopConfig, DesktopShell, HotkeyDispatcher,
    HotkeyError, KeyInput, PointerPosition, TransitionOutcome, WindowId, WindowLifecycleManager,
    WindowOptions, WindowRect,
};
use futures::executor::block_on;
use platform_host::{
    ManualClock, MemorySurface, MemorySurfaceHost, SurfaceId, SurfaceRect, TransitionEffect,
    VisualSurface,
};
use pretty_assertions::assert_eq;

fn desktop() -> (WindowLifecycleManager, MemorySurfaceHost, ManualClock) {
    let surfaces = MemorySurfaceHost::default();
    let clock = ManualClock::new(0);
    let manager = WindowLifecycleManager::new(
        DesktopConfig::default(),
        Box::new(surfaces.clone()),
        Box::new(NoopContentHost),
        Rc::new(clock.clone()),
    );
    (manager, surfaces, clock)
}

fn open(manager: &mut WindowLifecycleManager) -> WindowId {
    manager.create_window(WindowOptions::new()).id()
}

fn settle(manager: &mut WindowLifecycleManager, clock: &ManualClock) {
    clock.advance(1_000);
    manager.tick();
}

#[test]
fn each_created_window_is_raised_above_all_previous_ones() {
    let (mut manager, _, _) = desktop();
    let mut previous_max = 0;
    for _ in 0..6 {
        let id = open(&mut manager);
        let z = manager.window(id).expect("window").z_index();
        assert!(manager.windows().filter(|w| w.id() != id).all(|w| w.z_index() < z));
        assert!(z > previous_max);
        previous_max = z;

        assert_eq!(manager.windows().filter(|w| w.is_active()).count(), 1);
        assert_eq!(manager.active_window_id(), Some(id));
    }
}

#[test]
fn focusing_twice_is_idempotent() {
    let (mut manager, _, clock) = desktop();
    let first = open(&mut manager);
    open(&mut manager);
    settle(&mut manager, &clock);

    manager.focus_window(first);
    let z = manager.window(first).expect("window").z_index();
    manager.focus_window(first);

    assert_eq!(manager.active_window_id(), Some(first));
    assert!(manager.window(first).expect("window").z_index() >= z);
    assert_eq!(manager.windows().filter(|w| w.is_active()).count(), 1);
}

#[test]
fn closing_an_unknown_window_changes_nothing() {
    let (mut manager, _, _) = desktop();
    open(&mut manager);
    open(&mut manager);

    let outcome = block_on(manager.close_window(WindowId(404)));

    assert_eq!(outcome, TransitionOutcome::Skipped);
    assert_eq!(manager.len(), 2);
}

#[test]
fn minimize_hides_and_restore_reactivates() {
    let (mut manager, _, clock) = desktop();
    let id = open(&mut manager);
    settle(&mut manager, &clock);

    let minimizing = manager.minimize_window(id);
    settle(&mut manager, &clock);
    assert_eq!(block_on(minimizing), TransitionOutcome::TimedOut);
    assert!(!manager.window(id).expect("window").is_active());
    assert!(!manager.is_visible(id));

    let restoring = manager.restore_window(id);
    settle(&mut manager, &clock);
    assert_eq!(block_on(restoring), TransitionOutcome::TimedOut);
    assert!(manager.is_visible(id));
    assert!(manager.window(id).expect("window").is_active());
    assert_eq!(manager.active_window_id(), Some(id));
}

#[test]
fn toggle_maximize_twice_restores_geometry() {
    let (mut manager, surfaces, _) = desktop();
    open(&mut manager);
    let id = manager
        .create_window(WindowOptions::new().with_size(720, 480))
        .id();
    let before = manager.window(id).expect("window").bounds();

    manager.toggle_maximize(id);
    assert_eq!(
        manager.window(id).expect("window").bounds(),
        WindowRect {
            x: 0,
            y: 0,
            w: 1280,
            h: 752
        }
    );
    manager.toggle_maximize(id);

    let window = manager.window(id).expect("window");
    assert_eq!(window.bounds(), before);
    assert!(!window.is_maximized());
    assert_eq!(window.saved_bounds(), None);
    let surface = surfaces.surface(id.surface_id()).expect("surface");
    assert_eq!(surface.snapshot().rect, SurfaceRect::from(before));
}

#[test]
fn second_transition_on_a_surface_owns_the_terminal_state() {
    let clock = ManualClock::new(0);
    let mut animations =
        AnimationCoordinator::new(DesktopConfig::default().animation, Rc::new(clock.clone()));
    let surface = MemorySurface::new(SurfaceId(1), "Terminal");
    let handle: Rc<dyn VisualSurface> = Rc::new(surface.clone());
    let first_teardown = Rc::new(RefCell::new(0));
    let second_teardown = Rc::new(RefCell::new(0));

    let first = {
        let count = Rc::clone(&first_teardown);
        animations.minimize(&handle, Some(Box::new(move || *count.borrow_mut() += 1)))
    };
    let second = {
        let count = Rc::clone(&second_teardown);
        animations.close(&handle, Some(Box::new(move || *count.borrow_mut() += 1)))
    };
    let close_token = animations.pending_token(SurfaceId(1)).expect("close pending");

    clock.advance(250);
    assert_eq!(animations.poll_timers(), 1);
    assert_eq!(animations.poll_timers(), 0);

    assert_eq!(block_on(first), TransitionOutcome::Superseded);
    assert_eq!(block_on(second), TransitionOutcome::TimedOut);
    assert_eq!(*first_teardown.borrow(), 0);
    assert_eq!(*second_teardown.borrow(), 1);
    assert!(!animations.complete(close_token));

    let snapshot = surface.snapshot();
    assert_eq!(snapshot.transition, None);
    assert_eq!(
        snapshot.history,
        vec![TransitionEffect::Minimize, TransitionEffect::SlideOut]
    );
    assert_eq!(animations.metrics().active_transitions, 0);
    let settled = animations.take_settled();
    assert_eq!(settled.len(), 2);
}

#[test]
fn every_transition_settles_within_duration_plus_grace() {
    let (mut manager, surfaces, clock) = desktop();
    let id = open(&mut manager);
    let surface = surfaces.surface(id.surface_id()).expect("surface");
    let (_, effect, duration) = surface.snapshot().transition.expect("opening");
    assert_eq!(effect, TransitionEffect::SlideIn);
    assert_eq!(duration, Duration::from_millis(300));

    clock.advance(349);
    assert_eq!(manager.tick(), 0);
    clock.advance(1);
    assert_eq!(manager.tick(), 1);
    assert_eq!(manager.pending_transition(id), None);
}

#[test]
fn hotkey_conflict_policies() {
    let mut hotkeys = HotkeyDispatcher::<Vec<&'static str>>::new();
    hotkeys
        .register("ctrl+alt+t", |calls| calls.push("h1"))
        .expect("h1");
    hotkeys
        .register("ctrl+alt+t", |calls| calls.push("h2"))
        .expect("h2 replaces h1");

    let mut calls = Vec::new();
    let mut input = KeyInput::new("t").with_ctrl().with_alt();
    assert!(hotkeys.dispatch(&mut input, &mut calls));
    assert_eq!(calls, vec!["h2"]);
    assert!(input.default_prevented);

    assert_eq!(
        hotkeys.register_with("ctrl+alt+t", |calls| calls.push("h3"), ConflictPolicy::Error),
        Err(HotkeyError::Conflict("alt+ctrl+t".to_string()))
    );
    assert!(matches!(
        hotkeys.register("ctrl++", |calls| calls.push("h4")),
        Err(HotkeyError::Validation { .. })
    ));
}

#[test]
fn header_drag_follows_pointer_until_release() {
    let (mut manager, _, _) = desktop();
    let a = open(&mut manager);
    assert_eq!(
        manager.window(a).expect("window").origin(),
        PointerPosition { x: 100, y: 100 }
    );

    assert!(manager.begin_drag(a, PointerPosition { x: 110, y: 110 }));
    assert!(manager.drag_to(PointerPosition { x: 150, y: 150 }));
    assert_eq!(
        manager.window(a).expect("window").origin(),
        PointerPosition { x: 140, y: 140 }
    );

    assert_eq!(manager.end_drag(), Some(a));
    assert!(!manager.drag_to(PointerPosition { x: 400, y: 400 }));
    assert_eq!(
        manager.window(a).expect("window").origin(),
        PointerPosition { x: 140, y: 140 }
    );
}

#[test]
fn five_default_windows_cascade() {
    let (mut manager, _, _) = desktop();
    let xs: Vec<i32> = (0..5)
        .map(|_| manager.create_window(WindowOptions::new()).bounds().x)
        .collect();
    assert_eq!(xs, vec![100, 130, 160, 190, 220]);

    let ys: Vec<i32> = manager.windows().map(|w| w.bounds().y).collect();
    assert_eq!(ys, xs);
}

#[test]
fn close_all_snapshots_ids_and_clears_the_desktop() {
    let (mut manager, surfaces, clock) = desktop();
    for _ in 0..3 {
        open(&mut manager);
    }
    manager.close_all_windows();
    assert_eq!(manager.len(), 3);

    settle(&mut manager, &clock);
    assert!(manager.is_empty());
    assert!(surfaces.is_empty());
    assert_eq!(manager.active_window_id(), None);
}

#[test]
fn window_records_round_trip_through_json() {
    let (mut manager, _, _) = desktop();
    let id = open(&mut manager);
    manager.toggle_maximize(id);
    let model = manager.window(id).expect("window").clone();

    let json = model.to_json().expect("json");
    assert_eq!(json["saved_bounds"]["x"], 100);
    assert_eq!(
        desktop_runtime::WindowModel::from_json(json).expect("model"),
        model
    );
}

#[test]
fn shell_hotkeys_drive_the_window_manager() {
    let surfaces = MemorySurfaceHost::default();
    let clock = ManualClock::new(0);
    let mut shell = DesktopShell::new(
        DesktopConfig::default(),
        Box::new(surfaces.clone()),
        Rc::new(clock.clone()),
    );
    shell.init().expect("init");

    assert!(shell.handle_key(&mut KeyInput::new("T").with_ctrl().with_alt()));
    assert!(shell.handle_key(&mut KeyInput::new("t").with_ctrl().with_alt()));
    assert_eq!(shell.manager().len(), 2);
    assert_eq!(surfaces.len(), 2);

    let mut close = KeyInput::new("F4").with_alt();
    assert!(shell.handle_key(&mut close));
    clock.advance(1_000);
    shell.tick();
    assert_eq!(shell.manager().len(), 1);

    assert!(!shell.handle_key(&mut KeyInput::new("q").with_ctrl()));
    assert!(shell.handle_key(&mut KeyInput::new("f4").with_alt()));
    clock.advance(1_000);
    shell.tick();
    assert!(shell.manager().is_empty());
    assert!(surfaces.is_empty());
}
