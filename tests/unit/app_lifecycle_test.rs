//! End-to-end lifecycle tests for `App` driven through the recording host.

use std::fs;

use serde_json::json;
use tempfile::TempDir;

use tabhost::app::App;
use tabhost::config::HostConfig;
use tabhost::host::{ExitStatus, HostEvent};
use tabhost::managers::persistence_manager::SaveOutcome;
use tabhost::platform;
use tabhost::testing::{confirm_closes, ready_all, HostCall, RecordingHost};
use tabhost::types::notification::{Notification, TabDirection};
use tabhost::types::permission::{Origin, PermissionOutcome};
use tabhost::types::state::{AggregateAppState, PreferenceKey};
use tabhost::types::window::{DisplayState, Geometry, TabEntry, WindowOptions};

fn setup() -> (App<RecordingHost>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let app = App::new(RecordingHost::new(), HostConfig::for_profile(tmp.path().join("profile")));
    (app, tmp)
}

// ─── Startup ───

#[test]
fn test_startup_with_missing_state_opens_one_window() {
    let (mut app, _tmp) = setup();
    let id = app.startup().unwrap();
    assert_eq!(app.registry.count(), 1);
    assert_eq!(app.persistence.state(), &AggregateAppState::default());

    ready_all(&mut app);
    assert_eq!(
        app.host().sent_to(id),
        vec![&Notification::NewTab { url: "about:newtab".to_string(), follow: true }]
    );
}

#[test]
fn test_startup_with_corrupt_state_opens_one_window() {
    let (mut app, _tmp) = setup();
    let path = app.persistence.store().state_path();
    app.persistence.store().write_atomic(&path, b"{\"homepage\": 12,,,").unwrap();

    app.startup().unwrap();
    assert_eq!(app.registry.count(), 1);
    assert_eq!(app.persistence.state().homepage, "https://github.com");
}

#[test]
fn test_startup_failure_exits_nonzero() {
    let (mut app, _tmp) = setup();
    app.host_mut().fail_create_window = true;
    assert!(app.startup().is_err());
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Failure));
    assert_eq!(ExitStatus::Failure.code(), 1);
}

#[test]
fn test_first_window_starts_autosave() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();
    assert!(app.persistence.autosave_running());
    assert_eq!(app.host().active_timers().len(), 1);
}

#[test]
fn test_accelerators_registered_per_window() {
    let (mut app, _tmp) = setup();
    let id = app.startup().unwrap();
    let escape = HostCall::RegisterAccelerator(id, "Escape".to_string());
    assert!(app.host().calls.contains(&escape));

    app.handle_event(HostEvent::AcceleratorTriggered {
        window_id: id,
        accelerator: platform::resolve_accelerator("CmdOrCtrl+9"),
    });
    assert_eq!(
        app.host().sent_to(id).last(),
        Some(&&Notification::TabClick { index: -1 })
    );

    if !platform::is_macos() {
        app.handle_event(HostEvent::AcceleratorTriggered {
            window_id: id,
            accelerator: "Ctrl+Shift+Tab".to_string(),
        });
        assert_eq!(
            app.host().sent_to(id).last(),
            Some(&&Notification::TabSelect { direction: TabDirection::Previous })
        );
    }
}

// ─── Autosave ───

#[test]
fn test_autosave_tick_writes_state() {
    let (mut app, _tmp) = setup();
    let id = app.startup().unwrap();
    app.handle_event(HostEvent::TabsChanged {
        window_id: id,
        tabs: vec![TabEntry { url: "https://a.test".to_string(), is_active: true }],
        current_tab_index: 0,
    });

    let timer = app.host().active_timers()[0];
    app.handle_event(HostEvent::TimerFired { timer_id: timer });

    let saved = app.persistence.load().unwrap();
    assert_eq!(saved.windows.len(), 1);
    assert_eq!(saved.windows[0].tabs[0].url, "https://a.test");
    assert_eq!(app.registry.count(), 1);
}

// ─── Quit ───

#[test]
fn test_quit_drains_then_writes_then_exits() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();

    let outcome = app.request_quit().unwrap();
    assert_eq!(outcome, SaveOutcome::Draining { remaining: 2 });
    assert!(app.host().exit_status().is_none());
    assert!(app.host().active_timers().is_empty());
    assert!(!app.persistence.store().state_path().exists());

    assert_eq!(confirm_closes(&mut app), 2);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Normal));
    assert!(app.persistence.store().state_path().exists());
    assert_eq!(app.host().count_calls(|c| matches!(c, HostCall::Exit(_))), 1);
}

#[test]
fn test_last_window_closing_quits() {
    let (mut app, _tmp) = setup();
    let id = app.startup().unwrap();
    app.close_window(id).unwrap();
    confirm_closes(&mut app);

    if platform::is_macos() {
        assert!(app.host().exit_status().is_none());
    } else {
        assert_eq!(app.host().exit_status(), Some(ExitStatus::Normal));
        assert!(app.persistence.store().state_path().exists());
    }
}

#[test]
fn test_restart_after_language_grant() {
    let (mut app, _tmp) = setup();
    let first = app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();

    let token = app
        .request_language_change(Origin::window(first), "fr", "Français")
        .unwrap();
    let outcome = app.respond_permission(token, true).unwrap();
    assert_eq!(outcome, PermissionOutcome::Granted);
    assert!(app.host().exit_status().is_none());

    confirm_closes(&mut app);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Restart));
    assert_eq!(app.language(), "fr");
    // Restart path bumps the sequence but leaves the aggregate alone
    assert!(!app.persistence.store().state_path().exists());
    assert!(app.persistence.store().sequence_path().exists());
    assert_eq!(app.host().count_calls(|c| matches!(c, HostCall::Exit(_))), 1);
}

#[test]
fn test_denied_language_keeps_running() {
    let (mut app, _tmp) = setup();
    let first = app.startup().unwrap();
    let token = app
        .request_language_change(Origin::window(first), "fr", "Français")
        .unwrap();
    assert_eq!(app.respond_permission(token, false).unwrap(), PermissionOutcome::Denied);
    assert!(app.host().exit_status().is_none());
    assert_eq!(app.language(), "en-US");
    assert_eq!(app.registry.count(), 1);
}

#[test]
fn test_closing_requester_discards_request() {
    let (mut app, _tmp) = setup();
    let first = app.startup().unwrap();
    let second = app.open_window(WindowOptions::default()).unwrap();
    let token = app
        .request_language_change(Origin::window(second), "de", "Deutsch")
        .unwrap();

    app.close_window(second).unwrap();
    confirm_closes(&mut app);
    assert!(app.gate.is_idle());
    assert_eq!(app.respond_permission(token, true).unwrap(), PermissionOutcome::Stale);
    assert!(app.registry.contains(first));
}

#[test]
fn test_duplicate_close_does_not_finish_quit() {
    let (mut app, _tmp) = setup();
    let a = app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();
    assert_eq!(app.request_quit().unwrap(), SaveOutcome::Draining { remaining: 2 });

    app.handle_event(HostEvent::WindowClosed { window_id: a });
    app.handle_event(HostEvent::WindowClosed { window_id: a });

    assert_eq!(app.registry.count(), 1);
    assert!(!app.persistence.store().state_path().exists());
    assert!(app.host().exit_status().is_none());

    confirm_closes(&mut app);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Normal));
}

// ─── Disconnect ───

#[test]
fn test_disconnect_mid_drain_writes_captured_windows() {
    let (mut app, _tmp) = setup();
    let a = app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();
    app.request_quit().unwrap();
    app.handle_event(HostEvent::WindowClosed { window_id: a });

    assert_eq!(app.disconnect(), ExitStatus::Normal);
    assert_eq!(app.persistence.load().unwrap().windows.len(), 2);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Normal));
}

#[test]
fn test_disconnect_retries_failed_write() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    let state_path = app.persistence.store().state_path();
    fs::create_dir_all(&state_path).unwrap();

    app.request_quit().unwrap();
    confirm_closes(&mut app);
    assert!(app.persistence.has_pending_write());
    assert!(app.host().exit_status().is_none());

    fs::remove_dir_all(&state_path).unwrap();
    assert_eq!(app.disconnect(), ExitStatus::Normal);
    assert!(!app.persistence.has_pending_write());
    assert_eq!(app.persistence.load().unwrap().windows.len(), 1);
}

#[test]
fn test_disconnect_with_unwritable_state_fails() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    fs::create_dir_all(app.persistence.store().state_path()).unwrap();

    app.request_quit().unwrap();
    confirm_closes(&mut app);
    assert_eq!(app.disconnect(), ExitStatus::Failure);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Failure));
}

#[test]
fn test_disconnect_while_idle_soft_saves() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    assert_eq!(app.disconnect(), ExitStatus::Normal);
    assert_eq!(app.persistence.load().unwrap().windows.len(), 1);
    assert_eq!(app.registry.count(), 1);
}

// ─── Preferences ───

#[test]
fn test_set_preference_broadcasts() {
    let (mut app, _tmp) = setup();
    let a = app.startup().unwrap();
    let b = app.open_window(WindowOptions::default()).unwrap();

    let notified = app
        .set_preference(PreferenceKey::PdfViewer, json!("native"), Some(Origin::window(a)))
        .unwrap();
    assert_eq!(notified, 2);
    let expected = Notification::PreferenceChanged {
        key: PreferenceKey::PdfViewer,
        value: json!("native"),
        origin: Some(Origin::window(a)),
    };
    assert!(app.host().sent_to(b).contains(&&expected));
    assert_eq!(app.preference(PreferenceKey::PdfViewer), json!("native"));
}

#[test]
fn test_invalid_preference_not_broadcast() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    let before = app.host().sent.len();
    assert!(app
        .set_preference(PreferenceKey::Downloads, json!("nope"), None)
        .is_err());
    assert_eq!(app.host().sent.len(), before);
}

// ─── Restore ───

#[test]
fn test_quit_then_restore_round_trip() {
    let tmp = TempDir::new().unwrap();
    let config = HostConfig::for_profile(tmp.path().join("profile"));

    let mut app = App::new(RecordingHost::new(), config.clone());
    let id = app.startup().unwrap();
    app.handle_event(HostEvent::WindowStateChanged {
        window_id: id,
        geometry: Some(Geometry { x: 40, y: 50, width: 1000, height: 700 }),
        display_state: Some(DisplayState::Maximized),
        focused: Some(true),
    });
    app.handle_event(HostEvent::TabsChanged {
        window_id: id,
        tabs: vec![
            TabEntry { url: "https://a.test".to_string(), is_active: false },
            TabEntry { url: "https://b.test".to_string(), is_active: true },
        ],
        current_tab_index: 1,
    });
    app.request_quit().unwrap();
    confirm_closes(&mut app);

    let mut next = App::new(RecordingHost::new(), config);
    let listed = next.list_snapshots().unwrap();
    assert_eq!(listed.len(), 1);
    let restored = next.restore_all().unwrap();
    assert_eq!(restored.len(), 1);

    let window = next.registry.get(restored[0]).unwrap();
    assert_eq!(window.geometry.width, 1000);
    assert_eq!(window.display_state, DisplayState::Maximized);

    ready_all(&mut next);
    let replay = next.host().sent_to(restored[0]);
    assert!(matches!(
        replay.as_slice(),
        [Notification::ReplayTabs { tabs, focus_index: Some(1) }] if tabs.len() == 2
    ));
    assert!(next.list_snapshots().unwrap().is_empty());
}

#[test]
fn test_restore_twice_before_content_ready_opens_once() {
    let tmp = TempDir::new().unwrap();
    let config = HostConfig::for_profile(tmp.path().join("profile"));

    let mut app = App::new(RecordingHost::new(), config.clone());
    app.startup().unwrap();
    app.request_quit().unwrap();
    confirm_closes(&mut app);

    let mut next = App::new(RecordingHost::new(), config);
    let path = next.list_snapshots().unwrap()[0].path.clone().unwrap();
    let first = next.restore_snapshot(&path).unwrap();
    let second = next.restore_snapshot(&path).unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
    assert!(next.restore_all().unwrap().is_empty());
    assert_eq!(next.registry.count(), 1);
}

// ─── Misc ───

#[test]
fn test_open_url_window_size_and_first_content() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    let id = app.open_window_with_url("https://x.test", false).unwrap();
    let geometry = app.registry.get(id).unwrap().geometry;
    assert_eq!((geometry.width, geometry.height), (800, 500));

    app.handle_event(HostEvent::ContentReady { window_id: id });
    assert_eq!(
        app.host().sent_to(id),
        vec![&Notification::NewTab { url: "https://x.test".to_string(), follow: false }]
    );
}

#[test]
fn test_activate_only_without_windows() {
    let (mut app, _tmp) = setup();
    assert!(app.activate().unwrap().is_some());
    assert!(app.activate().unwrap().is_none());
    assert_eq!(app.registry.count(), 1);
}

#[test]
fn test_second_instance_unminimizes_first_window() {
    let (mut app, _tmp) = setup();
    let first = app.startup().unwrap();
    app.open_window(WindowOptions::default()).unwrap();
    app.handle_event(HostEvent::WindowStateChanged {
        window_id: first,
        geometry: None,
        display_state: Some(DisplayState::Minimized),
        focused: None,
    });

    assert_eq!(app.second_instance(), Some(first));
    assert!(app
        .host()
        .calls
        .contains(&HostCall::SetDisplayState(first, DisplayState::Normal)));
    assert!(app.host().calls.contains(&HostCall::FocusWindow(first)));
}

#[test]
fn test_back_online_reloads_windows() {
    let (mut app, _tmp) = setup();
    app.startup().unwrap();
    assert_eq!(app.set_online(true), 0);
    assert_eq!(app.set_online(false), 0);
    assert_eq!(app.set_online(true), 1);
}
