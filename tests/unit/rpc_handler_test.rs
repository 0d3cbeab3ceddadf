//! Unit tests for the RPC handler: every method dispatched by `handle_method`.
//!
//! These go through the same code path as the `tabhost` binary, with the
//! recording host standing in for the windowing shell.

use serde_json::{json, Value};
use tempfile::TempDir;

use tabhost::app::App;
use tabhost::config::HostConfig;
use tabhost::host::{ExitStatus, HostEvent};
use tabhost::rpc_handler::handle_method;
use tabhost::testing::{confirm_closes, RecordingHost};
use tabhost::types::permission::Origin;
use tabhost::types::window::WindowId;

/// Create a started App backed by a temp profile directory.
fn setup() -> (App<RecordingHost>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mut app = App::new(RecordingHost::new(), HostConfig::for_profile(tmp.path().join("profile")));
    app.startup().expect("Failed to start App");
    (app, tmp)
}

fn call(app: &mut App<RecordingHost>, method: &str, params: Value) -> Result<Value, String> {
    handle_method(app, None, method, &params)
}

fn first_window(app: &App<RecordingHost>) -> u64 {
    app.registry.ids()[0].0
}

// ─── Ping ───

#[test]
fn test_ping() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "ping", json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

// ─── Unknown method ───

#[test]
fn test_unknown_method_returns_error() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "nonexistent.method", json!({}));
    assert!(res.is_err());
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Windows ───

#[test]
fn test_window_open_count_list() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "window.open", json!({"width": 900, "height": 600})).unwrap();
    let id = res["window_id"].as_u64().unwrap();

    assert_eq!(call(&mut app, "window.count", json!({})).unwrap(), json!(2));
    let list = call(&mut app, "window.list", json!({})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);

    let window = call(&mut app, "window.get", json!({"window_id": id})).unwrap();
    assert_eq!(window["geometry"]["width"], 900);
    assert_eq!(window["closing"], false);
}

#[test]
fn test_window_get_unknown_is_null() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "window.get", json!({"window_id": 999})).unwrap();
    assert!(res.is_null());
}

#[test]
fn test_window_open_url() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "window.open_url", json!({"url": "https://x.test", "follow": true})).unwrap();
    let id = WindowId(res["window_id"].as_u64().unwrap());
    assert_eq!(app.registry.get(id).unwrap().geometry.width, 800);
}

#[test]
fn test_window_close_and_title() {
    let (mut app, _tmp) = setup();
    let id = first_window(&app);
    call(&mut app, "window.set_title", json!({"window_id": id, "title": "Hello"})).unwrap();
    assert_eq!(app.registry.get(WindowId(id)).unwrap().title.as_deref(), Some("Hello"));

    call(&mut app, "window.close", json!({"window_id": id})).unwrap();
    assert_eq!(
        call(&mut app, "window.get", json!({"window_id": id})).unwrap()["closing"],
        true
    );
}

#[test]
fn test_window_missing_param() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "window.close", json!({}));
    assert_eq!(res.unwrap_err(), "missing window_id");
}

// ─── Views ───

#[test]
fn test_view_lifecycle() {
    let (mut app, _tmp) = setup();
    let window = first_window(&app);

    let view = call(&mut app, "view.create", json!({"window_id": window, "url": "https://a.test"})).unwrap()
        ["view_id"]
        .as_u64()
        .unwrap();
    let attached = call(&mut app, "view.attach", json!({"window_id": window, "view_id": view})).unwrap();
    assert_eq!(attached["attached"], true);
    assert_eq!(attached["changed"], true);

    let again = call(&mut app, "view.attach", json!({"window_id": window, "view_id": view})).unwrap();
    assert_eq!(again["changed"], false);

    let bounds = call(
        &mut app,
        "view.set_bounds",
        json!({"window_id": window, "x": 0, "y": 50, "width": 1080, "height": 800}),
    )
    .unwrap();
    assert_eq!(bounds["bounds"]["height"], 751);

    call(&mut app, "view.navigate", json!({"view_id": view, "url": "https://b.test"})).unwrap();
    call(&mut app, "view.destroy", json!({"view_id": view})).unwrap();
    assert!(call(&mut app, "view.destroy", json!({"view_id": view})).is_err());
}

#[test]
fn test_view_set_bounds_extreme_values_saturate() {
    let (mut app, _tmp) = setup();
    let window = first_window(&app);
    let view = call(&mut app, "view.create", json!({"window_id": window, "url": "https://a.test"})).unwrap()
        ["view_id"]
        .as_u64()
        .unwrap();
    call(&mut app, "view.attach", json!({"window_id": window, "view_id": view})).unwrap();

    let bounds = call(
        &mut app,
        "view.set_bounds",
        json!({"window_id": window, "x": 0, "y": -1, "width": 10, "height": i32::MAX}),
    )
    .unwrap();
    assert_eq!(bounds["bounds"]["height"], i32::MAX);
}

#[test]
fn test_view_sentinel_accepted() {
    let (mut app, _tmp) = setup();
    let window = first_window(&app);
    assert_eq!(
        call(&mut app, "view.attach", json!({"window_id": window, "view_id": -1})).unwrap(),
        json!({"attached": false})
    );
    assert!(call(&mut app, "view.destroy", json!({"view_id": -1})).is_ok());
    assert!(call(&mut app, "view.navigate", json!({"view_id": -1, "url": "https://a.test"})).is_ok());
}

// ─── Preferences ───

#[test]
fn test_prefs_get_set() {
    let (mut app, _tmp) = setup();
    assert_eq!(
        call(&mut app, "prefs.get", json!({"key": "homepage"})).unwrap(),
        json!("https://github.com")
    );
    let res = call(&mut app, "prefs.set", json!({"key": "homepage", "value": "https://home.test"})).unwrap();
    assert_eq!(res["notified"], 1);
    assert_eq!(
        call(&mut app, "prefs.get", json!({"key": "homepage"})).unwrap(),
        json!("https://home.test")
    );
}

#[test]
fn test_prefs_set_auth_and_proxy() {
    let (mut app, _tmp) = setup();
    call(&mut app, "prefs.set", json!({"key": "auth", "value": {"username": "u", "password": "p"}})).unwrap();
    assert!(app.persistence.state().auth.is_complete());
    call(&mut app, "prefs.set", json!({"key": "proxy_config", "value": {"proxy_rules": "socks5://127.0.0.1:1080"}})).unwrap();
    assert_eq!(
        app.persistence.state().proxy_config.proxy_rules.as_deref(),
        Some("socks5://127.0.0.1:1080")
    );
}

#[test]
fn test_prefs_unknown_key() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "prefs.get", json!({"key": "language"}));
    assert!(res.unwrap_err().contains("unknown preference"));
}

// ─── Language ───

#[test]
fn test_lang_get_default() {
    let (mut app, _tmp) = setup();
    assert_eq!(call(&mut app, "lang.get", json!({})).unwrap(), json!("en-US"));
}

#[test]
fn test_lang_set_requires_origin() {
    let (mut app, _tmp) = setup();
    let res = call(&mut app, "lang.set", json!({"lang": "fr", "label": "Français"}));
    assert_eq!(res.unwrap_err(), "missing origin");
}

#[test]
fn test_lang_set_and_respond() {
    let (mut app, _tmp) = setup();
    let origin = Origin::window(WindowId(first_window(&app)));
    let res = handle_method(&mut app, Some(origin), "lang.set", &json!({"lang": "fr", "label": "Français"})).unwrap();
    let token = res["token"].as_str().unwrap().to_string();

    let busy = handle_method(&mut app, Some(origin), "lang.set", &json!({"lang": "de"}));
    assert!(busy.unwrap_err().contains("already pending"));

    let res = call(&mut app, "permission.respond", json!({"token": token, "accept": true})).unwrap();
    assert_eq!(res, json!({"outcome": "granted"}));
    confirm_closes(&mut app);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Restart));
    assert_eq!(call(&mut app, "lang.get", json!({})).unwrap(), json!("fr"));
}

#[test]
fn test_permission_respond_bad_token() {
    let (mut app, _tmp) = setup();
    assert!(call(&mut app, "permission.respond", json!({"token": "nope", "accept": true})).is_err());
    let stale = call(
        &mut app,
        "permission.respond",
        json!({"token": "67e55044-10b1-426f-9247-bb680e5fe0c8", "accept": true}),
    )
    .unwrap();
    assert_eq!(stale, json!({"outcome": "stale"}));
}

// ─── Snapshots & app ───

#[test]
fn test_quit_then_snapshots_restore() {
    let (mut app, tmp) = setup();
    let res = call(&mut app, "app.quit", json!({})).unwrap();
    assert_eq!(res, json!({"status": "draining", "remaining": 1}));
    confirm_closes(&mut app);
    assert_eq!(app.host().exit_status(), Some(ExitStatus::Normal));

    let mut next = App::new(RecordingHost::new(), HostConfig::for_profile(tmp.path().join("profile")));
    let list = call(&mut next, "snapshots.list", json!({})).unwrap();
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let path = entries[0]["path"].as_str().unwrap().to_string();

    let res = call(&mut next, "snapshots.restore", json!({"path": path})).unwrap();
    assert!(res["window_id"].is_u64());
    let window_id = WindowId(res["window_id"].as_u64().unwrap());
    next.handle_event(HostEvent::ContentReady { window_id });

    let res = call(&mut next, "snapshots.restore", json!({"path": path})).unwrap();
    assert!(res["window_id"].is_null());
    assert_eq!(call(&mut next, "snapshots.restore_all", json!({})).unwrap(), json!({"window_ids": []}));
}

#[test]
fn test_app_activate_and_second_instance() {
    let (mut app, _tmp) = setup();
    assert!(call(&mut app, "app.activate", json!({})).unwrap()["window_id"].is_null());
    let res = call(&mut app, "app.second_instance", json!({})).unwrap();
    assert_eq!(res["window_id"], first_window(&app));
}

#[test]
fn test_network_online_status() {
    let (mut app, _tmp) = setup();
    call(&mut app, "network.online_status", json!({"online": false})).unwrap();
    let res = call(&mut app, "network.online_status", json!({"online": true})).unwrap();
    assert_eq!(res, json!({"reloaded": 1}));
}
