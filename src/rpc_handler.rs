//! RPC method handler for the TabHost JSON-lines protocol.
//!
//! Kept apart from the stdio loop in `main.rs` so it can be unit-tested
//! against a `RecordingHost`. `handle_method` dispatches a request to the
//! `App` and returns its JSON result.

use std::path::PathBuf;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::App;
use crate::host::WindowHost;
use crate::managers::persistence_manager::SaveOutcome;
use crate::managers::view_manager::AttachOutcome;
use crate::types::permission::{Origin, PermissionOutcome, RequestToken};
use crate::types::snapshot::PersistedWindowSnapshot;
use crate::types::state::PreferenceKey;
use crate::types::view::{Rect, ViewId};
use crate::types::window::{Window, WindowId, WindowOptions};

fn window_id(params: &Value) -> Result<WindowId, String> {
    params
        .get("window_id")
        .and_then(|v| v.as_u64())
        .map(WindowId)
        .ok_or_else(|| "missing window_id".to_string())
}

/// Reads `view_id`; -1 (the "no view" sentinel) becomes `None`.
fn view_id(params: &Value) -> Result<Option<ViewId>, String> {
    params
        .get("view_id")
        .and_then(|v| v.as_i64())
        .map(ViewId::from_raw)
        .ok_or_else(|| "missing view_id".to_string())
}

fn int(params: &Value, key: &str) -> Result<i32, String> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| format!("missing {}", key))
}

fn opt_int(params: &Value, key: &str) -> Option<i32> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .and_then(|v| i32::try_from(v).ok())
}

fn window_json(w: &Window) -> Value {
    json!({
        "id": w.id,
        "geometry": w.geometry,
        "display_state": w.display_state,
        "focused": w.focused,
        "tabs": w.tabs,
        "current_tab_index": w.current_tab_index,
        "title": w.title,
        "closing": w.is_closing(),
    })
}

fn snapshot_json(s: &PersistedWindowSnapshot) -> Value {
    let mut value = serde_json::to_value(s).unwrap_or(Value::Null);
    if let (Some(obj), Some(path)) = (value.as_object_mut(), &s.path) {
        obj.insert("path".to_string(), json!(path.display().to_string()));
    }
    value
}

fn outcome_str(outcome: PermissionOutcome) -> &'static str {
    match outcome {
        PermissionOutcome::Granted => "granted",
        PermissionOutcome::Denied => "denied",
        PermissionOutcome::TimedOut => "timed_out",
        PermissionOutcome::Stale => "stale",
    }
}

fn save_json(outcome: &SaveOutcome) -> Value {
    match outcome {
        SaveOutcome::Written => json!({"status": "written"}),
        SaveOutcome::Skipped => json!({"status": "skipped"}),
        SaveOutcome::Draining { remaining } => json!({"status": "draining", "remaining": remaining}),
        SaveOutcome::Completed { exit } => json!({"status": "completed", "exit": exit}),
        SaveOutcome::RestartReady => json!({"status": "restarting"}),
        SaveOutcome::WriteFailed => json!({"status": "write_failed"}),
    }
}

/// Dispatch a request to the appropriate handler.
///
/// `origin` identifies the calling window or view, when the shell supplied
/// one. Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method<H: WindowHost>(
    app: &mut App<H>,
    origin: Option<Origin>,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    match method {
        // ─── Windows ───
        "window.open" => {
            let options = WindowOptions {
                x: opt_int(params, "x"),
                y: opt_int(params, "y"),
                width: opt_int(params, "width"),
                height: opt_int(params, "height"),
            };
            let id = app.open_window(options).map_err(|e| e.to_string())?;
            Ok(json!({"window_id": id}))
        }
        "window.open_url" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let follow = params.get("follow").and_then(|v| v.as_bool()).unwrap_or(true);
            let id = app.open_window_with_url(url, follow).map_err(|e| e.to_string())?;
            Ok(json!({"window_id": id}))
        }
        "window.close" => {
            let id = window_id(params)?;
            app.close_window(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "window.get" => {
            let id = window_id(params)?;
            match app.registry.get(id) {
                Some(w) => Ok(window_json(w)),
                None => Ok(Value::Null),
            }
        }
        "window.list" => {
            let arr: Vec<Value> = app.registry.all().map(window_json).collect();
            Ok(json!(arr))
        }
        "window.count" => Ok(json!(app.registry.count())),
        "window.set_title" => {
            let id = window_id(params)?;
            let title = params.get("title").and_then(|v| v.as_str()).ok_or("missing title")?;
            app.set_window_title(id, title).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Views ───
        "view.create" => {
            let id = window_id(params)?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let view = app.create_view(id, url).map_err(|e| e.to_string())?;
            Ok(json!({"view_id": view}))
        }
        "view.destroy" => {
            let view = view_id(params)?;
            app.destroy_view(view).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "view.attach" => {
            let id = window_id(params)?;
            let view = view_id(params)?;
            let outcome = app.attach_view(id, view).map_err(|e| e.to_string())?;
            let result = match outcome {
                AttachOutcome::NoView => json!({"attached": false}),
                AttachOutcome::AlreadyAttached => json!({"attached": true, "changed": false}),
                AttachOutcome::Attached { replaced } => {
                    let detached: Vec<ViewId> = replaced.into_iter().collect();
                    json!({"attached": true, "changed": true, "detached": detached})
                }
                AttachOutcome::Recovered { detached } => {
                    json!({"attached": true, "changed": true, "detached": detached, "recovered": true})
                }
            };
            Ok(result)
        }
        "view.set_bounds" => {
            let id = window_id(params)?;
            let rect = Rect {
                x: int(params, "x")?,
                y: int(params, "y")?,
                width: int(params, "width")?,
                height: int(params, "height")?,
            };
            match app.set_view_bounds(id, rect).map_err(|e| e.to_string())? {
                Some((view, bounds)) => Ok(json!({"view_id": view, "bounds": bounds})),
                None => Ok(Value::Null),
            }
        }
        "view.navigate" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            if let Some(view) = view_id(params)? {
                app.navigate_view(view, url).map_err(|e| e.to_string())?;
            }
            Ok(json!({"ok": true}))
        }

        // ─── Preferences ───
        "prefs.get" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let key = PreferenceKey::parse(key).ok_or_else(|| format!("unknown preference: {}", key))?;
            Ok(app.preference(key))
        }
        "prefs.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let key = PreferenceKey::parse(key).ok_or_else(|| format!("unknown preference: {}", key))?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let notified = app.set_preference(key, value, origin).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "notified": notified}))
        }

        // ─── Language ───
        "lang.get" => Ok(json!(app.language())),
        "lang.set" => {
            let lang = params.get("lang").and_then(|v| v.as_str()).ok_or("missing lang")?;
            let label = params.get("label").and_then(|v| v.as_str()).unwrap_or(lang);
            let origin = origin.ok_or("missing origin")?;
            let token = app
                .request_language_change(origin, lang, label)
                .map_err(|e| e.to_string())?;
            Ok(json!({"token": token}))
        }
        "permission.respond" => {
            let token = params.get("token").and_then(|v| v.as_str()).ok_or("missing token")?;
            let token = Uuid::parse_str(token).map_err(|e| format!("invalid token: {}", e))?;
            let accept = params.get("accept").and_then(|v| v.as_bool()).ok_or("missing accept")?;
            let outcome = app
                .respond_permission(RequestToken(token), accept)
                .map_err(|e| e.to_string())?;
            Ok(json!({"outcome": outcome_str(outcome)}))
        }

        // ─── Snapshots ───
        "snapshots.list" => {
            let snapshots = app.list_snapshots().map_err(|e| e.to_string())?;
            let arr: Vec<Value> = snapshots.iter().map(snapshot_json).collect();
            Ok(json!(arr))
        }
        "snapshots.restore" => {
            let path = params.get("path").and_then(|v| v.as_str()).ok_or("missing path")?;
            let id = app
                .restore_snapshot(&PathBuf::from(path))
                .map_err(|e| e.to_string())?;
            Ok(json!({"window_id": id}))
        }
        "snapshots.restore_all" => {
            let ids = app.restore_all().map_err(|e| e.to_string())?;
            Ok(json!({"window_ids": ids}))
        }

        // ─── App ───
        "app.quit" => {
            let outcome = app.request_quit().map_err(|e| e.to_string())?;
            Ok(save_json(&outcome))
        }
        "app.activate" => {
            let id = app.activate().map_err(|e| e.to_string())?;
            Ok(json!({"window_id": id}))
        }
        "app.second_instance" => Ok(json!({"window_id": app.second_instance()})),
        "network.online_status" => {
            let online = params.get("online").and_then(|v| v.as_bool()).ok_or("missing online")?;
            let reloaded = app.set_online(online);
            Ok(json!({"reloaded": reloaded}))
        }

        "ping" => Ok(json!({"pong": true})),

        _ => Err(format!("unknown method: {}", method)),
    }
}
