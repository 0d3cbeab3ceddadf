//! Unit tests for the SettingsGate permission round trip.

use std::time::Duration;

use tempfile::TempDir;

use tabhost::host::TimerId;
use tabhost::managers::persistence_manager::PersistenceManager;
use tabhost::managers::settings_gate::SettingsGate;
use tabhost::managers::window_registry::WindowRegistry;
use tabhost::services::state_codec::StateCodec;
use tabhost::services::state_store::StateStore;
use tabhost::testing::{HostCall, RecordingHost};
use tabhost::types::errors::GateError;
use tabhost::types::notification::Notification;
use tabhost::types::permission::{GateState, Origin, PermissionOutcome, RequestToken, RestartMutation};
use tabhost::types::view::ViewId;
use tabhost::types::window::{FirstContent, WindowId, WindowOptions};

struct Fixture {
    _dir: TempDir,
    store: StateStore,
    host: RecordingHost,
    registry: WindowRegistry,
    persistence: PersistenceManager,
    gate: SettingsGate,
    windows: Vec<WindowId>,
}

fn setup(timeout: Option<Duration>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("profile"), dir.path().join("relocated"));
    let mut host = RecordingHost::new();
    let mut registry = WindowRegistry::new();
    let windows = (0..2)
        .map(|_| {
            registry
                .open(&mut host, &WindowOptions::default(), FirstContent::NewTab, &[])
                .unwrap()
        })
        .collect();
    Fixture {
        persistence: PersistenceManager::new(store.clone()),
        store,
        _dir: dir,
        host,
        registry,
        gate: SettingsGate::new(timeout),
        windows,
    }
}

fn language(lang: &str) -> RestartMutation {
    RestartMutation::Language {
        lang: lang.to_string(),
        label: format!("Switch to {}", lang),
    }
}

impl Fixture {
    fn request(&mut self, origin: Origin) -> Result<RequestToken, GateError> {
        self.gate
            .request(&mut self.host, &self.registry, origin, language("ja"))
    }

    fn respond(&mut self, token: RequestToken, accept: bool) -> Result<PermissionOutcome, GateError> {
        self.gate
            .respond(&mut self.host, &mut self.persistence, token, accept)
    }

    fn state_bytes(&self) -> Vec<u8> {
        StateCodec.encode_state(self.persistence.state()).unwrap()
    }
}

#[test]
fn test_request_broadcasts_to_every_window() {
    let mut f = setup(None);
    let origin = Origin::window(f.windows[0]);
    let token = f.request(origin).unwrap();

    let expected = Notification::PermissionRequest {
        token,
        requester: origin,
        permission: "setLanguage".to_string(),
        label: "Switch to ja".to_string(),
    };
    for window in f.windows.clone() {
        assert_eq!(f.host.sent_to(window), vec![&expected]);
    }
    assert!(matches!(f.gate.state(), GateState::AwaitingPermission { .. }));
}

#[test]
fn test_grant_persists_language_and_marks_restart() {
    let mut f = setup(None);
    let token = f.request(Origin::window(f.windows[0])).unwrap();

    assert_eq!(f.respond(token, true).unwrap(), PermissionOutcome::Granted);
    assert!(f.gate.is_restarting());
    assert!(f.persistence.is_restart_pending());
    assert_eq!(f.persistence.read_language(), "ja");
    // The aggregate file is not the language's home
    assert!(!f.store.state_path().exists());
}

#[test]
fn test_denial_leaves_state_identical() {
    let mut f = setup(None);
    let before = f.state_bytes();
    let token = f.request(Origin::window(f.windows[1])).unwrap();

    assert_eq!(f.respond(token, false).unwrap(), PermissionOutcome::Denied);
    assert_eq!(f.state_bytes(), before);
    assert!(f.gate.is_idle());
    assert!(!f.persistence.is_restart_pending());
    assert!(!f.store.language_path().exists());
}

#[test]
fn test_timeout_resolves_as_denial() {
    let mut f = setup(Some(Duration::from_secs(120)));
    let before = f.state_bytes();
    f.request(Origin::window(f.windows[0])).unwrap();

    let timer = f
        .host
        .calls
        .iter()
        .find_map(|c| match c {
            HostCall::StartTimer { timer_id, repeat: false, .. } => Some(*timer_id),
            _ => None,
        })
        .unwrap();

    assert_eq!(f.gate.on_timer(TimerId(timer.0 + 100)), None);
    assert_eq!(f.gate.on_timer(timer), Some(PermissionOutcome::TimedOut));
    assert!(f.gate.is_idle());
    assert_eq!(f.state_bytes(), before);
}

#[test]
fn test_no_timer_without_timeout() {
    let mut f = setup(None);
    f.request(Origin::window(f.windows[0])).unwrap();
    assert!(f.host.active_timers().is_empty());
}

#[test]
fn test_answer_cancels_timeout() {
    let mut f = setup(Some(Duration::from_secs(120)));
    let token = f.request(Origin::window(f.windows[0])).unwrap();
    f.respond(token, false).unwrap();
    assert!(f.host.active_timers().is_empty());
}

#[test]
fn test_second_request_rejected_while_pending() {
    let mut f = setup(None);
    let origin = Origin::window(f.windows[0]);
    f.request(origin).unwrap();
    assert!(matches!(f.request(origin), Err(GateError::Busy)));
    assert!(matches!(
        f.request(Origin::window(f.windows[1])),
        Err(GateError::Busy)
    ));
}

#[test]
fn test_stale_token_ignored() {
    let mut f = setup(None);
    let token = f.request(Origin::window(f.windows[0])).unwrap();

    let outcome = f.respond(RequestToken::generate(), true).unwrap();
    assert_eq!(outcome, PermissionOutcome::Stale);
    assert_eq!(f.gate.pending_token(), Some(token));
    assert!(!f.persistence.is_restart_pending());
}

#[test]
fn test_requester_departure_discards_entry() {
    let mut f = setup(None);
    let token = f.request(Origin::window(f.windows[0])).unwrap();

    assert!(!f.gate.discard_for_window(&mut f.host, f.windows[1]));
    assert!(f.gate.discard_for_window(&mut f.host, f.windows[0]));
    assert!(f.gate.is_idle());
    assert_eq!(f.respond(token, true).unwrap(), PermissionOutcome::Stale);
    assert!(!f.store.language_path().exists());
}

#[test]
fn test_view_departure_discards_entry() {
    let mut f = setup(None);
    let origin = Origin {
        window_id: f.windows[0],
        view_id: Some(ViewId(42)),
    };
    f.request(origin).unwrap();
    assert!(f.gate.discard_for_view(&mut f.host, ViewId(42)));
    assert!(f.gate.is_idle());
}

#[test]
fn test_empty_language_rejected() {
    let mut f = setup(None);
    let result = f.gate.request(
        &mut f.host,
        &f.registry,
        Origin::window(f.windows[0]),
        language("  "),
    );
    assert!(matches!(result, Err(GateError::InvalidValue(_))));
    assert!(f.gate.is_idle());
}
