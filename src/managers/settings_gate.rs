//! Settings Mutation Gate for TabHost.
//!
//! Guards settings that only apply after a restart. A request is broadcast
//! to every window as a permission prompt and parked in a one-entry ledger
//! keyed by a fresh token. The answer either persists the value and marks a
//! restart pending, or drops the request with no effect.
//!
//! ```text
//! Idle -> AwaitingPermission -> (granted) Persisting -> Restarting
//!                            -> (denied | timed out | requester gone) Idle
//! ```

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::host::{TimerId, WindowHost};
use crate::managers::persistence_manager::PersistenceManager;
use crate::managers::window_registry::WindowRegistry;
use crate::types::errors::GateError;
use crate::types::notification::Notification;
use crate::types::permission::{
    GateState, Origin, PermissionOutcome, RequestToken, RestartMutation,
};
use crate::types::view::ViewId;
use crate::types::window::WindowId;

pub struct SettingsGate {
    state: GateState,
    timeout: Option<Duration>,
    timer: Option<TimerId>,
}

impl SettingsGate {
    /// `timeout` of `None` waits for an answer indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            state: GateState::Idle,
            timeout,
            timer: None,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GateState::Idle
    }

    pub fn is_restarting(&self) -> bool {
        self.state == GateState::Restarting
    }

    pub fn pending_token(&self) -> Option<RequestToken> {
        match &self.state {
            GateState::AwaitingPermission { token, .. } => Some(*token),
            _ => None,
        }
    }

    /// Broadcasts a permission prompt for `mutation` and waits for the answer.
    /// Only one request may be pending; a second one is rejected.
    pub fn request(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &WindowRegistry,
        origin: Origin,
        mutation: RestartMutation,
    ) -> Result<RequestToken, GateError> {
        if !self.is_idle() {
            return Err(GateError::Busy);
        }
        match &mutation {
            RestartMutation::Language { lang, .. } if lang.trim().is_empty() => {
                return Err(GateError::InvalidValue("language tag cannot be empty".to_string()));
            }
            _ => {}
        }

        let token = RequestToken::generate();
        let prompt = Notification::PermissionRequest {
            token,
            requester: origin,
            permission: mutation.permission().to_string(),
            label: mutation.label().to_string(),
        };
        let delivered = registry.broadcast(host, &prompt);
        debug!(token = %token, delivered, "permission requested");

        self.timer = self.timeout.map(|d| host.start_timer(d, false));
        self.state = GateState::AwaitingPermission {
            token,
            origin,
            mutation,
        };
        Ok(token)
    }

    /// Resolves the pending request. Answers that match no ledger entry are
    /// ignored and reported as [`PermissionOutcome::Stale`].
    ///
    /// On a grant the value is written to its own file and a restart is
    /// marked pending; the caller then drives the shutdown. If the write
    /// fails the gate returns to idle and nothing else changes.
    pub fn respond(
        &mut self,
        host: &mut dyn WindowHost,
        persistence: &mut PersistenceManager,
        token: RequestToken,
        accept: bool,
    ) -> Result<PermissionOutcome, GateError> {
        let matches = self.pending_token() == Some(token);
        if !matches {
            warn!(token = %token, "ignoring stale permission response");
            return Ok(PermissionOutcome::Stale);
        }
        self.cancel_timer(host);

        let GateState::AwaitingPermission { mutation, .. } =
            std::mem::replace(&mut self.state, GateState::Idle)
        else {
            return Ok(PermissionOutcome::Stale);
        };
        if !accept {
            info!(permission = mutation.permission(), "permission denied");
            return Ok(PermissionOutcome::Denied);
        }

        self.state = GateState::Persisting;
        let persisted = match &mutation {
            RestartMutation::Language { lang, .. } => persistence.write_language(lang),
        };
        if let Err(e) = persisted {
            error!("Granted setting could not be persisted: {}", e);
            self.state = GateState::Idle;
            return Err(GateError::Persist(e));
        }

        persistence.set_restart_pending();
        self.state = GateState::Restarting;
        info!(permission = mutation.permission(), "permission granted, restarting");
        Ok(PermissionOutcome::Granted)
    }

    /// Handles a fired timer. Returns `TimedOut` if it was this gate's
    /// timeout, treated as a denial.
    pub fn on_timer(&mut self, timer: TimerId) -> Option<PermissionOutcome> {
        if self.timer != Some(timer) {
            return None;
        }
        self.timer = None;
        if matches!(self.state, GateState::AwaitingPermission { .. }) {
            warn!("permission request timed out");
            self.state = GateState::Idle;
            return Some(PermissionOutcome::TimedOut);
        }
        None
    }

    /// Drops the pending request if it came from `window`.
    pub fn discard_for_window(&mut self, host: &mut dyn WindowHost, window: WindowId) -> bool {
        self.discard_if(host, |origin| origin.window_id == window)
    }

    /// Drops the pending request if it came from `view`.
    pub fn discard_for_view(&mut self, host: &mut dyn WindowHost, view: ViewId) -> bool {
        self.discard_if(host, |origin| origin.view_id == Some(view))
    }

    fn discard_if(&mut self, host: &mut dyn WindowHost, gone: impl Fn(&Origin) -> bool) -> bool {
        let departed = matches!(&self.state, GateState::AwaitingPermission { origin, .. } if gone(origin));
        if departed {
            debug!("requester departed, permission request discarded");
            self.cancel_timer(host);
            self.state = GateState::Idle;
        }
        departed
    }

    fn cancel_timer(&mut self, host: &mut dyn WindowHost) {
        if let Some(timer) = self.timer.take() {
            host.cancel_timer(timer);
        }
    }
}
