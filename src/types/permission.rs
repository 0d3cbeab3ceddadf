use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::view::ViewId;
use super::window::WindowId;

/// Who issued a request: the window's chrome, or a view inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    pub window_id: WindowId,
    #[serde(default)]
    pub view_id: Option<ViewId>,
}

impl Origin {
    pub fn window(window_id: WindowId) -> Self {
        Self {
            window_id,
            view_id: None,
        }
    }
}

/// Key correlating a permission request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub Uuid);

impl RequestToken {
    pub fn generate() -> Self {
        RequestToken(Uuid::new_v4())
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A setting change that only takes effect after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestartMutation {
    Language { lang: String, label: String },
}

impl RestartMutation {
    /// Permission name broadcast to the windows.
    pub fn permission(&self) -> &'static str {
        match self {
            RestartMutation::Language { .. } => "setLanguage",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RestartMutation::Language { label, .. } => label,
        }
    }
}

/// Where the settings mutation gate is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingPermission {
        token: RequestToken,
        origin: Origin,
        mutation: RestartMutation,
    },
    Persisting,
    /// Value persisted; waiting for windows to drain before exiting.
    Restarting,
}

/// How a permission round trip ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    TimedOut,
    /// No ledger entry matched: unknown token, or the requester is gone.
    Stale,
}
