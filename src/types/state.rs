use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::PersistenceError;
use super::snapshot::PersistedWindowSnapshot;

/// Cross-window settings and session data, persisted as one blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregateAppState {
    pub search_engine_provider: SearchEngineProvider,
    pub homepage: String,
    pub pdf_viewer: String,
    pub tab_config: TabConfig,
    pub auth: AuthCredentials,
    pub proxy_config: ProxyConfig,
    pub downloads: Vec<DownloadEntry>,
    pub history: Vec<HistoryEntry>,
    pub language: String,
    pub windows: Vec<PersistedWindowSnapshot>,
}

impl Default for AggregateAppState {
    fn default() -> Self {
        Self {
            search_engine_provider: SearchEngineProvider::default(),
            homepage: "https://github.com".to_string(),
            pdf_viewer: "pdf-viewer".to_string(),
            tab_config: TabConfig::default(),
            auth: AuthCredentials::default(),
            proxy_config: ProxyConfig::default(),
            downloads: Vec::new(),
            history: Vec::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            windows: Vec::new(),
        }
    }
}

pub const DEFAULT_LANGUAGE: &str = "en-US";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchEngineProvider {
    pub current: String,
    pub providers: Vec<SearchProviderEntry>,
}

impl Default for SearchEngineProvider {
    fn default() -> Self {
        let providers = vec![
            SearchProviderEntry::new("Google", "https://www.google.com/search?q="),
            SearchProviderEntry::new("DuckDuckGo", "https://duckduckgo.com/?q="),
            SearchProviderEntry::new("Bing", "https://www.bing.com/search?q="),
        ];
        Self {
            current: "Google".to_string(),
            providers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchProviderEntry {
    pub name: String,
    pub search: String,
}

impl SearchProviderEntry {
    fn new(name: &str, search: &str) -> Self {
        Self {
            name: name.to_string(),
            search: search.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TabConfig {
    pub default_url: String,
    pub default_favicon: Option<String>,
    pub open_in_background: bool,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self {
            default_url: "about:newtab".to_string(),
            default_favicon: None,
            open_in_background: false,
        }
    }
}

/// Credentials answered to servers that request HTTP authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuthCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthCredentials {
    pub fn is_complete(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProxyConfig {
    pub pac_script: Option<String>,
    pub proxy_rules: Option<String>,
    pub proxy_bypass_rules: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadEntry {
    pub name: String,
    pub url: String,
    pub save_path: String,
    pub total_bytes: u64,
    pub received_bytes: u64,
    pub state: String,
    #[serde(default)]
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub favicon: Option<String>,
    pub visited_at: i64,
}

/// Preferences settable through `prefs.set`. Language is excluded: it goes
/// through the settings mutation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKey {
    SearchEngineProvider,
    Homepage,
    PdfViewer,
    TabConfig,
    ProxyConfig,
    Auth,
    Downloads,
    History,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 8] = [
        PreferenceKey::SearchEngineProvider,
        PreferenceKey::Homepage,
        PreferenceKey::PdfViewer,
        PreferenceKey::TabConfig,
        PreferenceKey::ProxyConfig,
        PreferenceKey::Auth,
        PreferenceKey::Downloads,
        PreferenceKey::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::SearchEngineProvider => "search_engine_provider",
            PreferenceKey::Homepage => "homepage",
            PreferenceKey::PdfViewer => "pdf_viewer",
            PreferenceKey::TabConfig => "tab_config",
            PreferenceKey::ProxyConfig => "proxy_config",
            PreferenceKey::Auth => "auth",
            PreferenceKey::Downloads => "downloads",
            PreferenceKey::History => "history",
        }
    }

    pub fn parse(key: &str) -> Option<PreferenceKey> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

fn typed<T: serde::de::DeserializeOwned>(key: PreferenceKey, value: Value) -> Result<T, PersistenceError> {
    serde_json::from_value(value)
        .map_err(|e| PersistenceError::InvalidPreference(format!("{}: {}", key.as_str(), e)))
}

fn untyped<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl AggregateAppState {
    /// Returns the current value of a preference as JSON.
    pub fn preference(&self, key: PreferenceKey) -> Value {
        match key {
            PreferenceKey::SearchEngineProvider => untyped(&self.search_engine_provider),
            PreferenceKey::Homepage => untyped(&self.homepage),
            PreferenceKey::PdfViewer => untyped(&self.pdf_viewer),
            PreferenceKey::TabConfig => untyped(&self.tab_config),
            PreferenceKey::ProxyConfig => untyped(&self.proxy_config),
            PreferenceKey::Auth => untyped(&self.auth),
            PreferenceKey::Downloads => untyped(&self.downloads),
            PreferenceKey::History => untyped(&self.history),
        }
    }

    /// Replaces a preference. The value is validated against the field's
    /// type; on error the state is left untouched.
    pub fn set_preference(&mut self, key: PreferenceKey, value: Value) -> Result<(), PersistenceError> {
        match key {
            PreferenceKey::SearchEngineProvider => self.search_engine_provider = typed(key, value)?,
            PreferenceKey::Homepage => self.homepage = typed(key, value)?,
            PreferenceKey::PdfViewer => self.pdf_viewer = typed(key, value)?,
            PreferenceKey::TabConfig => self.tab_config = typed(key, value)?,
            PreferenceKey::ProxyConfig => self.proxy_config = typed(key, value)?,
            PreferenceKey::Auth => self.auth = typed(key, value)?,
            PreferenceKey::Downloads => self.downloads = typed(key, value)?,
            PreferenceKey::History => self.history = typed(key, value)?,
        }
        Ok(())
    }
}
