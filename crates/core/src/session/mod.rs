//! Credential resolution and the per-session state that replaces ambient browser storage.

use crate::domain::schedule::ScheduleConfig;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SELECTION_UNSUPPORTED: &str = "이 환경에서는 보안 API Key 선택 도구를 지원하지 않습니다.";

/// An embedding environment able to pick a credential interactively.
#[async_trait::async_trait]
pub trait CredentialHost: Send + Sync {
    async fn has_credential(&self) -> bool;

    async fn request_credential_selection(&self) -> anyhow::Result<()>;

    /// Key currently selected through the host, if any.
    async fn selected_key(&self) -> Option<String>;
}

/// Where a client reads its API key from on every call.
#[derive(Clone)]
pub enum KeySource {
    Static(Option<String>),
    Host(Arc<dyn CredentialHost>),
}

impl KeySource {
    pub async fn resolve(&self) -> Option<String> {
        let key = match self {
            KeySource::Static(key) => key.clone(),
            KeySource::Host(host) => host.selected_key().await,
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Static(key) => f
                .debug_tuple("Static")
                .field(&key.as_ref().map(|_| "<redacted>"))
                .finish(),
            KeySource::Host(_) => f.write_str("Host"),
        }
    }
}

/// Session-scoped state, passed explicitly instead of read from global storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub credential_confirmed: bool,
    pub schedule: ScheduleConfig,
}

impl SessionContext {
    pub fn new(schedule: ScheduleConfig) -> Self {
        Self {
            credential_confirmed: false,
            schedule,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("이 환경에서는 보안 API Key 선택 도구를 지원하지 않습니다.")]
    SelectionUnsupported,

    #[error("credential selection failed: {0:#}")]
    SelectionFailed(anyhow::Error),
}

#[derive(Clone)]
pub struct CredentialGate {
    host: Option<Arc<dyn CredentialHost>>,
    env_key_present: bool,
}

impl CredentialGate {
    pub fn new(host: Option<Arc<dyn CredentialHost>>, env_key_present: bool) -> Self {
        Self {
            host,
            env_key_present,
        }
    }

    /// Key source matching this gate: the host when present, otherwise the static env key.
    pub fn key_source(&self, env_key: Option<String>) -> KeySource {
        match &self.host {
            Some(host) => KeySource::Host(host.clone()),
            None => KeySource::Static(env_key),
        }
    }

    /// Whether actions requiring a credential may proceed. A positive host answer is cached
    /// for the rest of the session.
    pub async fn check(&self, session: &mut SessionContext) -> bool {
        if session.credential_confirmed {
            return true;
        }

        match &self.host {
            Some(host) => {
                let has_key = host.has_credential().await;
                if has_key {
                    session.credential_confirmed = true;
                }
                has_key
            }
            None => self.env_key_present,
        }
    }

    pub async fn select(&self, session: &mut SessionContext) -> Result<(), CredentialError> {
        let Some(host) = &self.host else {
            return Err(CredentialError::SelectionUnsupported);
        };

        match host.request_credential_selection().await {
            Ok(()) => {
                session.credential_confirmed = true;
                tracing::info!("credential selected");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential selection failed");
                Err(CredentialError::SelectionFailed(err))
            }
        }
    }

    pub fn invalidate(&self, session: &mut SessionContext) {
        session.credential_confirmed = false;
    }
}

/// Host backed by a key handed in out of band (for example over the HTTP API). Selecting
/// promotes the staged key; selecting with nothing staged drops the current one.
#[derive(Debug, Default)]
pub struct StagedKeyHost {
    staged: RwLock<Option<String>>,
    selected: RwLock<Option<String>>,
}

impl StagedKeyHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stage(&self, key: String) {
        *self.staged.write().await = Some(key);
    }
}

#[async_trait::async_trait]
impl CredentialHost for StagedKeyHost {
    async fn has_credential(&self) -> bool {
        self.selected.read().await.is_some()
    }

    async fn request_credential_selection(&self) -> anyhow::Result<()> {
        let staged = self.staged.write().await.take();
        let mut selected = self.selected.write().await;
        match staged.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                *selected = Some(key);
                Ok(())
            }
            None => {
                *selected = None;
                anyhow::bail!("no API key has been provided")
            }
        }
    }

    async fn selected_key(&self) -> Option<String> {
        self.selected.read().await.clone()
    }
}
