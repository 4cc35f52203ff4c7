use std::sync::{Arc, RwLock};

/// Short-lived access token for the remote API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Source of the active access token.
///
/// Implementations may return a different value on every call; the job client
/// asks again before each network call and never holds on to a token.
pub trait CredentialProvider: Send + Sync {
    fn current(&self) -> Result<Credential, CredentialError>;
}

/// Reads an environment variable on every lookup.
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new("API_KEY")
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn current(&self) -> Result<Credential, CredentialError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Ok(Credential::new(value.trim())),
            _ => Err(CredentialError::Missing),
        }
    }
}

/// Fixed token.
pub struct StaticCredentialProvider(Credential);

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Credential::new(token))
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn current(&self) -> Result<Credential, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Token cell the host can rotate while jobs are in flight.
#[derive(Clone, Default)]
pub struct SharedCredential {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedCredential {
    pub fn new(initial: Option<String>) -> Self {
        let initial = initial.filter(|t| !t.trim().is_empty());
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn rotate(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
        tracing::info!("API key rotated");
    }

    pub fn is_present(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl CredentialProvider for SharedCredential {
    fn current(&self) -> Result<Credential, CredentialError> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
            .map(Credential::new)
            .ok_or(CredentialError::Missing)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No API key is configured")]
    Missing,
}
