//! Tokio facade over [`FpeRegistry`].
//!
//! Engine calls block on file and network I/O, so every operation runs on
//! the blocking pool. With `call_timeout_ms` set the caller stops waiting
//! after that long; the engine call itself still runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::ProfileConfig;
use crate::error::{FpeError, Result};
use crate::registry::FpeRegistry;
use fpe_engine::FpeEngine;

/// Async handle to a shared registry. Cheap to clone.
pub struct AsyncRegistry<E: FpeEngine> {
    inner: Arc<FpeRegistry<E>>,
    timeout: Option<Duration>,
}

impl<E: FpeEngine> Clone for AsyncRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<E: FpeEngine> AsyncRegistry<E> {
    /// Wrap a registry, taking the call timeout from its settings.
    pub fn new(registry: FpeRegistry<E>) -> Self {
        Self::from_arc(Arc::new(registry))
    }

    /// Wrap an already shared registry.
    pub fn from_arc(registry: Arc<FpeRegistry<E>>) -> Self {
        let timeout = registry
            .settings()
            .call_timeout_ms
            .map(Duration::from_millis);
        Self {
            inner: registry,
            timeout,
        }
    }

    /// The underlying registry, for synchronous callers.
    pub fn registry(&self) -> &Arc<FpeRegistry<E>> {
        &self.inner
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&FpeRegistry<E>) -> Result<T> + Send + 'static,
    {
        let registry = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || f(&registry));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    warn!(op, after_ms, "FPE call timed out");
                    return Err(FpeError::Timeout { after_ms });
                }
            },
            None => task.await,
        };

        joined.map_err(|e| FpeError::Internal(format!("{} task failed: {}", op, e)))?
    }

    /// See [`FpeRegistry::register`].
    pub async fn register(&self, id: impl Into<String>, profile: ProfileConfig) -> Result<()> {
        let id = id.into();
        self.run("register", move |registry| registry.register(id, profile))
            .await
    }

    /// See [`FpeRegistry::encrypt_by_id`].
    pub async fn encrypt_by_id(&self, id: &str, plaintext: &str) -> Result<String> {
        let id = id.to_string();
        let plaintext = plaintext.to_string();
        self.run("encrypt", move |registry| {
            registry.encrypt_by_id(&id, &plaintext)
        })
        .await
    }

    /// See [`FpeRegistry::decrypt_by_id`].
    pub async fn decrypt_by_id(&self, id: &str, ciphertext: &str) -> Result<String> {
        let id = id.to_string();
        let ciphertext = ciphertext.to_string();
        self.run("decrypt", move |registry| {
            registry.decrypt_by_id(&id, &ciphertext)
        })
        .await
    }

    /// See [`FpeRegistry::remove`].
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run("remove", move |registry| Ok(registry.remove(&id)))
            .await
    }

    /// See [`FpeRegistry::delete_all`].
    pub async fn delete_all(&self) -> Result<usize> {
        self.run("delete_all", |registry| Ok(registry.delete_all()))
            .await
    }
}
