//! Registry of named FPE contexts.
//!
//! Maps a profile id to its [`ContextHandle`]. Lookups share a read lock
//! and hold it for the whole transform, so a handle is never released
//! while a call on it is in flight. Register, remove and delete-all take
//! the write lock only for the map update itself; engine setup happens
//! before it and handle release after it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::config::{EngineSettings, ProfileConfig, RegistryConfig};
use crate::context::ContextHandle;
use crate::error::{FpeError, Result};
use fpe_engine::FpeEngine;

/// Concurrency-safe registry of FPE contexts.
pub struct FpeRegistry<E: FpeEngine> {
    engine: Arc<E>,
    settings: EngineSettings,
    contexts: RwLock<HashMap<String, ContextHandle<E>>>,
}

impl<E: FpeEngine> FpeRegistry<E> {
    /// Create an empty registry with default engine settings.
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            settings: EngineSettings::default(),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty registry with explicit engine settings.
    pub fn with_settings(engine: Arc<E>, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            engine,
            settings,
            contexts: RwLock::new(HashMap::new()),
        })
    }

    /// Build a registry and register every configured profile.
    ///
    /// Stops at the first failure; profiles registered before it are torn
    /// down before the error is returned.
    pub fn from_config(engine: Arc<E>, config: &RegistryConfig) -> Result<Self> {
        let registry = Self::with_settings(engine, config.engine.clone())?;

        for (id, profile) in config.resolve_profiles()? {
            if let Err(e) = registry.register(id.as_str(), profile) {
                warn!(id = %id, error = %e, "Profile setup failed, tearing down registry");
                registry.delete_all();
                return Err(e);
            }
        }

        info!(
            engine = registry.engine().name(),
            profiles = registry.len(),
            "FPE registry loaded from config"
        );
        Ok(registry)
    }

    // The map is only ever changed by a single insert, remove or swap, so a
    // poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ContextHandle<E>>> {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ContextHandle<E>>> {
        self.contexts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a context for `profile` and store it under `id`.
    ///
    /// Replaces any existing profile with the same id; the old context is
    /// released once it is no longer reachable. On error the registry is
    /// unchanged.
    pub fn register(&self, id: impl Into<String>, profile: ProfileConfig) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FpeError::invalid("profile id must not be empty"));
        }

        let fingerprint = profile.fingerprint();
        let handle = ContextHandle::create(Arc::clone(&self.engine), profile, &self.settings)?;

        let previous = self.write().insert(id.clone(), handle);

        match previous {
            Some(old) => {
                old.close();
                info!(id = %id, profile = %fingerprint, "FPE profile replaced");
            }
            None => info!(id = %id, profile = %fingerprint, "FPE profile registered"),
        }
        Ok(())
    }

    /// Encrypt `plaintext` with the profile registered under `id`.
    pub fn encrypt_by_id(&self, id: &str, plaintext: &str) -> Result<String> {
        let contexts = self.read();
        let handle = contexts
            .get(id)
            .ok_or_else(|| FpeError::NotFound(id.to_string()))?;
        handle.protect(plaintext)
    }

    /// Decrypt `ciphertext` with the profile registered under `id`.
    pub fn decrypt_by_id(&self, id: &str, ciphertext: &str) -> Result<String> {
        let contexts = self.read();
        let handle = contexts
            .get(id)
            .ok_or_else(|| FpeError::NotFound(id.to_string()))?;
        handle.access(ciphertext)
    }

    /// Tear down one profile. Returns whether it was registered.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.write().remove(id);
        match removed {
            Some(handle) => {
                handle.close();
                info!(id = %id, "FPE profile removed");
                true
            }
            None => false,
        }
    }

    /// Tear down every profile. Returns how many were released.
    pub fn delete_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.write());
        let count = drained.len();

        for (id, handle) in drained {
            debug!(id = %id, "Releasing FPE profile");
            handle.close();
        }

        if count > 0 {
            info!(count, "All FPE profiles deleted");
        }
        count
    }

    /// Whether a profile is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Settings every context is built with.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The engine behind every context.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}

impl<E: FpeEngine> Drop for FpeRegistry<E> {
    fn drop(&mut self) {
        let contexts = std::mem::take(
            self.contexts
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if contexts.is_empty() {
            return;
        }

        warn!(
            count = contexts.len(),
            "FPE registry dropped with live profiles, releasing them"
        );
        for (_, handle) in contexts {
            handle.close();
        }
    }
}
