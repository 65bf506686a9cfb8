//! Swappable shared configuration value.
//!
//! `ConfigStore<T>` wraps `Arc<RwLock<T>>`. Readers always see the latest
//! value written with [`ConfigStore::update`]; the Optimus client reads its
//! endpoint through one of these so an admin can switch environments while
//! requests are in flight.

use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

pub struct ConfigStore<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the stored value.
    pub async fn update(&self, value: T) {
        *self.inner.write().await = value;
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().await
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
