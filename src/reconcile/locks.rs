//! Per-interface exclusive sections

use crate::wireguard::InterfaceName;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of one async mutex per interface name.
///
/// Entries are created on first use and kept for the life of the process.
#[derive(Debug, Default)]
pub struct InterfaceLocks {
    locks: Mutex<HashMap<InterfaceName, Arc<AsyncMutex<()>>>>,
}

impl InterfaceLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`; released when the guard drops
    pub async fn acquire(&self, name: &InterfaceName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(name.clone()).or_default())
        };

        debug!("Waiting for lock on {}", name);
        lock.lock_owned().await
    }

    /// Number of interfaces that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no interface has been locked yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn name(s: &str) -> InterfaceName {
        InterfaceName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_lazy_creation_and_retention() {
        let locks = InterfaceLocks::new();
        assert!(locks.is_empty());

        drop(locks.acquire(&name("wg0")).await);
        drop(locks.acquire(&name("wg1")).await);
        drop(locks.acquire(&name("wg0")).await);

        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = Arc::new(InterfaceLocks::new());
        let guard = locks.acquire(&name("wg0")).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(&name("wg0")).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        let second = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = InterfaceLocks::new();
        let _wg0 = locks.acquire(&name("wg0")).await;

        let wg1 = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&name("wg1"))).await;
        assert!(wg1.is_ok());
    }
}
