use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Process-wide gate serializing the first attempt of outbound requests.
///
/// Cloning shares the same underlying mutex, so every client built from one
/// handle queues behind the others.
#[derive(Clone, Debug, Default)]
pub struct RequestLock {
    inner: Arc<Mutex<()>>,
}

impl RequestLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate. Released when the guard is dropped.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let lock = RequestLock::new();
        {
            let _guard = lock.acquire().await;
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_clones_share_the_gate() {
        let lock = RequestLock::new();
        let other = lock.clone();
        let _guard = lock.acquire().await;
        assert!(other.is_locked());
    }
}
