//! Single-instance lifecycle for external connection handles.
//!
//! Each external resource (database pool, redis client, LLM client) lives
//! in a [`ResourceCell`]: absent until the first successful `get_or_init`,
//! then live until `take`. Initialization runs at most once even when
//! several tasks race on first access, because the losing tasks re-check
//! the slot under the write lock. A failed initialization leaves the cell
//! absent, so the next access attempts a fresh construction.

use std::future::Future;

use tokio::sync::RwLock;

use crate::error::Result;

/// Process-wide slot for one external resource handle.
#[derive(Debug)]
pub struct ResourceCell<T> {
    slot: RwLock<Option<T>>,
}

impl<T: Clone> ResourceCell<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Return the live handle, constructing it with `init` if absent.
    ///
    /// Handles are cheap clones of a shared connection object, so callers
    /// borrow the underlying resource rather than owning it.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(handle) = self.slot.read().await.as_ref() {
            return Ok(handle.clone());
        }

        let mut slot = self.slot.write().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        let handle = init().await?;
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Remove and return the live handle, leaving the cell absent.
    /// No-op when already absent.
    pub async fn take(&self) -> Option<T> {
        self.slot.write().await.take()
    }

    /// Whether a live handle currently exists.
    pub async fn is_live(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

impl<T: Clone> Default for ResourceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Handle(usize);

    async fn construct(built: Arc<AtomicUsize>) -> Result<Handle> {
        Ok(Handle(built.fetch_add(1, Ordering::SeqCst)))
    }

    #[tokio::test]
    async fn concurrent_first_access_constructs_once() {
        let cell = ResourceCell::new();
        let built = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cell.get_or_init(|| construct(built.clone())),
            cell.get_or_init(|| construct(built.clone())),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_access_returns_same_handle() {
        let cell = ResourceCell::new();
        let first = cell
            .get_or_init(|| async { Ok(Handle(7)) })
            .await
            .unwrap();
        let second = cell
            .get_or_init(|| async { Ok(Handle(8)) })
            .await
            .unwrap();
        // second init never ran
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn take_resets_to_absent_and_is_idempotent() {
        let cell = ResourceCell::new();
        cell.get_or_init(|| async { Ok(Handle(1)) }).await.unwrap();
        assert!(cell.is_live().await);

        assert_eq!(cell.take().await, Some(Handle(1)));
        assert!(!cell.is_live().await);
        assert_eq!(cell.take().await, None);
    }

    #[tokio::test]
    async fn reacquire_after_take_constructs_new_handle() {
        let cell = ResourceCell::new();
        let built = AtomicUsize::new(0);

        let first = cell
            .get_or_init(|| async { Ok(Handle(built.fetch_add(1, Ordering::SeqCst))) })
            .await
            .unwrap();
        cell.take().await;
        let second = cell
            .get_or_init(|| async { Ok(Handle(built.fetch_add(1, Ordering::SeqCst))) })
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_init_leaves_cell_absent_and_retries() {
        let cell = ResourceCell::new();

        let failed: Result<Handle> = cell
            .get_or_init(|| async {
                Err(ServerError::ResourceUnavailable("connect refused".into()))
            })
            .await;
        assert!(failed.is_err());
        assert!(!cell.is_live().await);

        // the failure is not cached; the next access constructs normally
        let handle = cell.get_or_init(|| async { Ok(Handle(3)) }).await.unwrap();
        assert_eq!(handle, Handle(3));
        assert!(cell.is_live().await);
    }
}
