//! A value that is only available while a scope holding it is alive.
//!
//! Typical use is a client opened once per invocation and read from helpers
//! that have no other way to reach it:
//!
//! ```
//! use turbo_lambda::cached::CachedContextManager;
//!
//! static DB: CachedContextManager<String> = CachedContextManager::new();
//!
//! {
//!     let db = DB.enter("connection".to_string());
//!     assert_eq!(db.as_str(), "connection");
//!     assert_eq!(DB.get().as_deref().map(String::as_str), Some("connection"));
//! }
//! assert!(DB.get().is_none());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Every live guard owns one entry; the newest live entry is the current value.
pub struct CachedContextManager<T> {
    entries: RwLock<Vec<(u64, Arc<T>)>>,
    next_id: AtomicU64,
}

impl<T> CachedContextManager<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Stores `value` until the returned guard is dropped.
    ///
    /// Entering again while entered shadows the current value. Guards may be
    /// dropped in any order; dropping one only removes its own value.
    #[must_use = "the value is cleared as soon as the guard is dropped"]
    pub fn enter(&self, value: T) -> CachedGuard<'_, T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(value);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::clone(&value)));
        CachedGuard {
            owner: self,
            id,
            value,
        }
    }

    /// The value of the most recently entered live guard, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(_, value)| Arc::clone(value))
    }
}

impl<T> Default for CachedContextManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CachedContextManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedContextManager")
            .field("entered", &self.get().is_some())
            .finish()
    }
}

pub struct CachedGuard<'a, T> {
    owner: &'a CachedContextManager<T>,
    id: u64,
    value: Arc<T>,
}

impl<T> Deref for CachedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for CachedGuard<'_, T> {
    fn drop(&mut self) {
        self.owner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_restores_outer_value() {
        let cached = CachedContextManager::new();
        let outer = cached.enter(1);
        {
            let inner = cached.enter(2);
            assert_eq!(*inner, 2);
            assert_eq!(cached.get().as_deref(), Some(&2));
        }
        assert_eq!(cached.get().as_deref(), Some(&1));
        drop(outer);
        assert!(cached.get().is_none());
    }

    #[test]
    fn test_out_of_order_drop_keeps_live_value() {
        let cached = CachedContextManager::new();
        let first = cached.enter(1);
        let second = cached.enter(2);

        drop(first);
        assert_eq!(cached.get().as_deref(), Some(&2));

        drop(second);
        assert!(cached.get().is_none());
    }
}
