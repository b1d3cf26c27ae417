//! Per-file bookkeeping of the currently cancellable request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chunkup_transfer::{CancelHandle, UploadId};
use tracing::debug;

/// Maps each upload to the cancel handle of its in-flight request.
///
/// An entry exists only while a request for that upload is in flight.
/// [`CancelRegistry::set`] overwrites any previous handle and returns a
/// guard that deletes the entry when dropped, on every exit path.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_generation: u64,
    entries: HashMap<UploadId, Entry>,
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    handle: CancelHandle,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` as the in-flight request for `id`.
    #[must_use = "dropping the guard releases the entry immediately"]
    pub fn set(&self, id: UploadId, handle: CancelHandle) -> RegistryGuard {
        let mut inner = self.inner.lock().unwrap();
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.entries.insert(id, Entry { generation, handle });
        RegistryGuard {
            inner: Arc::clone(&self.inner),
            id,
            generation,
        }
    }

    /// Returns the handle of the in-flight request for `id`.
    pub fn get(&self, id: UploadId) -> Option<CancelHandle> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(&id).map(|e| e.handle.clone())
    }

    /// Removes the entry for `id`. Returns whether one existed.
    pub fn delete(&self, id: UploadId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(&id).is_some()
    }

    /// Aborts the in-flight request for `id`, if any.
    ///
    /// Unknown or already finished uploads are a quiet no-op. Returns
    /// whether a handle was invoked. The entry itself is released by the
    /// request's own guard once it settles.
    pub fn abort(&self, id: UploadId) -> bool {
        let Some(handle) = self.get(id) else {
            debug!(upload_id = %id, "abort ignored, nothing in flight");
            return false;
        };
        debug!(upload_id = %id, "aborting in-flight request");
        handle.abort();
        true
    }

    pub fn contains(&self, id: UploadId) -> bool {
        self.inner.lock().unwrap().entries.contains_key(&id)
    }

    /// Number of uploads with a request in flight.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases one registry entry when dropped.
///
/// Only the entry this guard created is removed; a newer handle
/// registered for the same upload stays in place.
#[derive(Debug)]
pub struct RegistryGuard {
    inner: Arc<Mutex<RegistryInner>>,
    id: UploadId,
    generation: u64,
}

impl RegistryGuard {
    pub fn id(&self) -> UploadId {
        self.id
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let owned = inner
            .entries
            .get(&self.id)
            .is_some_and(|e| e.generation == self.generation);
        if owned {
            inner.entries.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_entry_on_drop() {
        let registry = CancelRegistry::new();
        let id = UploadId::new();
        {
            let _guard = registry.set(id, CancelHandle::new());
            assert!(registry.contains(id));
            assert_eq!(registry.len(), 1);
        }
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn set_overwrites_previous_handle() {
        let registry = CancelRegistry::new();
        let id = UploadId::new();
        let first = CancelHandle::new();
        let second = CancelHandle::new();

        let old_guard = registry.set(id, first.clone());
        let _new_guard = registry.set(id, second.clone());
        assert_eq!(registry.len(), 1);

        // The stale guard must not remove the newer entry.
        drop(old_guard);
        assert!(registry.contains(id));

        registry.abort(id);
        assert!(second.is_aborted());
        assert!(!first.is_aborted());
    }

    #[test]
    fn abort_invokes_handle_and_reports_it() {
        let registry = CancelRegistry::new();
        let id = UploadId::new();
        let handle = CancelHandle::new();
        let _guard = registry.set(id, handle.clone());

        assert!(registry.abort(id));
        assert!(handle.is_aborted());
    }

    #[test]
    fn abort_unknown_is_noop() {
        let registry = CancelRegistry::new();
        assert!(!registry.abort(UploadId::new()));
        assert!(registry.is_empty());
    }

    #[test]
    fn entries_are_keyed_by_upload() {
        let registry = CancelRegistry::new();
        let a = UploadId::new();
        let b = UploadId::new();
        let ha = CancelHandle::new();
        let hb = CancelHandle::new();
        let _ga = registry.set(a, ha.clone());
        let _gb = registry.set(b, hb.clone());

        registry.abort(a);
        assert!(ha.is_aborted());
        assert!(!hb.is_aborted());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn explicit_delete_then_guard_drop() {
        let registry = CancelRegistry::new();
        let id = UploadId::new();
        let guard = registry.set(id, CancelHandle::new());
        assert!(registry.delete(id));
        assert!(!registry.delete(id));
        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn get_returns_shared_handle() {
        let registry = CancelRegistry::new();
        let id = UploadId::new();
        let handle = CancelHandle::new();
        let guard = registry.set(id, handle.clone());

        registry.get(id).unwrap().abort();
        assert!(handle.is_aborted());
        assert_eq!(guard.id(), id);
    }
}
