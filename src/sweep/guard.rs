use crate::core::ResourceId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of resources that currently have a sweep in flight
///
/// An id is present exactly while one sweep for it runs. Membership is only
/// changed through `try_acquire`/`release` (or a [`ResourceClaim`]), each a
/// single critical section.
#[derive(Debug, Default)]
pub struct ActiveResourceGuard {
    active: Mutex<HashSet<ResourceId>>,
}

impl ActiveResourceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `resource` unless it is already present.
    ///
    /// Returns `false` without touching the set when another sweep holds it.
    pub fn try_acquire(&self, resource: &ResourceId) -> bool {
        self.lock().insert(resource.clone())
    }

    /// Remove `resource`. No-op if it is not held.
    pub fn release(&self, resource: &ResourceId) {
        self.lock().remove(resource);
    }

    /// Acquire `resource` and get a handle that releases it when dropped
    pub fn claim(self: &Arc<Self>, resource: &ResourceId) -> Option<ResourceClaim> {
        if self.try_acquire(resource) {
            Some(ResourceClaim {
                guard: Arc::clone(self),
                resource: resource.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, resource: &ResourceId) -> bool {
        self.lock().contains(resource)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    // Insert/remove cannot leave the set half-updated, so a poisoned lock
    // is still safe to use and release must keep working after a panic.
    fn lock(&self) -> MutexGuard<'_, HashSet<ResourceId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII claim on one resource
///
/// Releases the resource when dropped, whether the sweep returned normally,
/// bailed out with `?`, or is unwinding.
#[derive(Debug)]
pub struct ResourceClaim {
    guard: Arc<ActiveResourceGuard>,
    resource: ResourceId,
}

impl ResourceClaim {
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }
}

impl Drop for ResourceClaim {
    fn drop(&mut self) {
        self.guard.release(&self.resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_acquire_is_exclusive() {
        let guard = ActiveResourceGuard::new();
        let ds = ResourceId::from("ds-1");

        assert!(guard.try_acquire(&ds));
        assert!(!guard.try_acquire(&ds));
        assert!(guard.try_acquire(&ResourceId::from("ds-2")));
        assert_eq!(guard.active_count(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let guard = ActiveResourceGuard::new();
        let ds = ResourceId::from("ds-1");

        guard.release(&ds);
        assert!(guard.try_acquire(&ds));
        guard.release(&ds);
        guard.release(&ds);
        assert!(!guard.is_active(&ds));
        assert!(guard.try_acquire(&ds));
    }

    #[test]
    fn test_claim_releases_on_drop() {
        let guard = Arc::new(ActiveResourceGuard::new());
        let ds = ResourceId::from("ds-1");

        let claim = guard.claim(&ds).unwrap();
        assert_eq!(claim.resource(), &ds);
        assert!(guard.claim(&ds).is_none());

        drop(claim);
        assert!(!guard.is_active(&ds));
        assert!(guard.claim(&ds).is_some());
    }

    #[test]
    fn test_claim_released_by_panicking_thread() {
        let guard = Arc::new(ActiveResourceGuard::new());
        let ds = ResourceId::from("ds-1");

        let guard_for_thread = Arc::clone(&guard);
        let ds_for_thread = ds.clone();
        let result = std::thread::spawn(move || {
            let _claim = guard_for_thread.claim(&ds_for_thread).unwrap();
            panic!("sweep blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!guard.is_active(&ds));
    }

    #[test]
    fn test_concurrent_try_acquire_admits_one() {
        let guard = Arc::new(ActiveResourceGuard::new());
        let ds = ResourceId::from("ds-1");
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let ds = ds.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    guard.try_acquire(&ds)
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|acquired| *acquired)
            .count();
        assert_eq!(admitted, 1);
    }
}
