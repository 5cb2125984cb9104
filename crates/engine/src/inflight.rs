// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource in-flight admission
//!
//! Advisory lock set enforcing the one-operation-in-flight-per-resource
//! invariant. Acquisition is an atomic insert; the guard releases on drop
//! when the operation reaches a terminal state, so operations on different
//! resources run fully parallel while the same resource is serialized.

use canopy_core::ResourceId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct InflightSet {
    inner: Arc<Mutex<HashSet<ResourceId>>>,
}

impl InflightSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ResourceId>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically claim the resource. Returns `None` when an operation is
    /// already in flight for it.
    pub fn try_acquire(&self, id: &ResourceId) -> Option<InflightGuard> {
        let mut held = self.lock();
        if !held.insert(id.clone()) {
            return None;
        }
        Some(InflightGuard {
            set: Arc::clone(&self.inner),
            id: id.clone(),
        })
    }

    pub fn is_held(&self, id: &ResourceId) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Held for the lifetime of one operation; releases the resource on drop
pub struct InflightGuard {
    set: Arc<Mutex<HashSet<ResourceId>>>,
    id: ResourceId,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    const THING: &str = "/subscriptions/s1/providers/P.N/things/t1";

    #[test]
    fn second_acquire_is_denied_until_release() {
        let set = InflightSet::new();
        let a = id(THING);

        let guard = set.try_acquire(&a);
        assert!(guard.is_some());
        assert!(set.try_acquire(&a).is_none());
        assert!(set.is_held(&a));

        drop(guard);
        assert!(!set.is_held(&a));
        assert!(set.try_acquire(&a).is_some());
    }

    #[test]
    fn different_resources_are_independent() {
        let set = InflightSet::new();
        let _a = set.try_acquire(&id(THING));
        let b = set.try_acquire(&id("/subscriptions/s1/providers/P.N/things/t2"));
        assert!(b.is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn acquisition_is_case_insensitive() {
        let set = InflightSet::new();
        let _guard = set.try_acquire(&id(THING));
        assert!(set.try_acquire(&id(&THING.to_uppercase())).is_none());
    }

    #[test]
    fn concurrent_acquires_grant_exactly_one() {
        let set = InflightSet::new();
        let target = id(THING);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let set = set.clone();
                let target = target.clone();
                std::thread::spawn(move || set.try_acquire(&target).is_some())
            })
            .collect();

        let granted = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|&granted| granted)
            .count();
        assert_eq!(granted, 1);
    }
}
