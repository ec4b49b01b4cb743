/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! A process-wide, bounded, time-expiring mapping from type-label to type
//! concept, shared across transactions. Readers take an `Arc` clone of the
//! current snapshot under a read lock and never observe a half-built one;
//! writers swap in a freshly built snapshot wholesale at commit time.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use tracing::trace;

use crate::concept::TypeConcept;

#[derive(Default)]
struct Snapshot {
    entries: HashMap<String, (TypeConcept, Instant)>,
}

pub struct OntologyCache {
    capacity: usize,
    inner: RwLock<Arc<Snapshot>>,
}

impl OntologyCache {
    pub fn new(capacity: usize) -> Self {
        OntologyCache { capacity, inner: RwLock::new(Arc::new(Snapshot::default())) }
    }

    /// Cache-first lookup. Returns `None` on a miss or on an expired entry
    /// — expired entries are not evicted here, only at the next
    /// [`promote`](Self::promote), since reads take an immutable snapshot.
    pub fn get(&self, label: &str) -> Option<TypeConcept> {
        let snapshot = self.snapshot();
        let (concept, expires_at) = snapshot.entries.get(label)?;
        if Instant::now() < *expires_at {
            Some(concept.clone())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.read().expect("ontology cache lock poisoned").clone()
    }

    /// Builds a new snapshot from the current one plus `updates`, each
    /// stamped with a fresh expiry `ttl` from now, then atomically swaps it
    /// in. Evicts the soonest-to-expire entries first if over capacity.
    pub fn promote(&self, updates: impl IntoIterator<Item = (String, TypeConcept)>, ttl: Duration) {
        let current = self.snapshot();
        let mut entries = current.entries.clone();
        let expires_at = Instant::now() + ttl;
        let mut promoted = 0usize;
        for (label, concept) in updates {
            entries.insert(label, (concept, expires_at));
            promoted += 1;
        }

        while entries.len() > self.capacity {
            let Some(oldest) = entries.iter().min_by_key(|(_, (_, exp))| *exp).map(|(label, _)| label.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }

        trace!(promoted, total = entries.len(), "promoted ontology cache snapshot");
        let mut guard = self.inner.write().expect("ontology cache lock poisoned");
        *guard = Arc::new(Snapshot { entries });
    }
}

#[cfg(test)]
mod tests {
    use storage::VertexId;

    use super::*;
    use crate::{concept::TypeData, schema::BaseKind};

    fn entity_type(label: &str, type_id: u64) -> TypeConcept {
        TypeConcept::EntityType(TypeData {
            vertex: VertexId(type_id),
            type_id,
            label: label.to_string(),
            is_abstract: false,
            is_implicit: false,
            instance_count: 0,
            current_shard: None,
        })
    }

    #[test]
    fn promoted_entry_is_visible_to_readers() {
        let cache = OntologyCache::new(1000);
        cache.promote([("person".to_string(), entity_type("person", 1))], Duration::from_secs(5));
        assert_eq!(cache.get("person").unwrap().base_kind(), BaseKind::EntityType);
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = OntologyCache::new(1000);
        cache.promote([("person".to_string(), entity_type("person", 1))], Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("person").is_none());
    }

    #[test]
    fn capacity_evicts_soonest_expiring_entries() {
        let cache = OntologyCache::new(1);
        cache.promote([("a".to_string(), entity_type("a", 1))], Duration::from_secs(1));
        cache.promote([("b".to_string(), entity_type("b", 2))], Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }
}
