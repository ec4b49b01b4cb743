/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The per-transaction scratch state. Because `TypeConcept` is a flat
//! value type rather than an object graph, caching it needs nothing more
//! than a plain `HashMap` keyed by label: cloning a `TypeConcept` is
//! already cheap and carries no nested concept references to resolve.

use std::collections::{HashMap, HashSet};

use concept::{Concept, OntologyCache, TypeConcept};
use storage::VertexId;

#[derive(Default)]
pub struct TransactionLog {
    pub cached_types: HashMap<String, TypeConcept>,
    pub cached_concepts: HashMap<VertexId, Concept>,
    pub new_relations_by_fingerprint: HashMap<u64, VertexId>,
    pub modified_castings: HashSet<VertexId>,
    pub modified_resources: HashSet<VertexId>,
    pub modified_relations: HashSet<VertexId>,
    pub instance_counts_delta: HashMap<String, i64>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache-first type lookup: the first reference to a label within this
    /// transaction clones it out of the ontology cache; every later
    /// reference reuses that local clone, so within-transaction mutations
    /// (e.g. a shard rollover pending promotion) are visible to later
    /// reads in the same transaction.
    pub fn get_or_clone_type(&mut self, label: &str, cache: &OntologyCache) -> Option<TypeConcept> {
        if let Some(cached) = self.cached_types.get(label) {
            return Some(cached.clone());
        }
        let from_cache = cache.get(label)?;
        self.cached_types.insert(label.to_string(), from_cache.clone());
        Some(from_cache)
    }

    pub fn put_cached_type(&mut self, label: String, type_concept: TypeConcept) {
        self.cached_types.insert(label, type_concept);
    }

    pub fn record_instance_created(&mut self, type_label: &str) {
        *self.instance_counts_delta.entry(type_label.to_string()).or_insert(0) += 1;
    }
}
