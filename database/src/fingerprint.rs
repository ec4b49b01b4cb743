/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Deterministic fingerprints used as uniqueness keys. `DefaultHasher::new()`
//! is seeded with fixed keys rather than `RandomState`'s per-process random
//! ones, so two calls in the same process (or across processes, since we
//! never rely on ASLR-derived seeding) produce the same fingerprint for the
//! same input.

use std::{
    collections::{BTreeMap, BTreeSet},
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use concept::TypeId;
use storage::VertexId;

pub fn casting_fingerprint(role_id: TypeId, player: VertexId) -> u64 {
    let mut hasher = DefaultHasher::new();
    role_id.hash(&mut hasher);
    player.0.hash(&mut hasher);
    hasher.finish()
}

/// `H(type-id, sorted[(role-id, sorted[player-id])])`. The
/// `BTreeMap`/`BTreeSet` keys already iterate in sorted order, so no
/// explicit sort step is needed.
pub fn relation_fingerprint(type_id: TypeId, role_map: &BTreeMap<TypeId, BTreeSet<VertexId>>) -> u64 {
    let mut hasher = DefaultHasher::new();
    type_id.hash(&mut hasher);
    for (role_id, players) in role_map {
        role_id.hash(&mut hasher);
        for player in players {
            player.0.hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Lets resources use the same INDEX-based reconciliation protocol as
/// castings and relations.
pub fn resource_fingerprint(type_id: TypeId, encoded_value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    type_id.hash(&mut hasher);
    encoded_value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_fingerprint_is_order_independent_in_input_construction() {
        let mut a: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        a.entry(2).or_default().insert(VertexId(20));
        a.entry(1).or_default().insert(VertexId(10));

        let mut b: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        b.entry(1).or_default().insert(VertexId(10));
        b.entry(2).or_default().insert(VertexId(20));

        assert_eq!(relation_fingerprint(7, &a), relation_fingerprint(7, &b));
    }

    #[test]
    fn different_role_maps_produce_different_fingerprints() {
        let mut a: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        a.entry(1).or_default().insert(VertexId(10));
        let mut b: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        b.entry(1).or_default().insert(VertexId(11));

        assert_ne!(relation_fingerprint(7, &a), relation_fingerprint(7, &b));
    }
}
