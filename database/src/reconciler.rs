/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The post-processing reconciler. Two transactions racing to create the
//! same casting, resource, or relation each succeed locally and commit
//! their own vertex; both carry the same INDEX. The reconciler consumes
//! the commit log's `castings`/`resources`/`relations` groups, picks one
//! surviving vertex per group, and merges the rest into it.
//!
//! Runs independently of any transaction — it owns a plain write session
//! against the live backing rather than going through `Database::open_transaction`,
//! since this is asynchronous post-processing, not a user-visible
//! transaction subject to the one-per-thread rule.

use std::collections::{BTreeMap, BTreeSet};

use concept::{schema::EdgeLabel, BaseKind, TypeId};
use resource::constants::{edge_property, property};
use storage::{ElementStore, InMemoryBacking, VertexId};
use tracing::trace;

use crate::{commit_log::{CommitLogPayload, IndexGroup}, error::TransactionError, fingerprint, transaction::wrap_store};

pub struct Reconciler;

impl Reconciler {
    pub fn reconcile(backing: &InMemoryBacking, payload: &CommitLogPayload) -> Result<(), TransactionError> {
        let mut store = ElementStore::new(Box::new(backing.open()), false);
        let mut merged = 0usize;

        for group in &payload.castings {
            merged += Self::reconcile_group(&mut store, group, Self::merge_casting)?;
        }
        for group in &payload.resources {
            merged += Self::reconcile_group(&mut store, group, Self::merge_resource)?;
        }
        for group in &payload.relations {
            merged += Self::reconcile_group(&mut store, group, Self::merge_relation)?;
        }

        store.commit().map_err(|source| TransactionError::SubstrateFailure { source })?;
        if merged > 0 {
            trace!(merged, "reconciler merged duplicate vertices");
        }
        Ok(())
    }

    /// Picks the lowest surviving vertex id in `group` as "main", merges
    /// every other candidate into it via `merge`, then re-asserts `main`'s
    /// INDEX (a prior merge into `main` may have already set it, but an
    /// empty-duplicates group never reaches this line). Returns the number
    /// of duplicates merged away.
    fn reconcile_group(
        store: &mut ElementStore,
        group: &IndexGroup,
        merge: impl Fn(&mut ElementStore, VertexId, VertexId) -> Result<(), TransactionError>,
    ) -> Result<usize, TransactionError> {
        let mut candidates: Vec<VertexId> =
            group.concept_ids.iter().map(|&id| VertexId(id)).filter(|&v| store.vertex_by_raw_id(v).is_some()).collect();
        candidates.sort();

        let Some((&main, duplicates)) = candidates.split_first() else { return Ok(0) };
        if duplicates.is_empty() {
            return Ok(0);
        }

        for &duplicate in duplicates {
            merge(store, main, duplicate)?;
        }
        store.set_property(main, property::INDEX, &group.index.to_string()).map_err(wrap_store)?;
        Ok(duplicates.len())
    }

    /// Repoints `duplicate`'s CASTING and ROLE_PLAYER edges onto `main`,
    /// skipping any edge an equivalent of which already exists on `main`
    /// (two relations independently casting the same role-player pair
    /// would otherwise end up with parallel edges to the same casting).
    fn merge_casting(store: &mut ElementStore, main: VertexId, duplicate: VertexId) -> Result<(), TransactionError> {
        for (_, player) in store.out_edges(duplicate, EdgeLabel::RolePlayer.as_str()) {
            let exists = store.out_edges(main, EdgeLabel::RolePlayer.as_str()).iter().any(|&(_, p)| p == player);
            if !exists {
                store.add_edge(main, player, EdgeLabel::RolePlayer.as_str()).map_err(wrap_store)?;
            }
        }

        for (edge, relation) in store.in_edges(duplicate, EdgeLabel::Casting.as_str()) {
            let role_id = store.get_edge_property(edge, edge_property::ROLE_TYPE_ID);
            let already_linked = store.out_edges(relation, EdgeLabel::Casting.as_str()).iter().any(|&(existing, v)| {
                v == main && store.get_edge_property(existing, edge_property::ROLE_TYPE_ID) == role_id
            });
            if !already_linked {
                let new_edge = store.add_edge(relation, main, EdgeLabel::Casting.as_str()).map_err(wrap_store)?;
                if let Some(role_id) = &role_id {
                    store.set_edge_property(new_edge, edge_property::ROLE_TYPE_ID, role_id).map_err(wrap_store)?;
                }
            }
        }

        store.delete_vertex(duplicate).map_err(wrap_store)?;
        Ok(())
    }

    /// Merges two vertices both recognised as the same relation instance
    /// (same type, same role-map — that's what put them in one INDEX
    /// group). Their casting sets are deduplicated independently, so
    /// nothing needs transferring; `duplicate` is simply dropped.
    fn merge_relation(store: &mut ElementStore, _main: VertexId, duplicate: VertexId) -> Result<(), TransactionError> {
        store.delete_vertex(duplicate).map_err(wrap_store)?;
        Ok(())
    }

    /// The "resource relation copy": for every relation the duplicate
    /// resource plays a role in, rebuild that relation's role-map with
    /// `main` substituted for `duplicate`, and recompute its fingerprint.
    /// If a relation with that fingerprint already exists, the one found
    /// here is redundant and is dropped (its castings stay, deduplicated
    /// on their own); otherwise this relation's role-player edges are
    /// repointed at `main` via new castings and its INDEX updated.
    fn merge_resource(store: &mut ElementStore, main: VertexId, duplicate: VertexId) -> Result<(), TransactionError> {
        for (_, relation) in store.in_edges(duplicate, EdgeLabel::Shortcut.as_str()) {
            Self::converge_relation_after_substitution(store, relation, duplicate, main)?;
        }
        store.delete_vertex(duplicate).map_err(wrap_store)?;
        Ok(())
    }

    fn converge_relation_after_substitution(
        store: &mut ElementStore,
        relation: VertexId,
        old_player: VertexId,
        new_player: VertexId,
    ) -> Result<(), TransactionError> {
        let Some(type_id) = Self::relation_type_id(store, relation) else { return Ok(()) };
        let role_map = Self::role_map_with_substitution(store, relation, old_player, new_player);
        let new_fingerprint = fingerprint::relation_fingerprint(type_id, &role_map);

        let equivalent_exists = store
            .vertices_by_property(property::INDEX, &new_fingerprint.to_string())
            .collect::<Vec<_>>()
            .into_iter()
            .any(|v| v != relation && store.vertex_by_raw_id(v).as_deref() == Some(BaseKind::Relation.as_str()));

        if equivalent_exists {
            store.delete_vertex(relation).map_err(wrap_store)?;
            return Ok(());
        }

        Self::repoint_role_player(store, relation, old_player, new_player)?;
        store.set_property(relation, property::INDEX, &new_fingerprint.to_string()).map_err(wrap_store)?;
        Ok(())
    }

    fn relation_type_id(store: &ElementStore, relation: VertexId) -> Option<TypeId> {
        let (_, shard) = store.out_edges(relation, EdgeLabel::Isa.as_str()).into_iter().next()?;
        let (_, relation_type) = store.out_edges(shard, EdgeLabel::Shard.as_str()).into_iter().next()?;
        store.get_property(relation_type, property::TYPE_ID)?.parse().ok()
    }

    fn role_map_with_substitution(
        store: &ElementStore,
        relation: VertexId,
        old_player: VertexId,
        new_player: VertexId,
    ) -> BTreeMap<TypeId, BTreeSet<VertexId>> {
        let mut role_map: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        for (edge, casting) in store.out_edges(relation, EdgeLabel::Casting.as_str()) {
            let Some(role_id) = store.get_edge_property(edge, edge_property::ROLE_TYPE_ID).and_then(|s| s.parse().ok())
            else {
                continue;
            };
            for (_, player) in store.out_edges(casting, EdgeLabel::RolePlayer.as_str()) {
                let player = if player == old_player { new_player } else { player };
                role_map.entry(role_id).or_default().insert(player);
            }
        }
        role_map
    }

    /// Repoints every CASTING/SHORTCUT edge `relation` holds toward
    /// `old_player` so it instead names `new_player`, reusing an existing
    /// casting for `(role, new_player)` if one is already there.
    fn repoint_role_player(
        store: &mut ElementStore,
        relation: VertexId,
        old_player: VertexId,
        new_player: VertexId,
    ) -> Result<(), TransactionError> {
        for (casting_edge, casting) in store.out_edges(relation, EdgeLabel::Casting.as_str()) {
            let plays_old = store.out_edges(casting, EdgeLabel::RolePlayer.as_str()).iter().any(|&(_, p)| p == old_player);
            if !plays_old {
                continue;
            }
            let Some(role_id) = store.get_edge_property(casting_edge, edge_property::ROLE_TYPE_ID) else { continue };
            let Ok(role_type_id) = role_id.parse::<TypeId>() else { continue };

            let new_index = fingerprint::casting_fingerprint(role_type_id, new_player);
            let replacement = store
                .vertices_by_property(property::INDEX, &new_index.to_string())
                .collect::<Vec<_>>()
                .into_iter()
                .find(|&v| store.vertex_by_raw_id(v).as_deref() == Some(BaseKind::Casting.as_str()));

            let replacement = match replacement {
                Some(existing) => existing,
                None => {
                    let created = store.add_vertex(BaseKind::Casting.as_str()).map_err(wrap_store)?;
                    store.set_property(created, property::INDEX, &new_index.to_string()).map_err(wrap_store)?;
                    let rp_edge = store.add_edge(created, new_player, EdgeLabel::RolePlayer.as_str()).map_err(wrap_store)?;
                    store.set_edge_property(rp_edge, edge_property::ROLE_TYPE_ID, &role_id).map_err(wrap_store)?;
                    created
                }
            };

            if replacement != casting {
                store.delete_edge(casting_edge).map_err(wrap_store)?;
                let new_edge = store.add_edge(relation, replacement, EdgeLabel::Casting.as_str()).map_err(wrap_store)?;
                store.set_edge_property(new_edge, edge_property::ROLE_TYPE_ID, &role_id).map_err(wrap_store)?;
            }
        }

        for (shortcut_edge, player) in store.out_edges(relation, EdgeLabel::Shortcut.as_str()) {
            if player != old_player {
                continue;
            }
            let relation_type_id = store.get_edge_property(shortcut_edge, edge_property::RELATION_TYPE_ID);
            let role_id = store.get_edge_property(shortcut_edge, edge_property::ROLE_TYPE_ID);
            store.delete_edge(shortcut_edge).map_err(wrap_store)?;
            let new_shortcut = store.add_edge(relation, new_player, EdgeLabel::Shortcut.as_str()).map_err(wrap_store)?;
            if let Some(relation_type_id) = relation_type_id {
                store.set_edge_property(new_shortcut, edge_property::RELATION_TYPE_ID, &relation_type_id).map_err(wrap_store)?;
            }
            if let Some(role_id) = role_id {
                store.set_edge_property(new_shortcut, edge_property::ROLE_TYPE_ID, &role_id).map_err(wrap_store)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use concept::{BaseKind, ConceptApi, Value};

    use super::*;
    use crate::{commit_log::IndexGroup, transaction::TransactionKind, Database};

    fn test_database() -> Database {
        Database::open("test", resource::Config::interactive_defaults().with_cache_capacity(100), Arc::new(crate::commit_log::NoOpSink))
            .unwrap()
    }

    /// `add_relation` dedups against already-committed state, so two
    /// sequential transactions can never be made to build a genuine
    /// duplicate through the public API alone — only two sessions open
    /// concurrently, neither seeing the other's yet-uncommitted vertex,
    /// produce one. This fabricates the vertex such a second session would
    /// have produced: its own relation vertex, and its own castings for the
    /// identical (role, player) pairs, all carrying the fingerprint the real
    /// transaction already computed. Exercises casting and relation
    /// reconciliation together, in the order a real commit log would.
    #[test]
    fn concurrent_relations_sharing_a_fingerprint_converge_to_one_vertex() {
        let db = test_database();

        let mut setup = db.open_transaction(TransactionKind::Write).unwrap();
        let person = setup.put_type("person", BaseKind::EntityType, None).unwrap();
        let parentage = setup.put_type("parentage", BaseKind::RelationType, None).unwrap();
        let parent_role = setup.put_type("parent", BaseKind::RoleType, None).unwrap();
        let child_role = setup.put_type("child", BaseKind::RoleType, None).unwrap();
        setup.relates(&parentage, &parent_role).unwrap();
        setup.relates(&parentage, &child_role).unwrap();
        let alice = setup.add_entity(&person).unwrap();
        let bob = setup.add_entity(&person).unwrap();
        db.commit_transaction(setup).unwrap();

        let mut role_map = BTreeMap::new();
        role_map.entry(parent_role.data().type_id).or_insert_with(std::collections::BTreeSet::new).insert(alice.vertex());
        role_map.entry(child_role.data().type_id).or_insert_with(std::collections::BTreeSet::new).insert(bob.vertex());

        let mut tx = db.open_transaction(TransactionKind::Write).unwrap();
        let relation = tx.add_relation(&parentage, &role_map).unwrap();
        let relation_vertex = relation.vertex();
        db.commit_transaction(tx).unwrap();

        let relation_fingerprint = fingerprint::relation_fingerprint(parentage.data().type_id, &role_map);
        let parent_casting_index = fingerprint::casting_fingerprint(parent_role.data().type_id, alice.vertex());
        let child_casting_index = fingerprint::casting_fingerprint(child_role.data().type_id, bob.vertex());

        let mut session = ElementStore::new(Box::new(db.backing_handle().open()), false);
        let (_, shard) = session.out_edges(relation_vertex, EdgeLabel::Isa.as_str()).into_iter().next().unwrap();

        let duplicate_relation = session.add_vertex(BaseKind::Relation.as_str()).unwrap();
        session.add_edge(duplicate_relation, shard, EdgeLabel::Isa.as_str()).unwrap();
        session.set_property(duplicate_relation, property::INDEX, &relation_fingerprint.to_string()).unwrap();

        let link_role = |session: &mut ElementStore, role_id: u64, player: VertexId, casting_index: u64| {
            let casting = session.add_vertex(BaseKind::Casting.as_str()).unwrap();
            session.set_property(casting, property::INDEX, &casting_index.to_string()).unwrap();
            let rp_edge = session.add_edge(casting, player, EdgeLabel::RolePlayer.as_str()).unwrap();
            session.set_edge_property(rp_edge, edge_property::ROLE_TYPE_ID, &role_id.to_string()).unwrap();
            let casting_edge = session.add_edge(duplicate_relation, casting, EdgeLabel::Casting.as_str()).unwrap();
            session.set_edge_property(casting_edge, edge_property::ROLE_TYPE_ID, &role_id.to_string()).unwrap();
        };
        link_role(&mut session, parent_role.data().type_id, alice.vertex(), parent_casting_index);
        link_role(&mut session, child_role.data().type_id, bob.vertex(), child_casting_index);
        session.commit().unwrap();

        let probe = ElementStore::new(Box::new(db.backing_handle().open()), false);
        let parent_castings: Vec<u64> = probe.vertices_by_property(property::INDEX, &parent_casting_index.to_string()).map(|v| v.0).collect();
        let child_castings: Vec<u64> = probe.vertices_by_property(property::INDEX, &child_casting_index.to_string()).map(|v| v.0).collect();
        assert_eq!(parent_castings.len(), 2, "the real and the fabricated transaction each built their own casting");

        let payload = CommitLogPayload {
            instance_counts: vec![],
            castings: vec![
                IndexGroup { index: parent_casting_index, concept_ids: parent_castings },
                IndexGroup { index: child_casting_index, concept_ids: child_castings },
            ],
            resources: vec![],
            relations: vec![IndexGroup { index: relation_fingerprint, concept_ids: vec![relation_vertex.0, duplicate_relation.0] }],
        };

        Reconciler::reconcile(&db.backing_handle(), &payload).unwrap();

        let (main, dropped) =
            if relation_vertex < duplicate_relation { (relation_vertex, duplicate_relation) } else { (duplicate_relation, relation_vertex) };
        let mut read_tx = db.open_transaction(TransactionKind::Read).unwrap();
        assert!(read_tx.get_concept(main).unwrap().is_some());
        assert!(read_tx.get_concept(dropped).unwrap().is_none());

        let post_merge = ElementStore::new(Box::new(db.backing_handle().open()), false);
        assert_eq!(post_merge.vertices_by_property(property::INDEX, &parent_casting_index.to_string()).count(), 1);
        assert_eq!(post_merge.out_edges(main, EdgeLabel::Casting.as_str()).len(), 2);
    }

    #[test]
    fn duplicate_resource_merge_collapses_its_owning_relation_too() {
        let db = test_database();

        let mut setup = db.open_transaction(TransactionKind::Write).unwrap();
        let person = setup.put_type("person", BaseKind::EntityType, None).unwrap();
        let email = setup.put_type("email", BaseKind::ResourceType, Some(concept::ValueType::String)).unwrap();
        let alice = setup.add_entity(&person).unwrap();
        db.commit_transaction(setup).unwrap();

        let mut tx1 = db.open_transaction(TransactionKind::Write).unwrap();
        let resource1 = tx1.add_resource(&email, Value::String("alice@example.com".to_string())).unwrap();
        let resource1_vertex = resource1.vertex();
        tx1.attach_resource(alice.vertex(), &email, resource1_vertex).unwrap();
        let payload1 = db.commit_transaction(tx1).unwrap().expect("mutating transaction emits a commit log");

        let mut tx2 = db.open_transaction(TransactionKind::Write).unwrap();
        let resource2 = tx2.add_resource(&email, Value::String("alice@example.com".to_string())).unwrap();
        let resource2_vertex = resource2.vertex();
        tx2.attach_resource(alice.vertex(), &email, resource2_vertex).unwrap();
        let payload2 = db.commit_transaction(tx2).unwrap().expect("mutating transaction emits a commit log");

        assert_ne!(resource1_vertex, resource2_vertex);

        Reconciler::reconcile(&db.backing_handle(), &payload1).unwrap();
        Reconciler::reconcile(&db.backing_handle(), &payload2).unwrap();

        let (main, dropped) = if resource1_vertex < resource2_vertex { (resource1_vertex, resource2_vertex) } else { (resource2_vertex, resource1_vertex) };

        let mut read_tx = db.open_transaction(TransactionKind::Read).unwrap();
        assert!(read_tx.get_concept(dropped).unwrap().is_none());
        let owners = read_tx.owner_of(main, "email").unwrap();
        assert_eq!(owners.len(), 1);
        let resources = read_tx.resources_of(alice.vertex(), "email").unwrap();
        assert_eq!(resources.len(), 1);
    }
}
