/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The engine's entry point: owns the substrate backing, the process-wide
//! ontology cache, and the thread-bound-transaction registry. Everything a
//! caller does starts with `Database::open`.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    thread::ThreadId,
};

use concept::{schema::EdgeLabel, BaseKind, OntologyCache};
use resource::{constants::property, Config};
use storage::{ElementStore, InMemoryBacking, VertexId};
use tracing::{info, trace};

use crate::{
    bootstrap,
    commit_log::{CommitLogPayload, CommitLogSink},
    error::TransactionError,
    transaction::{CommitOutcome, Transaction, TransactionKind},
};

/// One open keyspace. `InMemoryBacking` is the only substrate this
/// workspace ships, but every other collaborator — `ElementStore`,
/// `Transaction` — only ever sees it through the substrate-agnostic
/// `PropertyGraph` trait.
pub struct Database {
    keyspace: String,
    backing: InMemoryBacking,
    ontology_cache: Arc<OntologyCache>,
    config: Config,
    root_vertex: VertexId,
    open_threads: Arc<Mutex<HashSet<ThreadId>>>,
    commit_log_sink: Arc<dyn CommitLogSink>,
}

impl Database {
    pub fn open(keyspace: impl Into<String>, config: Config, commit_log_sink: Arc<dyn CommitLogSink>) -> Result<Self, TransactionError> {
        let keyspace = keyspace.into();
        let backing = InMemoryBacking::new();
        let ontology_cache = Arc::new(OntologyCache::new(config.ontology_cache_capacity));

        let mut bootstrap_session = ElementStore::new(Box::new(backing.open()), false);
        let root_vertex = bootstrap::ensure_bootstrapped(&mut bootstrap_session, &ontology_cache)?;
        bootstrap_session.commit().map_err(|source| TransactionError::SubstrateFailure { source })?;

        info!(keyspace = %keyspace, "opened database");
        Ok(Database {
            keyspace,
            backing,
            ontology_cache,
            config,
            root_vertex,
            open_threads: Arc::new(Mutex::new(HashSet::new())),
            commit_log_sink,
        })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn ontology_cache(&self) -> Arc<OntologyCache> {
        self.ontology_cache.clone()
    }

    /// A cheap handle to the live backing, for collaborators that run
    /// outside the ordinary transaction machinery — currently only the
    /// reconciler, which is not itself a user transaction.
    pub fn backing_handle(&self) -> InMemoryBacking {
        self.backing.clone()
    }

    /// Opens a transaction bound to the calling thread — at most one open
    /// transaction per thread.
    pub fn open_transaction(&self, kind: TransactionKind) -> Result<Transaction, TransactionError> {
        let store = ElementStore::new(Box::new(self.backing.open()), kind.is_read_only());
        Transaction::new(
            kind,
            self.keyspace.clone(),
            store,
            self.ontology_cache.clone(),
            self.config.clone(),
            self.root_vertex,
            self.open_threads.clone(),
        )
    }

    /// Commits `transaction`, then rolls over any type that crossed its
    /// sharding threshold against the now-live backing, and finally
    /// forwards the resulting commit log to the configured sink.
    pub fn commit_transaction(&self, transaction: Transaction) -> Result<Option<CommitLogPayload>, TransactionError> {
        let CommitOutcome { commit_log, instance_counts_delta } = transaction.commit()?;
        self.update_type_shards(&instance_counts_delta)?;
        if let Some(payload) = &commit_log {
            self.commit_log_sink.submit(payload.clone());
        }
        Ok(commit_log)
    }

    /// Applies queued instance-count deltas to each affected type and
    /// rolls a fresh shard when the live total crosses `sharding.threshold`.
    /// Runs once per commit against the live backing (not inside the
    /// transaction's own session, which is already consumed), so it is
    /// idempotent by construction rather than by re-checking a watermark.
    fn update_type_shards(&self, deltas: &HashMap<String, i64>) -> Result<(), TransactionError> {
        if deltas.is_empty() {
            return Ok(());
        }

        let mut session = ElementStore::new(Box::new(self.backing.open()), false);
        for (label, delta) in deltas {
            let Some(vertex) = session.vertices_by_property(property::TYPE_LABEL, label).next() else {
                continue;
            };
            let current = session
                .get_property(vertex, property::INSTANCE_COUNT)
                .and_then(|raw| raw.parse::<i64>().ok())
                .unwrap_or(0);
            let updated = (current + delta).max(0) as u64;
            session
                .set_property(vertex, property::INSTANCE_COUNT, &updated.to_string())
                .map_err(|source| TransactionError::SubstrateFailure { source })?;

            if updated > 0 && updated % self.config.sharding_threshold == 0 {
                let shard =
                    session.add_vertex(BaseKind::Shard.as_str()).map_err(|source| TransactionError::SubstrateFailure { source })?;
                session
                    .add_edge(shard, vertex, EdgeLabel::Shard.as_str())
                    .map_err(|source| TransactionError::SubstrateFailure { source })?;
                session
                    .set_property(vertex, property::CURRENT_SHARD, &shard.to_string())
                    .map_err(|source| TransactionError::SubstrateFailure { source })?;
                trace!(label, updated, "rolled over shard");
            }
        }
        session.commit().map_err(|source| TransactionError::SubstrateFailure { source })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use concept::{BaseKind, ConceptApi, Value};

    use super::*;
    use crate::commit_log::NoOpSink;

    fn test_database() -> Database {
        Database::open("test", Config::interactive_defaults().with_cache_capacity(100), Arc::new(NoOpSink)).unwrap()
    }

    #[test]
    fn open_bootstraps_meta_types_once() {
        let db = test_database();
        assert_eq!(db.ontology_cache().len(), 7);
    }

    #[test]
    fn write_transaction_creates_and_reads_back_an_entity_type() {
        let db = test_database();
        let mut tx = db.open_transaction(TransactionKind::Write).unwrap();
        let person = tx.put_type("person", BaseKind::EntityType, None).unwrap();
        let entity = tx.add_entity(&person).unwrap();
        db.commit_transaction(tx).unwrap();

        let mut read_tx = db.open_transaction(TransactionKind::Read).unwrap();
        let reloaded = read_tx.get_concept(entity.vertex()).unwrap();
        assert!(reloaded.is_some());
    }

    #[test]
    fn relation_round_trips_through_commit() {
        let db = test_database();
        let mut tx = db.open_transaction(TransactionKind::Write).unwrap();
        let person = tx.put_type("person", BaseKind::EntityType, None).unwrap();
        let friendship = tx.put_type("friendship", BaseKind::RelationType, None).unwrap();
        let friend_role = tx.put_type("friend", BaseKind::RoleType, None).unwrap();
        tx.relates(&friendship, &friend_role).unwrap();

        let alice = tx.add_entity(&person).unwrap();
        let bob = tx.add_entity(&person).unwrap();

        let mut role_map = BTreeMap::new();
        role_map.entry(friend_role.data().type_id).or_insert_with(std::collections::BTreeSet::new).insert(alice.vertex());
        role_map.entry(friend_role.data().type_id).or_insert_with(std::collections::BTreeSet::new).insert(bob.vertex());
        let relation = tx.add_relation(&friendship, &role_map).unwrap();

        db.commit_transaction(tx).unwrap();

        let mut read_tx = db.open_transaction(TransactionKind::Read).unwrap();
        let reloaded = read_tx.get_concept(relation.vertex()).unwrap().unwrap();
        assert_eq!(reloaded.base_kind(), BaseKind::Relation);
    }

    #[test]
    fn only_one_transaction_may_be_open_per_thread() {
        let db = test_database();
        let _first = db.open_transaction(TransactionKind::Read).unwrap();
        let err = db.open_transaction(TransactionKind::Read).unwrap_err();
        assert!(matches!(err, TransactionError::AlreadyOpen { .. }));
    }

    #[test]
    fn resource_value_is_queryable_after_commit() {
        let db = test_database();
        let mut tx = db.open_transaction(TransactionKind::Write).unwrap();
        let age = tx.put_type("age", BaseKind::ResourceType, Some(concept::ValueType::Long)).unwrap();
        tx.add_resource(&age, Value::Long(42)).unwrap();
        db.commit_transaction(tx).unwrap();

        let mut read_tx = db.open_transaction(TransactionKind::Read).unwrap();
        let found = read_tx.get_resources_by_value(&Value::Long(42)).unwrap();
        assert_eq!(found.len(), 1);
    }
}
