/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The public transaction surface: an explicit value rather than ambient,
//! thread-local transaction state — every operation takes `&mut self`
//! rather than reaching into thread-local storage. The only thread-bound
//! state left is the "one open transaction per thread" bookkeeping,
//! enforced by [`ThreadGuard`] and nothing else.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex},
    thread::ThreadId,
    time::Duration,
};

use concept::{
    meta, schema::EdgeLabel, BaseKind, Concept, ConceptFactory, InstanceConcept, InstanceData, OntologyCache,
    TypeConcept, TypeData, TypeId, Value, ValueType,
};
use itertools::Itertools;
use rand::Rng;
use resource::{
    constants::{edge_property, property},
    CacheMode, Config,
};
use storage::{ElementStore, VertexId};
use tracing::{trace, warn};

use crate::{
    commit_log::{CommitLogPayload, IndexGroup, InstanceCountDelta},
    error::TransactionError,
    fingerprint,
    log::TransactionLog,
    validator::Validator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Read,
    Write,
    Batch,
}

impl TransactionKind {
    pub fn is_read_only(self) -> bool {
        matches!(self, TransactionKind::Read)
    }

    pub fn cache_mode(self) -> CacheMode {
        match self {
            TransactionKind::Batch => CacheMode::Batch,
            TransactionKind::Read | TransactionKind::Write => CacheMode::Interactive,
        }
    }
}

/// Releases this thread's slot in the open-transaction registry when the
/// transaction ends, however it ends (commit, abort, close, or an early
/// return via `?`).
pub(crate) struct ThreadGuard {
    registry: Arc<Mutex<HashSet<ThreadId>>>,
    thread_id: ThreadId,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        self.registry.lock().expect("thread registry lock poisoned").remove(&self.thread_id);
    }
}

impl ThreadGuard {
    pub(crate) fn acquire(registry: Arc<Mutex<HashSet<ThreadId>>>) -> Result<Self, TransactionError> {
        let thread_id = std::thread::current().id();
        let mut held = registry.lock().expect("thread registry lock poisoned");
        if !held.insert(thread_id) {
            return Err(TransactionError::AlreadyOpen {});
        }
        drop(held);
        Ok(ThreadGuard { registry, thread_id })
    }
}

pub struct CommitOutcome {
    pub commit_log: Option<CommitLogPayload>,
    pub instance_counts_delta: HashMap<String, i64>,
}

pub struct Transaction {
    kind: TransactionKind,
    keyspace: String,
    store: ElementStore,
    log: TransactionLog,
    ontology_cache: Arc<OntologyCache>,
    config: Config,
    root_vertex: VertexId,
    closed: bool,
    _thread_guard: ThreadGuard,
}

impl Transaction {
    pub(crate) fn new(
        kind: TransactionKind,
        keyspace: String,
        store: ElementStore,
        ontology_cache: Arc<OntologyCache>,
        config: Config,
        root_vertex: VertexId,
        open_threads: Arc<Mutex<HashSet<ThreadId>>>,
    ) -> Result<Self, TransactionError> {
        let thread_guard = ThreadGuard::acquire(open_threads)?;
        trace!(?kind, keyspace = %keyspace, "opened transaction");
        Ok(Transaction {
            kind,
            keyspace,
            store,
            log: TransactionLog::new(),
            ontology_cache,
            config,
            root_vertex,
            closed: false,
            _thread_guard: thread_guard,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    fn ensure_open(&self) -> Result<(), TransactionError> {
        if self.closed {
            Err(TransactionError::GraphClosed {})
        } else {
            Ok(())
        }
    }

    fn ensure_writable(&self) -> Result<(), TransactionError> {
        self.ensure_open()?;
        if self.kind.is_read_only() {
            Err(TransactionError::ReadOnly {})
        } else {
            Ok(())
        }
    }

    // ---- type lookup & creation -------------------------------------------------

    pub fn get_type(&mut self, label: &str, kind: Option<BaseKind>) -> Result<Option<TypeConcept>, TransactionError> {
        self.ensure_open()?;
        let resolved = match self.log.get_or_clone_type(label, &self.ontology_cache) {
            Some(t) => Some(t),
            None => self.resolve_type_from_store(label)?,
        };
        Ok(resolved.filter(|t| kind.map(|k| k == t.base_kind()).unwrap_or(true)))
    }

    fn resolve_type_from_store(&mut self, label: &str) -> Result<Option<TypeConcept>, TransactionError> {
        let candidates = self.store.vertices_by_property(property::TYPE_LABEL, label).collect::<Vec<_>>();
        match candidates.as_slice() {
            [] => Ok(None),
            [vertex] => {
                let concept =
                    ConceptFactory::from_vertex(&self.store, *vertex).map_err(|source| TransactionError::Concept { source })?;
                let type_concept = concept.into_type().ok_or_else(|| TransactionError::DuplicateConcept {
                    key: format!("{property}={label}", property = property::TYPE_LABEL),
                })?;
                self.log.put_cached_type(label.to_string(), type_concept.clone());
                Ok(Some(type_concept))
            }
            _ => Err(TransactionError::DuplicateConcept { key: format!("{}={label}", property::TYPE_LABEL) }),
        }
    }

    /// Idempotent creator. Meta-type labels are never created here — only
    /// matched for idempotence against the bootstrap state; any mismatch
    /// against a meta-type is `MetaImmutable` rather than `TypeConflict`.
    pub fn put_type(&mut self, label: &str, kind: BaseKind, datatype: Option<ValueType>) -> Result<TypeConcept, TransactionError> {
        self.ensure_writable()?;
        if !kind.is_type() {
            return Err(TransactionError::TypeConflict { label: label.to_string() });
        }

        let existing = self.get_type(label, None)?;

        if meta::is_meta_label(label) {
            return match existing {
                Some(t) if t.base_kind() == kind && t.datatype() == datatype => Ok(t),
                _ => Err(TransactionError::MetaImmutable { label: label.to_string() }),
            };
        }

        if let Some(t) = existing {
            return if t.base_kind() == kind && t.datatype() == datatype {
                Ok(t)
            } else {
                Err(TransactionError::TypeConflict { label: label.to_string() })
            };
        }

        let type_id = self.allocate_type_id()?;
        let vertex = self.store.add_vertex(kind.as_str()).map_err(|source| TransactionError::SubstrateFailure { source })?;
        self.write_type_properties(vertex, type_id, label, datatype)?;

        let supertype_label = meta_label_for_kind(kind);
        if let Some(supertype_vertex) = self.vertex_of_meta_label(supertype_label)? {
            self.store
                .add_edge(vertex, supertype_vertex, EdgeLabel::Sub.as_str())
                .map_err(|source| TransactionError::SubstrateFailure { source })?;
        }

        let current_shard = Some(self.create_shard(vertex)?);

        let data = TypeData {
            vertex,
            type_id,
            label: label.to_string(),
            is_abstract: false,
            is_implicit: false,
            instance_count: 0,
            current_shard,
        };
        let type_concept = match kind {
            BaseKind::EntityType => TypeConcept::EntityType(data),
            BaseKind::RelationType => TypeConcept::RelationType(data),
            BaseKind::ResourceType => {
                let datatype = datatype.ok_or_else(|| TransactionError::InvalidDatatype { datatype: "<none>".to_string() })?;
                TypeConcept::ResourceType(data, datatype)
            }
            BaseKind::RoleType => TypeConcept::RoleType(data),
            BaseKind::RuleType => TypeConcept::RuleType(data),
            _ => unreachable!("guarded by kind.is_type() above"),
        };

        self.log.put_cached_type(label.to_string(), type_concept.clone());
        trace!(label, type_id, "created type");
        Ok(type_concept)
    }

    /// Declares that `relation_type` may cast players in `role_type`,
    /// recorded as a RELATES edge from the relation type's vertex to the
    /// role type's. `add_relation` accepts any role map regardless, but an
    /// undeclared role fails validation at commit. Idempotent.
    pub fn relates(&mut self, relation_type: &TypeConcept, role_type: &TypeConcept) -> Result<(), TransactionError> {
        self.ensure_writable()?;
        let TypeConcept::RelationType(relation_data) = relation_type else {
            return Err(TransactionError::TypeConflict { label: relation_type.data().label.clone() });
        };
        let TypeConcept::RoleType(role_data) = role_type else {
            return Err(TransactionError::TypeConflict { label: role_type.data().label.clone() });
        };

        let already_declared = self
            .store
            .out_edges(relation_data.vertex, EdgeLabel::Relates.as_str())
            .iter()
            .any(|&(_, v)| v == role_data.vertex);
        if !already_declared {
            self.store.add_edge(relation_data.vertex, role_data.vertex, EdgeLabel::Relates.as_str()).map_err(wrap_store)?;
        }
        Ok(())
    }

    fn write_type_properties(
        &mut self,
        vertex: VertexId,
        type_id: TypeId,
        label: &str,
        datatype: Option<ValueType>,
    ) -> Result<(), TransactionError> {
        self.store.set_property(vertex, property::TYPE_ID, &type_id.to_string()).map_err(wrap_store)?;
        self.store.set_property(vertex, property::TYPE_LABEL, label).map_err(wrap_store)?;
        self.store.set_property(vertex, property::IS_ABSTRACT, "false").map_err(wrap_store)?;
        self.store.set_property(vertex, property::IS_IMPLICIT, "false").map_err(wrap_store)?;
        self.store.set_property(vertex, property::INSTANCE_COUNT, "0").map_err(wrap_store)?;
        if let Some(datatype) = datatype {
            self.store.set_property(vertex, property::DATA_TYPE, datatype.as_str()).map_err(wrap_store)?;
        }
        Ok(())
    }

    fn vertex_of_meta_label(&mut self, label: Option<&str>) -> Result<Option<VertexId>, TransactionError> {
        let Some(label) = label else { return Ok(None) };
        Ok(self.get_type(label, None)?.map(|t| t.data().vertex))
    }

    /// Bounded retry with jitter on substrate conflict. Reads the counter
    /// from the root bookkeeping vertex, increments it, and writes it back.
    fn allocate_type_id(&mut self) -> Result<TypeId, TransactionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current_raw = self
                .store
                .get_property(self.root_vertex, NEXT_TYPE_ID_PROPERTY)
                .ok_or_else(|| TransactionError::SubstrateFailure { source: storage::StoreError::SubstrateUnavailable {} })?;
            let current: TypeId = current_raw.parse().map_err(|_| TransactionError::SubstrateFailure {
                source: storage::StoreError::SubstrateUnavailable {},
            })?;
            match self.store.set_property(self.root_vertex, NEXT_TYPE_ID_PROPERTY, &(current + 1).to_string()) {
                Ok(()) => return Ok(current),
                Err(_) if attempt < resource::constants::TYPE_ID_ALLOCATION_MAX_ATTEMPTS => {
                    warn!(attempt, "type-id allocation conflict, retrying");
                    let jitter = rand::thread_rng().gen_range(0..resource::constants::TYPE_ID_ALLOCATION_BACKOFF_BASE_MS * 4);
                    std::thread::sleep(Duration::from_millis(jitter));
                }
                Err(source) => return Err(TransactionError::SubstrateFailure { source }),
            }
        }
    }

    fn create_shard(&mut self, of_type: VertexId) -> Result<VertexId, TransactionError> {
        let shard = self.store.add_vertex(BaseKind::Shard.as_str()).map_err(wrap_store)?;
        self.store.add_edge(shard, of_type, EdgeLabel::Shard.as_str()).map_err(wrap_store)?;
        self.store.set_property(of_type, property::CURRENT_SHARD, &shard.to_string()).map_err(wrap_store)?;
        Ok(shard)
    }

    // ---- concept lookup ----------------------------------------------------------

    /// The vertex id doubles as the concept id: the substrate's own
    /// element id is already a stable, process-unique handle, so no
    /// separate `ID` property round-trip is needed to resolve one.
    pub fn get_concept(&mut self, concept_id: VertexId) -> Result<Option<Concept>, TransactionError> {
        self.ensure_open()?;
        if let Some(cached) = self.log.cached_concepts.get(&concept_id) {
            return Ok(Some(cached.clone()));
        }
        if self.store.vertex_by_raw_id(concept_id).is_none() {
            return Ok(None);
        }
        let concept =
            ConceptFactory::from_vertex(&self.store, concept_id).map_err(|source| TransactionError::Concept { source })?;
        self.log.cached_concepts.insert(concept_id, concept.clone());
        Ok(Some(concept))
    }

    pub fn get_resources_by_value(&mut self, value: &Value) -> Result<Vec<Concept>, TransactionError> {
        self.ensure_open()?;
        let property_key = value.datatype().value_property();
        let encoded = value.encode();
        let mut results = Vec::new();
        for vertex in self.store.vertices_by_property(property_key, &encoded).collect::<Vec<_>>() {
            let concept = ConceptFactory::from_vertex(&self.store, vertex).map_err(|source| TransactionError::Concept { source })?;
            if matches!(&concept, Concept::Instance(InstanceConcept::Resource(_, v)) if v == value) {
                results.push(concept);
            }
        }
        Ok(results)
    }

    // ---- instance creation ---------------------------------------------------------

    pub fn add_entity(&mut self, entity_type: &TypeConcept) -> Result<Concept, TransactionError> {
        self.ensure_writable()?;
        let vertex = self.store.add_vertex(BaseKind::Entity.as_str()).map_err(wrap_store)?;
        self.attach_to_current_shard(vertex, entity_type)?;
        self.log.record_instance_created(&entity_type.data().label);
        let data = InstanceData { vertex, type_id: entity_type.data().type_id };
        let concept = Concept::Instance(InstanceConcept::Entity(data));
        self.log.cached_concepts.insert(vertex, concept.clone());
        Ok(concept)
    }

    pub fn add_rule(&mut self, rule_type: &TypeConcept) -> Result<Concept, TransactionError> {
        self.ensure_writable()?;
        let vertex = self.store.add_vertex(BaseKind::Rule.as_str()).map_err(wrap_store)?;
        self.attach_to_current_shard(vertex, rule_type)?;
        self.log.record_instance_created(&rule_type.data().label);
        let data = InstanceData { vertex, type_id: rule_type.data().type_id };
        let concept = Concept::Instance(InstanceConcept::Rule(data));
        self.log.cached_concepts.insert(vertex, concept.clone());
        Ok(concept)
    }

    /// Resources are not deduplicated within a transaction the way
    /// relations are; two transactions inserting the same value each get
    /// their own vertex, converged later by the reconciler.
    pub fn add_resource(&mut self, resource_type: &TypeConcept, value: Value) -> Result<Concept, TransactionError> {
        self.ensure_writable()?;
        let TypeConcept::ResourceType(data, datatype) = resource_type else {
            return Err(TransactionError::InvalidDatatype { datatype: "<not-a-resource-type>".to_string() });
        };
        if *datatype != value.datatype() {
            return Err(TransactionError::InvalidDatatype { datatype: value.datatype().as_str().to_string() });
        }

        let vertex = self.store.add_vertex(BaseKind::Resource.as_str()).map_err(wrap_store)?;
        self.attach_to_current_shard(vertex, resource_type)?;
        self.store.set_property(vertex, datatype.value_property(), &value.encode()).map_err(wrap_store)?;
        let index = fingerprint::resource_fingerprint(data.type_id, &value.encode());
        self.store.set_property(vertex, property::INDEX, &index.to_string()).map_err(wrap_store)?;
        self.log.modified_resources.insert(vertex);
        self.log.record_instance_created(&data.label);

        let instance = InstanceData { vertex, type_id: data.type_id };
        let concept = Concept::Instance(InstanceConcept::Resource(instance, value));
        self.log.cached_concepts.insert(vertex, concept.clone());
        Ok(concept)
    }

    fn attach_to_current_shard(&mut self, vertex: VertexId, of_type: &TypeConcept) -> Result<(), TransactionError> {
        let shard = of_type.data().current_shard.ok_or_else(|| TransactionError::SubstrateFailure {
            source: storage::StoreError::SubstrateUnavailable {},
        })?;
        self.store.add_edge(vertex, shard, EdgeLabel::Isa.as_str()).map_err(wrap_store)?;
        Ok(())
    }

    /// Builds a relation, deduplicating by fingerprint within this
    /// transaction and against the already-committed index.
    pub fn add_relation(
        &mut self,
        relation_type: &TypeConcept,
        role_map: &BTreeMap<TypeId, BTreeSet<VertexId>>,
    ) -> Result<Concept, TransactionError> {
        self.ensure_writable()?;
        let type_id = relation_type.data().type_id;
        let fp = fingerprint::relation_fingerprint(type_id, role_map);

        if let Some(&vertex) = self.log.new_relations_by_fingerprint.get(&fp) {
            return Ok(self.get_concept(vertex)?.expect("relation just created must resolve"));
        }
        for candidate in self.store.vertices_by_property(property::INDEX, &fp.to_string()).collect::<Vec<_>>() {
            if self.store.vertex_by_raw_id(candidate).as_deref() == Some(BaseKind::Relation.as_str()) {
                self.log.new_relations_by_fingerprint.insert(fp, candidate);
                return Ok(self.get_concept(candidate)?.expect("indexed relation must resolve"));
            }
        }

        let vertex = self.store.add_vertex(BaseKind::Relation.as_str()).map_err(wrap_store)?;
        self.attach_to_current_shard(vertex, relation_type)?;
        self.store.set_property(vertex, property::INDEX, &fp.to_string()).map_err(wrap_store)?;

        for (&role_id, players) in role_map {
            for &player in players {
                self.apply_casting_protocol(vertex, type_id, role_id, player)?;
            }
        }

        self.log.new_relations_by_fingerprint.insert(fp, vertex);
        self.log.modified_relations.insert(vertex);
        self.log.record_instance_created(&relation_type.data().label);

        let instance = InstanceData { vertex, type_id };
        let concept = Concept::Instance(InstanceConcept::Relation(instance));
        self.log.cached_concepts.insert(vertex, concept.clone());
        Ok(concept)
    }

    /// Finds or creates the casting vertex for (role, player), links it to
    /// the relation, and maintains the shortcut edge that lets readers
    /// reach `player` from the relation without hopping through the
    /// casting vertex.
    fn apply_casting_protocol(
        &mut self,
        relation: VertexId,
        relation_type_id: TypeId,
        role_id: TypeId,
        player: VertexId,
    ) -> Result<(), TransactionError> {
        let index = fingerprint::casting_fingerprint(role_id, player);

        let found = self
            .store
            .vertices_by_property(property::INDEX, &index.to_string())
            .collect::<Vec<_>>()
            .into_iter()
            .find(|&v| self.store.vertex_by_raw_id(v).as_deref() == Some(BaseKind::Casting.as_str()));

        let casting = match found {
            Some(existing) => existing,
            None => {
                let casting = self.store.add_vertex(BaseKind::Casting.as_str()).map_err(wrap_store)?;
                self.store.set_property(casting, property::INDEX, &index.to_string()).map_err(wrap_store)?;
                let role_player_edge =
                    self.store.add_edge(casting, player, EdgeLabel::RolePlayer.as_str()).map_err(wrap_store)?;
                self.store
                    .set_edge_property(role_player_edge, edge_property::ROLE_TYPE_ID, &role_id.to_string())
                    .map_err(wrap_store)?;
                casting
            }
        };
        self.log.modified_castings.insert(casting);

        let already_cast = self.store.out_edges(relation, EdgeLabel::Casting.as_str()).iter().any(|&(_, v)| v == casting);
        if !already_cast {
            let casting_edge = self.store.add_edge(relation, casting, EdgeLabel::Casting.as_str()).map_err(wrap_store)?;
            self.store
                .set_edge_property(casting_edge, edge_property::ROLE_TYPE_ID, &role_id.to_string())
                .map_err(wrap_store)?;
        }

        let shortcut_exists = self.store.out_edges(relation, EdgeLabel::Shortcut.as_str()).iter().any(|&(edge, v)| {
            v == player && self.store.get_edge_property(edge, edge_property::ROLE_TYPE_ID).as_deref() == Some(&role_id.to_string())
        });
        if !shortcut_exists {
            let shortcut_edge =
                self.store.add_edge(relation, player, EdgeLabel::Shortcut.as_str()).map_err(wrap_store)?;
            self.store
                .set_edge_property(shortcut_edge, edge_property::RELATION_TYPE_ID, &relation_type_id.to_string())
                .map_err(wrap_store)?;
            self.store
                .set_edge_property(shortcut_edge, edge_property::ROLE_TYPE_ID, &role_id.to_string())
                .map_err(wrap_store)?;
        }

        self.log.modified_relations.insert(relation);
        Ok(())
    }

    // ---- resource ownership ----------------------------------------------------

    /// Attaches `resource` to `owner` via an implicit has-relation — the
    /// same construction typed-graph engines use to represent attribute
    /// ownership without a dedicated edge kind. Reuses the casting
    /// protocol wholesale: `owner` and `resource` simply play the two
    /// roles of a synthesized `@has-<label>` relation.
    pub fn attach_resource(
        &mut self,
        owner: VertexId,
        resource_type: &TypeConcept,
        resource: VertexId,
    ) -> Result<Concept, TransactionError> {
        self.ensure_writable()?;
        let resource_label = resource_type.data().label.clone();
        let (has_relation_type, owner_role, owned_role) = self.ensure_has_relation_types(&resource_label)?;

        let mut role_map: BTreeMap<TypeId, BTreeSet<VertexId>> = BTreeMap::new();
        role_map.entry(owner_role.data().type_id).or_default().insert(owner);
        role_map.entry(owned_role.data().type_id).or_default().insert(resource);
        self.add_relation(&has_relation_type, &role_map)
    }

    fn ensure_has_relation_types(
        &mut self,
        resource_label: &str,
    ) -> Result<(TypeConcept, TypeConcept, TypeConcept), TransactionError> {
        let relation_label = format!("@has-{resource_label}");
        let owner_role_label = format!("@has-{resource_label}-owner");
        let owned_role_label = format!("@has-{resource_label}-owned");

        let relation_type = self.put_type(&relation_label, BaseKind::RelationType, None)?;
        let owner_role = self.put_type(&owner_role_label, BaseKind::RoleType, None)?;
        let owned_role = self.put_type(&owned_role_label, BaseKind::RoleType, None)?;
        self.relates(&relation_type, &owner_role)?;
        self.relates(&relation_type, &owned_role)?;
        Ok((relation_type, owner_role, owned_role))
    }

    /// Every resource vertex of the implicit `@has-<resource_label>`
    /// relation that `owner` plays the owner role in.
    pub fn resources_of(&mut self, owner: VertexId, resource_label: &str) -> Result<Vec<Concept>, TransactionError> {
        self.ensure_open()?;
        let Some((owner_role, owned_role)) = self.has_roles(resource_label)? else { return Ok(Vec::new()) };
        self.players_via_casting(owner, owner_role, owned_role)
    }

    /// The inverse of [`resources_of`](Self::resources_of): every owner a
    /// given resource is attached to under `resource_label`.
    pub fn owner_of(&mut self, resource: VertexId, resource_label: &str) -> Result<Vec<Concept>, TransactionError> {
        self.ensure_open()?;
        let Some((owner_role, owned_role)) = self.has_roles(resource_label)? else { return Ok(Vec::new()) };
        self.players_via_casting(resource, owned_role, owner_role)
    }

    fn has_roles(&mut self, resource_label: &str) -> Result<Option<(TypeId, TypeId)>, TransactionError> {
        let Some(owner_role) = self.get_type(&format!("@has-{resource_label}-owner"), Some(BaseKind::RoleType))? else {
            return Ok(None);
        };
        let Some(owned_role) = self.get_type(&format!("@has-{resource_label}-owned"), Some(BaseKind::RoleType))? else {
            return Ok(None);
        };
        Ok(Some((owner_role.data().type_id, owned_role.data().type_id)))
    }

    /// Walks `vertex`'s castings for `from_role` back to their relations
    /// via `in_edges`, then forward along each SHORTCUT edge to find the
    /// player cast in `to_role` — an ordinary bidirectional graph walk
    /// over the casting protocol's own edges, not a bespoke index.
    fn players_via_casting(
        &mut self,
        vertex: VertexId,
        from_role: TypeId,
        to_role: TypeId,
    ) -> Result<Vec<Concept>, TransactionError> {
        let mut results = Vec::new();
        for (role_player_edge, casting) in self.store.in_edges(vertex, EdgeLabel::RolePlayer.as_str()) {
            if self.store.get_edge_property(role_player_edge, edge_property::ROLE_TYPE_ID) != Some(from_role.to_string()) {
                continue;
            }
            for (_, relation) in self.store.in_edges(casting, EdgeLabel::Casting.as_str()) {
                for (shortcut_edge, player) in self.store.out_edges(relation, EdgeLabel::Shortcut.as_str()) {
                    if player == vertex {
                        continue;
                    }
                    if self.store.get_edge_property(shortcut_edge, edge_property::ROLE_TYPE_ID) == Some(to_role.to_string())
                    {
                        if let Some(concept) = self.get_concept(player)? {
                            results.push(concept);
                        }
                    }
                }
            }
        }
        Ok(results)
    }

    // ---- lifecycle -----------------------------------------------------------------

    pub fn commit(mut self) -> Result<CommitOutcome, TransactionError> {
        self.ensure_open()?;
        self.closed = true;

        if self.kind.is_read_only() {
            self.store.rollback();
            return Ok(CommitOutcome { commit_log: None, instance_counts_delta: HashMap::new() });
        }

        let failures = Validator::validate(&self.log, &self.store);
        if !failures.is_empty() {
            self.store.rollback();
            return Err(TransactionError::Validation { source: error::Aggregate::new(failures) });
        }

        let commit_log = self.build_commit_log();
        self.store.commit().map_err(|source| TransactionError::SubstrateFailure { source })?;

        let ttl = Duration::from_millis(self.config.cache_timeout_ms(self.kind.cache_mode()));
        self.ontology_cache.promote(self.log.cached_types.drain(), ttl);

        trace!(keyspace = %self.keyspace, has_commit_log = commit_log.is_some(), "committed transaction");
        Ok(CommitOutcome { commit_log, instance_counts_delta: std::mem::take(&mut self.log.instance_counts_delta) })
    }

    pub fn abort(mut self) -> Result<(), TransactionError> {
        self.ensure_open()?;
        self.closed = true;
        self.store.rollback();
        Ok(())
    }

    pub fn close(self) -> Result<(), TransactionError> {
        if self.closed {
            return Ok(());
        }
        self.abort()
    }

    fn build_commit_log(&self) -> Option<CommitLogPayload> {
        if self.keyspace == resource::constants::SYSTEM_KEYSPACE {
            return None;
        }
        if self.log.modified_castings.is_empty()
            && self.log.modified_resources.is_empty()
            && self.log.modified_relations.is_empty()
            && self.log.instance_counts_delta.is_empty()
        {
            return None;
        }

        let castings = Self::group_by_index(&self.store, &self.log.modified_castings, property::INDEX);
        let resources = Self::group_by_index(&self.store, &self.log.modified_resources, property::INDEX);
        let relations = Self::group_by_index(&self.store, &self.log.modified_relations, property::INDEX);
        let instance_counts = self
            .log
            .instance_counts_delta
            .iter()
            .map(|(label, delta)| InstanceCountDelta { type_label: label.clone(), delta: *delta })
            .collect();

        Some(CommitLogPayload { instance_counts, castings, resources, relations })
    }

    fn group_by_index(store: &ElementStore, touched: &HashSet<VertexId>, index_property: &str) -> Vec<IndexGroup> {
        let pairs = touched.iter().filter_map(|&vertex| {
            let index_raw = store.get_property(vertex, index_property)?;
            let index: u64 = index_raw.parse().ok()?;
            Some((index, index_raw))
        });

        pairs
            .unique_by(|(index, _)| *index)
            .map(|(index, index_raw)| {
                let concept_ids =
                    store.vertices_by_property(index_property, &index_raw).map(|v| v.0).sorted().dedup().collect();
                IndexGroup { index, concept_ids }
            })
            .collect()
    }
}

const NEXT_TYPE_ID_PROPERTY: &str = "NEXT_TYPE_ID";

fn meta_label_for_kind(kind: BaseKind) -> Option<&'static str> {
    match kind {
        BaseKind::EntityType => Some(meta::ENTITY_TYPE),
        BaseKind::RelationType => Some(meta::RELATION_TYPE),
        BaseKind::ResourceType => Some(meta::RESOURCE_TYPE),
        BaseKind::RoleType => Some(meta::ROLE_TYPE),
        BaseKind::RuleType => Some(meta::RULE_TYPE),
        _ => None,
    }
}

pub(crate) fn wrap_store(source: storage::StoreError) -> TransactionError {
    match source {
        storage::StoreError::ReadOnly { .. } => TransactionError::ReadOnly {},
        other => TransactionError::SubstrateFailure { source: other },
    }
}
