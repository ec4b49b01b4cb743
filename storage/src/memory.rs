/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The one substrate implementation this workspace is allowed to assume:
//! an in-process, non-durable property graph. A transaction clones the
//! currently-committed graph on open and mutates its own copy; `commit`
//! replaces the shared state wholesale (last-writer-wins), `rollback` — or
//! simply dropping the session without committing — discards the copy.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use resource::constants::property::ID;

use crate::{
    graph::PropertyGraph,
    types::{EdgeId, VertexId},
    StoreError,
};

#[derive(Debug, Clone, Default)]
struct VertexRecord {
    kind: String,
    properties: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    from: VertexId,
    to: VertexId,
    label: String,
    properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct GraphData {
    next_vertex_id: u64,
    next_edge_id: u64,
    vertices: HashMap<VertexId, VertexRecord>,
    edges: HashMap<EdgeId, EdgeRecord>,
}

/// Owns the shared, committed state. Each call to [`open`](Self::open)
/// hands out an independent transactional session.
#[derive(Clone)]
pub struct InMemoryBacking {
    shared: Arc<Mutex<GraphData>>,
}

impl InMemoryBacking {
    pub fn new() -> Self {
        InMemoryBacking { shared: Arc::new(Mutex::new(GraphData::default())) }
    }

    pub fn open(&self) -> InMemoryPropertyGraph {
        let local = self.shared.lock().expect("in-memory backing lock poisoned").clone();
        InMemoryPropertyGraph { shared: self.shared.clone(), local }
    }
}

impl Default for InMemoryBacking {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryPropertyGraph {
    shared: Arc<Mutex<GraphData>>,
    local: GraphData,
}

impl PropertyGraph for InMemoryPropertyGraph {
    fn add_vertex(&mut self, kind: &str) -> VertexId {
        let id = VertexId(self.local.next_vertex_id);
        self.local.next_vertex_id += 1;
        let mut record = VertexRecord { kind: kind.to_string(), properties: HashMap::new() };
        record.properties.insert(ID.to_string(), id.to_string());
        self.local.vertices.insert(id, record);
        id
    }

    fn add_edge(&mut self, from: VertexId, to: VertexId, label: &str) -> EdgeId {
        let id = EdgeId(self.local.next_edge_id);
        self.local.next_edge_id += 1;
        self.local.edges.insert(id, EdgeRecord { from, to, label: label.to_string(), properties: HashMap::new() });
        id
    }

    fn set_property(&mut self, vertex: VertexId, key: &str, value: &str) {
        if let Some(record) = self.local.vertices.get_mut(&vertex) {
            record.properties.insert(key.to_string(), value.to_string());
        }
    }

    fn get_property(&self, vertex: VertexId, key: &str) -> Option<String> {
        self.local.vertices.get(&vertex).and_then(|record| record.properties.get(key).cloned())
    }

    fn set_edge_property(&mut self, edge: EdgeId, key: &str, value: &str) {
        if let Some(record) = self.local.edges.get_mut(&edge) {
            record.properties.insert(key.to_string(), value.to_string());
        }
    }

    fn get_edge_property(&self, edge: EdgeId, key: &str) -> Option<String> {
        self.local.edges.get(&edge).and_then(|record| record.properties.get(key).cloned())
    }

    fn vertices_by_property(&self, key: &str, value: &str) -> Vec<VertexId> {
        self.local
            .vertices
            .iter()
            .filter(|(_, record)| record.properties.get(key).map(String::as_str) == Some(value))
            .map(|(id, _)| *id)
            .collect()
    }

    fn vertex_exists(&self, vertex: VertexId) -> bool {
        self.local.vertices.contains_key(&vertex)
    }

    fn vertex_kind(&self, vertex: VertexId) -> Option<String> {
        self.local.vertices.get(&vertex).map(|record| record.kind.clone())
    }

    fn out_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)> {
        self.local
            .edges
            .iter()
            .filter(|(_, record)| record.from == vertex && record.label == label)
            .map(|(id, record)| (*id, record.to))
            .collect()
    }

    fn in_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)> {
        self.local
            .edges
            .iter()
            .filter(|(_, record)| record.to == vertex && record.label == label)
            .map(|(id, record)| (*id, record.from))
            .collect()
    }

    fn delete_vertex(&mut self, vertex: VertexId) {
        self.local.vertices.remove(&vertex);
        self.local.edges.retain(|_, record| record.from != vertex && record.to != vertex);
    }

    fn delete_edge(&mut self, edge: EdgeId) {
        self.local.edges.remove(&edge);
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().map_err(|_| StoreError::SubstrateUnavailable {})?;
        *shared = self.local;
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        // Dropping `self.local` without writing it back to `shared` is the
        // entire rollback; there is nothing else holding a reference to it.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_is_visible_to_later_sessions() {
        let backing = InMemoryBacking::new();
        let mut session = backing.open();
        let v = session.add_vertex("ENTITY");
        session.set_property(v, "TYPE_LABEL", "person");
        Box::new(session).commit().unwrap();

        let session2 = backing.open();
        assert!(session2.vertex_exists(v));
        assert_eq!(session2.get_property(v, "TYPE_LABEL"), Some("person".to_string()));
    }

    #[test]
    fn rollback_is_invisible_to_later_sessions() {
        let backing = InMemoryBacking::new();
        let mut session = backing.open();
        let v = session.add_vertex("ENTITY");
        Box::new(session).rollback();

        let session2 = backing.open();
        assert!(!session2.vertex_exists(v));
    }

    #[test]
    fn dropping_without_commit_also_rolls_back() {
        let backing = InMemoryBacking::new();
        let mut session = backing.open();
        let v = session.add_vertex("ENTITY");
        drop(session);

        let session2 = backing.open();
        assert!(!session2.vertex_exists(v));
    }
}
