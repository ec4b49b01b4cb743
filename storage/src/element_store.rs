/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use tracing::trace;

use crate::{
    graph::PropertyGraph,
    types::{EdgeId, VertexId},
    StoreError,
};

/// Thin, substrate-agnostic facade over one transactional [`PropertyGraph`]
/// session. Adds the read-only rejection the substrate itself doesn't know
/// about.
pub struct ElementStore {
    session: Option<Box<dyn PropertyGraph>>,
    read_only: bool,
}

impl ElementStore {
    pub fn new(session: Box<dyn PropertyGraph>, read_only: bool) -> Self {
        ElementStore { session: Some(session), read_only }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn add_vertex(&mut self, kind: &str) -> Result<VertexId, StoreError> {
        self.guard_mutation()?;
        let id = self.session_mut().add_vertex(kind);
        trace!(kind, vertex = %id, "added vertex");
        Ok(id)
    }

    pub fn add_edge(&mut self, from: VertexId, to: VertexId, label: &str) -> Result<EdgeId, StoreError> {
        self.guard_mutation()?;
        let id = self.session_mut().add_edge(from, to, label);
        trace!(%from, %to, label, edge = %id, "added edge");
        Ok(id)
    }

    pub fn set_property(&mut self, vertex: VertexId, key: &str, value: &str) -> Result<(), StoreError> {
        self.guard_mutation()?;
        self.session_mut().set_property(vertex, key, value);
        Ok(())
    }

    pub fn set_edge_property(&mut self, edge: EdgeId, key: &str, value: &str) -> Result<(), StoreError> {
        self.guard_mutation()?;
        self.session_mut().set_edge_property(edge, key, value);
        Ok(())
    }

    pub fn delete_vertex(&mut self, vertex: VertexId) -> Result<(), StoreError> {
        self.guard_mutation()?;
        self.session_mut().delete_vertex(vertex);
        Ok(())
    }

    pub fn delete_edge(&mut self, edge: EdgeId) -> Result<(), StoreError> {
        self.guard_mutation()?;
        self.session_mut().delete_edge(edge);
        Ok(())
    }

    pub fn get_property(&self, vertex: VertexId, key: &str) -> Option<String> {
        self.session().get_property(vertex, key)
    }

    pub fn get_edge_property(&self, edge: EdgeId, key: &str) -> Option<String> {
        self.session().get_edge_property(edge, key)
    }

    /// Restartable only by calling again — each call re-traverses the
    /// substrate rather than returning a cached cursor.
    pub fn vertices_by_property(&self, key: &str, value: &str) -> impl Iterator<Item = VertexId> + '_ {
        self.session().vertices_by_property(key, value).into_iter()
    }

    pub fn vertex_by_raw_id(&self, id: VertexId) -> Option<String> {
        if self.session().vertex_exists(id) {
            self.session().vertex_kind(id)
        } else {
            None
        }
    }

    pub fn out_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)> {
        self.session().out_edges(vertex, label)
    }

    pub fn in_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)> {
        self.session().in_edges(vertex, label)
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        let session = self.session.take().expect("element store used after commit/rollback");
        session.commit()
    }

    pub fn rollback(mut self) {
        if let Some(session) = self.session.take() {
            session.rollback();
        }
    }

    fn guard_mutation(&self) -> Result<(), StoreError> {
        if self.read_only {
            Err(StoreError::ReadOnly {})
        } else {
            Ok(())
        }
    }

    fn session(&self) -> &dyn PropertyGraph {
        self.session.as_deref().expect("element store used after commit/rollback")
    }

    fn session_mut(&mut self) -> &mut dyn PropertyGraph {
        self.session.as_deref_mut().expect("element store used after commit/rollback")
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::InMemoryBacking;

    use super::*;

    #[test]
    fn read_only_rejects_mutation() {
        let backing = InMemoryBacking::new();
        let mut store = ElementStore::new(Box::new(backing.open()), true);
        let err = store.add_vertex("ENTITY").unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly { .. }));
    }

    #[test]
    fn write_session_round_trips_a_property() {
        let backing = InMemoryBacking::new();
        let mut store = ElementStore::new(Box::new(backing.open()), false);
        let v = store.add_vertex("ENTITY").unwrap();
        store.set_property(v, "TYPE_LABEL", "person").unwrap();
        assert_eq!(store.get_property(v, "TYPE_LABEL"), Some("person".to_string()));
        store.commit().unwrap();
    }
}
