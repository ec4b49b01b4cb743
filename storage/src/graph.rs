/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::types::{EdgeId, VertexId};

/// The substrate contract this engine consumes: a generic property graph
/// with string-valued properties, iteration by property value, and
/// per-session commit/rollback. Kinds and labels are passed as plain
/// strings — the closed vocabulary of base kinds and edge labels belongs to
/// the `concept` crate, not to the substrate.
///
/// One value implements this trait per open transaction; it is the
/// substrate's own transactional session, not a shared handle.
pub trait PropertyGraph {
    fn add_vertex(&mut self, kind: &str) -> VertexId;

    fn add_edge(&mut self, from: VertexId, to: VertexId, label: &str) -> EdgeId;

    fn set_property(&mut self, vertex: VertexId, key: &str, value: &str);

    fn get_property(&self, vertex: VertexId, key: &str) -> Option<String>;

    fn set_edge_property(&mut self, edge: EdgeId, key: &str, value: &str);

    fn get_edge_property(&self, edge: EdgeId, key: &str) -> Option<String>;

    /// Last-writer-wins: if more than one vertex carries `value` for `key`,
    /// all are returned; the substrate makes no uniqueness guarantee on its
    /// own, uniqueness is an invariant the engine enforces above this layer.
    fn vertices_by_property(&self, key: &str, value: &str) -> Vec<VertexId>;

    fn vertex_exists(&self, vertex: VertexId) -> bool;

    fn vertex_kind(&self, vertex: VertexId) -> Option<String>;

    /// Outgoing edges from `vertex` carrying `label`, as (edge, destination)
    /// pairs.
    fn out_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)>;

    /// Incoming edges into `vertex` carrying `label`, as (edge, source)
    /// pairs. Ordinary reverse graph traversal, not a secondary index.
    fn in_edges(&self, vertex: VertexId, label: &str) -> Vec<(EdgeId, VertexId)>;

    fn delete_vertex(&mut self, vertex: VertexId);

    fn delete_edge(&mut self, edge: EdgeId);

    /// Applies every staged mutation atomically. A session that is dropped
    /// without calling `commit` rolls back.
    fn commit(self: Box<Self>) -> Result<(), crate::StoreError>;

    fn rollback(self: Box<Self>);
}
