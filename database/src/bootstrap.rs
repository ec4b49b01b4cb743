/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Creates the root bookkeeping vertex and the seven meta-type vertices
//! every keyspace starts with. Runs once per fresh keyspace; a re-opened
//! keyspace finds the root already in place and is a no-op.
//!
//! Meta-types never go through [`crate::transaction::Transaction::put_type`]
//! — that method treats any already-missing meta label as an attempt to
//! alter the ontology root (`MetaImmutable`), which is exactly right for
//! ordinary transactions and exactly wrong for bootstrap, so bootstrap
//! writes the vertices directly.

use std::time::Duration;

use concept::{meta, schema::EdgeLabel, BaseKind, OntologyCache, TypeConcept, TypeData, ValueType};
use resource::constants::property;
use storage::{ElementStore, VertexId};
use tracing::trace;

use crate::{error::TransactionError, transaction::wrap_store};

/// Root bookkeeping vertex's own kind string. Not in [`BaseKind`]'s closed
/// set — the root is never constructed as a [`concept::Concept`].
const ROOT_KIND: &str = "ROOT";
const NEXT_TYPE_ID_PROPERTY: &str = "NEXT_TYPE_ID";

/// Meta-type cache entries effectively never expire; picking an explicit
/// far-future TTL rather than re-deriving it keeps `put_type`'s ordinary
/// short-lived promotions and the bootstrap ones visibly distinct.
const META_CACHE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

pub(crate) fn ensure_bootstrapped(
    store: &mut ElementStore,
    ontology_cache: &OntologyCache,
) -> Result<VertexId, TransactionError> {
    if let Some(root) = store.vertices_by_property(property::TYPE_LABEL, meta::ROOT_VERTEX_LABEL).next() {
        return Ok(root);
    }

    let root = store.add_vertex(ROOT_KIND).map_err(wrap_store)?;
    store.set_property(root, property::TYPE_LABEL, meta::ROOT_VERTEX_LABEL).map_err(wrap_store)?;

    let mut next_id = 1u64;
    let mut created: Vec<(&'static str, VertexId, u64, BaseKind)> = Vec::new();
    for label in meta::ALL {
        let kind = meta_kind(label);
        let vertex = store.add_vertex(kind.as_str()).map_err(wrap_store)?;
        let type_id = next_id;
        next_id += 1;

        store.set_property(vertex, property::TYPE_ID, &type_id.to_string()).map_err(wrap_store)?;
        store.set_property(vertex, property::TYPE_LABEL, label).map_err(wrap_store)?;
        store
            .set_property(vertex, property::IS_ABSTRACT, if is_abstract_root(label) { "true" } else { "false" })
            .map_err(wrap_store)?;
        store.set_property(vertex, property::IS_IMPLICIT, "false").map_err(wrap_store)?;
        store.set_property(vertex, property::INSTANCE_COUNT, "0").map_err(wrap_store)?;
        if kind == BaseKind::ResourceType {
            store.set_property(vertex, property::DATA_TYPE, ValueType::String.as_str()).map_err(wrap_store)?;
        }
        created.push((label, vertex, type_id, kind));
    }
    store.set_property(root, NEXT_TYPE_ID_PROPERTY, &next_id.to_string()).map_err(wrap_store)?;

    let rule_type_vertex = find_created(&created, meta::RULE_TYPE);
    for label in [meta::INFERENCE_RULE, meta::CONSTRAINT_RULE] {
        let vertex = find_created(&created, label);
        store.add_edge(vertex, rule_type_vertex, EdgeLabel::Sub.as_str()).map_err(wrap_store)?;
    }

    let snapshot = created
        .into_iter()
        .map(|(label, vertex, type_id, kind)| {
            let data = TypeData {
                vertex,
                type_id,
                label: label.to_string(),
                is_abstract: is_abstract_root(label),
                is_implicit: false,
                instance_count: 0,
                current_shard: None,
            };
            let type_concept = match kind {
                BaseKind::EntityType => TypeConcept::EntityType(data),
                BaseKind::RelationType => TypeConcept::RelationType(data),
                BaseKind::ResourceType => TypeConcept::ResourceType(data, ValueType::String),
                BaseKind::RoleType => TypeConcept::RoleType(data),
                BaseKind::RuleType => TypeConcept::RuleType(data),
                _ => unreachable!("meta_kind only ever returns a type kind"),
            };
            (label.to_string(), type_concept)
        })
        .collect::<Vec<_>>();
    ontology_cache.promote(snapshot, META_CACHE_TTL);

    trace!("bootstrapped meta-type ontology");
    Ok(root)
}

fn find_created(created: &[(&'static str, VertexId, u64, BaseKind)], label: &str) -> VertexId {
    created.iter().find(|(l, ..)| *l == label).map(|(_, vertex, ..)| *vertex).expect("meta-type created earlier in this pass")
}

fn meta_kind(label: &str) -> BaseKind {
    match label {
        _ if label == meta::ENTITY_TYPE => BaseKind::EntityType,
        _ if label == meta::RELATION_TYPE => BaseKind::RelationType,
        _ if label == meta::RESOURCE_TYPE => BaseKind::ResourceType,
        _ if label == meta::ROLE_TYPE => BaseKind::RoleType,
        _ => BaseKind::RuleType,
    }
}

fn is_abstract_root(label: &str) -> bool {
    label != meta::INFERENCE_RULE && label != meta::CONSTRAINT_RULE
}

#[cfg(test)]
mod tests {
    use storage::InMemoryBacking;

    use super::*;

    #[test]
    fn bootstrap_creates_all_seven_meta_types_and_is_idempotent() {
        let backing = InMemoryBacking::new();
        let mut store = ElementStore::new(Box::new(backing.open()), false);
        let cache = OntologyCache::new(100);

        let root = ensure_bootstrapped(&mut store, &cache).unwrap();
        assert_eq!(store.get_property(root, property::TYPE_LABEL).as_deref(), Some(meta::ROOT_VERTEX_LABEL));
        for label in meta::ALL {
            assert!(cache.get(label).is_some(), "{label} should be cached after bootstrap");
        }

        let root_again = ensure_bootstrapped(&mut store, &cache).unwrap();
        assert_eq!(root, root_again);
    }

    #[test]
    fn inference_rule_is_concrete_and_subtypes_rule_type() {
        let backing = InMemoryBacking::new();
        let mut store = ElementStore::new(Box::new(backing.open()), false);
        let cache = OntologyCache::new(100);
        ensure_bootstrapped(&mut store, &cache).unwrap();

        let inference_rule = cache.get(meta::INFERENCE_RULE).unwrap();
        assert!(!inference_rule.data().is_abstract);
        let vertex = inference_rule.data().vertex;
        let rule_type_vertex = cache.get(meta::RULE_TYPE).unwrap().data().vertex;
        let subtypes: Vec<_> = store.out_edges(vertex, EdgeLabel::Sub.as_str());
        assert!(subtypes.iter().any(|&(_, v)| v == rule_type_vertex));
    }
}
