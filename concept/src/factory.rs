/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Builds a typed [`Concept`] from a raw vertex by reading its base kind
//! and the properties that kind implies. Total over the closed set of
//! kinds from [`crate::schema::BaseKind`].

use resource::constants::property;
use storage::{ElementStore, VertexId};

use crate::{
    concept::{CastingConcept, Concept, InstanceConcept, InstanceData, ShardConcept, TypeConcept, TypeData},
    error::ConceptError,
    schema::{BaseKind, EdgeLabel},
    value::{Value, ValueType},
};

pub struct ConceptFactory;

impl ConceptFactory {
    /// Reads `vertex`'s base kind and assembles the matching `Concept`
    /// variant. Fails with `CorruptGraph` if the kind is missing or falls
    /// outside the closed set.
    pub fn from_vertex(store: &ElementStore, vertex: VertexId) -> Result<Concept, ConceptError> {
        let kind_str = store.vertex_by_raw_id(vertex).ok_or_else(|| ConceptError::CorruptGraph {
            vertex: vertex.to_string(),
        })?;
        let kind = BaseKind::from_str(&kind_str)
            .ok_or_else(|| ConceptError::CorruptGraph { vertex: vertex.to_string() })?;

        match kind {
            BaseKind::EntityType => Ok(Concept::Type(TypeConcept::EntityType(Self::read_type_data(store, vertex)?))),
            BaseKind::RelationType => {
                Ok(Concept::Type(TypeConcept::RelationType(Self::read_type_data(store, vertex)?)))
            }
            BaseKind::ResourceType => {
                let data = Self::read_type_data(store, vertex)?;
                let datatype_raw = Self::require_property(store, vertex, property::DATA_TYPE)?;
                let datatype = ValueType::from_str(&datatype_raw)
                    .ok_or_else(|| ConceptError::InvalidDatatype { datatype: datatype_raw })?;
                Ok(Concept::Type(TypeConcept::ResourceType(data, datatype)))
            }
            BaseKind::RoleType => Ok(Concept::Type(TypeConcept::RoleType(Self::read_type_data(store, vertex)?))),
            BaseKind::RuleType => Ok(Concept::Type(TypeConcept::RuleType(Self::read_type_data(store, vertex)?))),
            BaseKind::Entity => {
                Ok(Concept::Instance(InstanceConcept::Entity(Self::read_instance_data(store, vertex)?)))
            }
            BaseKind::Relation => {
                Ok(Concept::Instance(InstanceConcept::Relation(Self::read_instance_data(store, vertex)?)))
            }
            BaseKind::Rule => Ok(Concept::Instance(InstanceConcept::Rule(Self::read_instance_data(store, vertex)?))),
            BaseKind::Resource => {
                let instance = Self::read_instance_data(store, vertex)?;
                let resource_type_vertex = Self::direct_type_vertex(store, vertex)?;
                let datatype_raw = Self::require_property(store, resource_type_vertex, property::DATA_TYPE)?;
                let datatype = ValueType::from_str(&datatype_raw)
                    .ok_or_else(|| ConceptError::InvalidDatatype { datatype: datatype_raw })?;
                let raw_value = Self::require_property(store, vertex, datatype.value_property())?;
                let value = Value::decode(datatype, &raw_value, vertex.to_string())?;
                Ok(Concept::Instance(InstanceConcept::Resource(instance, value)))
            }
            BaseKind::Casting => {
                let index_raw = Self::require_property(store, vertex, property::INDEX)?;
                let index = Self::parse_u64(vertex, property::INDEX, &index_raw)?;
                Ok(Concept::Casting(CastingConcept { vertex, index }))
            }
            BaseKind::Shard => {
                let type_vertex = Self::direct_type_vertex_of_shard(store, vertex)?;
                let type_id_raw = Self::require_property(store, type_vertex, property::TYPE_ID)?;
                let of_type = Self::parse_u64(type_vertex, property::TYPE_ID, &type_id_raw)?;
                Ok(Concept::Shard(ShardConcept { vertex, of_type }))
            }
        }
    }

    fn read_type_data(store: &ElementStore, vertex: VertexId) -> Result<TypeData, ConceptError> {
        let type_id_raw = Self::require_property(store, vertex, property::TYPE_ID)?;
        let label = Self::require_property(store, vertex, property::TYPE_LABEL)?;
        let is_abstract = Self::parse_bool(store, vertex, property::IS_ABSTRACT)?;
        let is_implicit = Self::parse_bool(store, vertex, property::IS_IMPLICIT)?;
        let instance_count_raw = Self::require_property(store, vertex, property::INSTANCE_COUNT)?;
        let current_shard = store
            .get_property(vertex, property::CURRENT_SHARD)
            .map(|raw| Self::parse_vertex_id(vertex, property::CURRENT_SHARD, &raw))
            .transpose()?;

        Ok(TypeData {
            vertex,
            type_id: Self::parse_u64(vertex, property::TYPE_ID, &type_id_raw)?,
            label,
            is_abstract,
            is_implicit,
            instance_count: Self::parse_u64(vertex, property::INSTANCE_COUNT, &instance_count_raw)?,
            current_shard,
        })
    }

    fn read_instance_data(store: &ElementStore, vertex: VertexId) -> Result<InstanceData, ConceptError> {
        let type_vertex = Self::direct_type_vertex(store, vertex)?;
        let type_id_raw = Self::require_property(store, type_vertex, property::TYPE_ID)?;
        Ok(InstanceData { vertex, type_id: Self::parse_u64(type_vertex, property::TYPE_ID, &type_id_raw)? })
    }

    /// Invariant 1: every instance reaches exactly one direct type by
    /// following ISA to its shard, then SHARD to the type.
    fn direct_type_vertex(store: &ElementStore, vertex: VertexId) -> Result<VertexId, ConceptError> {
        let (_, shard_vertex) = store
            .out_edges(vertex, EdgeLabel::Isa.as_str())
            .into_iter()
            .next()
            .ok_or_else(|| ConceptError::UnresolvedDirectType { vertex: vertex.to_string() })?;
        Self::direct_type_vertex_of_shard(store, shard_vertex)
    }

    fn direct_type_vertex_of_shard(store: &ElementStore, shard_vertex: VertexId) -> Result<VertexId, ConceptError> {
        store
            .out_edges(shard_vertex, EdgeLabel::Shard.as_str())
            .into_iter()
            .next()
            .map(|(_, type_vertex)| type_vertex)
            .ok_or_else(|| ConceptError::UnresolvedDirectType { vertex: shard_vertex.to_string() })
    }

    fn require_property(store: &ElementStore, vertex: VertexId, key: &str) -> Result<String, ConceptError> {
        store
            .get_property(vertex, key)
            .ok_or_else(|| ConceptError::MissingProperty { vertex: vertex.to_string(), key: key.to_string() })
    }

    fn parse_bool(store: &ElementStore, vertex: VertexId, key: &str) -> Result<bool, ConceptError> {
        let raw = Self::require_property(store, vertex, key)?;
        raw.parse().map_err(|_| ConceptError::MalformedProperty {
            vertex: vertex.to_string(),
            key: key.to_string(),
            value: raw,
        })
    }

    fn parse_u64(vertex: VertexId, key: &str, raw: &str) -> Result<u64, ConceptError> {
        raw.parse().map_err(|_| ConceptError::MalformedProperty {
            vertex: vertex.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    fn parse_vertex_id(vertex: VertexId, key: &str, raw: &str) -> Result<VertexId, ConceptError> {
        raw.parse().map_err(|_| ConceptError::MalformedProperty {
            vertex: vertex.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use storage::{InMemoryBacking, PropertyGraph};

    use super::*;
    use crate::concept::ConceptApi;

    #[test]
    fn unknown_kind_is_corrupt_graph() {
        let backing = InMemoryBacking::new();
        let mut session = backing.open();
        let v = session.add_vertex("NOT_A_REAL_KIND");
        let store = ElementStore::new(Box::new(session), false);
        let err = ConceptFactory::from_vertex(&store, v).unwrap_err();
        assert!(matches!(err, ConceptError::CorruptGraph { .. }));
    }

    #[test]
    fn entity_type_decodes_its_fields() {
        let backing = InMemoryBacking::new();
        let mut session = backing.open();
        let v = session.add_vertex(BaseKind::EntityType.as_str());
        session.set_property(v, property::TYPE_ID, "7");
        session.set_property(v, property::TYPE_LABEL, "person");
        session.set_property(v, property::IS_ABSTRACT, "false");
        session.set_property(v, property::IS_IMPLICIT, "false");
        session.set_property(v, property::INSTANCE_COUNT, "0");
        let store = ElementStore::new(Box::new(session), false);

        let concept = ConceptFactory::from_vertex(&store, v).unwrap();
        assert_eq!(concept.base_kind(), BaseKind::EntityType);
        let type_concept = concept.as_type().unwrap();
        assert_eq!(type_concept.data().label, "person");
        assert_eq!(type_concept.data().type_id, 7);
    }
}
