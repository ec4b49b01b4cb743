/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The tagged-variant `Concept` value: one enum in place of a class
//! hierarchy with virtual dispatch, one capability trait for the handful
//! of operations every variant supports.

use storage::VertexId;

use crate::{schema::BaseKind, value::Value, value::ValueType};

pub type TypeId = u64;

/// Fields shared by every type concept.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeData {
    pub vertex: VertexId,
    pub type_id: TypeId,
    pub label: String,
    pub is_abstract: bool,
    pub is_implicit: bool,
    pub instance_count: u64,
    pub current_shard: Option<VertexId>,
}

/// Fields shared by every instance concept.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceData {
    pub vertex: VertexId,
    pub type_id: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeConcept {
    EntityType(TypeData),
    RelationType(TypeData),
    ResourceType(TypeData, ValueType),
    RoleType(TypeData),
    RuleType(TypeData),
}

impl TypeConcept {
    pub fn data(&self) -> &TypeData {
        match self {
            TypeConcept::EntityType(d)
            | TypeConcept::RelationType(d)
            | TypeConcept::ResourceType(d, _)
            | TypeConcept::RoleType(d)
            | TypeConcept::RuleType(d) => d,
        }
    }

    pub fn data_mut(&mut self) -> &mut TypeData {
        match self {
            TypeConcept::EntityType(d)
            | TypeConcept::RelationType(d)
            | TypeConcept::ResourceType(d, _)
            | TypeConcept::RoleType(d)
            | TypeConcept::RuleType(d) => d,
        }
    }

    pub fn base_kind(&self) -> BaseKind {
        match self {
            TypeConcept::EntityType(_) => BaseKind::EntityType,
            TypeConcept::RelationType(_) => BaseKind::RelationType,
            TypeConcept::ResourceType(..) => BaseKind::ResourceType,
            TypeConcept::RoleType(_) => BaseKind::RoleType,
            TypeConcept::RuleType(_) => BaseKind::RuleType,
        }
    }

    pub fn datatype(&self) -> Option<ValueType> {
        match self {
            TypeConcept::ResourceType(_, datatype) => Some(*datatype),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceConcept {
    Entity(InstanceData),
    Relation(InstanceData),
    Resource(InstanceData, Value),
    Rule(InstanceData),
}

impl InstanceConcept {
    pub fn data(&self) -> &InstanceData {
        match self {
            InstanceConcept::Entity(d)
            | InstanceConcept::Relation(d)
            | InstanceConcept::Resource(d, _)
            | InstanceConcept::Rule(d) => d,
        }
    }

    pub fn base_kind(&self) -> BaseKind {
        match self {
            InstanceConcept::Entity(_) => BaseKind::Entity,
            InstanceConcept::Relation(_) => BaseKind::Relation,
            InstanceConcept::Resource(..) => BaseKind::Resource,
            InstanceConcept::Rule(_) => BaseKind::Rule,
        }
    }
}

/// Internal bridging concept: "instance I plays role R". Never constructed
/// or returned by a public `Transaction` method.
#[derive(Debug, Clone, PartialEq)]
pub struct CastingConcept {
    pub vertex: VertexId,
    pub index: u64,
}

/// Internal partition of a type's instances. Never exposed publicly.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardConcept {
    pub vertex: VertexId,
    pub of_type: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Concept {
    Type(TypeConcept),
    Instance(InstanceConcept),
    Casting(CastingConcept),
    Shard(ShardConcept),
}

/// Shared behaviour across every variant.
pub trait ConceptApi {
    fn vertex(&self) -> VertexId;
    fn base_kind(&self) -> BaseKind;
}

impl ConceptApi for Concept {
    fn vertex(&self) -> VertexId {
        match self {
            Concept::Type(t) => t.data().vertex,
            Concept::Instance(i) => i.data().vertex,
            Concept::Casting(c) => c.vertex,
            Concept::Shard(s) => s.vertex,
        }
    }

    fn base_kind(&self) -> BaseKind {
        match self {
            Concept::Type(t) => t.base_kind(),
            Concept::Instance(i) => i.base_kind(),
            Concept::Casting(_) => BaseKind::Casting,
            Concept::Shard(_) => BaseKind::Shard,
        }
    }
}

impl Concept {
    pub fn as_type(&self) -> Option<&TypeConcept> {
        match self {
            Concept::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_type(self) -> Option<TypeConcept> {
        match self {
            Concept::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceConcept> {
        match self {
            Concept::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<InstanceConcept> {
        match self {
            Concept::Instance(i) => Some(i),
            _ => None,
        }
    }
}
