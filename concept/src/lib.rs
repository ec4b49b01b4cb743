/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod concept;
pub mod error;
pub mod factory;
pub mod ontology_cache;
pub mod schema;
pub mod value;

pub use concept::{
    CastingConcept, Concept, ConceptApi, InstanceConcept, InstanceData, ShardConcept, TypeConcept, TypeData, TypeId,
};
pub use error::ConceptError;
pub use factory::ConceptFactory;
pub use ontology_cache::OntologyCache;
pub use schema::{meta, BaseKind, EdgeLabel};
pub use value::{Value, ValueType};
