/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The fixed enumeration of base kinds, edge labels, and meta-type
//! identities. Everything above `storage` speaks in terms of these closed
//! sets rather than raw strings.

/// The closed set of vertex kinds. `Casting` and `Shard` are internal —
/// [`crate::Concept`] never exposes them through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    EntityType,
    RelationType,
    ResourceType,
    RoleType,
    RuleType,
    Entity,
    Relation,
    Resource,
    Rule,
    Casting,
    Shard,
}

impl BaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseKind::EntityType => "ENTITY_TYPE",
            BaseKind::RelationType => "RELATION_TYPE",
            BaseKind::ResourceType => "RESOURCE_TYPE",
            BaseKind::RoleType => "ROLE_TYPE",
            BaseKind::RuleType => "RULE_TYPE",
            BaseKind::Entity => "ENTITY",
            BaseKind::Relation => "RELATION",
            BaseKind::Resource => "RESOURCE",
            BaseKind::Rule => "RULE",
            BaseKind::Casting => "CASTING",
            BaseKind::Shard => "SHARD",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        Some(match raw {
            "ENTITY_TYPE" => BaseKind::EntityType,
            "RELATION_TYPE" => BaseKind::RelationType,
            "RESOURCE_TYPE" => BaseKind::ResourceType,
            "ROLE_TYPE" => BaseKind::RoleType,
            "RULE_TYPE" => BaseKind::RuleType,
            "ENTITY" => BaseKind::Entity,
            "RELATION" => BaseKind::Relation,
            "RESOURCE" => BaseKind::Resource,
            "RULE" => BaseKind::Rule,
            "CASTING" => BaseKind::Casting,
            "SHARD" => BaseKind::Shard,
            _ => return None,
        })
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            BaseKind::EntityType
                | BaseKind::RelationType
                | BaseKind::ResourceType
                | BaseKind::RoleType
                | BaseKind::RuleType
        )
    }

    pub fn is_instance(self) -> bool {
        matches!(self, BaseKind::Entity | BaseKind::Relation | BaseKind::Resource | BaseKind::Rule)
    }
}

/// The closed set of edge labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    Sub,
    Shard,
    Casting,
    RolePlayer,
    Shortcut,
    Isa,
    Relates,
}

impl EdgeLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeLabel::Sub => "SUB",
            EdgeLabel::Shard => "SHARD",
            EdgeLabel::Casting => "CASTING",
            EdgeLabel::RolePlayer => "ROLE_PLAYER",
            EdgeLabel::Shortcut => "SHORTCUT",
            EdgeLabel::Isa => "ISA",
            EdgeLabel::Relates => "RELATES",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        Some(match raw {
            "SUB" => EdgeLabel::Sub,
            "SHARD" => EdgeLabel::Shard,
            "CASTING" => EdgeLabel::Casting,
            "ROLE_PLAYER" => EdgeLabel::RolePlayer,
            "SHORTCUT" => EdgeLabel::Shortcut,
            "ISA" => EdgeLabel::Isa,
            "RELATES" => EdgeLabel::Relates,
            _ => return None,
        })
    }
}

/// Meta-type labels that form the ontology root. `concept` itself is not
/// one of the seven meta-types: it is the internal bookkeeping vertex that
/// owns the monotonic type-id counter, never constructed as a
/// [`crate::Concept`].
pub mod meta {
    pub const ROOT_VERTEX_LABEL: &str = "concept";

    pub const ENTITY_TYPE: &str = "entity-type";
    pub const RELATION_TYPE: &str = "relation-type";
    pub const RESOURCE_TYPE: &str = "resource-type";
    pub const ROLE_TYPE: &str = "role-type";
    pub const RULE_TYPE: &str = "rule-type";
    pub const INFERENCE_RULE: &str = "inference-rule";
    pub const CONSTRAINT_RULE: &str = "constraint-rule";

    /// The seven bootstrap meta-types, in the order they are created so
    /// that type-ids are assigned deterministically and stay stable across
    /// a fresh keyspace.
    pub const ALL: [&str; 7] =
        [ENTITY_TYPE, RELATION_TYPE, RESOURCE_TYPE, ROLE_TYPE, RULE_TYPE, INFERENCE_RULE, CONSTRAINT_RULE];

    pub fn is_meta_label(label: &str) -> bool {
        label == ROOT_VERTEX_LABEL || ALL.contains(&label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_kind_round_trips_through_its_string_form() {
        for kind in [
            BaseKind::EntityType,
            BaseKind::RelationType,
            BaseKind::ResourceType,
            BaseKind::RoleType,
            BaseKind::RuleType,
            BaseKind::Entity,
            BaseKind::Relation,
            BaseKind::Resource,
            BaseKind::Rule,
            BaseKind::Casting,
            BaseKind::Shard,
        ] {
            assert_eq!(BaseKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_is_none() {
        assert_eq!(BaseKind::from_str("NOT_A_KIND"), None);
    }
}
