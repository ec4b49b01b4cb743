/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Walks the modified set recorded in the transaction log and checks the
//! graph's structural invariants plus its domain rules. Never short-circuits
//! on the first failure — every violation found is returned.

use std::fmt;

use concept::schema::EdgeLabel;
use storage::ElementStore;

use crate::log::TransactionLog;

#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub invariant: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

pub struct Validator;

impl Validator {
    /// Checks every relation touched this transaction has at least one
    /// role-player, every role played is declared on the relation type's
    /// role list, and every SHORTCUT edge is mirrored by a casting on the
    /// same relation and role (invariant 10). Resource datatype conformance
    /// and meta-immutability are enforced eagerly at the point of mutation
    /// (`put_type`, `add_resource`) rather than re-walked here, since they
    /// can only be violated through operations this crate already guards.
    pub fn validate(log: &TransactionLog, store: &ElementStore) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for &relation in &log.modified_relations {
            Self::check_relation_has_role_players(store, relation, &mut failures);
            Self::check_roles_are_declared(store, relation, &mut failures);
            Self::check_shortcuts_are_mirrored_by_castings(store, relation, &mut failures);
        }

        failures
    }

    fn check_relation_has_role_players(store: &ElementStore, relation: storage::VertexId, failures: &mut Vec<ValidationFailure>) {
        if store.out_edges(relation, EdgeLabel::Casting.as_str()).is_empty() {
            failures.push(ValidationFailure {
                invariant: "domain:relation-has-role-player",
                message: format!("relation '{relation}' has no role-players."),
            });
        }
    }

    /// Every role-id named on one of `relation`'s CASTING edges must be
    /// declared on the relation type via a RELATES edge (its relation
    /// type's role list).
    fn check_roles_are_declared(store: &ElementStore, relation: storage::VertexId, failures: &mut Vec<ValidationFailure>) {
        let declared = Self::declared_role_ids(store, relation);

        let played: std::collections::HashSet<String> = store
            .out_edges(relation, EdgeLabel::Casting.as_str())
            .into_iter()
            .filter_map(|(edge, _)| store.get_edge_property(edge, resource::constants::edge_property::ROLE_TYPE_ID))
            .collect();

        for role_id in played {
            if !declared.contains(&role_id) {
                failures.push(ValidationFailure {
                    invariant: "domain:role-must-be-declared",
                    message: format!("relation '{relation}' casts a player in role {role_id}, which its relation type does not declare via `relates`."),
                });
            }
        }
    }

    /// Resolves `relation`'s direct type by following ISA to its shard and
    /// SHARD to the type vertex, then collects the role type-ids it
    /// declares via RELATES. An unresolvable type (shouldn't happen for a
    /// well-formed relation vertex) is treated as declaring no roles.
    fn declared_role_ids(store: &ElementStore, relation: storage::VertexId) -> std::collections::HashSet<String> {
        let Some((_, shard)) = store.out_edges(relation, EdgeLabel::Isa.as_str()).into_iter().next() else {
            return std::collections::HashSet::new();
        };
        let Some((_, relation_type)) = store.out_edges(shard, EdgeLabel::Shard.as_str()).into_iter().next() else {
            return std::collections::HashSet::new();
        };
        store
            .out_edges(relation_type, EdgeLabel::Relates.as_str())
            .into_iter()
            .filter_map(|(_, role_vertex)| store.get_property(role_vertex, resource::constants::property::TYPE_ID))
            .collect()
    }

    fn check_shortcuts_are_mirrored_by_castings(
        store: &ElementStore,
        relation: storage::VertexId,
        failures: &mut Vec<ValidationFailure>,
    ) {
        let castings: Vec<_> = store
            .out_edges(relation, EdgeLabel::Casting.as_str())
            .into_iter()
            .filter_map(|(edge, casting_vertex)| {
                store.get_edge_property(edge, resource::constants::edge_property::ROLE_TYPE_ID).map(|role| (casting_vertex, role))
            })
            .collect();

        for (edge, player) in store.out_edges(relation, EdgeLabel::Shortcut.as_str()) {
            let Some(role_id) = store.get_edge_property(edge, resource::constants::edge_property::ROLE_TYPE_ID) else {
                failures.push(ValidationFailure {
                    invariant: "invariant-10:shortcut-mirrored-by-casting",
                    message: format!("relation '{relation}' has a SHORTCUT edge to '{player}' with no role annotation."),
                });
                continue;
            };

            let mirrored = castings.iter().any(|(casting_vertex, casting_role)| {
                casting_role == &role_id
                    && store
                        .out_edges(*casting_vertex, EdgeLabel::RolePlayer.as_str())
                        .iter()
                        .any(|(_, casting_player)| *casting_player == player)
            });

            if !mirrored {
                failures.push(ValidationFailure {
                    invariant: "invariant-10:shortcut-mirrored-by-casting",
                    message: format!(
                        "relation '{relation}' has a SHORTCUT edge to '{player}' (role {role_id}) with no mirroring casting."
                    ),
                });
            }
        }
    }
}
