/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use error::{domain_error, Aggregate};

use crate::validator::ValidationFailure;

domain_error! {
    pub TransactionError(domain = "Transaction", prefix = "TXN") {
        GraphClosed(1, "operation attempted on a closed transaction."),
        AlreadyOpen(2, "a transaction is already open on this thread."),
        ReadOnly(3, "mutation attempted against a read-only transaction."),
        MetaImmutable(4, "meta-type '{label}' cannot be altered.", label: String),
        TypeConflict(5, "type '{label}' already exists with a different kind or datatype.", label: String),
        InvalidDatatype(6, "value of datatype '{datatype}' is not in the supported set.", datatype: String),
        ImmutableValue(7, "resource type '{label}' datatype cannot be changed once created.", label: String),
        DuplicateConcept(8, "more than one concept matched where uniqueness was required for '{key}'.", key: String),
        Validation(9, "transaction failed validation.", (source: Aggregate<ValidationFailure>)),
        SubstrateFailure(10, "substrate operation failed.", (source: storage::StoreError)),
        Concept(11, "concept construction failed.", (source: concept::ConceptError)),
    }
}
