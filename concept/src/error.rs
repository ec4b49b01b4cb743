/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use error::domain_error;

domain_error! {
    pub ConceptError(domain = "Concept", prefix = "CON") {
        CorruptGraph(1, "vertex '{vertex}' has an unknown or missing base kind.", vertex: String),
        MissingProperty(2, "vertex '{vertex}' is missing required property '{key}'.", vertex: String, key: String),
        MalformedProperty(3, "vertex '{vertex}' property '{key}' has malformed value '{value}'.", vertex: String, key: String, value: String),
        UnresolvedDirectType(4, "instance '{vertex}' has no reachable direct type via ISA/SHARD edges.", vertex: String),
        InvalidDatatype(5, "value of datatype '{datatype}' is not in the supported set.", datatype: String),
    }
}
