/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reserved vertex/edge property names and the fixed defaults that are not
//! exposed as configuration keys.

/// Reserved vertex properties.
pub mod property {
    pub const ID: &str = "ID";
    pub const TYPE_LABEL: &str = "TYPE_LABEL";
    pub const TYPE_ID: &str = "TYPE_ID";
    pub const INSTANCE_COUNT: &str = "INSTANCE_COUNT";
    pub const IS_ABSTRACT: &str = "IS_ABSTRACT";
    pub const IS_SHARD: &str = "IS_SHARD";
    pub const IS_IMPLICIT: &str = "IS_IMPLICIT";
    pub const CURRENT_SHARD: &str = "CURRENT_SHARD";
    pub const INDEX: &str = "INDEX";
    pub const DATA_TYPE: &str = "DATA_TYPE";

    pub const VALUE_STRING: &str = "VALUE_STRING";
    pub const VALUE_LONG: &str = "VALUE_LONG";
    pub const VALUE_DOUBLE: &str = "VALUE_DOUBLE";
    pub const VALUE_BOOLEAN: &str = "VALUE_BOOLEAN";
    pub const VALUE_DATE: &str = "VALUE_DATE";
}

/// Reserved edge properties.
pub mod edge_property {
    pub const ROLE_TYPE_ID: &str = "ROLE_TYPE_ID";
    pub const RELATION_TYPE_ID: &str = "RELATION_TYPE_ID";
}

/// Default bound on the ontology cache's entry count; not a configuration
/// key, but overridable in tests via `Config::with_cache_capacity`.
pub const DEFAULT_ONTOLOGY_CACHE_CAPACITY: usize = 1000;

/// Number of bounded retries, with jitter, on substrate conflict during
/// type-id allocation.
pub const TYPE_ID_ALLOCATION_MAX_ATTEMPTS: u32 = 3;

/// Base backoff before the jittered retry on type-id allocation conflict.
pub const TYPE_ID_ALLOCATION_BACKOFF_BASE_MS: u64 = 2;

/// Sentinel `engine.url` value selecting the in-process, non-durable substrate.
pub const ENGINE_URL_IN_MEMORY: &str = "IN_MEMORY";

/// The keyspace reserved for bootstrap meta-types; never sharded, never
/// surfaced to post-processing.
pub const SYSTEM_KEYSPACE: &str = "system";
