/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

use error::domain_error;

use crate::constants::{DEFAULT_ONTOLOGY_CACHE_CAPACITY, ENGINE_URL_IN_MEMORY};

domain_error! {
    pub ConfigError(domain = "Config", prefix = "CFG") {
        MissingKey(1, "missing required configuration key '{key}'.", key: String),
        InvalidInteger(2, "configuration key '{key}' must be a positive integer, got '{value}'.", key: String, value: String),
        InvalidEngineUrl(3, "configuration key 'engine.url' must be '{expected}' or a URL, got '{value}'.", expected: String, value: String),
    }
}

/// Where commit-log payloads are submitted. `IN_MEMORY` selects the
/// in-process, non-durable substrate this workspace ships; any other value
/// is an opaque destination the engine does not interpret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineUrl {
    InMemory,
    Remote(String),
}

impl EngineUrl {
    /// `IN_MEMORY` selects the in-process substrate; anything else must look
    /// like a URL (carry a `scheme://`) since it is handed to an outbound
    /// sink as a submission destination.
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw == ENGINE_URL_IN_MEMORY {
            Ok(EngineUrl::InMemory)
        } else if raw.contains("://") {
            Ok(EngineUrl::Remote(raw.to_string()))
        } else {
            Err(ConfigError::InvalidEngineUrl { expected: ENGINE_URL_IN_MEMORY.to_string(), value: raw.to_string() })
        }
    }
}

/// Which write-expiry the ontology cache should use: one value for
/// interactive sessions, a longer one for batch loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Interactive,
    Batch,
}

/// The four recognized configuration keys, parsed from a caller-supplied
/// string map so this crate never depends on a particular
/// file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sharding_threshold: u64,
    pub ontology_cache_timeout_ms_normal: u64,
    pub ontology_cache_timeout_ms_batch: u64,
    pub engine_url: EngineUrl,
    pub ontology_cache_capacity: usize,
}

const KEY_SHARDING_THRESHOLD: &str = "sharding.threshold";
const KEY_CACHE_TIMEOUT_NORMAL: &str = "ontology.cache.timeout.ms.normal";
const KEY_CACHE_TIMEOUT_BATCH: &str = "ontology.cache.timeout.ms.batch";
const KEY_ENGINE_URL: &str = "engine.url";

impl Config {
    /// Parses the four mandatory keys out of a string map. Unknown keys are
    /// ignored. Fails on the first problem found, unlike the validator's
    /// aggregated style, since misconfiguration is an operator error
    /// surfaced once at startup, not a per-transaction invariant.
    pub fn from_map(raw: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let sharding_threshold = parse_u64(raw, KEY_SHARDING_THRESHOLD)?;
        let ontology_cache_timeout_ms_normal = parse_u64(raw, KEY_CACHE_TIMEOUT_NORMAL)?;
        let ontology_cache_timeout_ms_batch = parse_u64(raw, KEY_CACHE_TIMEOUT_BATCH)?;
        let engine_url_raw = raw
            .get(KEY_ENGINE_URL)
            .ok_or_else(|| ConfigError::MissingKey { key: KEY_ENGINE_URL.to_string() })?;
        Ok(Config {
            sharding_threshold,
            ontology_cache_timeout_ms_normal,
            ontology_cache_timeout_ms_batch,
            engine_url: EngineUrl::parse(engine_url_raw)?,
            ontology_cache_capacity: DEFAULT_ONTOLOGY_CACHE_CAPACITY,
        })
    }

    /// Preset tuned for a human-driven session: short cache write-expiry so
    /// schema edits are visible quickly, small sharding threshold for tests.
    pub fn interactive_defaults() -> Self {
        Config {
            sharding_threshold: 1000,
            ontology_cache_timeout_ms_normal: 5_000,
            ontology_cache_timeout_ms_batch: 60_000,
            engine_url: EngineUrl::InMemory,
            ontology_cache_capacity: DEFAULT_ONTOLOGY_CACHE_CAPACITY,
        }
    }

    /// Preset tuned for bulk/batch loading: longer cache write-expiry since
    /// the same types are reused across many transactions in a row.
    pub fn batch_defaults() -> Self {
        Config { ontology_cache_timeout_ms_normal: 5_000, ..Self::interactive_defaults() }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.ontology_cache_capacity = capacity;
        self
    }

    pub fn cache_timeout_ms(&self, mode: CacheMode) -> u64 {
        match mode {
            CacheMode::Interactive => self.ontology_cache_timeout_ms_normal,
            CacheMode::Batch => self.ontology_cache_timeout_ms_batch,
        }
    }
}

fn parse_u64(raw: &HashMap<String, String>, key: &str) -> Result<u64, ConfigError> {
    let value = raw.get(key).ok_or_else(|| ConfigError::MissingKey { key: key.to_string() })?;
    value.parse::<u64>().map_err(|_| ConfigError::InvalidInteger { key: key.to_string(), value: value.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_map() -> HashMap<String, String> {
        HashMap::from([
            (KEY_SHARDING_THRESHOLD.to_string(), "3".to_string()),
            (KEY_CACHE_TIMEOUT_NORMAL.to_string(), "5000".to_string()),
            (KEY_CACHE_TIMEOUT_BATCH.to_string(), "60000".to_string()),
            (KEY_ENGINE_URL.to_string(), "IN_MEMORY".to_string()),
        ])
    }

    #[test]
    fn parses_a_complete_map() {
        let config = Config::from_map(&valid_map()).unwrap();
        assert_eq!(config.sharding_threshold, 3);
        assert_eq!(config.engine_url, EngineUrl::InMemory);
    }

    #[test]
    fn missing_key_is_reported() {
        let mut map = valid_map();
        map.remove(KEY_ENGINE_URL);
        let err = Config::from_map(&map).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn non_integer_threshold_is_reported() {
        let mut map = valid_map();
        map.insert(KEY_SHARDING_THRESHOLD.to_string(), "not-a-number".to_string());
        let err = Config::from_map(&map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInteger { .. }));
    }

    #[test]
    fn remote_engine_url_is_preserved() {
        let mut map = valid_map();
        map.insert(KEY_ENGINE_URL.to_string(), "https://ingest.example/commit-log".to_string());
        let config = Config::from_map(&map).unwrap();
        assert_eq!(config.engine_url, EngineUrl::Remote("https://ingest.example/commit-log".to_string()));
    }

    #[test]
    fn engine_url_without_a_scheme_is_rejected() {
        let mut map = valid_map();
        map.insert(KEY_ENGINE_URL.to_string(), "ingest.example".to_string());
        let err = Config::from_map(&map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEngineUrl { .. }));
    }

    #[test]
    fn cache_timeout_selects_by_mode() {
        let config = Config::interactive_defaults();
        assert_eq!(config.cache_timeout_ms(CacheMode::Batch), 60_000);
    }
}
