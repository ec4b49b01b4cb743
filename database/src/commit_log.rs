/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The document emitted on commit for the reconciler to consume, and the
//! outbound sink abstraction standing in for a concrete HTTP submission:
//! modelled as an outbound sink trait, with the in-memory engine using a
//! no-op sink.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceCountDelta {
    #[serde(rename = "type-label")]
    pub type_label: String,
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexGroup {
    pub index: u64,
    #[serde(rename = "concept-id")]
    pub concept_ids: Vec<u64>,
}

/// A JSON object with `instance-counts`, `castings`, `resources`, and
/// `relations` top-level keys. `relations` carries relation vertices
/// touched this transaction, grouped by their INDEX the same way castings
/// and resources are: two transactions racing to create the identical
/// relation tuple each commit their own vertex under the same fingerprint,
/// and only converge once the reconciler sees both in one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitLogPayload {
    #[serde(rename = "instance-counts")]
    pub instance_counts: Vec<InstanceCountDelta>,
    pub castings: Vec<IndexGroup>,
    pub resources: Vec<IndexGroup>,
    pub relations: Vec<IndexGroup>,
}

impl CommitLogPayload {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("CommitLogPayload fields are all serializable")
    }
}

/// Where a committed transaction's commit log is submitted, selected by
/// `engine.url`. The engine never interprets the destination itself.
pub trait CommitLogSink: Send + Sync {
    fn submit(&self, payload: CommitLogPayload);
}

/// Discards every payload. Selected when no in-process observation of
/// commit logs is needed.
pub struct NoOpSink;

impl CommitLogSink for NoOpSink {
    fn submit(&self, _payload: CommitLogPayload) {}
}

/// Buffers payloads in memory — for tests, and for embedding the engine
/// without the external HTTP ingestion pipeline this crate treats as an
/// out-of-scope collaborator.
#[derive(Default)]
pub struct InMemorySink {
    payloads: Mutex<Vec<CommitLogPayload>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<CommitLogPayload> {
        std::mem::take(&mut self.payloads.lock().expect("commit log sink lock poisoned"))
    }
}

impl CommitLogSink for InMemorySink {
    fn submit(&self, payload: CommitLogPayload) {
        self.payloads.lock().expect("commit log sink lock poisoned").push(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_the_documented_keys() {
        let payload = CommitLogPayload {
            instance_counts: vec![InstanceCountDelta { type_label: "person".to_string(), delta: 1 }],
            castings: vec![IndexGroup { index: 42, concept_ids: vec![1, 2] }],
            resources: vec![],
            relations: vec![],
        };
        let json = payload.to_json();
        assert!(json.contains("\"instance-counts\""));
        assert!(json.contains("\"castings\""));
        assert!(json.contains("\"resources\""));
        assert!(json.contains("\"relations\""));
    }

    #[test]
    fn in_memory_sink_buffers_and_drains() {
        let sink = InMemorySink::new();
        sink.submit(CommitLogPayload { instance_counts: vec![], castings: vec![], resources: vec![], relations: vec![] });
        assert_eq!(sink.drain().len(), 1);
        assert_eq!(sink.drain().len(), 0);
    }
}
