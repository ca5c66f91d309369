//! Core data types for documents, batches and cache diagnostics

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record from the backend: an ordered field-name → value mapping.
///
/// `serde_json`'s default map is BTree-backed, so field order is canonical
/// (sorted) no matter how the caller assembled the input. The access layer
/// never mutates a document after returning it.
pub type Document = serde_json::Map<String, Value>;

/// A single failed item inside a batch creation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position of the item in the caller's input list.
    pub index: usize,
    /// The input document that failed, returned for reconciliation.
    pub input: Document,
    /// Human-readable failure description.
    pub error: String,
}

/// Outcome of a batch creation: per-item success and failure records.
///
/// When the run was not stopped early, `count() + errors()` equals the
/// number of input documents. `failed` preserves the original input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Documents the backend created, in input order.
    pub created: Vec<Document>,
    /// Per-item failure records, in input order.
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Number of documents created.
    pub fn count(&self) -> usize {
        self.created.len()
    }

    /// Number of failed items.
    pub fn errors(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Schema metadata for a collection type, projected from the backend's
/// metadata collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    /// Field definitions as returned by the backend.
    pub fields: Vec<Value>,
    /// Permission rules as returned by the backend.
    pub permissions: Vec<Value>,
    pub is_submittable: bool,
    pub track_changes: bool,
}

/// Diagnostic snapshot of the cache store.
///
/// `active` counts entries whose expiry is still in the future at call
/// time; `expired` entries linger until read or overwritten (expiry is
/// lazy) and only consume memory, never serve data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_outcome_counts_track_lists() {
        let mut outcome = BatchOutcome::default();
        assert!(outcome.is_complete_success());

        outcome.created.push(Document::new());
        outcome.created.push(Document::new());
        outcome.failed.push(BatchFailure {
            index: 2,
            input: Document::new(),
            error: "boom".into(),
        });

        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.errors(), 1);
        assert!(!outcome.is_complete_success());
    }

    #[test]
    fn document_field_order_is_canonical() {
        let a: Document =
            serde_json::from_str(r#"{"b": 1, "a": 2}"#).expect("valid json object");
        let b: Document =
            serde_json::from_str(r#"{"a": 2, "b": 1}"#).expect("valid json object");
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
