//! Bulk creation with per-item failure isolation
//!
//! Bulk imports are the primary workload here, and one malformed record must
//! not discard the rest of the batch. Items run sequentially in input order;
//! each failure becomes a structured record instead of aborting the run,
//! unless the caller asked to stop at the first error.

use docbridge_domain::{BatchFailure, BatchOutcome, Document, Result};
use futures::future::BoxFuture;
use tracing::warn;

/// Create `documents` one at a time through `create_one`, collecting
/// per-item results.
///
/// Successes land in `created`, failures in `failed` (both in input order,
/// `failed` entries carrying the original index and input). With
/// `stop_on_error` the run stops at the first failure and the remaining
/// documents are neither attempted nor recorded.
pub async fn run<'a, F>(
    documents: Vec<Document>,
    stop_on_error: bool,
    mut create_one: F,
) -> BatchOutcome
where
    F: FnMut(Document) -> BoxFuture<'a, Result<Document>>,
{
    let mut outcome = BatchOutcome::default();

    for (index, input) in documents.into_iter().enumerate() {
        match create_one(input.clone()).await {
            Ok(created) => outcome.created.push(created),
            Err(error) => {
                warn!(index, error = %error, "batch item failed");
                outcome.failed.push(BatchFailure {
                    index,
                    input,
                    error: error.to_string(),
                });
                if stop_on_error {
                    break;
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use docbridge_domain::DocBridgeError;
    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    fn doc(label: &str) -> Document {
        let mut d = Document::new();
        d.insert("label".into(), json!(label));
        d
    }

    /// Creator that fails for inputs whose label is listed.
    fn failing_creator(
        bad_labels: Vec<&'static str>,
    ) -> impl FnMut(Document) -> BoxFuture<'static, Result<Document>> {
        move |input: Document| {
            let bad = bad_labels.clone();
            async move {
                let label = input["label"].as_str().unwrap_or_default().to_string();
                if bad.contains(&label.as_str()) {
                    Err(DocBridgeError::Validation(format!("bad document {label}")))
                } else {
                    let mut created = input.clone();
                    created.insert("name".into(), json!(format!("DOC-{label}")));
                    Ok(created)
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn continues_past_failures_by_default() {
        let inputs = vec![doc("a"), doc("b"), doc("c"), doc("d"), doc("e")];

        let outcome = run(inputs, false, failing_creator(vec!["c"])).await;

        assert_eq!(outcome.count(), 4);
        assert_eq!(outcome.errors(), 1);
        assert_eq!(outcome.failed[0].index, 2);
        assert_eq!(outcome.failed[0].input["label"], json!("c"));
        assert!(outcome.failed[0].error.contains("bad document c"));
    }

    #[tokio::test]
    async fn stop_on_error_leaves_remainder_unattempted() {
        let inputs = vec![doc("a"), doc("b"), doc("c"), doc("d"), doc("e")];

        let outcome = run(inputs, true, failing_creator(vec!["c"])).await;

        // Indices 0 and 1 created, index 2 failed, 3 and 4 never attempted
        // and not recorded either way.
        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.errors(), 1);
        assert_eq!(outcome.failed[0].index, 2);
    }

    #[tokio::test]
    async fn all_successes_yield_empty_failed_list() {
        let inputs = vec![doc("a"), doc("b")];

        let outcome = run(inputs, false, failing_creator(vec![])).await;

        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.errors(), 0);
        assert!(outcome.is_complete_success());
        assert_eq!(outcome.created[0]["name"], json!("DOC-a"));
        assert_eq!(outcome.created[1]["name"], json!("DOC-b"));
    }

    #[tokio::test]
    async fn multiple_failures_preserve_input_order() {
        let inputs = vec![doc("a"), doc("b"), doc("c"), doc("d")];

        let outcome = run(inputs, false, failing_creator(vec!["b", "d"])).await;

        assert_eq!(outcome.count(), 2);
        assert_eq!(outcome.errors(), 2);
        let indices: Vec<usize> = outcome.failed.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[tokio::test]
    async fn empty_input_is_a_successful_noop() {
        let outcome = run(Vec::new(), false, failing_creator(vec![])).await;

        assert_eq!(outcome.count(), 0);
        assert_eq!(outcome.errors(), 0);
        assert!(outcome.is_complete_success());
    }
}
