//! Offset/limit pagination driver
//!
//! Hides multi-page result sets behind one call: pages are fetched in order
//! and concatenated until a short page signals exhaustion. The backend gives
//! no "has more" flag, so a page shorter than the requested size is the sole
//! termination signal.
//!
//! The driver assumes the backend's ordering is stable across repeated paged
//! calls with the same filter/order arguments; that is a backend obligation
//! the driver cannot verify. There is no cancellation mechanism: a run
//! completes or fails on a per-page error.

use docbridge_domain::{Document, Result};
use futures::future::BoxFuture;
use tracing::debug;

/// Fetch every page of a result set.
///
/// `fetch_page(offset, limit)` returns one page, typically a closure over a
/// cached-and-retried single-page read keyed per offset. A page shorter than
/// `page_size` (including an empty first page) terminates the loop; a full
/// page advances the offset by `page_size`. Errors from any page abort the
/// run and propagate unchanged.
pub async fn fetch_all<'a, F>(mut fetch_page: F, page_size: u64) -> Result<Vec<Document>>
where
    F: FnMut(u64, u64) -> BoxFuture<'a, Result<Vec<Document>>>,
{
    let mut all = Vec::new();
    let mut offset = 0u64;

    loop {
        let page = fetch_page(offset, page_size).await?;
        let fetched = page.len() as u64;
        debug!(offset, fetched, "fetched result page");
        all.extend(page);

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use docbridge_domain::DocBridgeError;
    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    fn doc(n: u64) -> Document {
        let mut d = Document::new();
        d.insert("n".into(), json!(n));
        d
    }

    /// Backend yielding pages of the given sizes, counting calls.
    fn scripted_pages(sizes: Vec<usize>) -> (impl FnMut(u64, u64) -> BoxFuture<'static, Result<Vec<Document>>>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let fetcher = move |offset: u64, _limit: u64| {
            let call = calls_clone.fetch_add(1, Ordering::SeqCst);
            let size = sizes.get(call).copied().unwrap_or(0);
            async move { Ok((0..size as u64).map(|i| doc(offset + i)).collect()) }.boxed()
        };
        (fetcher, calls)
    }

    #[tokio::test]
    async fn short_final_page_terminates_with_all_documents() {
        let (fetcher, calls) = scripted_pages(vec![100, 100, 37]);

        let all = fetch_all(fetcher, 100).await.expect("pages");

        assert_eq!(all.len(), 237);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Original order preserved across page boundaries
        assert_eq!(all[0]["n"], json!(0));
        assert_eq!(all[99]["n"], json!(99));
        assert_eq!(all[100]["n"], json!(100));
        assert_eq!(all[236]["n"], json!(236));
    }

    #[tokio::test]
    async fn empty_first_page_terminates_after_one_call() {
        let (fetcher, calls) = scripted_pages(vec![0]);

        let all = fetch_all(fetcher, 100).await.expect("pages");

        assert!(all.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_trailing_empty_page() {
        // 200 rows at page size 100: the driver cannot know page 2 was the
        // last without asking for page 3 and seeing it empty.
        let (fetcher, calls) = scripted_pages(vec![100, 100, 0]);

        let all = fetch_all(fetcher, 100).await.expect("pages");

        assert_eq!(all.len(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_short_page_terminates_immediately() {
        let (fetcher, calls) = scripted_pages(vec![7]);

        let all = fetch_all(fetcher, 100).await.expect("pages");

        assert_eq!(all.len(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn page_error_aborts_and_propagates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let fetcher = move |offset: u64, limit: u64| {
            let call = calls_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Ok((0..limit).map(|i| doc(offset + i)).collect())
                } else {
                    Err(DocBridgeError::Network("connection reset".into()))
                }
            }
            .boxed()
        };

        let result = fetch_all(fetcher, 50).await;

        assert!(matches!(result, Err(DocBridgeError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn offsets_advance_by_page_size() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let fetcher = move |offset: u64, limit: u64| {
            seen_clone.lock().unwrap().push(offset);
            let size = if offset >= 200 { 0 } else { limit };
            async move { Ok((0..size).map(|i| doc(offset + i)).collect()) }.boxed()
        };

        fetch_all(fetcher, 100).await.expect("pages");

        assert_eq!(*seen.lock().unwrap(), vec![0, 100, 200]);
    }
}
