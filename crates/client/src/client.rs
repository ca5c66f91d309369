//! Public CRUD facade over the document backend
//!
//! Composes the transport, cache store, retry executor, pagination driver
//! and batch executor behind a handful of operations. Reads go through the
//! cache (when enabled) keyed by canonical request signatures; writes always
//! invalidate the affected collection's entries on success, whether or not
//! caching was enabled for the reads around them.
//!
//! # Wire mapping
//!
//! - search  → `GET /resource/{collection}` with `filters`, `fields`,
//!   `order_by`, `limit_page_length`, `limit_start`
//! - get     → `GET /resource/{collection}/{id}`
//! - create  → `POST /resource/{collection}`
//! - update  → `PUT /resource/{collection}/{id}` (changed fields only)
//! - delete  → `DELETE /resource/{collection}/{id}`
//! - schema  → `GET /resource/DocType/{collection}`
//! - global search → `GET /method/search_link`

use std::sync::Arc;

use docbridge_common::retry::{RetryConfig, RetryDecision, RetryExecutor, RetryPolicy};
use docbridge_common::time::{Clock, SystemClock};
use docbridge_domain::{
    BatchOutcome, CacheStats, ClientConfig, CollectionSchema, Credentials, DocBridgeError,
    Document, Result,
};
use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::batch;
use crate::cache::{CacheStore, RequestSignature};
use crate::paginate;
use crate::transport::{ApiRequest, HttpTransport, Transport};

/// Metadata collection that describes every other collection.
const METADATA_COLLECTION: &str = "DocType";

/// Backend default ordering for searches when the caller gives none.
const DEFAULT_ORDER: &str = "modified desc";

/// Default page length when listing collection types.
const DEFAULT_LIST_LIMIT: u64 = 999;

/// Retries transient failures, surfaces everything else immediately.
pub struct TransientErrorPolicy;

impl RetryPolicy<DocBridgeError> for TransientErrorPolicy {
    fn classify(&self, error: &DocBridgeError) -> RetryDecision {
        if error.is_retryable() { RetryDecision::Retry } else { RetryDecision::Stop }
    }
}

/// Options for a search call.
///
/// Defaults: no filters, all fields, backend ordering `modified desc`,
/// pages of 20 starting at offset 0, no auto-pagination, cache honored.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Filter object passed through to the backend, e.g.
    /// `json!({"status": "Open"})`. Must be a JSON object when present.
    pub filters: Option<Value>,
    /// Fields to project; `None` means all fields.
    pub fields: Option<Vec<String>>,
    /// Backend sort expression, e.g. `"modified desc"`.
    pub order_by: Option<String>,
    /// Page size (and total result size unless auto-paginating).
    pub limit: u64,
    /// Starting offset.
    pub offset: u64,
    /// Fetch every page and return the concatenation.
    pub auto_paginate: bool,
    /// Honor the cache for this call. Ignored while caching is disabled on
    /// the client.
    pub use_cache: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filters: None,
            fields: None,
            order_by: None,
            limit: 20,
            offset: 0,
            auto_paginate: false,
            use_cache: true,
        }
    }
}

impl SearchOptions {
    pub fn filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn auto_paginate(mut self, auto_paginate: bool) -> Self {
        self.auto_paginate = auto_paginate;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

/// Client for a document-oriented HTTP backend with caching, retry,
/// pagination and batch creation built in.
///
/// One instance may be shared across tasks; the cache store is the only
/// shared mutable state and is lock-protected.
pub struct DocBridgeClient {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    retry: RetryExecutor<TransientErrorPolicy>,
    config: ClientConfig,
}

impl DocBridgeClient {
    /// Connect to a backend with the given credentials and configuration.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&credentials, &config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Build a client entirely from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(Credentials::from_env()?, ClientConfig::from_env())
    }

    /// Build a client over a custom transport (tests, instrumentation).
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self::with_clock(transport, config, Arc::new(SystemClock))
    }

    /// Build a client with a custom clock for deterministic cache-expiry
    /// tests.
    pub fn with_clock(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let retry = RetryExecutor::new(
            RetryConfig::new(config.max_retries, config.retry_base_delay),
            TransientErrorPolicy,
        );
        Self { transport, cache: CacheStore::new(clock), retry, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Search documents of a collection type.
    ///
    /// With `auto_paginate` the full result set is fetched page by page and
    /// concatenated; each page is cached and retried independently, keyed by
    /// its offset, so a re-run only refetches pages whose cache entries
    /// lapsed. Without it, one page of `limit` documents starting at
    /// `offset` is returned.
    pub async fn search(&self, collection: &str, options: SearchOptions) -> Result<Vec<Document>> {
        validate_collection(collection)?;
        validate_filters(options.filters.as_ref())?;
        if options.limit == 0 {
            return Err(DocBridgeError::Validation("limit must be positive".to_string()));
        }

        if options.auto_paginate {
            let base_offset = options.offset;
            paginate::fetch_all(
                |offset, limit| {
                    self.search_page(collection, &options, base_offset + offset, limit).boxed()
                },
                options.limit,
            )
            .await
        } else {
            self.search_page(collection, &options, options.offset, options.limit).await
        }
    }

    /// Fetch one document by id.
    pub async fn get(
        &self,
        collection: &str,
        id: &str,
        fields: Option<Vec<String>>,
    ) -> Result<Document> {
        validate_collection(collection)?;
        validate_id(id)?;

        let signature =
            RequestSignature::new(collection, "get", &json!({ "id": id, "fields": fields }));
        if self.config.enable_cache {
            if let Some(value) = self.cache.get(&signature) {
                return document_from(value);
            }
        }

        let mut query = Vec::new();
        if let Some(fields) = &fields {
            query.push(("fields".to_string(), json!(fields).to_string()));
        }
        let request =
            ApiRequest::get(format!("/resource/{collection}/{id}")).with_query(query);
        let body = self.send(request).await?;
        let data = body.get("data").cloned().unwrap_or_else(|| json!({}));

        if self.config.enable_cache {
            self.cache.set(&signature, data.clone(), self.config.cache_ttl);
        }
        document_from(data)
    }

    /// Create a document. On success every cache entry for the collection
    /// is invalidated.
    pub async fn create(&self, collection: &str, data: Document) -> Result<Document> {
        validate_collection(collection)?;

        let mut payload = data;
        payload.insert("doctype".to_string(), json!(collection));
        let request =
            ApiRequest::post(format!("/resource/{collection}"), Value::Object(payload));
        let body = self.send(request).await?;

        self.cache.invalidate_collection(collection);
        info!(collection, "document created");
        document_from(body.get("data").cloned().unwrap_or_else(|| json!({})))
    }

    /// Update a document with the changed fields only. Invalidates the
    /// collection's cache entries on success.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Document> {
        validate_collection(collection)?;
        validate_id(id)?;

        let request = ApiRequest::put(
            format!("/resource/{collection}/{id}"),
            Value::Object(changes),
        );
        let body = self.send(request).await?;

        self.cache.invalidate_collection(collection);
        info!(collection, id, "document updated");
        document_from(body.get("data").cloned().unwrap_or_else(|| json!({})))
    }

    /// Delete a document. Invalidates the collection's cache entries on
    /// success.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        validate_collection(collection)?;
        validate_id(id)?;

        let request = ApiRequest::delete(format!("/resource/{collection}/{id}"));
        self.send(request).await?;

        self.cache.invalidate_collection(collection);
        info!(collection, id, "document deleted");
        Ok(())
    }

    /// Create many documents with per-item failure isolation.
    ///
    /// Each item runs through [`Self::create`] (retried, cache-invalidating)
    /// in input order. Failures become [`BatchOutcome::failed`] records
    /// instead of aborting the run; with `stop_on_error` the run stops at
    /// the first failure and the remainder is not attempted. There is no
    /// cancellation beyond the per-request timeout.
    pub async fn batch_create(
        &self,
        collection: &str,
        documents: Vec<Document>,
        stop_on_error: bool,
    ) -> Result<BatchOutcome> {
        validate_collection(collection)?;

        let outcome = batch::run(documents, stop_on_error, |document| {
            self.create(collection, document).boxed()
        })
        .await;

        info!(
            collection,
            created = outcome.count(),
            failed = outcome.errors(),
            "batch creation finished"
        );
        Ok(outcome)
    }

    /// List the names of all collection types known to the backend.
    pub async fn list_collections(&self, limit: Option<u64>) -> Result<Vec<String>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let signature = RequestSignature::new(
            METADATA_COLLECTION,
            "search",
            &json!({ "limit": limit, "names_only": true }),
        );
        if self.config.enable_cache {
            if let Some(value) = self.cache.get(&signature) {
                return Ok(collection_names(&value));
            }
        }

        let request = ApiRequest::get(format!("/resource/{METADATA_COLLECTION}"))
            .with_query(vec![("limit_page_length".to_string(), limit.to_string())]);
        let body = self.send(request).await?;
        let data = body.get("data").cloned().unwrap_or_else(|| json!([]));

        if self.config.enable_cache {
            self.cache.set(&signature, data.clone(), self.config.cache_ttl);
        }
        Ok(collection_names(&data))
    }

    /// Fetch schema metadata for a collection type.
    ///
    /// Cached under the queried collection, so a write to that collection
    /// refreshes its schema entry along with its data entries.
    pub async fn schema(&self, collection: &str) -> Result<CollectionSchema> {
        validate_collection(collection)?;

        let signature = RequestSignature::new(collection, "schema", &json!({}));
        if self.config.enable_cache {
            if let Some(value) = self.cache.get(&signature) {
                return Ok(schema_from(value));
            }
        }

        let request =
            ApiRequest::get(format!("/resource/{METADATA_COLLECTION}/{collection}"));
        let body = self.send(request).await?;
        let meta = body.get("data").cloned().unwrap_or_else(|| json!({}));

        if self.config.enable_cache {
            self.cache.set(&signature, meta.clone(), self.config.cache_ttl);
        }
        Ok(schema_from(meta))
    }

    /// Free-text search across collections.
    ///
    /// Results are volatile, so this is never cached unless the caller
    /// explicitly opts in with `use_cache`.
    pub async fn global_search(
        &self,
        text: &str,
        limit: u64,
        use_cache: bool,
    ) -> Result<Vec<Document>> {
        if text.trim().is_empty() {
            return Err(DocBridgeError::Validation("search text must not be empty".to_string()));
        }

        let signature = RequestSignature::new(
            "_global",
            "method:search_link",
            &json!({ "text": text, "limit": limit }),
        );
        if self.config.enable_cache && use_cache {
            if let Some(value) = self.cache.get(&signature) {
                return documents_from(value);
            }
        }

        let request = ApiRequest::get("/method/search_link").with_query(vec![
            ("text".to_string(), text.to_string()),
            ("limit".to_string(), limit.to_string()),
        ]);
        let body = self.send(request).await?;
        let message = body.get("message").cloned().unwrap_or_else(|| json!([]));

        if self.config.enable_cache && use_cache {
            self.cache.set(&signature, message.clone(), self.config.cache_ttl);
        }
        documents_from(message)
    }

    /// Diagnostic snapshot of the cache store.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cache entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// One retried round-trip through the transport.
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.retry.execute(|| self.transport.execute(request.clone())).await
    }

    async fn search_page(
        &self,
        collection: &str,
        options: &SearchOptions,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Document>> {
        let filters = options.filters.clone().unwrap_or_else(|| json!({}));
        let fields = options.fields.clone().map(|f| json!(f)).unwrap_or_else(|| json!(["*"]));
        let order_by = options.order_by.clone().unwrap_or_else(|| DEFAULT_ORDER.to_string());

        let signature = RequestSignature::new(
            collection,
            "search",
            &json!({
                "filters": filters,
                "fields": fields,
                "order_by": order_by,
                "limit": limit,
                "offset": offset,
            }),
        );

        let use_cache = self.config.enable_cache && options.use_cache;
        if use_cache {
            if let Some(value) = self.cache.get(&signature) {
                return documents_from(value);
            }
        }
        debug!(collection, offset, limit, "searching backend");

        let query = vec![
            ("filters".to_string(), filters.to_string()),
            ("fields".to_string(), fields.to_string()),
            ("order_by".to_string(), order_by),
            ("limit_page_length".to_string(), limit.to_string()),
            ("limit_start".to_string(), offset.to_string()),
        ];
        let request = ApiRequest::get(format!("/resource/{collection}")).with_query(query);
        let body = self.send(request).await?;
        let data = body.get("data").cloned().unwrap_or_else(|| json!([]));

        if use_cache {
            self.cache.set(&signature, data.clone(), self.config.cache_ttl);
        }
        documents_from(data)
    }
}

fn validate_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(DocBridgeError::Validation("collection type must not be empty".to_string()));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(DocBridgeError::Validation("document id must not be empty".to_string()));
    }
    Ok(())
}

fn validate_filters(filters: Option<&Value>) -> Result<()> {
    match filters {
        None => Ok(()),
        Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(DocBridgeError::Validation(format!(
            "filters must be a JSON object, got {other}"
        ))),
    }
}

fn document_from(value: Value) -> Result<Document> {
    serde_json::from_value(value)
        .map_err(|err| DocBridgeError::Internal(format!("backend returned a non-object: {err}")))
}

fn documents_from(value: Value) -> Result<Vec<Document>> {
    serde_json::from_value(value).map_err(|err| {
        DocBridgeError::Internal(format!("backend returned a non-document list: {err}"))
    })
}

fn collection_names(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn schema_from(meta: Value) -> CollectionSchema {
    CollectionSchema {
        name: meta.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
        fields: meta.get("fields").and_then(Value::as_array).cloned().unwrap_or_default(),
        permissions: meta
            .get("permissions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        is_submittable: truthy(meta.get("is_submittable")),
        track_changes: truthy(meta.get("track_changes")),
    }
}

// The metadata collection reports flags as 0/1 integers.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}
