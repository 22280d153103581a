//! Record-level CRUD client for the product table
//!
//! Reads go through the shared TTL cache; writes invalidate the affected
//! keys because the remote API has no change-notification mechanism.
//! Every network call passes through the retry policy. Deletion is soft:
//! records are archived, never removed.

use machina_core::{
    Category, MachinaResult, ParseError, Product, ProductPatch, RemoteError, StoreConfig,
};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::cache::TtlCache;
use crate::mapper::{field, status, to_domain, to_fields};
use crate::record::{parse_single_record, ExternalRecord, RecordPage};
use crate::retry::with_retry;
use crate::transport::{ApiResponse, HttpTransport, TableTransport};

/// Cache key prefix for list reads; create/update invalidate by this
/// substring so new records are visible on the next list.
const LIST_KEY_PREFIX: &str = "records:list";

/// How many characters of a malformed body to keep for diagnosis.
const SNIPPET_LEN: usize = 200;

fn record_key(id: &str) -> String {
    format!("records:get:{}", id)
}

// ============================================================================
// LIST QUERY
// ============================================================================

/// Parameters for a list read.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub category: Option<Category>,
    pub featured_only: bool,
    /// Fetch everything regardless of status. Used for exact counting;
    /// bypasses the cache because its purpose is to observe the current
    /// true state, not a recent snapshot.
    pub include_all_statuses: bool,
    pub limit: Option<u32>,
    pub offset: Option<String>,
}

impl ListQuery {
    /// Build the server-side filter expression by ANDing the applicable
    /// equality predicates. No predicates means no filter (all records).
    pub fn filter_formula(&self) -> Option<String> {
        let mut predicates = Vec::new();

        if !self.include_all_statuses {
            predicates.push(format!("{{{}}} = '{}'", field::STATUS, status::ACTIVE));
        }
        if self.featured_only {
            predicates.push(format!("{{{}}} = TRUE()", field::FEATURED));
        }
        if let Some(category) = &self.category {
            predicates.push(format!(
                "{{{}}} = '{}'",
                field::CATEGORY,
                category.external_name().replace('\'', "\\'")
            ));
        }

        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(format!("AND({})", predicates.join(", "))),
        }
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(formula) = self.filter_formula() {
            params.push(("filterByFormula".to_string(), formula));
        }
        if let Some(limit) = self.limit {
            params.push(("maxRecords".to_string(), limit.to_string()));
        }
        if let Some(offset) = &self.offset {
            params.push(("offset".to_string(), offset.clone()));
        }
        params
    }

    fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            LIST_KEY_PREFIX,
            self.filter_formula().unwrap_or_else(|| "all".to_string()),
            self.limit.map(|l| l.to_string()).unwrap_or_default(),
            self.offset.as_deref().unwrap_or_default(),
        )
    }
}

// ============================================================================
// PRODUCT STORE
// ============================================================================

/// Cached, retrying client for one product table.
///
/// Connection settings are read once at construction, which fails
/// immediately on missing configuration. The transport is a type
/// parameter so tests can run against an in-memory table.
pub struct ProductStore<T: TableTransport = HttpTransport> {
    transport: T,
    site_base: String,
    max_attempts: u32,
    base_delay: Duration,
    list_cache: TtlCache<RecordPage>,
    record_cache: TtlCache<Option<ExternalRecord>>,
}

impl ProductStore<HttpTransport> {
    /// Build a store over HTTP from an explicit configuration.
    pub fn new(config: StoreConfig) -> MachinaResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config);
        Ok(Self::with_transport(transport, &config))
    }

    /// Build a store from environment variables.
    pub fn from_env() -> MachinaResult<Self> {
        Self::new(StoreConfig::from_env()?)
    }
}

impl<T: TableTransport> ProductStore<T> {
    /// Build a store over an arbitrary transport.
    pub fn with_transport(transport: T, config: &StoreConfig) -> Self {
        Self {
            transport,
            site_base: config.resolved_site_url(),
            max_attempts: config.max_attempts,
            base_delay: config.base_delay,
            list_cache: TtlCache::new(config.cache_ttl),
            record_cache: TtlCache::new(config.cache_ttl),
        }
    }

    // ------------------------------------------------------------------
    // Record-level operations
    // ------------------------------------------------------------------

    /// List one page of records.
    ///
    /// Results are cached per filter/limit/offset unless the query asks
    /// for all statuses, which always hits the network.
    pub async fn list_records(&self, query: &ListQuery) -> MachinaResult<RecordPage> {
        let params = query.params();

        if query.include_all_statuses {
            return self.fetch_page(params).await;
        }

        self.list_cache
            .get_or_compute(&query.cache_key(), || self.fetch_page(params))
            .await
    }

    /// Fetch a single record by id.
    ///
    /// Absence is an expected outcome, not a failure: a remote 404 and an
    /// unrecognized response shape both yield `None`.
    pub async fn get_record(&self, id: &str) -> MachinaResult<Option<ExternalRecord>> {
        let path = format!("/{}", id);

        self.record_cache
            .get_or_compute(&record_key(id), || async {
                let response = with_retry(
                    || {
                        let path = path.clone();
                        async move {
                            let resp = self.transport.get(&path, &[]).await?;
                            if resp.is_success() || resp.status == 404 {
                                Ok(resp)
                            } else {
                                Err(remote_error(&resp))
                            }
                        }
                    },
                    self.max_attempts,
                    self.base_delay,
                )
                .await?;

                if response.status == 404 {
                    return Ok(None);
                }

                let body: Value = parse_json(&response.body, "record response")?;
                match parse_single_record(&body) {
                    Some(record) => Ok(Some(record)),
                    None => {
                        tracing::error!(
                            record_id = %id,
                            "Unrecognized single-record response shape"
                        );
                        Ok(None)
                    }
                }
            })
            .await
    }

    /// Create a record from an outgoing fields map.
    pub async fn create_record(&self, fields: Map<String, Value>) -> MachinaResult<ExternalRecord> {
        let body = json!({ "fields": fields });

        let response = with_retry(
            || {
                let body = body.clone();
                async move {
                    let resp = self.transport.post("", &body).await?;
                    if resp.is_success() {
                        Ok(resp)
                    } else {
                        Err(remote_error(&resp))
                    }
                }
            },
            self.max_attempts,
            self.base_delay,
        )
        .await?;

        let record: ExternalRecord = parse_json(&response.body, "create response")?;

        // New records must be visible on the next list read.
        let invalidated = self.list_cache.invalidate(LIST_KEY_PREFIX);
        tracing::debug!(record_id = %record.id, invalidated, "Record created");
        Ok(record)
    }

    /// Apply a partial fields map to an existing record.
    pub async fn update_record(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> MachinaResult<ExternalRecord> {
        let path = format!("/{}", id);
        let body = json!({ "fields": fields });

        let response = with_retry(
            || {
                let path = path.clone();
                let body = body.clone();
                async move {
                    let resp = self.transport.patch(&path, &body).await?;
                    if resp.is_success() {
                        Ok(resp)
                    } else {
                        Err(remote_error(&resp))
                    }
                }
            },
            self.max_attempts,
            self.base_delay,
        )
        .await?;

        let record: ExternalRecord = parse_json(&response.body, "update response")?;

        self.list_cache.invalidate(LIST_KEY_PREFIX);
        self.record_cache.invalidate(&record_key(id));
        tracing::debug!(record_id = %id, "Record updated");
        Ok(record)
    }

    /// Soft-delete a record by archiving it. There is no hard delete.
    pub async fn delete_record(&self, id: &str) -> MachinaResult<()> {
        let mut fields = Map::new();
        fields.insert(
            field::STATUS.to_string(),
            Value::String(status::ARCHIVED.to_string()),
        );
        self.update_record(id, fields).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Product-level operations
    // ------------------------------------------------------------------

    /// List products, skipping records the mapper rejects.
    ///
    /// A single structurally-broken record must not take down a whole
    /// catalog page; it is logged and dropped.
    pub async fn list_products(&self, query: &ListQuery) -> MachinaResult<Vec<Product>> {
        let page = self.list_records(query).await?;
        let mut products = Vec::with_capacity(page.records.len());

        for record in &page.records {
            match to_domain(record) {
                Ok(product) => products.push(product),
                Err(err) => {
                    tracing::warn!(
                        record_id = %record.id,
                        error = %err,
                        "Skipping unmappable record"
                    );
                }
            }
        }
        Ok(products)
    }

    /// Fetch one product by id.
    pub async fn get_product(&self, id: &str) -> MachinaResult<Option<Product>> {
        match self.get_record(id).await? {
            Some(record) => Ok(Some(to_domain(&record)?)),
            None => Ok(None),
        }
    }

    /// Create a product from a patch.
    pub async fn create_product(&self, patch: &ProductPatch) -> MachinaResult<Product> {
        let fields = to_fields(patch, &self.site_base);
        let record = self.create_record(fields).await?;
        to_domain(&record)
    }

    /// Apply a partial update to a product.
    pub async fn update_product(&self, id: &str, patch: &ProductPatch) -> MachinaResult<Product> {
        let fields = to_fields(patch, &self.site_base);
        let record = self.update_record(id, fields).await?;
        to_domain(&record)
    }

    /// Archive a product (soft delete).
    pub async fn archive_product(&self, id: &str) -> MachinaResult<()> {
        self.delete_record(id).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn fetch_page(&self, params: Vec<(String, String)>) -> MachinaResult<RecordPage> {
        let response = with_retry(
            || {
                let params = params.clone();
                async move {
                    let resp = self.transport.get("", &params).await?;
                    if resp.is_success() {
                        Ok(resp)
                    } else {
                        Err(remote_error(&resp))
                    }
                }
            },
            self.max_attempts,
            self.base_delay,
        )
        .await?;

        parse_json(&response.body, "list response")
    }
}

/// Classify a non-2xx response, extracting the error message from the
/// JSON body. An unparsable body must not fail the error-handling path
/// itself, so it degrades to "Unknown error".
fn remote_error(response: &ApiResponse) -> machina_core::MachinaError {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            let error = body.get("error")?;
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "Unknown error".to_string());

    RemoteError::RequestFailed {
        status: response.status,
        message,
    }
    .into()
}

fn parse_json<D: serde::de::DeserializeOwned>(body: &str, context: &str) -> MachinaResult<D> {
    serde_json::from_str(body).map_err(|_| {
        ParseError::InvalidJson {
            context: context.to_string(),
            snippet: body.chars().take(SNIPPET_LEN).collect(),
        }
        .into()
    })
}

// =============================================================================
// TESTS
// =============================================================================
