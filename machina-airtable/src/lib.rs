//! Machina Airtable - Cached Record Store for the Product Catalog
//!
//! The data-access layer between the application's product model and the
//! remote tabular store: a TTL cache to avoid hammering the rate-limited
//! API, bounded exponential-backoff retry for transient faults, a
//! record-level CRUD client, and a pure schema mapper translating between
//! the loosely-typed external field map and [`machina_core::Product`].
//!
//! Callers either construct a [`ProductStore`] explicitly (preferred,
//! dependency-injected) or use [`shared_store`] for the process-wide
//! lazily-initialized instance.

pub mod cache;
pub mod client;
pub mod mapper;
pub mod record;
pub mod retry;
pub mod transport;

pub use cache::TtlCache;
pub use client::{ListQuery, ProductStore};
pub use mapper::{to_domain, to_fields};
pub use record::{ExternalRecord, RecordPage};
pub use retry::with_retry;
pub use transport::{ApiResponse, HttpTransport, TableTransport};

use machina_core::MachinaResult;
use once_cell::sync::OnceCell;

static SHARED_STORE: OnceCell<ProductStore> = OnceCell::new();

/// The process-wide store, built lazily from the environment on first
/// use and reused for the life of the process.
///
/// A construction failure is returned to the caller and not cached, so a
/// later call after fixing the environment can still succeed.
pub fn shared_store() -> MachinaResult<&'static ProductStore> {
    SHARED_STORE.get_or_try_init(ProductStore::from_env)
}
