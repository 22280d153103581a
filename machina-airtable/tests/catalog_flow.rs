//! End-to-end catalog flows against an in-memory table.

use async_trait::async_trait;
use machina_airtable::{ApiResponse, ListQuery, ProductStore, TableTransport};
use machina_core::{MachinaResult, ProductPatch, StoreConfig};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A fake remote table honoring the wire contract: list with
/// filterByFormula/maxRecords, dual-shape single-record reads, create
/// with assigned ids, and merge-on-patch.
#[derive(Default)]
struct FakeTable {
    rows: Mutex<Vec<(String, Map<String, Value>)>>,
    next_id: AtomicU32,
}

impl FakeTable {
    fn record_json(id: &str, fields: &Map<String, Value>) -> Value {
        json!({
            "id": id,
            "fields": fields,
            "createdTime": "2024-01-01T00:00:00Z"
        })
    }

    fn matches(formula: &str, fields: &Map<String, Value>) -> bool {
        if formula.contains("{Status} = 'Active'")
            && fields.get("Status") != Some(&json!("Active"))
        {
            return false;
        }
        if formula.contains("{Featured} = TRUE()")
            && fields.get("Featured") != Some(&json!(true))
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl TableTransport for &FakeTable {
    async fn get(&self, path: &str, query: &[(String, String)]) -> MachinaResult<ApiResponse> {
        let rows = self.rows.lock().unwrap();

        if path.is_empty() {
            let formula = query
                .iter()
                .find(|(k, _)| k == "filterByFormula")
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            let limit = query
                .iter()
                .find(|(k, _)| k == "maxRecords")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(usize::MAX);

            let records: Vec<Value> = rows
                .iter()
                .filter(|(_, fields)| FakeTable::matches(formula, fields))
                .take(limit)
                .map(|(id, fields)| FakeTable::record_json(id, fields))
                .collect();

            return Ok(ApiResponse {
                status: 200,
                body: json!({ "records": records }).to_string(),
            });
        }

        let id = path.trim_start_matches('/');
        match rows.iter().find(|(row_id, _)| row_id == id) {
            // Wrapped shape, one of the two the remote API is known to use.
            Some((id, fields)) => Ok(ApiResponse {
                status: 200,
                body: json!({ "record": FakeTable::record_json(id, fields) }).to_string(),
            }),
            None => Ok(ApiResponse {
                status: 404,
                body: json!({ "error": "NOT_FOUND" }).to_string(),
            }),
        }
    }

    async fn post(&self, _path: &str, body: &Value) -> MachinaResult<ApiResponse> {
        let fields = body["fields"].as_object().cloned().unwrap_or_default();
        let id = format!("rec{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.rows.lock().unwrap().push((id.clone(), fields.clone()));

        Ok(ApiResponse {
            status: 200,
            body: FakeTable::record_json(&id, &fields).to_string(),
        })
    }

    async fn patch(&self, path: &str, body: &Value) -> MachinaResult<ApiResponse> {
        let id = path.trim_start_matches('/').to_string();
        let patch = body["fields"].as_object().cloned().unwrap_or_default();
        let mut rows = self.rows.lock().unwrap();

        let Some((_, fields)) = rows.iter_mut().find(|(row_id, _)| *row_id == id) else {
            return Ok(ApiResponse {
                status: 404,
                body: json!({ "error": "NOT_FOUND" }).to_string(),
            });
        };
        for (key, value) in patch {
            fields.insert(key, value);
        }

        Ok(ApiResponse {
            status: 200,
            body: FakeTable::record_json(&id, fields).to_string(),
        })
    }
}

fn test_config() -> StoreConfig {
    StoreConfig {
        api_key: "key".to_string(),
        base_id: "base".to_string(),
        table: "Products".to_string(),
        site_url: Some("https://machina.example".to_string()),
        deploy_url: None,
        cache_ttl: Duration::from_secs(300),
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
    }
}

fn product_patch(name: &str, code: &str, active: bool) -> ProductPatch {
    ProductPatch {
        name: Some(name.to_string()),
        code: Some(code.to_string()),
        active: Some(active),
        ..ProductPatch::default()
    }
}

#[tokio::test]
async fn test_default_listing_filters_to_active_products() {
    let table = FakeTable::default();
    let store = ProductStore::with_transport(&table, &test_config());

    for i in 0..25 {
        store
            .create_product(&product_patch(&format!("Active {i}"), &format!("A-{i}"), true))
            .await
            .unwrap();
    }
    for i in 0..5 {
        store
            .create_product(&product_patch(&format!("Draft {i}"), &format!("D-{i}"), false))
            .await
            .unwrap();
    }

    let query = ListQuery {
        limit: Some(10),
        ..ListQuery::default()
    };
    let products = store.list_products(&query).await.unwrap();

    assert_eq!(products.len(), 10);
    assert!(products.iter().all(|p| p.active));
}

#[tokio::test]
async fn test_all_statuses_listing_sees_everything() {
    let table = FakeTable::default();
    let store = ProductStore::with_transport(&table, &test_config());

    store.create_product(&product_patch("Live", "L-1", true)).await.unwrap();
    store.create_product(&product_patch("Hidden", "H-1", false)).await.unwrap();

    let all = ListQuery {
        include_all_statuses: true,
        ..ListQuery::default()
    };
    assert_eq!(store.list_products(&all).await.unwrap().len(), 2);
    assert_eq!(
        store.list_products(&ListQuery::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_create_then_get_round_trips_identity_fields() {
    let table = FakeTable::default();
    let store = ProductStore::with_transport(&table, &test_config());

    let patch = ProductPatch {
        key_specs: Some(vec![
            "400 V".to_string(),
            "   ".to_string(),
            "Three-phase".to_string(),
        ]),
        ..product_patch("Arc Welder", "WLD-220", true)
    };
    let created = store.create_product(&patch).await.unwrap();

    let fetched = store.get_product(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.code, "WLD-220");
    assert_eq!(fetched.name, "Arc Welder");
    assert_eq!(fetched.key_specs.len(), 2);
    assert!(fetched.active);
}

#[tokio::test]
async fn test_archive_hides_product_from_default_listing() {
    let table = FakeTable::default();
    let store = ProductStore::with_transport(&table, &test_config());

    let created = store.create_product(&product_patch("Old Press", "P-9", true)).await.unwrap();
    assert_eq!(store.list_products(&ListQuery::default()).await.unwrap().len(), 1);

    store.archive_product(&created.id).await.unwrap();

    assert!(store.list_products(&ListQuery::default()).await.unwrap().is_empty());
    let archived = store.get_product(&created.id).await.unwrap().unwrap();
    assert!(!archived.active);

    let all = ListQuery {
        include_all_statuses: true,
        ..ListQuery::default()
    };
    assert_eq!(store.list_products(&all).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_partial_update_leaves_omitted_fields_untouched() {
    let table = FakeTable::default();
    let store = ProductStore::with_transport(&table, &test_config());

    let patch = ProductPatch {
        images: Some(vec!["/uploads/press.jpg".to_string()]),
        ..product_patch("Press", "P-1", true)
    };
    let created = store.create_product(&patch).await.unwrap();
    assert_eq!(created.images, vec!["https://machina.example/uploads/press.jpg"]);

    // Renaming without an images key must not clear the images.
    let rename = ProductPatch {
        name: Some("Hydraulic Press".to_string()),
        active: Some(true),
        ..ProductPatch::default()
    };
    let updated = store.update_product(&created.id, &rename).await.unwrap();
    assert_eq!(updated.name, "Hydraulic Press");
    assert_eq!(updated.images, vec!["https://machina.example/uploads/press.jpg"]);

    // An explicitly empty images list clears them.
    let clear = ProductPatch {
        images: Some(vec![]),
        active: Some(true),
        ..ProductPatch::default()
    };
    let cleared = store.update_product(&created.id, &clear).await.unwrap();
    assert!(cleared.images.is_empty());
}
