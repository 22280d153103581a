//! Bidirectional translation between external records and products
//!
//! Pure, stateless functions: the same record always maps to the same
//! product. `to_domain` normalizes the loosely-typed field map into the
//! strongly-typed `Product`; `to_fields` implements selective
//! partial-update semantics, where an absent patch field is omitted from
//! the output (leave the remote value untouched) and a present-but-empty
//! field overwrites it.

use chrono::{DateTime, Utc};
use machina_core::{
    Category, MachinaResult, Product, ProductPatch, SpecDocument, ValidationError,
};
use serde_json::{json, Map, Value};

use crate::record::{bool_field, str_field, ExternalRecord};

/// External field names, keyed by what they hold.
pub mod field {
    pub const NAME: &str = "Name";
    pub const CODE: &str = "Product Code";
    pub const SHORT_DESCRIPTION: &str = "Short Description";
    pub const CATEGORY: &str = "Category";
    pub const KEY_SPECS: [&str; 3] = ["Key Spec 1", "Key Spec 2", "Key Spec 3"];
    /// Free-text field holding the JSON-encoded [`SpecDocument`].
    pub const TECHNICAL_DETAILS: &str = "Technical Details";
    pub const WHATSAPP_MESSAGE: &str = "WhatsApp Message";
    pub const STATUS: &str = "Status";
    pub const FEATURED: &str = "Featured";
    pub const IMAGES: &str = "Images";
}

/// Status values used by the remote store.
pub mod status {
    pub const ACTIVE: &str = "Active";
    pub const DRAFT: &str = "Draft";
    pub const ARCHIVED: &str = "Archived";
}

/// Default attachment filename when none can be derived from the URL.
const DEFAULT_IMAGE_NAME: &str = "image";

// ============================================================================
// EXTERNAL -> DOMAIN
// ============================================================================

/// Translate an external record into a product.
///
/// Fails only when the record is structurally unusable (no `fields`).
/// Everything else degrades: unknown categories fall back to a lowercased
/// slug, malformed attachment entries are dropped, and a non-JSON
/// technical-details field is treated as plain installation requirements.
pub fn to_domain(record: &ExternalRecord) -> MachinaResult<Product> {
    let fields = record
        .fields
        .as_ref()
        .ok_or_else(|| ValidationError::MissingFields {
            record_id: record.id.clone(),
        })?;

    let key_specs: Vec<String> = field::KEY_SPECS
        .iter()
        .filter_map(|name| str_field(fields, name))
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
        .map(String::from)
        .collect();

    let doc = str_field(fields, field::TECHNICAL_DETAILS)
        .map(SpecDocument::parse)
        .unwrap_or_default();

    let created_at = record
        .created_time
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Ok(Product {
        id: record.id.clone(),
        code: owned_str(fields, field::CODE),
        name: owned_str(fields, field::NAME),
        short_description: owned_str(fields, field::SHORT_DESCRIPTION),
        category: Category::from_external(str_field(fields, field::CATEGORY).unwrap_or("")),
        key_specs,
        applications: doc.applications,
        full_specs: doc.full_specs,
        installation_reqs: doc.installation_reqs,
        whatsapp_message: owned_str(fields, field::WHATSAPP_MESSAGE),
        active: str_field(fields, field::STATUS) == Some(status::ACTIVE),
        featured: bool_field(fields, field::FEATURED),
        images: image_urls(fields.get(field::IMAGES)),
        created_at,
        // The external schema has no update timestamp.
        updated_at: created_at,
    })
}

fn owned_str(fields: &Map<String, Value>, name: &str) -> String {
    str_field(fields, name).unwrap_or("").to_string()
}

/// Normalize the attachment list into ordered URLs.
///
/// Accepts attachment objects (`{"url": ...}`) or bare URL strings; drops
/// nulls and entries whose URL is blank after trimming.
fn image_urls(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(url.as_str()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// DOMAIN -> EXTERNAL
// ============================================================================

/// Translate a partial product into an outgoing fields map.
///
/// `site_base` absolutizes relative image paths; the remote store cannot
/// resolve relative URLs.
pub fn to_fields(patch: &ProductPatch, site_base: &str) -> Map<String, Value> {
    let mut out = Map::new();

    insert_non_blank(&mut out, field::NAME, patch.name.as_deref());
    insert_non_blank(&mut out, field::CODE, patch.code.as_deref());
    insert_non_blank(
        &mut out,
        field::SHORT_DESCRIPTION,
        patch.short_description.as_deref(),
    );

    if let Some(category) = &patch.category {
        out.insert(
            field::CATEGORY.to_string(),
            Value::String(category.external_name().to_string()),
        );
    }

    // Key specs map positionally onto three discrete fields. Entries
    // beyond the third are silently dropped (a known schema limitation);
    // unused positions are cleared so stale specs do not linger.
    if let Some(specs) = &patch.key_specs {
        for (i, name) in field::KEY_SPECS.iter().enumerate() {
            let value = specs.get(i).map(|s| s.trim()).unwrap_or("");
            out.insert(name.to_string(), Value::String(value.to_string()));
        }
    }

    let doc = SpecDocument {
        full_specs: patch.full_specs.clone().unwrap_or_default(),
        applications: patch.applications.clone().unwrap_or_default(),
        installation_reqs: patch.installation_reqs.clone().unwrap_or_default(),
    };
    // Never write an empty structured blob.
    if !doc.is_empty() {
        out.insert(
            field::TECHNICAL_DETAILS.to_string(),
            Value::String(doc.to_json()),
        );
    }

    if let Some(message) = &patch.whatsapp_message {
        out.insert(
            field::WHATSAPP_MESSAGE.to_string(),
            Value::String(message.clone()),
        );
    }

    // Status and Featured are mandatory on every write, with explicit
    // defaults; absent means Draft / not featured.
    let status = if patch.active.unwrap_or(false) {
        status::ACTIVE
    } else {
        status::DRAFT
    };
    out.insert(field::STATUS.to_string(), Value::String(status.to_string()));
    out.insert(
        field::FEATURED.to_string(),
        Value::Bool(patch.featured.unwrap_or(false)),
    );

    if let Some(images) = &patch.images {
        let attachments: Vec<Value> = images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(|url| attachment(url, site_base))
            .collect();
        out.insert(field::IMAGES.to_string(), Value::Array(attachments));
    }

    out
}

fn insert_non_blank(out: &mut Map<String, Value>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            out.insert(name.to_string(), Value::String(trimmed.to_string()));
        }
    }
}

/// Build an attachment object with a fully-qualified URL.
fn attachment(url: &str, site_base: &str) -> Value {
    let absolute = absolutize(url, site_base);
    let filename = absolute
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_IMAGE_NAME);
    json!({ "url": absolute, "filename": filename })
}

/// Resolve a site-relative path against the configured base. A path is
/// relative when it starts with `/` but not `//`; everything else passes
/// through unchanged.
fn absolutize(url: &str, site_base: &str) -> String {
    if url.starts_with('/') && !url.starts_with("//") {
        format!("{}{}", site_base.trim_end_matches('/'), url)
    } else {
        url.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
