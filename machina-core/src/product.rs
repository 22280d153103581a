//! Product domain model
//!
//! The strongly-typed internal representation of a catalog entry. A
//! `Product` is never persisted directly: it exists only as the translation
//! target/source of an external record, is built fresh on every read, and
//! is never mutated in place by the data layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Maximum number of key specs the external schema can hold.
pub const MAX_KEY_SPECS: usize = 3;

// ============================================================================
// CATEGORY
// ============================================================================

/// Product category, stored internally as a slug.
///
/// The remote store uses human-readable display names; the fixed lookup
/// table below is shared with the rest of the application. External values
/// outside the table fall back to a lowercased copy of the raw value
/// rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Generators,
    Welding,
    Compressors,
    Other(String),
}

impl Category {
    /// Remap an external display name to the internal category.
    pub fn from_external(raw: &str) -> Self {
        match raw {
            "Industrial Generators" => Self::Generators,
            "Welding Equipment" => Self::Welding,
            "Air Compressors" => Self::Compressors,
            other => Self::Other(other.to_lowercase()),
        }
    }

    /// Parse an internal slug back into a category.
    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "generators" => Self::Generators,
            "welding" => Self::Welding,
            "compressors" => Self::Compressors,
            other => Self::Other(other.to_lowercase()),
        }
    }

    /// The internal slug for this category.
    pub fn slug(&self) -> &str {
        match self {
            Self::Generators => "generators",
            Self::Welding => "welding",
            Self::Compressors => "compressors",
            Self::Other(raw) => raw,
        }
    }

    /// The value written to the remote store's category field.
    pub fn external_name(&self) -> &str {
        match self {
            Self::Generators => "Industrial Generators",
            Self::Welding => "Welding Equipment",
            Self::Compressors => "Air Compressors",
            Self::Other(raw) => raw,
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.slug())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slug = String::deserialize(deserializer)?;
        Ok(Self::from_slug(&slug))
    }
}

// ============================================================================
// EMBEDDED SPEC DOCUMENT
// ============================================================================

/// Structured sub-document stored inside a single free-text field.
///
/// The external schema cannot represent nested structures, so full specs,
/// applications, and installation requirements are JSON-encoded into one
/// text field. The field predates structured storage and may hold plain
/// text, so parsing falls back to treating the entire content as
/// `installation_reqs` verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDocument {
    #[serde(default, rename = "fullSpecs")]
    pub full_specs: BTreeMap<String, String>,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default, rename = "installationReqs")]
    pub installation_reqs: String,
}

impl SpecDocument {
    /// Parse the free-text field, degrading gracefully on non-JSON input.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(doc) => doc,
            Err(_) => Self {
                installation_reqs: text.to_string(),
                ..Self::default()
            },
        }
    }

    /// True when none of the three sections carry content.
    pub fn is_empty(&self) -> bool {
        self.full_specs.is_empty()
            && self.applications.is_empty()
            && self.installation_reqs.trim().is_empty()
    }

    /// Serialize back into the free-text field format.
    pub fn to_json(&self) -> String {
        // Serialization of string maps and vectors cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// PRODUCT
// ============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque identifier assigned by the remote store.
    pub id: String,
    /// Human product code.
    pub code: String,
    pub name: String,
    pub short_description: String,
    pub category: Category,
    /// Up to three order-significant key specs, never padded.
    pub key_specs: Vec<String>,
    pub applications: Vec<String>,
    pub full_specs: BTreeMap<String, String>,
    pub installation_reqs: String,
    pub whatsapp_message: String,
    pub active: bool,
    pub featured: bool,
    /// Ordered absolute image URLs.
    pub images: Vec<String>,
    /// Both timestamps come from the external record's single
    /// `createdTime`; the external schema has no update timestamp.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial product for writes, with omit-vs-empty semantics.
///
/// A `None` field is omitted from the outgoing fields map entirely,
/// leaving the remote value untouched. A present field - even an empty
/// one - overwrites the remote value. Omitting `images` on an update must
/// never clear existing images; passing `Some(vec![])` must clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_specs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_specs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_reqs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ProductPatch {
    /// A patch carrying every field of an existing product.
    ///
    /// Useful for full overwrites and for round-trip checks; ordinary
    /// updates should build a sparse patch instead.
    pub fn from_product(product: &Product) -> Self {
        Self {
            code: Some(product.code.clone()),
            name: Some(product.name.clone()),
            short_description: Some(product.short_description.clone()),
            category: Some(product.category.clone()),
            key_specs: Some(product.key_specs.clone()),
            applications: Some(product.applications.clone()),
            full_specs: Some(product.full_specs.clone()),
            installation_reqs: Some(product.installation_reqs.clone()),
            whatsapp_message: Some(product.whatsapp_message.clone()),
            active: Some(product.active),
            featured: Some(product.featured),
            images: Some(product.images.clone()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
