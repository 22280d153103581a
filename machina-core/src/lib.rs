//! Machina Core - Domain Model and Shared Plumbing
//!
//! Pure data types, configuration, and the error taxonomy for the catalog
//! data layer. The data-access implementation lives in machina-airtable.

pub mod config;
pub mod error;
pub mod product;

pub use config::StoreConfig;
pub use error::{
    ConfigError, MachinaError, MachinaResult, ParseError, RemoteError, ValidationError,
};
pub use product::{Category, Product, ProductPatch, SpecDocument, MAX_KEY_SPECS};
