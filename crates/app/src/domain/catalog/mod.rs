//! Catalog
//!
//! Read access to product facts and the stock counters checkout decrements.
//! Catalog content itself is managed elsewhere.

pub mod repository;

pub use repository::{CatalogReader, StockCounters};
