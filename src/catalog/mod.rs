//! Catalog module
//!
//! This module contains schema definitions, data types and the catalog of
//! live tables.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::{Catalog, TableBuilder};
pub use schema::{Column, ForeignKey, OnDelete, Schema, TableDef};
pub use types::DataType;
