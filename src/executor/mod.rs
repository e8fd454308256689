//! Statement execution module
//!
//! This module runs parsed statements against a database.

pub mod executor;

pub use executor::{execute, execute_read, QueryResult};
