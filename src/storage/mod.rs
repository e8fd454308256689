//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Values and tuples
//! - Hash indexes
//! - Tables with constraint checks and joins
//! - JSON snapshots with atomic replace

pub mod index;
pub mod predicate;
pub mod result;
pub mod snapshot;
pub mod table;
pub mod value;

pub use index::{Index, RowId};
pub use predicate::{CompareOp, Condition};
pub use result::{row, ResultSet, Row};
pub use snapshot::{Snapshot, Storage, TableSnapshot};
pub use table::{JoinKind, Table, TableDescription};
pub use value::{Tuple, Value};
