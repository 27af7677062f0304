//! The datastore crate.
//!
//! This crate maps serde-serializable structs onto tables of an in-memory sqlite DB.  There are 3 primary pieces:
//!
//! - The descriptor, an explicit value describing the tables, columns, constraints, and indexes.  The database builds
//!   its schema from the descriptor; nothing is derived by reflection.
//! - The database and its transactions, which own the connection and run statements against it.
//! - The query, a value built by chaining filters, ordering, and a limit, which only does something when handed to a
//!   transaction.
//!
//! Constraints live in the store.  Rows are not validated beyond making sure that they have the shape the descriptor
//! asks for, so e.g. a uniqueness violation is reported by sqlite as [Error::ConstraintViolation].
//!
//! Every table has exactly one key column, an auto-assigned integer.  Keys are never reused, even after deletion.
mod database;
mod descriptor;
mod error;
mod query;
mod row_value;
mod timestamp;

pub use database::*;
pub use descriptor::*;
pub use error::*;
pub use query::*;
pub use timestamp::*;
