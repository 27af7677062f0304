//! The student record store.
//!
//! A [Student] is a plain struct.  Its table, constraints, and index are declared separately, as a
//! [roster_datastore::DatabaseDescriptor] built by [build_descriptor].  Reads and writes go through a [Session], which
//! wraps one transaction and buffers changes to loaded students until it is flushed or committed.
mod error;
mod session;
mod student;

pub use error::*;
pub use session::*;
pub use student::*;
