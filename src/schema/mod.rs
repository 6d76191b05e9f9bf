//! Settings schema: the declared keys, their types and defaults.
//!
//! Schemas are read once at startup from a markup description file. Every key
//! the client reads or writes must be declared here.
//!
//! # Example
//!
//! ```ignore
//! let schemas = SchemaStore::parse("/usr/share/mdm/mdm.schemas", "/")?;
//! let entry = schemas.entry("/daemon/TimedLoginEnable");
//! assert_eq!(entry.signature, Signature::Boolean);
//! ```

mod parser;
mod store;

pub use store::SchemaStore;
