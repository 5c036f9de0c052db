//! SQLbackup Core - Core abstractions shared by the dump engine and drivers
//!
//! This crate defines the boundary between the DDL-to-literal engine and the
//! database it reads from:
//!
//! - `Connection` - Trait for a catalog + row source (one per database user)
//! - `RowCursor` - Trait for a server-side cursor over projected rows
//! - `ProjectionQuery` - The row query plus how each position must be fetched
//! - `RawCell` / `RawRow` - Undecoded cell bytes, or SQL NULL

mod connection;
mod error;
mod types;

pub use connection::*;
pub use error::*;
pub use types::*;
