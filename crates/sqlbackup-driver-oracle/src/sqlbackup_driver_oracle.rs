//! Oracle database driver implementation

mod connection;
mod dsn;

pub use connection::{OracleConnection, OracleRowCursor};
pub use dsn::OracleConnectOptions;
