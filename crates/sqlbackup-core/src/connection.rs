//! Connection and cursor traits

use crate::{ProjectionQuery, RawRow, Result};
use async_trait::async_trait;

/// A database connection scoped to one principal (user/schema)
///
/// The dump engine only ever issues one operation at a time on a
/// connection, and fully drains or closes a cursor before opening the next.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "oracle")
    fn driver_name(&self) -> &str;

    /// Round-trip to the server to confirm the session is alive
    async fn ping(&self) -> Result<()>;

    /// List the tables owned by the connected principal, in catalog order
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Fetch the full DDL text describing one table
    ///
    /// The text may hold several statements (the `CREATE TABLE` plus index
    /// and constraint statements); it is treated as opaque by the caller.
    async fn fetch_table_ddl(&self, table_name: &str) -> Result<String>;

    /// Execute a projection query and return a cursor over its rows
    async fn open_rows(&self, query: &ProjectionQuery) -> Result<Box<dyn RowCursor>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// A server-side cursor over projected rows
///
/// Implementations must release the server resource both on `close` and on
/// drop, so an early return on an error path never leaks a cursor.
#[async_trait]
pub trait RowCursor: Send {
    /// Fetch the next row, or `None` once the cursor is exhausted
    async fn next_row(&mut self) -> Result<Option<RawRow>>;

    /// Release the cursor
    async fn close(self: Box<Self>) -> Result<()>;
}
