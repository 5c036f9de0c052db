//! Table backup orchestration
//!
//! For each table: liveness check, DDL fetch, optional DROP, DDL echo, schema
//! parse, row query, one INSERT per row. Tables are processed strictly one
//! after another on a single connection, and any failure aborts the run.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::projection::build_projection;
use crate::row_serializer::RowSerializer;
use crate::schema_parser::{SchemaParser, TableSchema};
use sqlbackup_core::{Connection, RowCursor, SqlBackupError};

/// Errors during a backup run. Every variant is fatal.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Liveness check failed before table {table}: {message}")]
    Liveness { table: String, message: String },

    #[error("Failed to fetch DDL for table {table}: {message}")]
    MetadataFetch { table: String, message: String },

    #[error("Query failed for table {table}: {message}")]
    QueryExecution { table: String, message: String },

    #[error("Row {row} of table {table} has {actual} cells, schema has {expected} columns")]
    RowWidthMismatch {
        table: String,
        row: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to list tables: {0}")]
    TableEnumeration(String),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Options for a backup run
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Emit `DROP TABLE` before each `CREATE TABLE`
    pub drop_first: bool,
    /// Bound on the liveness check issued before each table
    pub ping_timeout: Duration,
    /// Bound on the DDL fetch
    pub metadata_timeout: Duration,
    /// Bound on opening the row query and on each row fetch
    pub query_timeout: Duration,
    /// Tables to include (empty = all tables)
    pub include_tables: Vec<String>,
    /// Tables to exclude
    pub exclude_tables: Vec<String>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            drop_first: false,
            ping_timeout: Duration::from_secs(55),
            metadata_timeout: Duration::from_secs(120),
            query_timeout: Duration::from_secs(120),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
        }
    }
}

impl BackupOptions {
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.include_tables = tables;
        self
    }

    pub fn with_excluded_tables(mut self, tables: Vec<String>) -> Self {
        self.exclude_tables = tables;
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// The longest deadline any single driver call is given
    pub fn longest_timeout(&self) -> Duration {
        self.ping_timeout
            .max(self.metadata_timeout)
            .max(self.query_timeout)
    }

    fn should_include_table(&self, table_name: &str) -> bool {
        if !self.include_tables.is_empty()
            && !self.include_tables.iter().any(|t| t == table_name)
        {
            return false;
        }
        !self.exclude_tables.iter().any(|t| t == table_name)
    }
}

/// Progress callback for backup runs
pub type BackupProgressCallback = Box<dyn Fn(BackupProgress) + Send + Sync>;

/// Backup progress information
#[derive(Debug, Clone)]
pub struct BackupProgress {
    pub phase: BackupPhase,
    /// Table being processed
    pub current_table: Option<String>,
    pub total_tables: usize,
    pub tables_completed: usize,
    /// Rows written for the current table (or in total once complete)
    pub rows_written: u64,
    pub message: Option<String>,
}

/// Phases of a backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    /// Listing tables
    Starting,
    /// A table has been started
    BackingUpTable,
    /// A table has been fully written
    TableComplete,
    /// Every table has been written
    Complete,
}

/// Outcome of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table_name: String,
    /// Columns recognized in the DDL
    pub columns: usize,
    /// INSERT statements written
    pub rows: u64,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub tables: Vec<TableSummary>,
}

impl BackupSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Writes a replayable SQL script for the tables behind a connection
pub struct SqlBackup {
    connection: Arc<dyn Connection>,
    options: BackupOptions,
    parser: SchemaParser,
    progress_callback: Option<BackupProgressCallback>,
}

impl SqlBackup {
    pub fn new(connection: Arc<dyn Connection>, options: BackupOptions) -> Self {
        Self {
            connection,
            options,
            parser: SchemaParser::new(),
            progress_callback: None,
        }
    }

    /// Set progress callback
    pub fn with_progress_callback(mut self, callback: BackupProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, progress: BackupProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    /// Back up every table owned by the connected principal, in catalog order.
    pub async fn backup_all(&self, out: &mut dyn Write) -> Result<BackupSummary, BackupError> {
        self.report_progress(BackupProgress {
            phase: BackupPhase::Starting,
            current_table: None,
            total_tables: 0,
            tables_completed: 0,
            rows_written: 0,
            message: Some("Listing tables...".into()),
        });

        let tables: Vec<String> = bounded(
            self.options.metadata_timeout,
            "table listing",
            self.connection.list_tables(),
        )
        .await
        .map_err(|e| BackupError::TableEnumeration(e.to_string()))?
            .into_iter()
            .filter(|t| self.options.should_include_table(t))
            .collect();

        let total_tables = tables.len();
        tracing::info!(tables = total_tables, driver = self.connection.driver_name(), "starting backup");

        let mut summary = BackupSummary::default();
        for (idx, table_name) in tables.iter().enumerate() {
            self.report_progress(BackupProgress {
                phase: BackupPhase::BackingUpTable,
                current_table: Some(table_name.clone()),
                total_tables,
                tables_completed: idx,
                rows_written: 0,
                message: Some(format!("Backing up table [{}]", table_name)),
            });

            let table_summary = self.backup_table(table_name, out).await?;

            self.report_progress(BackupProgress {
                phase: BackupPhase::TableComplete,
                current_table: Some(table_name.clone()),
                total_tables,
                tables_completed: idx + 1,
                rows_written: table_summary.rows,
                message: Some(format!(
                    "Wrote {} rows from [{}]",
                    table_summary.rows, table_name
                )),
            });
            summary.tables.push(table_summary);
        }

        self.report_progress(BackupProgress {
            phase: BackupPhase::Complete,
            current_table: None,
            total_tables,
            tables_completed: total_tables,
            rows_written: summary.total_rows(),
            message: Some("Backup completed successfully".into()),
        });

        Ok(summary)
    }

    /// Back up a single table: optional DROP, the catalog DDL, then its rows.
    pub async fn backup_table(
        &self,
        table_name: &str,
        out: &mut dyn Write,
    ) -> Result<TableSummary, BackupError> {
        bounded(
            self.options.ping_timeout,
            "liveness check",
            self.connection.ping(),
        )
        .await
        .map_err(|e| BackupError::Liveness {
            table: table_name.to_string(),
            message: e.to_string(),
        })?;

        let ddl = bounded(
            self.options.metadata_timeout,
            "DDL fetch",
            self.connection.fetch_table_ddl(table_name),
        )
        .await
        .map_err(|e| BackupError::MetadataFetch {
            table: table_name.to_string(),
            message: e.to_string(),
        })?;

        if self.options.drop_first {
            writeln!(out, "DROP TABLE \"{}\";", table_name)?;
        }
        writeln!(out, "{}", ddl)?;

        let schema = self.parser.parse(&ddl);
        let rows = if schema.is_empty() {
            tracing::warn!(table = %table_name, "no columns recognized in DDL; skipping row data");
            0
        } else {
            // Keeps `&` in data from being taken as a substitution variable on replay.
            writeln!(out, "SET DEFINE OFF;")?;
            self.write_rows(table_name, &schema, out).await?
        };

        writeln!(out)?;
        writeln!(out)?;
        out.flush()?;

        tracing::info!(table = %table_name, columns = schema.len(), rows, "table backed up");
        Ok(TableSummary {
            table_name: table_name.to_string(),
            columns: schema.len(),
            rows,
        })
    }

    async fn write_rows(
        &self,
        table_name: &str,
        schema: &TableSchema,
        out: &mut dyn Write,
    ) -> Result<u64, BackupError> {
        let query = build_projection(table_name, schema);
        tracing::debug!(table = %table_name, sql = %query.sql, "opening row query");

        let mut cursor = bounded(
            self.options.query_timeout,
            "row query",
            self.connection.open_rows(&query),
        )
        .await
        .map_err(|e| query_error(table_name, e))?;

        match self
            .drain_cursor(table_name, schema, cursor.as_mut(), out)
            .await
        {
            Ok(rows) => {
                bounded(self.options.query_timeout, "cursor close", cursor.close())
                    .await
                    .map_err(|e| query_error(table_name, e))?;
                Ok(rows)
            }
            Err(DrainError::Stalled(e)) => {
                // close would wait on the stuck fetch; dropping releases the cursor.
                tracing::warn!(table = %table_name, error = %e, "row fetch timed out; releasing cursor");
                drop(cursor);
                Err(query_error(table_name, e))
            }
            Err(DrainError::Failed(e)) => {
                if let Err(close_err) =
                    bounded(self.options.query_timeout, "cursor close", cursor.close()).await
                {
                    tracing::warn!(table = %table_name, error = %close_err, "failed to close cursor");
                }
                Err(e)
            }
        }
    }

    async fn drain_cursor(
        &self,
        table_name: &str,
        schema: &TableSchema,
        cursor: &mut dyn RowCursor,
        out: &mut dyn Write,
    ) -> Result<u64, DrainError> {
        let serializer = RowSerializer::new(schema, table_name);
        let mut rows = 0u64;

        while let Some(row) = bounded(self.options.query_timeout, "row fetch", cursor.next_row())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DrainError::Stalled(e)
                } else {
                    DrainError::Failed(query_error(table_name, e))
                }
            })?
        {
            if row.len() != schema.len() {
                return Err(DrainError::Failed(BackupError::RowWidthMismatch {
                    table: table_name.to_string(),
                    row: rows + 1,
                    expected: schema.len(),
                    actual: row.len(),
                }));
            }
            writeln!(out, "{}", serializer.serialize_row(&row))
                .map_err(|e| DrainError::Failed(e.into()))?;
            rows += 1;
        }

        Ok(rows)
    }
}

/// Why a cursor drain stopped before the end of the rows
enum DrainError {
    /// A fetch outlived its deadline and may still be running in the driver
    Stalled(SqlBackupError),
    Failed(BackupError),
}

fn query_error(table_name: &str, e: SqlBackupError) -> BackupError {
    BackupError::QueryExecution {
        table: table_name.to_string(),
        message: e.to_string(),
    }
}

/// Run a driver operation under a hard deadline.
///
/// On expiry the operation's future is dropped, not awaited.
async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = sqlbackup_core::Result<T>>,
) -> sqlbackup_core::Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SqlBackupError::Timeout { operation, limit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_options_default() {
        let options = BackupOptions::default();
        assert!(!options.drop_first);
        assert_eq!(options.ping_timeout, Duration::from_secs(55));
        assert_eq!(options.metadata_timeout, Duration::from_secs(120));
        assert_eq!(options.query_timeout, Duration::from_secs(120));
        assert!(options.include_tables.is_empty());
    }

    #[test]
    fn test_longest_timeout() {
        let options = BackupOptions::default()
            .with_ping_timeout(Duration::from_secs(5))
            .with_query_timeout(Duration::from_secs(600));
        assert_eq!(options.longest_timeout(), Duration::from_secs(600));
        assert_eq!(
            BackupOptions::default().longest_timeout(),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_table_filters() {
        let options = BackupOptions::default()
            .with_tables(vec!["A".into(), "B".into()])
            .with_excluded_tables(vec!["B".into()]);
        assert!(options.should_include_table("A"));
        assert!(!options.should_include_table("B"));
        assert!(!options.should_include_table("C"));

        let options = BackupOptions::default().with_excluded_tables(vec!["LOG".into()]);
        assert!(options.should_include_table("EMP"));
        assert!(!options.should_include_table("LOG"));
    }

    #[test]
    fn test_summary_total_rows() {
        let summary = BackupSummary {
            tables: vec![
                TableSummary {
                    table_name: "A".into(),
                    columns: 2,
                    rows: 3,
                },
                TableSummary {
                    table_name: "B".into(),
                    columns: 1,
                    rows: 4,
                },
            ],
        };
        assert_eq!(summary.total_rows(), 7);
    }
}
