//! Oracle connection implementation
//!
//! The `oracle` crate is blocking, so every call runs on tokio's blocking
//! pool. Row cursors are pumped by a blocking task into a bounded channel;
//! dropping or closing the cursor stops the pump, which drops the result set
//! and releases the server-side cursor.
//!
//! A blocking call cannot be cancelled from the async side. The session call
//! timeout makes the server give up on a stuck round trip, and lock waits are
//! bounded by the same limit so later calls fail with `Busy` instead of
//! queueing behind it.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::dsn::OracleConnectOptions;
use sqlbackup_core::{
    CellEncoding, Connection, ProjectionQuery, RawCell, RawRow, Result, RowCursor, SqlBackupError,
};

const LIST_TABLES_SQL: &str = "SELECT table_name FROM user_tables";
const TABLE_DDL_SQL: &str = "SELECT dbms_metadata.get_ddl('TABLE', :1) FROM dual";

/// Rows buffered between the pump and the reader
const ROW_CHANNEL_CAPACITY: usize = 256;

/// Oracle connection wrapper
pub struct OracleConnection {
    conn: Arc<Mutex<oracle::Connection>>,
    username: String,
    call_timeout: Option<Duration>,
}

impl OracleConnection {
    /// Connect with `user/password@connect_string` credentials
    pub async fn connect(options: OracleConnectOptions) -> Result<Self> {
        tracing::info!(
            user = %options.username,
            connect_string = %options.connect_string,
            call_timeout = ?options.call_timeout,
            "connecting to Oracle"
        );
        let username = options.username.clone();
        let call_timeout = options.call_timeout;
        let conn = tokio::task::spawn_blocking(move || {
            let conn = oracle::Connection::connect(
                &options.username,
                &options.password,
                &options.connect_string,
            )?;
            conn.set_call_timeout(options.call_timeout)?;
            Ok::<_, oracle::Error>(conn)
        })
        .await
        .map_err(|e| task_error("connect", e))?
        .map_err(|e| SqlBackupError::Connection(e.to_string()))?;

        tracing::info!(user = %username, "Oracle connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            username,
            call_timeout,
        })
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&oracle::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let wait = self.call_timeout;
        tokio::task::spawn_blocking(move || {
            let guard = acquire(&conn, wait, operation)?;
            f(&guard)
        })
        .await
        .map_err(|e| task_error(operation, e))?
    }
}

fn acquire<'a>(
    conn: &'a Mutex<oracle::Connection>,
    wait: Option<Duration>,
    operation: &'static str,
) -> Result<MutexGuard<'a, oracle::Connection>> {
    match wait {
        Some(waited) => conn
            .try_lock_for(waited)
            .ok_or(SqlBackupError::Busy { operation, waited }),
        None => Ok(conn.lock()),
    }
}

fn task_error(operation: &'static str, e: tokio::task::JoinError) -> SqlBackupError {
    SqlBackupError::Task {
        operation,
        message: e.to_string(),
    }
}

fn catalog_error(object: &str, e: oracle::Error) -> SqlBackupError {
    SqlBackupError::Catalog {
        object: object.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl Connection for OracleConnection {
    fn driver_name(&self) -> &str {
        "oracle"
    }

    async fn ping(&self) -> Result<()> {
        self.run_blocking("ping", |conn| {
            conn.ping()
                .map_err(|e| SqlBackupError::Connection(e.to_string()))
        })
        .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.run_blocking("table listing", |conn| {
            let rows = conn
                .query_as::<String>(LIST_TABLES_SQL, &[])
                .map_err(|e| catalog_error("user_tables", e))?;
            rows.map(|row| row.map_err(|e| catalog_error("user_tables", e)))
                .collect()
        })
        .await
    }

    async fn fetch_table_ddl(&self, table_name: &str) -> Result<String> {
        tracing::debug!(table = %table_name, "fetching table DDL");
        let table_name = table_name.to_string();
        self.run_blocking("DDL fetch", move |conn| {
            let rows = conn
                .query_as::<String>(TABLE_DDL_SQL, &[&table_name])
                .map_err(|e| catalog_error(&table_name, e))?;
            let mut ddl = String::new();
            for row in rows {
                let statement = row.map_err(|e| catalog_error(&table_name, e))?;
                ddl.push_str(&statement);
                ddl.push_str(";\n");
            }
            Ok(ddl)
        })
        .await
    }

    async fn open_rows(&self, query: &ProjectionQuery) -> Result<Box<dyn RowCursor>> {
        tracing::debug!(table = %query.table_name, sql = %query.sql, "executing row query");
        let conn = Arc::clone(&self.conn);
        let wait = self.call_timeout;
        let sql = query.sql.clone();
        let encodings = query.encodings.clone();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (row_tx, row_rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);

        let pump = tokio::task::spawn_blocking(move || {
            let guard = match acquire(&conn, wait, "row query") {
                Ok(guard) => guard,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let rows = match guard.query(&sql, &[]) {
                Ok(rows) => {
                    let _ = ready_tx.send(Ok(()));
                    rows
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(SqlBackupError::RowQuery(e.to_string())));
                    return;
                }
            };

            for row in rows {
                let cells = row
                    .map_err(|e| SqlBackupError::RowQuery(e.to_string()))
                    .and_then(|row| decode_row(&row, &encodings));
                let failed = cells.is_err();
                if row_tx.blocking_send(cells).is_err() {
                    tracing::debug!("row reader went away; stopping cursor");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(Box::new(OracleRowCursor {
                rows: row_rx,
                pump: Some(pump),
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SqlBackupError::RowQuery(
                "row query task ended before executing".into(),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        tracing::info!(user = %self.username, "closing Oracle connection");
        self.run_blocking("close", |conn| {
            conn.close()
                .map_err(|e| SqlBackupError::Connection(e.to_string()))
        })
        .await
    }
}

fn decode_row(row: &oracle::Row, encodings: &[CellEncoding]) -> Result<RawRow> {
    encodings
        .iter()
        .enumerate()
        .map(|(idx, encoding)| {
            let cell = match encoding {
                CellEncoding::Text => row.get::<usize, Option<String>>(idx).map(RawCell::from),
                CellEncoding::Binary => row
                    .get::<usize, Option<Vec<u8>>>(idx)
                    .map(RawCell::from_option),
            };
            cell.map_err(|e| SqlBackupError::Decode {
                column: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Cursor over a running Oracle row query
pub struct OracleRowCursor {
    rows: mpsc::Receiver<Result<RawRow>>,
    pump: Option<JoinHandle<()>>,
}

#[async_trait]
impl RowCursor for OracleRowCursor {
    async fn next_row(&mut self) -> Result<Option<RawRow>> {
        match self.rows.recv().await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.rows.close();
        match self.pump.take() {
            Some(pump) if pump.is_finished() => pump.await.map_err(|e| task_error("row query", e)),
            // Still inside a fetch; it stops at its next send now the channel is closed.
            Some(_) => {
                tracing::debug!("detaching row pump");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
