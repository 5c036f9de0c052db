//! SQLbackup dump engine
//!
//! Turns a table's catalog DDL and its rows into a replayable SQL script.
//!
//! # Architecture
//!
//! ```text
//! Connection ──DDL text──→ SchemaParser ──TableSchema──→ build_projection
//!      │                                                      │
//!      └──────────────── RowCursor ←──── ProjectionQuery ─────┘
//!                            │
//!                      RowSerializer ──encode_cell (per cell)──→ INSERT text
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let backup = SqlBackup::new(connection, BackupOptions::default().with_drop_first(true));
//! let summary = backup.backup_all(&mut std::io::stdout()).await?;
//! ```

mod backup;
mod literal;
mod projection;
mod row_serializer;
mod schema_parser;

pub use backup::{
    BackupError, BackupOptions, BackupPhase, BackupProgress, BackupProgressCallback,
    BackupSummary, SqlBackup, TableSummary,
};
pub use literal::{DATE_MASK, encode_cell};
pub use projection::build_projection;
pub use row_serializer::{RowSerializer, serialize_rows};
pub use schema_parser::{
    ColumnDescriptor, ColumnKind, LineClass, ParsedDdl, SchemaParser, SkippedLine, TableSchema,
    classify_line, parse_schema,
};
