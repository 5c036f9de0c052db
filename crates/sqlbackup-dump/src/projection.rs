//! Row query builder
//!
//! Only national-character and BLOB columns are fetched raw; every other
//! column is wrapped in `TO_CHAR` so its bytes are already a literal by the
//! time they reach [`crate::encode_cell`].

use crate::literal::DATE_MASK;
use crate::schema_parser::{ColumnKind, TableSchema};
use sqlbackup_core::{CellEncoding, ProjectionQuery};

/// Build the SELECT that feeds the row serializer for one table.
pub fn build_projection(table_name: &str, schema: &TableSchema) -> ProjectionQuery {
    let mut columns = Vec::with_capacity(schema.len());
    let mut encodings = Vec::with_capacity(schema.len());

    for descriptor in schema {
        let (expr, encoding) = match descriptor.kind() {
            ColumnKind::NationalText => (descriptor.name.clone(), CellEncoding::Text),
            ColumnKind::Blob => (descriptor.name.clone(), CellEncoding::Binary),
            ColumnKind::Date => (
                format!("TO_CHAR({},'{}')", descriptor.name, DATE_MASK),
                CellEncoding::Text,
            ),
            ColumnKind::Other => (format!("TO_CHAR({})", descriptor.name), CellEncoding::Text),
        };
        columns.push(expr);
        encodings.push(encoding);
    }

    ProjectionQuery {
        table_name: table_name.to_string(),
        sql: format!(
            "SELECT {} FROM {}",
            columns.join(","),
            quote_identifier(table_name)
        ),
        encodings,
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
