//! Row serializer: one `INSERT` statement per row.

use crate::literal::encode_cell;
use crate::schema_parser::TableSchema;
use sqlbackup_core::{RawCell, RawRow};

/// Builds INSERT statements for one table
///
/// The column list is computed once; cells are matched to descriptors by
/// position.
#[derive(Debug, Clone)]
pub struct RowSerializer<'a> {
    schema: &'a TableSchema,
    table_name: &'a str,
    column_list: String,
}

impl<'a> RowSerializer<'a> {
    pub fn new(schema: &'a TableSchema, table_name: &'a str) -> Self {
        let column_list = schema.column_names().collect::<Vec<_>>().join(",");
        Self {
            schema,
            table_name,
            column_list,
        }
    }

    /// Render one row as `Insert Into <table> (<columns>) VALUES (<values>);`
    pub fn serialize_row(&self, row: &[RawCell]) -> String {
        debug_assert_eq!(row.len(), self.schema.len(), "row width must match schema");
        let values = row
            .iter()
            .zip(self.schema.iter())
            .map(|(cell, descriptor)| encode_cell(cell, descriptor))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "Insert Into {} ({}) VALUES ({});",
            self.table_name, self.column_list, values
        )
    }
}

/// Lazily serialize rows in the order they are received.
pub fn serialize_rows<'a, I>(
    schema: &'a TableSchema,
    rows: I,
    table_name: &'a str,
) -> impl Iterator<Item = String> + 'a
where
    I: IntoIterator<Item = RawRow>,
    I::IntoIter: 'a,
{
    let serializer = RowSerializer::new(schema, table_name);
    rows.into_iter().map(move |row| serializer.serialize_row(&row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_parser::ColumnDescriptor;
    use pretty_assertions::assert_eq;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDescriptor::new("ID", "NUMBER"),
            ColumnDescriptor::new("NAME", "NVARCHAR2(10)"),
            ColumnDescriptor::new("CREATED", "DATE"),
        ])
    }

    #[test]
    fn test_single_row() {
        let schema = schema();
        let row = vec![RawCell::text("1"), RawCell::text("abc"), RawCell::text("01-JAN-24")];
        let statements: Vec<_> = serialize_rows(&schema, vec![row], "T").collect();
        assert_eq!(
            statements,
            vec!["Insert Into T (ID,NAME,CREATED) VALUES (1,'abc',TO_DATE('01-JAN-24','RR-MM-DD'));"]
        );
    }

    #[test]
    fn test_rows_keep_input_order() {
        let schema = TableSchema::new(vec![ColumnDescriptor::new("\"V\"", "NUMBER")]);
        let rows = ["A", "B", "C"].map(|v| vec![RawCell::text(v)]);
        let statements: Vec<_> = serialize_rows(&schema, rows, "T").collect();
        assert_eq!(
            statements,
            vec![
                "Insert Into T (\"V\") VALUES (A);",
                "Insert Into T (\"V\") VALUES (B);",
                "Insert Into T (\"V\") VALUES (C);",
            ]
        );
    }

    #[test]
    fn test_nulls_and_blob() {
        let schema = TableSchema::new(vec![
            ColumnDescriptor::new("\"ID\"", "NUMBER"),
            ColumnDescriptor::new("\"DATA\"", "BLOB"),
            ColumnDescriptor::new("\"AT\"", "DATE"),
        ]);
        let serializer = RowSerializer::new(&schema, "FILES");
        assert_eq!(
            serializer.serialize_row(&[
                RawCell::text("7"),
                RawCell::Bytes(vec![0xCA, 0xFE]),
                RawCell::Null
            ]),
            "Insert Into FILES (\"ID\",\"DATA\",\"AT\") VALUES (7,HEXTORAW('CAFE'),NULL);"
        );
    }

    #[test]
    fn test_serialize_rows_is_lazy() {
        let schema = schema();
        let rows = std::iter::repeat_with(|| vec![RawCell::Null, RawCell::Null, RawCell::Null]);
        let first: Vec<_> = serialize_rows(&schema, rows, "T").take(2).collect();
        assert_eq!(first.len(), 2);
    }
}
