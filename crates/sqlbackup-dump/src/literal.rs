//! Literal encoder: renders one raw cell as a SQL literal fragment.

use crate::schema_parser::{ColumnDescriptor, ColumnKind};
use sqlbackup_core::RawCell;
use std::borrow::Cow;

/// Date format shared by the projection (`TO_CHAR`) and the emitted `TO_DATE`
pub const DATE_MASK: &str = "RR-MM-DD";

/// Encode a cell for embedding in an INSERT statement.
///
/// | column kind    | literal                          |
/// |----------------|----------------------------------|
/// | any, NULL cell | `NULL`                           |
/// | `NVARCHAR*`    | `'text'` (not escaped)           |
/// | `DATE*`        | `TO_DATE('text','RR-MM-DD')`     |
/// | `BLOB*`        | `HEXTORAW('DEAD')`, uppercase hex |
/// | anything else  | text verbatim, unquoted          |
///
/// Text is expected to be rendered upstream (see [`crate::build_projection`]);
/// bytes that are not valid UTF-8 are replaced, never transcoded.
pub fn encode_cell(value: &RawCell, descriptor: &ColumnDescriptor) -> String {
    let bytes = match value {
        RawCell::Null => return "NULL".to_string(),
        RawCell::Bytes(bytes) => bytes,
    };

    match descriptor.kind() {
        ColumnKind::NationalText => format!("'{}'", text(bytes)),
        ColumnKind::Date => format!("TO_DATE('{}','{}')", text(bytes), DATE_MASK),
        ColumnKind::Blob => format!("HEXTORAW('{}')", hex::encode_upper(bytes)),
        ColumnKind::Other => text(bytes).into_owned(),
    }
}

fn text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}
