//! Core types for SQLbackup

/// One column's undecoded value for one row
///
/// Text columns arrive already rendered by the query layer (e.g. through
/// `TO_CHAR`), binary columns arrive as their raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCell {
    /// SQL NULL
    Null,
    /// Raw bytes as fetched
    Bytes(Vec<u8>),
}

impl RawCell {
    /// Build a cell from text
    pub fn text(value: impl Into<String>) -> Self {
        RawCell::Bytes(value.into().into_bytes())
    }

    /// Build a cell from an optional byte buffer, `None` meaning NULL
    pub fn from_option(value: Option<Vec<u8>>) -> Self {
        match value {
            Some(bytes) => RawCell::Bytes(bytes),
            None => RawCell::Null,
        }
    }
}

impl From<Option<String>> for RawCell {
    fn from(value: Option<String>) -> Self {
        RawCell::from_option(value.map(String::into_bytes))
    }
}

/// A row of raw cells, positionally aligned with the projection
pub type RawRow = Vec<RawCell>;

/// How the driver must fetch one projected position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEncoding {
    /// Character data, handed over as its UTF-8 bytes
    Text,
    /// Binary data (LOB/RAW), handed over untouched
    Binary,
}

/// A row query together with the fetch encoding of each projected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionQuery {
    /// Table the query reads from
    pub table_name: String,
    /// Full SELECT statement
    pub sql: String,
    /// One entry per projected column, in projection order
    pub encodings: Vec<CellEncoding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cell_from_option_string() {
        assert_eq!(RawCell::from(None::<String>), RawCell::Null);
        assert_eq!(
            RawCell::from(Some("abc".to_string())),
            RawCell::Bytes(b"abc".to_vec())
        );
    }
}
