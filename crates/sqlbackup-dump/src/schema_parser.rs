//! Schema parser: turns catalog DDL text into an ordered column schema.
//!
//! The catalog hands back free-text DDL (`CREATE TABLE` plus trailing index
//! and constraint statements). There is no SQL grammar here: the parser walks
//! trimmed lines through a small state machine and classifies each line
//! inside the column list with [`classify_line`].

/// Marker for an explicitly enabled NOT NULL constraint
const NOT_NULL_ENABLE: &str = "NOT NULL ENABLE";
const DEFAULT_KEYWORD: &str = "DEFAULT";
const CREATE_TABLE: &str = "CREATE TABLE";

/// Leading keywords of clause lines that legitimately appear inside the
/// column list and are skipped without a warning.
const CLAUSE_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "USING",
    "PRIMARY KEY",
    "UNIQUE",
    "CHECK",
    "FOREIGN KEY",
    "SUPPLEMENTAL",
    "REF",
    "SCOPE",
    "TABLESPACE",
    "PCTFREE",
    "STORAGE",
];

/// How the value of a column must be re-encoded, derived from its type text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `NVARCHAR`, `NVARCHAR2`, ... fetched raw, emitted as a quoted string
    NationalText,
    /// `DATE`, rendered with [`crate::DATE_MASK`] and emitted through `TO_DATE`
    Date,
    /// `BLOB`, fetched raw, emitted through `HEXTORAW`
    Blob,
    /// Numbers and every other scalar, rendered as text by the query
    Other,
}

impl ColumnKind {
    pub fn from_type_attribute(type_attribute: &str) -> Self {
        if type_attribute.starts_with("NVARCHAR") {
            ColumnKind::NationalText
        } else if type_attribute.starts_with("DATE") {
            ColumnKind::Date
        } else if type_attribute.starts_with("BLOB") {
            ColumnKind::Blob
        } else {
            ColumnKind::Other
        }
    }
}

/// One column of a table, in catalog declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnDescriptor {
    /// Identifier exactly as declared, quotes included
    pub name: String,
    /// Type and size text (e.g. `VARCHAR2(20)`) with DEFAULT/NOT NULL removed
    pub type_attribute: String,
    /// Default expression text, empty when none is declared
    pub default_literal: String,
    /// True only for an explicit `NOT NULL ENABLE`
    pub not_null: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_attribute: type_attribute.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> ColumnKind {
        ColumnKind::from_type_attribute(&self.type_attribute)
    }
}

/// Ordered column list of one table
///
/// Row data is matched to descriptors by position, so the order here must
/// be the order of the projection query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl<'a> IntoIterator for &'a TableSchema {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Classification of one line inside the parenthesized column list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// A column definition; holds the line with any leading `(` removed
    Column(&'a str),
    /// The closing `)` of the column list
    EndOfColumns,
    /// Nothing but whitespace
    Blank,
    /// A known constraint/index clause
    Clause(&'a str),
    /// Anything else; skipped, but possibly a lost column
    Unrecognized(&'a str),
}

/// Classify one raw line of the column list.
///
/// A column line is one that, once trimmed and stripped of a single leading
/// `(`, starts with a double quote.
pub fn classify_line(line: &str) -> LineClass<'_> {
    let trimmed = line.trim();
    let body = match trimmed.strip_prefix('(') {
        Some(rest) => rest.trim(),
        None => trimmed,
    };

    if body.starts_with(')') {
        LineClass::EndOfColumns
    } else if body.is_empty() {
        LineClass::Blank
    } else if body.starts_with('"') {
        LineClass::Column(body)
    } else if starts_with_clause_keyword(body) {
        LineClass::Clause(body)
    } else {
        LineClass::Unrecognized(body)
    }
}

fn starts_with_clause_keyword(body: &str) -> bool {
    let upper = body.to_ascii_uppercase();
    CLAUSE_KEYWORDS.iter().any(|kw| {
        upper.starts_with(kw)
            && upper[kw.len()..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || c == '(')
    })
}

/// A line inside the column list that did not produce a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number within the DDL text
    pub line_number: usize,
    pub text: String,
    /// True when the line starts with a known clause keyword
    pub known_clause: bool,
}

/// Result of parsing one DDL text, with diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDdl {
    pub schema: TableSchema,
    /// Whether a `CREATE TABLE` line was seen at all
    pub found_create_table: bool,
    pub skipped: Vec<SkippedLine>,
}

impl ParsedDdl {
    /// Skipped lines that are not recognizable clauses
    pub fn suspicious_lines(&self) -> impl Iterator<Item = &SkippedLine> {
        self.skipped.iter().filter(|l| !l.known_clause)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    AwaitingCreateTable,
    InColumnList,
    Done,
}

/// Line-oriented DDL parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaParser;

impl SchemaParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse DDL text, returning the schema and the lines that were skipped.
    pub fn parse_with_diagnostics(&self, ddl: &str) -> ParsedDdl {
        let mut parsed = ParsedDdl::default();
        let mut columns = Vec::new();
        let mut state = ParserState::AwaitingCreateTable;

        for (idx, line) in ddl.lines().enumerate() {
            match state {
                ParserState::AwaitingCreateTable => {
                    if line.trim().starts_with(CREATE_TABLE) {
                        parsed.found_create_table = true;
                        state = ParserState::InColumnList;
                    }
                }
                ParserState::InColumnList => match classify_line(line) {
                    LineClass::Column(body) => columns.push(parse_column_line(body)),
                    LineClass::EndOfColumns => state = ParserState::Done,
                    LineClass::Blank => {}
                    LineClass::Clause(text) => parsed.skipped.push(SkippedLine {
                        line_number: idx + 1,
                        text: text.to_string(),
                        known_clause: true,
                    }),
                    LineClass::Unrecognized(text) => parsed.skipped.push(SkippedLine {
                        line_number: idx + 1,
                        text: text.to_string(),
                        known_clause: false,
                    }),
                },
                ParserState::Done => break,
            }
        }

        parsed.schema = TableSchema::new(columns);
        parsed
    }

    /// Parse DDL text into a schema, logging every skipped line.
    pub fn parse(&self, ddl: &str) -> TableSchema {
        let parsed = self.parse_with_diagnostics(ddl);
        if !parsed.found_create_table {
            tracing::warn!("no CREATE TABLE statement found in DDL");
        }
        for line in &parsed.skipped {
            if line.known_clause {
                tracing::debug!(line = line.line_number, text = %line.text, "skipping clause line");
            } else {
                tracing::warn!(
                    line = line.line_number,
                    text = %line.text,
                    "skipping unrecognized line in column list; a column may be missing"
                );
            }
        }
        tracing::debug!(columns = parsed.schema.len(), "parsed table schema");
        parsed.schema
    }
}

/// Parse DDL text into a schema with the default parser.
pub fn parse_schema(ddl: &str) -> TableSchema {
    SchemaParser::new().parse(ddl)
}

fn parse_column_line(body: &str) -> ColumnDescriptor {
    let body = body.trim_end_matches(',').trim_end();
    let (name, rest) = split_name(body);

    let mut rest = rest.to_string();
    let not_null = match rest.find(NOT_NULL_ENABLE) {
        Some(pos) => {
            rest.replace_range(pos..pos + NOT_NULL_ENABLE.len(), "");
            true
        }
        None => false,
    };

    let mut default_literal = String::new();
    if let Some(pos) = rest.find(DEFAULT_KEYWORD) {
        let after = rest[pos + DEFAULT_KEYWORD.len()..].trim_start();
        let (literal, remainder) = split_default_value(after);
        default_literal = literal.to_string();
        rest = format!("{} {}", &rest[..pos], remainder);
    }

    ColumnDescriptor {
        name: name.to_string(),
        type_attribute: rest.split_whitespace().collect::<Vec<_>>().join(" "),
        default_literal,
        not_null,
    }
}

/// Split a column line into its quoted identifier and the remainder.
fn split_name(body: &str) -> (&str, &str) {
    if let Some(end) = body[1..].find('"') {
        let end = end + 2;
        return (&body[..end], body[end..].trim_start());
    }
    match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (body, ""),
    }
}

/// Split the text after `DEFAULT` into the default value and what follows.
///
/// Quoted values end at the next quote; doubled quotes are not unescaped.
fn split_default_value(after: &str) -> (&str, &str) {
    if let Some(quoted) = after.strip_prefix('\'') {
        return match quoted.find('\'') {
            Some(end) => after.split_at(end + 2),
            None => (after, ""),
        };
    }
    match after.split_once(char::is_whitespace) {
        Some((token, remainder)) => (token, remainder),
        None => (after, ""),
    }
}
