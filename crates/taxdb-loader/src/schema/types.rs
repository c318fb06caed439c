//! Building blocks of the structured schema description

use taxdb_common::DumpFile;

/// Column types used by the taxonomy tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Non-negative integer identifier, `BIGINT` guarded by `CHECK (col >= 0)`
    Unsigned,
    Boolean,
    Text,
    VarChar(u16),
    /// Value of a named [`EnumType`]
    Enum(&'static str),
}

impl ColumnType {
    /// SQL type as it appears in `CREATE TABLE`
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Unsigned => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::VarChar(len) => format!("VARCHAR({})", len),
            ColumnType::Enum(name) => format!("\"{}\"", name),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Unsigned)
    }
}

/// Column definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// SQL literal used as `DEFAULT`, also substituted for empty dump fields
    pub default: Option<&'static str>,
}

impl Column {
    /// Nullable column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    /// `NOT NULL` column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, col_type)
        }
    }

    /// Single-column primary key
    pub const fn primary_key(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            primary_key: true,
            ..Self::required(name, col_type)
        }
    }

    pub const fn with_default(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

/// Foreign key, always `ON UPDATE CASCADE ON DELETE CASCADE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub const fn new(
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
    ) -> Self {
        Self {
            column,
            references_table,
            references_column,
        }
    }
}

/// Single-column B-tree index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub column: &'static str,
}

impl Index {
    pub const fn on(column: &'static str) -> Self {
        Self { column }
    }

    /// `idx_<table>_<column>`
    pub fn name(&self, table: &str) -> String {
        format!("idx_{}_{}", table, self.column)
    }
}

/// Closed enumeration created with `CREATE TYPE ... AS ENUM`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumType {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

/// Table definition
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    /// Dump file bulk-loaded into this table; `None` for derived tables
    pub source: Option<DumpFile>,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    pub indexes: &'static [Index],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }
}
