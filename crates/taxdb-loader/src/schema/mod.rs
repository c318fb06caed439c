//! Database schema: description, DDL rendering and rebuild
//!
//! The tables are described as data ([`tables`]) and rendered to SQL by
//! [`ddl`]; [`manager`] drops and recreates the database from that
//! description on every run.

pub mod ddl;
pub mod manager;
pub mod tables;
pub mod types;

pub use manager::SchemaManager;
pub use tables::{ALL_TABLES, CITATION_TAXA, NAME_CLASS, SCHEMA_VERSION};
pub use types::{Column, ColumnType, EnumType, ForeignKey, Index, TableSchema};

use std::collections::HashSet;

use crate::error::{LoaderError, Result};

/// The set of types and tables created for one run
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: u32,
    pub enums: Vec<&'static EnumType>,
    /// Creation order; referenced tables come first
    pub tables: Vec<&'static TableSchema>,
}

impl Schema {
    /// The taxonomy schema, with the citation join table when requested
    pub fn new(normalize_citations: bool) -> Self {
        let mut tables = ALL_TABLES.to_vec();
        if normalize_citations {
            tables.push(&CITATION_TAXA);
        }
        Self {
            version: SCHEMA_VERSION,
            enums: vec![&NAME_CLASS],
            tables,
        }
    }

    pub fn table(&self, name: &str) -> Option<&'static TableSchema> {
        self.tables.iter().copied().find(|t| t.name == name)
    }

    /// Check internal consistency
    ///
    /// Every foreign key must point at an existing column of a table created
    /// earlier, and indexed and enum-typed columns must exist.
    pub fn validate(&self) -> Result<()> {
        let enum_names: HashSet<_> = self.enums.iter().map(|e| e.name).collect();
        let mut created: Vec<&TableSchema> = Vec::with_capacity(self.tables.len());

        for &table in &self.tables {
            if created.iter().any(|t| t.name == table.name) {
                return Err(schema_error(format!("table '{}' defined twice", table.name)));
            }

            for column in table.columns {
                if let ColumnType::Enum(name) = column.col_type {
                    if !enum_names.contains(name) {
                        return Err(schema_error(format!(
                            "{}.{} uses undeclared type '{}'",
                            table.name, column.name, name
                        )));
                    }
                }
            }

            for fk in table.foreign_keys {
                if table.column(fk.column).is_none() {
                    return Err(schema_error(format!(
                        "foreign key column {}.{} does not exist",
                        table.name, fk.column
                    )));
                }
                let target = created
                    .iter()
                    .find(|t| t.name == fk.references_table)
                    .ok_or_else(|| {
                        schema_error(format!(
                            "{}.{} references '{}', which is not created before it",
                            table.name, fk.column, fk.references_table
                        ))
                    })?;
                if target.column(fk.references_column).is_none() {
                    return Err(schema_error(format!(
                        "{}.{} references missing column {}.{}",
                        table.name, fk.column, fk.references_table, fk.references_column
                    )));
                }
            }

            for index in table.indexes {
                if table.column(index.column).is_none() {
                    return Err(schema_error(format!(
                        "index on missing column {}.{}",
                        table.name, index.column
                    )));
                }
            }

            created.push(table);
        }

        Ok(())
    }

    /// DDL statements creating the whole schema, in execution order
    pub fn statements(&self) -> Vec<String> {
        let mut statements: Vec<String> = self.enums.iter().map(|e| ddl::create_enum(e)).collect();
        for table in &self.tables {
            statements.extend(ddl::table_statements(table));
        }
        statements
    }
}

fn schema_error(msg: String) -> LoaderError {
    LoaderError::Schema(msg)
}
