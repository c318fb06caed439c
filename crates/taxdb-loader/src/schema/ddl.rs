//! Rendering of the schema description to PostgreSQL DDL
//!
//! Every identifier goes through [`quote_identifier`], so reserved words such
//! as `rank` and `name` are safe as column names.

use pg_escape::{quote_identifier, quote_literal};

use super::tables::SCHEMA_VERSION;
use super::types::{Column, ColumnType, EnumType, TableSchema};

/// `CREATE TYPE` for an enumeration
pub fn create_enum(enum_type: &EnumType) -> String {
    let values: Vec<_> = enum_type.values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({})",
        quote_identifier(enum_type.name),
        values.join(", ")
    )
}

fn column_definition(column: &Column) -> String {
    let name = quote_identifier(column.name);
    let sql_type = match column.col_type {
        ColumnType::Enum(enum_name) => quote_identifier(enum_name).into_owned(),
        other => other.sql_type(),
    };

    let mut def = format!("{} {}", name, sql_type);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = column.default {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    if column.col_type.is_integer() {
        def.push_str(&format!(" CHECK ({} >= 0)", name));
    }
    def
}

/// `CREATE TABLE` with columns, primary key and foreign keys
pub fn create_table(table: &TableSchema) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_definition).collect();

    if let Some(pk) = table.primary_key() {
        parts.push(format!("PRIMARY KEY ({})", quote_identifier(pk.name)));
    }
    for fk in table.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE CASCADE ON DELETE CASCADE",
            quote_identifier(fk.column),
            quote_identifier(fk.references_table),
            quote_identifier(fk.references_column)
        ));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_identifier(table.name),
        parts.join(",\n    ")
    )
}

/// `CREATE INDEX` statements for a table
pub fn create_indexes(table: &TableSchema) -> Vec<String> {
    table
        .indexes
        .iter()
        .map(|index| {
            format!(
                "CREATE INDEX {} ON {} ({})",
                quote_identifier(&index.name(table.name)),
                quote_identifier(table.name),
                quote_identifier(index.column)
            )
        })
        .collect()
}

/// Table comment recording origin and schema version
pub fn comment_on_table(table: &TableSchema) -> String {
    let origin = match table.source {
        Some(file) => format!("NCBI Taxonomy {}", file),
        None => "derived from NCBI Taxonomy".to_string(),
    };
    format!(
        "COMMENT ON TABLE {} IS {}",
        quote_identifier(table.name),
        quote_literal(&format!("{}, schema version {}", origin, SCHEMA_VERSION))
    )
}

/// All statements for one table, in execution order
pub fn table_statements(table: &TableSchema) -> Vec<String> {
    let mut statements = vec![create_table(table)];
    statements.extend(create_indexes(table));
    statements.push(comment_on_table(table));
    statements
}
