//! Re-encoding of dump records as `COPY ... FROM STDIN` text rows
//!
//! COPY text format rules:
//! - fields separated by TAB, rows terminated by NEWLINE
//! - NULL: `\N`
//! - text: backslash-escape `\`, tab, newline, carriage return; strip NUL bytes
//!
//! Empty dump fields are mapped per column type. Integer and boolean columns
//! take the column default, else NULL; a `NOT NULL` column with neither is
//! a malformed record. Empty text stays the empty string. Enum columns
//! cannot hold an empty label, so they become NULL.

use pg_escape::quote_identifier;
use taxdb_common::{DumpError, DumpRecord};

use crate::schema::{Column, ColumnType, TableSchema};

const NULL: &[u8] = b"\\N";

/// Encodes the records of one dump file for one table
#[derive(Debug)]
pub struct CopyEncoder {
    table: &'static TableSchema,
    surplus_records: u64,
}

impl CopyEncoder {
    pub fn new(table: &'static TableSchema) -> Self {
        Self {
            table,
            surplus_records: 0,
        }
    }

    /// `COPY table (columns) FROM STDIN` in text format
    pub fn copy_statement(&self) -> String {
        let columns = self
            .table
            .columns
            .iter()
            .map(|c| quote_identifier(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "COPY {} ({}) FROM STDIN",
            quote_identifier(self.table.name),
            columns
        )
    }

    /// Records that carried more fields than the table has columns
    pub fn surplus_records(&self) -> u64 {
        self.surplus_records
    }

    /// Append `record` as one COPY row to `buf`
    ///
    /// Nothing is appended when the record is rejected.
    pub fn encode(&mut self, record: &DumpRecord, buf: &mut Vec<u8>) -> Result<(), DumpError> {
        let expected = self.table.columns.len();
        let found = record.fields.len();
        if found < expected {
            return Err(DumpError::FieldCount {
                line: record.line,
                expected,
                found,
            });
        }
        if found > expected {
            // Newer dumps append columns; only the known prefix is loaded.
            self.surplus_records += 1;
        }

        let start = buf.len();
        for (i, (column, raw)) in self.table.columns.iter().zip(&record.fields).enumerate() {
            if i > 0 {
                buf.push(b'\t');
            }
            if let Err(e) = write_field(buf, column, raw, record.line) {
                buf.truncate(start);
                return Err(e);
            }
        }
        buf.push(b'\n');
        Ok(())
    }
}

fn write_field(buf: &mut Vec<u8>, column: &Column, raw: &str, line: usize) -> Result<(), DumpError> {
    match column.col_type {
        ColumnType::Unsigned | ColumnType::Boolean => {
            let value = raw.trim();
            if !value.is_empty() {
                write_text(buf, value);
            } else if let Some(default) = column.default {
                write_text(buf, default);
            } else if column.nullable {
                buf.extend_from_slice(NULL);
            } else {
                return Err(DumpError::MissingValue {
                    line,
                    column: column.name.to_string(),
                });
            }
        },
        ColumnType::Enum(_) => {
            let value = raw.trim();
            if value.is_empty() {
                buf.extend_from_slice(NULL);
            } else {
                write_text(buf, value);
            }
        },
        ColumnType::Text | ColumnType::VarChar(_) => write_text(buf, raw),
    }
    Ok(())
}

fn write_text(buf: &mut Vec<u8>, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            0 => {},
            _ => buf.push(byte),
        }
    }
}
