//! Transactional bulk load of every dump file

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use sqlx::postgres::PgCopyIn;
use sqlx::{Connection, PgConnection};
use taxdb_common::{DumpError, DumpReader};
use tracing::{error, info, warn};

use super::copy::CopyEncoder;
use crate::config::LoadSettings;
use crate::error::{LoaderError, Result};
use crate::schema::{TableSchema, ALL_TABLES, CITATION_TAXA};

/// Read buffer for dump files
const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Splits `citations.taxid_list` into one row per cited taxon
const POPULATE_CITATION_TAXA: &str = r"INSERT INTO citation_taxa (cit_id, tax_id)
SELECT c.cit_id, t.tax_id::BIGINT
FROM citations c
CROSS JOIN LATERAL regexp_split_to_table(btrim(c.taxid_list), '\s+') AS t(tax_id)
WHERE t.tax_id <> ''";

/// Rows written to one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: &'static str,
    pub rows: u64,
    /// Records whose extra trailing fields were dropped
    pub surplus_records: u64,
    /// Records whose invalid UTF-8 was replaced
    pub lossy_records: u64,
}

/// Outcome of a committed bulk load, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    /// Rows loaded into `table`, if it was loaded
    pub fn rows(&self, table: &str) -> Option<u64> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Streams the dump files into their tables inside one transaction
#[derive(Debug, Clone, Default)]
pub struct BulkLoader {
    settings: LoadSettings,
}

impl BulkLoader {
    pub fn new(settings: LoadSettings) -> Self {
        Self { settings }
    }

    /// Load every table in dependency order and commit once
    ///
    /// On any failure the transaction is rolled back, leaving every table
    /// empty, and the error names the table being loaded.
    pub async fn load_all(&self, conn: &mut PgConnection, directory: &Path) -> Result<LoadReport> {
        let mut tx = conn.begin().await?;
        let mut report = LoadReport::default();

        for &table in ALL_TABLES {
            match self.load_table(&mut *tx, table, directory).await {
                Ok(load) => report.tables.push(load),
                Err(e) => {
                    error!(table = table.name, error = %e, "Bulk load failed, rolling back");
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    return Err(e);
                },
            }
        }

        if self.settings.normalize_citations {
            match sqlx::query(POPULATE_CITATION_TAXA).execute(&mut *tx).await {
                Ok(done) => {
                    info!(table = CITATION_TAXA.name, rows = done.rows_affected(), "Loaded table");
                    report.tables.push(TableLoad {
                        table: CITATION_TAXA.name,
                        rows: done.rows_affected(),
                        surplus_records: 0,
                        lossy_records: 0,
                    });
                },
                Err(source) => {
                    error!(table = CITATION_TAXA.name, error = %source, "Bulk load failed, rolling back");
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    return Err(LoaderError::Load {
                        table: CITATION_TAXA.name,
                        source,
                    });
                },
            }
        }

        tx.commit().await?;
        info!(
            tables = report.tables.len(),
            rows = report.total_rows(),
            "Bulk load committed"
        );
        Ok(report)
    }

    async fn load_table(
        &self,
        conn: &mut PgConnection,
        table: &'static TableSchema,
        directory: &Path,
    ) -> Result<TableLoad> {
        let Some(file) = table.source else {
            return Err(LoaderError::Schema(format!(
                "table '{}' has no dump file",
                table.name
            )));
        };
        let path = directory.join(file.file_name());
        info!(table = table.name, file = %path.display(), "Loading table");

        let handle = File::open(&path).map_err(|e| LoaderError::io(&path, e))?;
        let mut reader = DumpReader::new(BufReader::with_capacity(READ_BUFFER_BYTES, handle));
        let mut encoder = CopyEncoder::new(table);

        let load_error = |source| LoaderError::Load {
            table: table.name,
            source,
        };

        let mut copy = conn
            .copy_in_raw(&encoder.copy_statement())
            .await
            .map_err(load_error)?;

        let sent = match self.stream(&mut copy, &mut reader, &mut encoder).await {
            Ok(sent) => sent,
            Err(e) => {
                let e = match e {
                    StreamError::Dump(source) => LoaderError::Dump {
                        file: file.file_name().to_string(),
                        source,
                    },
                    StreamError::Database(source) => load_error(source),
                };
                if let Err(abort) = copy.abort(e.to_string()).await {
                    warn!(table = table.name, error = %abort, "COPY abort failed");
                }
                return Err(e);
            },
        };

        let rows = copy.finish().await.map_err(load_error)?;
        if rows != sent {
            warn!(table = table.name, sent, rows, "Server row count differs from records sent");
        }
        if encoder.surplus_records() > 0 {
            warn!(
                table = table.name,
                records = encoder.surplus_records(),
                "Dump has more fields than the table, extra fields dropped"
            );
        }
        if reader.lossy_records() > 0 {
            warn!(
                table = table.name,
                records = reader.lossy_records(),
                "Dump has invalid UTF-8, replaced with U+FFFD"
            );
        }

        info!(table = table.name, rows, "Loaded table");
        Ok(TableLoad {
            table: table.name,
            rows,
            surplus_records: encoder.surplus_records(),
            lossy_records: reader.lossy_records(),
        })
    }

    /// Encode and send every record, flushing in bounded chunks
    async fn stream(
        &self,
        copy: &mut PgCopyIn<&mut PgConnection>,
        reader: &mut DumpReader<BufReader<File>>,
        encoder: &mut CopyEncoder,
    ) -> std::result::Result<u64, StreamError> {
        let flush_threshold = self.settings.flush_bytes.max(1);
        let mut buf = Vec::with_capacity(flush_threshold);
        let mut sent: u64 = 0;

        for record in reader.by_ref() {
            let record = record.map_err(StreamError::Dump)?;
            encoder.encode(&record, &mut buf).map_err(StreamError::Dump)?;
            sent += 1;

            if buf.len() >= flush_threshold {
                copy.send(std::mem::take(&mut buf))
                    .await
                    .map_err(StreamError::Database)?;
                buf = Vec::with_capacity(flush_threshold);
            }
        }

        if !buf.is_empty() {
            copy.send(buf).await.map_err(StreamError::Database)?;
        }
        Ok(sent)
    }
}

enum StreamError {
    Dump(DumpError),
    Database(sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lookup() {
        let report = LoadReport {
            tables: vec![
                TableLoad {
                    table: "division",
                    rows: 12,
                    surplus_records: 0,
                    lossy_records: 0,
                },
                TableLoad {
                    table: "nodes",
                    rows: 3,
                    surplus_records: 3,
                    lossy_records: 1,
                },
            ],
        };
        assert_eq!(report.rows("division"), Some(12));
        assert_eq!(report.rows("names"), None);
        assert_eq!(report.total_rows(), 15);
    }

    #[test]
    fn test_citation_taxa_statement_targets_join_table() {
        assert!(POPULATE_CITATION_TAXA.starts_with("INSERT INTO citation_taxa"));
        assert!(POPULATE_CITATION_TAXA.contains("FROM citations"));
    }
}
