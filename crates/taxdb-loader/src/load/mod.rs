//! Bulk load of dump files through `COPY ... FROM STDIN`

pub mod copy;
pub mod loader;

pub use copy::CopyEncoder;
pub use loader::{BulkLoader, LoadReport, TableLoad};
