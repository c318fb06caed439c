//! taxdb common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared pieces used by the taxdb workspace members:
//!
//! - **Dump format**: the NCBI taxdump record layout (`\t|\t` fields,
//!   `\t|\n` lines) and a streaming record reader
//! - **Errors**: dump parsing errors
//! - **Logging**: tracing subscriber configuration
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use taxdb_common::dump::DumpReader;
//!
//! fn count_nodes(path: &str) -> taxdb_common::Result<usize> {
//!     let reader = DumpReader::new(BufReader::new(File::open(path)?));
//!     let mut count = 0;
//!     for record in reader {
//!         record?;
//!         count += 1;
//!     }
//!     Ok(count)
//! }
//! ```

pub mod dump;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use dump::{DumpFile, DumpReader, DumpRecord};
pub use error::{DumpError, Result};
