//! Getting the taxdump onto local disk
//!
//! - [`fetch`]: download `taxdmp.zip` over FTP or HTTP(S)
//! - [`archive`]: expand it into the working directory
//! - [`inspector`]: decide whether a directory already has what the load needs

pub mod archive;
pub mod fetch;
pub mod inspector;

pub use archive::ArchiveExpander;
pub use fetch::{
    transport_for, ArchiveFetcher, ArchiveTransport, FtpTransport, HttpTransport,
    TransportTimeouts,
};
pub use inspector::LocalDataInspector;
