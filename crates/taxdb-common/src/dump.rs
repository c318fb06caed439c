//! NCBI taxdump record format
//!
//! Every `.dmp` file in `taxdmp.zip` shares one layout: fields are separated
//! by the literal sequence `TAB PIPE TAB` and every record ends with
//! `TAB PIPE NEWLINE`. Taxon names routinely contain commas, quotes and
//! backslashes, so nothing here treats those characters specially.
//!
//! [`DumpReader`] splits records on the terminator rather than on bare
//! newlines, which keeps a record intact even if a free-text field carries an
//! embedded line break.

use std::fmt;
use std::io::BufRead;

use crate::error::Result;

/// Field separator: `\t|\t`
pub const FIELD_SEPARATOR: &[u8] = b"\t|\t";

/// Record terminator: `\t|\n`
pub const LINE_TERMINATOR: &[u8] = b"\t|\n";

/// Name of the archive distributed by NCBI
pub const ARCHIVE_FILE_NAME: &str = "taxdmp.zip";

/// The dump files a complete taxdump provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpFile {
    Citations,
    DeletedNodes,
    Divisions,
    GeneticCodes,
    MergedNodes,
    Names,
    Nodes,
}

impl DumpFile {
    /// Every expected dump file, alphabetical by file name
    pub const ALL: [DumpFile; 7] = [
        DumpFile::Citations,
        DumpFile::DeletedNodes,
        DumpFile::Divisions,
        DumpFile::GeneticCodes,
        DumpFile::MergedNodes,
        DumpFile::Names,
        DumpFile::Nodes,
    ];

    /// File name inside the archive and the working directory
    pub fn file_name(self) -> &'static str {
        match self {
            DumpFile::Citations => "citations.dmp",
            DumpFile::DeletedNodes => "delnodes.dmp",
            DumpFile::Divisions => "division.dmp",
            DumpFile::GeneticCodes => "gencode.dmp",
            DumpFile::MergedNodes => "merged.dmp",
            DumpFile::Names => "names.dmp",
            DumpFile::Nodes => "nodes.dmp",
        }
    }

    /// Look up a dump file by its file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|file| file.file_name() == name)
    }
}

impl fmt::Display for DumpFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// One record of a dump file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRecord {
    /// 1-based line number where the record starts
    pub line: usize,
    /// Raw field values, untrimmed
    pub fields: Vec<String>,
}

impl DumpRecord {
    /// Split a record body (terminator already removed) into fields
    ///
    /// Invalid UTF-8 is replaced with U+FFFD; see [`DumpRecord::decode`].
    pub fn parse(line: usize, body: &[u8]) -> Self {
        Self::decode(line, body).0
    }

    /// Like [`DumpRecord::parse`], also reporting whether any field held
    /// invalid UTF-8
    pub fn decode(line: usize, body: &[u8]) -> (Self, bool) {
        let mut lossy = false;
        let fields = split_fields(body)
            .into_iter()
            .map(|field| match std::str::from_utf8(field) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    lossy = true;
                    String::from_utf8_lossy(field).into_owned()
                },
            })
            .collect();
        (Self { line, fields }, lossy)
    }

    /// Field value at `index`, if present
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// Split on every non-overlapping `\t|\t`
fn split_fields(body: &[u8]) -> Vec<&[u8]> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut cursor = 0;

    while cursor + FIELD_SEPARATOR.len() <= body.len() {
        if &body[cursor..cursor + FIELD_SEPARATOR.len()] == FIELD_SEPARATOR {
            fields.push(&body[start..cursor]);
            cursor += FIELD_SEPARATOR.len();
            start = cursor;
        } else {
            cursor += 1;
        }
    }
    fields.push(&body[start..]);

    fields
}

/// Streaming reader over `\t|\n`-terminated records
pub struct DumpReader<R> {
    inner: R,
    buf: Vec<u8>,
    line: usize,
    lossy_records: u64,
}

impl<R: BufRead> DumpReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
            line: 0,
            lossy_records: 0,
        }
    }

    /// Number of physical lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Records read so far whose invalid UTF-8 was replaced
    pub fn lossy_records(&self) -> u64 {
        self.lossy_records
    }

    /// Read the next record, `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<DumpRecord>> {
        self.buf.clear();
        let mut start_line = self.line + 1;

        loop {
            let read = self.inner.read_until(b'\n', &mut self.buf)?;
            if read == 0 {
                break;
            }
            self.line += 1;

            // Blank lines between records belong to no record
            if self.buf == b"\n" || self.buf == b"\r\n" {
                self.buf.clear();
                start_line = self.line + 1;
                continue;
            }

            if self.buf.ends_with(LINE_TERMINATOR) {
                let body_len = self.buf.len() - LINE_TERMINATOR.len();
                let (record, lossy) = DumpRecord::decode(start_line, &self.buf[..body_len]);
                self.lossy_records += u64::from(lossy);
                return Ok(Some(record));
            }
            if !self.buf.ends_with(b"\n") {
                // end of input without a trailing newline
                break;
            }
        }

        // Unterminated tail: accept `...\t|` without the newline, skip blank lines.
        let mut body: &[u8] = &self.buf;
        while let Some(rest) = body.strip_suffix(b"\n") {
            body = rest;
        }
        if let Some(rest) = body.strip_suffix(b"\r") {
            body = rest;
        }
        if let Some(rest) = body.strip_suffix(b"\t|") {
            body = rest;
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let (record, lossy) = DumpRecord::decode(start_line, body);
        self.lossy_records += u64::from(lossy);
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for DumpReader<R> {
    type Item = Result<DumpRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
