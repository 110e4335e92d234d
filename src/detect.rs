// 🔎 Format Detector - header record -> logical file type + dialect
//
// The first line of every payload is a file description record. It declares
// the logical category; the dialect comes from the payload's extension.

use crate::error::{IngestError, Result};
use crate::parser::{self, Dialect, Field, Record, RecordType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

// ============================================================================
// LOGICAL FILE TYPE
// ============================================================================

/// Header-declared category, independent of dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    MeetRegistration,
    MeetResults,
    VendorDefined,
    Unknown,
}

impl FileType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "01" => FileType::MeetRegistration,
            "02" => FileType::MeetResults,
            "20" => FileType::VendorDefined,
            _ => FileType::Unknown,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            FileType::MeetRegistration => Some("01"),
            FileType::MeetResults => Some("02"),
            FileType::VendorDefined => Some("20"),
            FileType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::MeetRegistration => "MEET_REGISTRATION",
            FileType::MeetResults => "MEET_RESULTS",
            FileType::VendorDefined => "VENDOR_DEFINED",
            FileType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FILE DESCRIPTION
// ============================================================================

/// Contents of the leading header record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescription {
    pub file_type: FileType,
    pub dialect: Dialect,
    /// YYYY-MM-DD, or "" when the header carries no usable date
    pub file_date: String,
    pub vendor: String,
    pub vendor_version: String,
}

/// Validate the header record and pull out its fields
pub fn parse_header(record: &Record, dialect: Dialect) -> Result<FileDescription> {
    let expected = dialect.header_record();
    if record.record_type() != expected {
        return Err(IngestError::InvalidHeader(format!(
            "expected {} record, found {}",
            expected,
            record.record_type()
        )));
    }

    // Every header field must be present, down to the file date
    let min_len = parser::layout(expected, dialect)
        .and_then(|layout| layout.iter().map(|(_, spec)| spec.end()).max())
        .unwrap_or(0);
    if record.line().chars().count() < min_len {
        return Err(IngestError::InvalidHeader(format!(
            "header record too short ({} characters)",
            record.line().chars().count()
        )));
    }

    let file_type = FileType::from_code(&record.raw_field(dialect, Field::FileType)?);

    Ok(FileDescription {
        file_type,
        dialect,
        file_date: record.date_field(dialect, Field::FileDate)?,
        vendor: record.text_field(dialect, Field::Vendor)?,
        vendor_version: record.text_field(dialect, Field::VendorVersion)?,
    })
}

/// Fail with FormatMismatch unless the header declares `expected`
pub fn expect_file_type(description: &FileDescription, expected: FileType) -> Result<()> {
    if description.file_type != expected {
        return Err(IngestError::FormatMismatch {
            expected,
            found: description.file_type,
        });
    }
    Ok(())
}

// ============================================================================
// FLAT FILE
// ============================================================================

/// A detected payload: header plus the remaining records in file order
#[derive(Debug, Clone)]
pub struct FlatFile {
    pub description: FileDescription,
    pub records: Vec<Record>,
}

impl FlatFile {
    /// Split text into header + records. Blank lines are skipped.
    pub fn from_text(text: &str, dialect: Dialect) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let first = lines
            .next()
            .ok_or_else(|| IngestError::InvalidHeader("file is empty".to_string()))?;
        let description = parse_header(&Record::new(first), dialect)?;

        let records: Vec<Record> = lines.map(Record::new).collect();

        debug!(
            "Detected {} {} file from '{}' ({} records)",
            dialect,
            description.file_type,
            description.vendor,
            records.len()
        );

        Ok(FlatFile {
            description,
            records,
        })
    }

    /// Per record type counts, in order of first appearance
    pub fn record_counts(&self) -> Vec<(RecordType, usize)> {
        let mut counts: Vec<(RecordType, usize)> = Vec::new();
        for record in &self.records {
            match counts.iter_mut().find(|(rt, _)| *rt == record.record_type()) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.record_type(), 1)),
            }
        }
        counts
    }
}

/// Read a payload from disk. Vendor files are not always valid UTF-8, so
/// undecodable bytes are replaced rather than rejected.
pub fn read_flat_file(path: &Path, dialect: Dialect) -> Result<FlatFile> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    FlatFile::from_text(&text, dialect)
}
