// ⚠️ Error taxonomy for the parse-and-reconcile pipeline
//
// Parse-phase errors abort the remaining items of a run. Reconciliation-phase
// errors roll back the in-flight batch. An unmatched athlete is NOT an error:
// it lands in the orphan ledger instead.

use crate::detect::FileType;
use crate::parser::RecordType;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    // ========================================================================
    // ARCHIVE / FORMAT
    // ========================================================================
    #[error("Unknown archive type: {}", .0.display())]
    ArchiveFormat(PathBuf),

    #[error("Archive {} contains no {} file", .archive.display(), .expected)]
    MissingPayload { archive: PathBuf, expected: String },

    #[error("Invalid file description record: {0}")]
    InvalidHeader(String),

    #[error("File type mismatch, expected {expected}, found {found}")]
    FormatMismatch { expected: FileType, found: FileType },

    // ========================================================================
    // RECORDS / ASSEMBLY
    // ========================================================================
    #[error("Invalid {record_type} record: {reason}")]
    InvalidRecord {
        record_type: RecordType,
        reason: String,
    },

    #[error("Record out of sequence: {0}")]
    Sequence(String),

    #[error("More than 1 team defined in the roster file")]
    DuplicateTeam,

    #[error("{0}")]
    EmptyFile(String),

    // ========================================================================
    // RECONCILIATION
    // ========================================================================
    #[error("Meet '{meet}' has {teams} team(s), 2 are required")]
    IncompleteMeet { meet: String, teams: usize },

    #[error("Team {0} is not found in the database")]
    TeamNotFound(String),

    #[error("Invalid rain-out pairing: {0}")]
    Pairing(String),

    // ========================================================================
    // WRAPPED
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl IngestError {
    /// True for errors raised while reading/parsing input files
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            IngestError::ArchiveFormat(_)
                | IngestError::MissingPayload { .. }
                | IngestError::InvalidHeader(_)
                | IngestError::FormatMismatch { .. }
                | IngestError::InvalidRecord { .. }
                | IngestError::Sequence(_)
                | IngestError::DuplicateTeam
                | IngestError::EmptyFile(_)
                | IngestError::Io(_)
                | IngestError::Zip(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mismatch_message() {
        let err = IngestError::FormatMismatch {
            expected: FileType::MeetResults,
            found: FileType::MeetRegistration,
        };
        assert_eq!(
            err.to_string(),
            "File type mismatch, expected MEET_RESULTS, found MEET_REGISTRATION"
        );
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_reconcile_errors_are_not_parse_errors() {
        let err = IngestError::IncompleteMeet {
            meet: "Dual Meet".to_string(),
            teams: 1,
        };
        assert!(!err.is_parse_error());
        assert!(!IngestError::TeamNotFound("SST".to_string()).is_parse_error());
    }
}
