// 🏗️ Record Parser - fixed-width SDIF-family records
// Three dialects (SD3, CL2, HY3) share record codes but disagree on column offsets

use crate::entities::{Athlete, MeetInfo, Relay, Team};
use crate::error::{IngestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================================
// RECORD TYPES
// ============================================================================

/// RecordType - selected by the first two characters of every line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    FileDescription,
    /// Some vendors write this as the file description of HY3 rosters
    RosterOnly,
    Meet,
    MeetHost,
    TeamId,
    TeamEntry,
    IndividualEvent,
    IndividualAdmin,
    IndividualContact,
    IndividualInfo,
    Split,
    RelayEvent,
    RelayName,
    FileTerminator,
    /// Unknown code or a line shorter than two characters
    Invalid,
}

const RECORD_CODES: [(RecordType, &str); 14] = [
    (RecordType::FileDescription, "A0"),
    (RecordType::RosterOnly, "A1"),
    (RecordType::Meet, "B1"),
    (RecordType::MeetHost, "B2"),
    (RecordType::TeamId, "C1"),
    (RecordType::TeamEntry, "C2"),
    (RecordType::IndividualEvent, "D0"),
    (RecordType::IndividualAdmin, "D1"),
    (RecordType::IndividualContact, "D2"),
    (RecordType::IndividualInfo, "D3"),
    (RecordType::Split, "G0"),
    (RecordType::RelayEvent, "E0"),
    (RecordType::RelayName, "F0"),
    (RecordType::FileTerminator, "Z0"),
];

impl RecordType {
    /// Two-character code as written in the file ("XX" for Invalid)
    pub fn code(&self) -> &'static str {
        RECORD_CODES
            .iter()
            .find(|(rt, _)| rt == self)
            .map(|(_, code)| *code)
            .unwrap_or("XX")
    }

    pub fn from_code(code: &str) -> Self {
        RECORD_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(rt, _)| *rt)
            .unwrap_or(RecordType::Invalid)
    }

    /// Records that carry one athlete's name/dob/gender
    pub fn is_athlete_record(&self) -> bool {
        matches!(
            self,
            RecordType::IndividualEvent | RecordType::IndividualAdmin | RecordType::RelayName
        )
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::FileDescription => "file description",
            RecordType::RosterOnly => "roster-only header",
            RecordType::Meet => "meet",
            RecordType::MeetHost => "meet host",
            RecordType::TeamId => "team id",
            RecordType::TeamEntry => "team entry",
            RecordType::IndividualEvent => "individual event",
            RecordType::IndividualAdmin => "individual admin",
            RecordType::IndividualContact => "individual contact",
            RecordType::IndividualInfo => "individual info",
            RecordType::Split => "split",
            RecordType::RelayEvent => "relay event",
            RecordType::RelayName => "relay name",
            RecordType::FileTerminator => "file terminator",
            RecordType::Invalid => "invalid",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

// ============================================================================
// DIALECTS
// ============================================================================

/// Dialect - concrete column layout of a flat file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Flat container, standard SDIF columns
    Sd3,
    /// Primary inner file of a compressed container
    Cl2,
    /// Secondary inner file of a compressed container
    Hy3,
}

impl Dialect {
    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Sd3 => "sd3",
            Dialect::Cl2 => "cl2",
            Dialect::Hy3 => "hy3",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "sd3" => Some(Dialect::Sd3),
            "cl2" => Some(Dialect::Cl2),
            "hy3" => Some(Dialect::Hy3),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Record type the first line of a file must carry
    pub fn header_record(&self) -> RecordType {
        match self {
            Dialect::Hy3 => RecordType::RosterOnly,
            Dialect::Sd3 | Dialect::Cl2 => RecordType::FileDescription,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

// ============================================================================
// FIELD OFFSET TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    FileType,
    Vendor,
    VendorVersion,
    FileDate,
    MeetName,
    MeetDate,
    TeamCode,
    TeamName,
    AthleteName,
    AthleteDob,
    AthleteGender,
    FinalsTime,
    RelayLetter,
    RelayTeamCode,
}

/// Column range of one field: 0-based offset, width in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub offset: usize,
    pub len: usize,
}

impl FieldSpec {
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

const fn at(offset: usize, len: usize) -> FieldSpec {
    FieldSpec { offset, len }
}

type Layout = &'static [(Field, FieldSpec)];

const SDIF_HEADER: Layout = &[
    (Field::FileType, at(11, 2)),
    (Field::Vendor, at(43, 20)),
    (Field::VendorVersion, at(63, 10)),
    (Field::FileDate, at(105, 8)),
];
const HY3_HEADER: Layout = &[
    (Field::FileType, at(2, 2)),
    (Field::Vendor, at(29, 15)),
    (Field::VendorVersion, at(44, 14)),
    (Field::FileDate, at(58, 8)),
];

const SDIF_MEET: Layout = &[(Field::MeetName, at(11, 30)), (Field::MeetDate, at(121, 8))];
const HY3_MEET: Layout = &[(Field::MeetName, at(2, 30)), (Field::MeetDate, at(92, 8))];

const SDIF_TEAM: Layout = &[(Field::TeamCode, at(13, 4)), (Field::TeamName, at(17, 30))];
const HY3_TEAM: Layout = &[(Field::TeamCode, at(2, 5)), (Field::TeamName, at(7, 30))];

const SDIF_INDIVIDUAL_ADMIN: Layout = &[
    (Field::AthleteName, at(18, 28)),
    (Field::AthleteDob, at(63, 8)),
    (Field::AthleteGender, at(73, 1)),
];
const SDIF_INDIVIDUAL_EVENT: Layout = &[
    (Field::AthleteName, at(11, 28)),
    (Field::AthleteDob, at(55, 8)),
    (Field::AthleteGender, at(65, 1)),
    (Field::FinalsTime, at(115, 8)),
];
const SDIF_RELAY_EVENT: Layout = &[
    (Field::RelayLetter, at(11, 1)),
    (Field::RelayTeamCode, at(12, 6)),
    (Field::FinalsTime, at(72, 8)),
];
const SD3_RELAY_NAME: Layout = &[
    (Field::AthleteName, at(22, 28)),
    (Field::AthleteDob, at(65, 8)),
    (Field::AthleteGender, at(75, 1)),
];
// CL2 drops the citizenship column ahead of the birth date
const CL2_RELAY_NAME: Layout = &[
    (Field::AthleteName, at(22, 28)),
    (Field::AthleteDob, at(63, 8)),
    (Field::AthleteGender, at(73, 1)),
];

const HY3_ATHLETE: Layout = &[
    (Field::AthleteGender, at(2, 1)),
    (Field::AthleteName, at(8, 40)),
    (Field::AthleteDob, at(88, 8)),
];
const HY3_INDIVIDUAL_EVENT: Layout = &[
    (Field::AthleteGender, at(2, 1)),
    (Field::AthleteName, at(8, 40)),
    (Field::AthleteDob, at(88, 8)),
    (Field::FinalsTime, at(100, 8)),
];
const HY3_RELAY_EVENT: Layout = &[
    (Field::RelayTeamCode, at(2, 5)),
    (Field::RelayLetter, at(7, 1)),
    (Field::FinalsTime, at(72, 8)),
];

/// Layout of a (record type, dialect) pair; None when the pair carries no fields we read
pub fn layout(record_type: RecordType, dialect: Dialect) -> Option<Layout> {
    use Dialect::*;
    use RecordType::*;

    match (record_type, dialect) {
        (FileDescription, Sd3 | Cl2) => Some(SDIF_HEADER),
        (RosterOnly, Hy3) => Some(HY3_HEADER),
        (Meet, Sd3 | Cl2) => Some(SDIF_MEET),
        (Meet, Hy3) => Some(HY3_MEET),
        (TeamId, Sd3 | Cl2) => Some(SDIF_TEAM),
        (TeamId, Hy3) => Some(HY3_TEAM),
        (IndividualAdmin, Sd3 | Cl2) => Some(SDIF_INDIVIDUAL_ADMIN),
        (IndividualAdmin, Hy3) => Some(HY3_ATHLETE),
        (IndividualEvent, Sd3 | Cl2) => Some(SDIF_INDIVIDUAL_EVENT),
        (IndividualEvent, Hy3) => Some(HY3_INDIVIDUAL_EVENT),
        (RelayEvent, Sd3 | Cl2) => Some(SDIF_RELAY_EVENT),
        (RelayEvent, Hy3) => Some(HY3_RELAY_EVENT),
        (RelayName, Sd3) => Some(SD3_RELAY_NAME),
        (RelayName, Cl2) => Some(CL2_RELAY_NAME),
        (RelayName, Hy3) => Some(HY3_ATHLETE),
        _ => None,
    }
}

pub fn field_spec(record_type: RecordType, dialect: Dialect, field: Field) -> Option<FieldSpec> {
    layout(record_type, dialect)?
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, spec)| *spec)
}

/// Render a fixed-width line for a record type, placing each value at its
/// column range (values are left-aligned and truncated to the field width).
pub fn compose_line(record_type: RecordType, dialect: Dialect, values: &[(Field, &str)]) -> String {
    let width = layout(record_type, dialect)
        .map(|l| l.iter().map(|(_, s)| s.end()).max().unwrap_or(0))
        .unwrap_or(0)
        .max(160);

    let mut buf: Vec<char> = vec![' '; width];
    for (i, c) in record_type.code().chars().enumerate() {
        buf[i] = c;
    }

    for (field, value) in values {
        if let Some(spec) = field_spec(record_type, dialect, *field) {
            for (i, c) in value.chars().take(spec.len).enumerate() {
                buf[spec.offset + i] = c;
            }
        }
    }

    buf.into_iter().collect()
}

// ============================================================================
// RECORD
// ============================================================================

/// One line of a flat file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: String,
    record_type: RecordType,
}

impl Record {
    pub fn new(line: impl Into<String>) -> Self {
        let line = line.into();
        let code: String = line.chars().take(2).collect();
        let record_type = if code.chars().count() < 2 {
            RecordType::Invalid
        } else {
            RecordType::from_code(&code)
        };

        Record { line, record_type }
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    /// Raw column slice; columns past the end of the line are absent
    pub fn raw_field(&self, dialect: Dialect, field: Field) -> Result<String> {
        let spec = field_spec(self.record_type, dialect, field).ok_or_else(|| {
            IngestError::InvalidRecord {
                record_type: self.record_type,
                reason: format!("no {:?} column in the {} dialect", field, dialect),
            }
        })?;

        Ok(self.line.chars().skip(spec.offset).take(spec.len).collect())
    }

    pub fn text_field(&self, dialect: Dialect, field: Field) -> Result<String> {
        Ok(self.raw_field(dialect, field)?.trim().to_string())
    }

    /// MMDDYYYY column normalized to YYYY-MM-DD ("" when malformed)
    pub fn date_field(&self, dialect: Dialect, field: Field) -> Result<String> {
        Ok(make_date_string(self.raw_field(dialect, field)?.trim()))
    }

    fn invalid(&self, reason: impl Into<String>) -> IngestError {
        IngestError::InvalidRecord {
            record_type: self.record_type,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// FIELD NORMALIZATION
// ============================================================================

/// MMDDYYYY -> YYYY-MM-DD. Anything not exactly 8 characters becomes "".
pub fn make_date_string(buf: &str) -> String {
    if buf.len() != 8 || !buf.is_ascii() {
        return String::new();
    }
    format!("{}-{}-{}", &buf[4..8], &buf[0..2], &buf[2..4])
}

/// Trim and collapse internal runs of whitespace
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "NS" (no show) and "SCR" (scratch) individual finals times
pub fn is_no_show_time(finals_time: &str) -> bool {
    matches!(finals_time.trim(), "NS" | "SCR")
}

// ============================================================================
// DOMAIN EXTRACTION
// ============================================================================

/// Build an athlete from an individual-event, individual-admin or relay-name record
pub fn parse_athlete(record: &Record, dialect: Dialect) -> Result<Athlete> {
    if !record.record_type().is_athlete_record() {
        return Err(record.invalid("not an athlete record"));
    }

    let name = normalize_name(&record.raw_field(dialect, Field::AthleteName)?);
    let dob = record.date_field(dialect, Field::AthleteDob)?;
    let gender = record.text_field(dialect, Field::AthleteGender)?;

    if name.chars().count() < 3 || dob.len() != 10 || gender.chars().count() != 1 {
        return Err(record.invalid(format!(
            "invalid athlete data (name='{}', dob='{}', gender='{}')",
            name, dob, gender
        )));
    }

    Ok(Athlete::new(name, gender, dob))
}

/// Individual-event record of a results file: the finals time marks no-shows
pub fn parse_event_result(record: &Record, dialect: Dialect) -> Result<Athlete> {
    let mut athlete = parse_athlete(record, dialect)?;
    athlete.no_show = is_no_show_time(&record.raw_field(dialect, Field::FinalsTime)?);
    Ok(athlete)
}

pub fn parse_team(record: &Record, dialect: Dialect) -> Result<Team> {
    let code = record.text_field(dialect, Field::TeamCode)?;
    let name = record.text_field(dialect, Field::TeamName)?;

    if code.is_empty() {
        return Err(record.invalid("empty team code"));
    }

    Ok(Team::new(code, name))
}

pub fn parse_meet_info(record: &Record, dialect: Dialect) -> Result<MeetInfo> {
    let name = record.text_field(dialect, Field::MeetName)?;
    let raw_date = record.text_field(dialect, Field::MeetDate)?;
    let date = NaiveDate::parse_from_str(&raw_date, "%m%d%Y")
        .map_err(|e| record.invalid(format!("bad meet date '{}': {}", raw_date, e)))?;

    Ok(MeetInfo::new(name, date))
}

/// Relay named "<team code>-<relay letter>", e.g. "SST-A"
pub fn parse_relay(record: &Record, dialect: Dialect) -> Result<Relay> {
    let letter = record.text_field(dialect, Field::RelayLetter)?;
    let team_code = record.text_field(dialect, Field::RelayTeamCode)?;
    let finals = record.raw_field(dialect, Field::FinalsTime)?;

    // Only an absent relay drops its legs; a scratched relay still swam them
    let no_show = finals.trim() == "NS";
    Ok(Relay::new(format!("{}-{}", team_code, letter), no_show))
}

// ============================================================================
// TESTS
// ============================================================================
