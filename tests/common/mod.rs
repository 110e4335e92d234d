//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use swim_registrar::{compose_line, Dialect, Field, RecordType};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const DOB: &str = "01022008";

/// Athlete line for the given record type: (name, finals time)
pub fn athlete_line(record_type: RecordType, dialect: Dialect, name: &str, finals: &str) -> String {
    compose_line(
        record_type,
        dialect,
        &[
            (Field::AthleteName, name),
            (Field::AthleteDob, DOB),
            (Field::AthleteGender, "F"),
            (Field::FinalsTime, finals),
        ],
    )
}

pub fn header(dialect: Dialect, type_code: &str) -> String {
    compose_line(
        dialect.header_record(),
        dialect,
        &[
            (Field::FileType, type_code),
            (Field::Vendor, "Test Vendor"),
            (Field::VendorVersion, "1.0"),
            (Field::FileDate, "07132017"),
        ],
    )
}

pub fn team_line(dialect: Dialect, code: &str) -> String {
    compose_line(
        RecordType::TeamId,
        dialect,
        &[(Field::TeamCode, code), (Field::TeamName, "Swim Team")],
    )
}

pub fn meet_line(dialect: Dialect, date: &str) -> String {
    compose_line(
        RecordType::Meet,
        dialect,
        &[(Field::MeetName, "Summer Dual Meet"), (Field::MeetDate, date)],
    )
}

/// Flat roster: header 01, one team, D1 per athlete
pub fn roster_text(code: &str, names: &[&str]) -> String {
    let d = Dialect::Sd3;
    let mut lines = vec![header(d, "01"), team_line(d, code)];
    for name in names {
        lines.push(athlete_line(RecordType::IndividualAdmin, d, name, ""));
    }
    lines.push("Z0".to_string());
    lines.join("\n")
}

pub fn write_roster(dir: &Path, code: &str, names: &[&str]) -> PathBuf {
    let path = dir.join(format!("{}.sd3", code.to_lowercase()));
    fs::write(&path, roster_text(code, names)).unwrap();
    path
}

/// CL2 meet-results text. Each team: (code, [(name, finals)])
pub fn results_text(date: &str, teams: &[(&str, &[(&str, &str)])]) -> String {
    let d = Dialect::Cl2;
    let mut lines = vec![header(d, "02"), meet_line(d, date)];
    for (code, swims) in teams {
        lines.push(team_line(d, code));
        for (name, finals) in swims.iter() {
            lines.push(athlete_line(RecordType::IndividualEvent, d, name, finals));
        }
    }
    lines.push("Z0".to_string());
    lines.join("\n")
}

pub fn write_zip(dir: &Path, name: &str, members: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    for (member, contents) in members {
        writer.start_file(*member, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}
