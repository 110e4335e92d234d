// 📅 Meet Entities - meet identity, scenarios and the results aggregate

use super::{Athlete, Team};
use crate::archive::ContainerKind;
use crate::detect::FileType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SCENARIO
// ============================================================================

/// What a batch of files represents; persisted as the meet's result type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    TeamRoster,
    MeetResults,
    ByeWeekEntries,
    ByeWeekResults,
    RainOutEntries,
    RainOutResults,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::TeamRoster,
        Scenario::MeetResults,
        Scenario::ByeWeekEntries,
        Scenario::ByeWeekResults,
        Scenario::RainOutEntries,
        Scenario::RainOutResults,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::TeamRoster => "TEAM_ROSTER",
            Scenario::MeetResults => "MEET_RESULTS",
            Scenario::ByeWeekEntries => "BYE_WEEK_ENTRIES",
            Scenario::ByeWeekResults => "BYE_WEEK_RESULTS",
            Scenario::RainOutEntries => "RAIN_OUT_ENTRIES",
            Scenario::RainOutResults => "RAIN_OUT_RESULTS",
        }
    }

    /// Results files mark no-shows and declare the meet-results type
    pub fn is_results(&self) -> bool {
        matches!(
            self,
            Scenario::MeetResults | Scenario::ByeWeekResults | Scenario::RainOutResults
        )
    }

    pub fn is_bye_week(&self) -> bool {
        matches!(self, Scenario::ByeWeekEntries | Scenario::ByeWeekResults)
    }

    pub fn is_rain_out(&self) -> bool {
        matches!(self, Scenario::RainOutEntries | Scenario::RainOutResults)
    }

    /// Logical file type a payload must declare for this scenario
    pub fn expected_file_type(&self, kind: ContainerKind) -> FileType {
        if self.is_results() {
            return FileType::MeetResults;
        }
        match kind {
            ContainerKind::Flat => FileType::MeetRegistration,
            ContainerKind::Compressed => FileType::VendorDefined,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    /// Accepts "MEET_RESULTS", "meet-results", "meet_results"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Scenario::ALL
            .iter()
            .find(|sc| sc.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}

// ============================================================================
// MEET INFO + RESULTS AGGREGATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetInfo {
    pub name: String,
    pub date: NaiveDate,
}

impl MeetInfo {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        MeetInfo {
            name: name.into(),
            date,
        }
    }
}

/// One parsed meet: info, scenario, attached teams and the orphans found
/// while resolving its athletes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetResults {
    pub info: MeetInfo,
    pub scenario: Scenario,
    pub teams: Vec<Team>,
    pub orphans: Vec<Athlete>,
    /// Header file date (YYYY-MM-DD)
    pub file_date: String,
}

impl MeetResults {
    pub fn new(info: MeetInfo, scenario: Scenario, file_date: impl Into<String>) -> Self {
        MeetResults {
            info,
            scenario,
            teams: Vec::new(),
            orphans: Vec::new(),
            file_date: file_date.into(),
        }
    }

    pub fn add_team(&mut self, team: Team) {
        self.teams.push(team);
    }

    pub fn add_orphan(&mut self, athlete: Athlete) {
        self.orphans.push(athlete);
    }

    /// Ready for persistence: at least two teams attached
    pub fn is_complete(&self) -> bool {
        self.teams.len() >= 2
    }

    /// "Name (2017-07-12): SST vs HBR"
    pub fn describe(&self) -> String {
        let codes: Vec<&str> = self.teams.iter().map(|t| t.code.as_str()).collect();
        format!("{} ({}): {}", self.info.name, self.info.date, codes.join(" vs "))
    }
}

// ============================================================================
// PERSISTED MEET ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meet {
    pub id: i64,
    pub meet_date: String,
    pub file_date: String,
    pub team1_id: i64,
    pub team2_id: i64,
    pub result_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_parse() {
        assert_eq!("MEET_RESULTS".parse::<Scenario>().unwrap(), Scenario::MeetResults);
        assert_eq!("rain-out-entries".parse::<Scenario>().unwrap(), Scenario::RainOutEntries);
        assert!("practice".parse::<Scenario>().is_err());

        for sc in Scenario::ALL {
            assert_eq!(sc.as_str().parse::<Scenario>().unwrap(), sc);
        }
    }

    #[test]
    fn test_expected_file_type() {
        assert_eq!(
            Scenario::ByeWeekResults.expected_file_type(ContainerKind::Compressed),
            FileType::MeetResults
        );
        assert_eq!(
            Scenario::TeamRoster.expected_file_type(ContainerKind::Flat),
            FileType::MeetRegistration
        );
        assert_eq!(
            Scenario::RainOutEntries.expected_file_type(ContainerKind::Compressed),
            FileType::VendorDefined
        );
    }

    #[test]
    fn test_meet_results_completeness() {
        let info = MeetInfo::new("Dual Meet", NaiveDate::from_ymd_opt(2017, 7, 12).unwrap());
        let mut meet = MeetResults::new(info, Scenario::MeetResults, "2017-07-13");
        assert!(!meet.is_complete());

        meet.add_team(Team::new("SST", "Seaside"));
        meet.add_team(Team::new("HBR", "Harbor"));
        assert!(meet.is_complete());
        assert_eq!(meet.describe(), "Dual Meet (2017-07-12): SST vs HBR");
    }
}
