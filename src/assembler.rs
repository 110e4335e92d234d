// 🧩 Domain Assembler - record stream -> Team / MeetResults aggregates
//
// One forward pass. All sequencing state lives in FoldState and is threaded
// through try_fold, so a record can only ever see the team/relay/meet that
// preceded it in the same file.

use crate::detect::FlatFile;
use crate::entities::{MeetResults, Relay, Scenario, Team};
use crate::error::{IngestError, Result};
use crate::parser::{self, Dialect, Record, RecordType};
use tracing::{debug, info};

/// Which aggregate a file is folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Exactly one team and its athletes
    Roster,
    /// One meet with its attached teams
    Meet(Scenario),
}

impl Pipeline {
    fn drops_no_shows(&self) -> bool {
        matches!(self, Pipeline::Meet(scenario) if scenario.is_results())
    }
}

// ============================================================================
// FOLD STATE
// ============================================================================

#[derive(Debug, Default)]
struct FoldState {
    /// Roster pipeline's single team
    team: Option<Team>,
    /// Meet pipeline's aggregate; its last team is the current team
    meet: Option<MeetResults>,
    relay: Option<Relay>,
}

impl FoldState {
    fn current_team(&mut self) -> Option<&mut Team> {
        match self.meet.as_mut() {
            Some(meet) => meet.teams.last_mut(),
            None => self.team.as_mut(),
        }
    }
}

struct FoldContext<'a> {
    pipeline: Pipeline,
    dialect: Dialect,
    file_date: &'a str,
}

fn step(mut state: FoldState, record: &Record, ctx: &FoldContext) -> Result<FoldState> {
    match (record.record_type(), ctx.pipeline) {
        (RecordType::TeamId, Pipeline::Roster) => {
            if state.team.is_some() {
                return Err(IngestError::DuplicateTeam);
            }
            state.team = Some(parser::parse_team(record, ctx.dialect)?);
        }

        (RecordType::Meet, Pipeline::Meet(scenario)) => {
            if state.meet.is_some() {
                return Err(IngestError::Sequence(
                    "more than one meet record in the file".to_string(),
                ));
            }
            let info = parser::parse_meet_info(record, ctx.dialect)?;
            state.meet = Some(MeetResults::new(info, scenario, ctx.file_date));
        }

        (RecordType::TeamId, Pipeline::Meet(_)) => {
            let meet = state.meet.as_mut().ok_or_else(|| {
                IngestError::Sequence("team record precedes the meet record".to_string())
            })?;
            // A meet is stored under a team pair; a third team has nowhere to go
            if meet.teams.len() >= 2 {
                return Err(IngestError::Sequence(format!(
                    "more than two team records in meet {}",
                    meet.info.name
                )));
            }
            meet.add_team(parser::parse_team(record, ctx.dialect)?);
            state.relay = None;
        }

        (RecordType::IndividualAdmin | RecordType::IndividualEvent, _) => {
            let dialect = ctx.dialect;
            let results = ctx.pipeline.drops_no_shows()
                && record.record_type() == RecordType::IndividualEvent;

            let team = state.current_team().ok_or_else(|| {
                IngestError::Sequence("athlete record precedes any team record".to_string())
            })?;

            if results {
                let athlete = parser::parse_event_result(record, dialect)?;
                if athlete.no_show {
                    debug!("Skipping no-show {} ({})", athlete.name, team.code);
                } else {
                    team.add_athlete(athlete);
                }
            } else {
                team.add_athlete(parser::parse_athlete(record, dialect)?);
            }
        }

        (RecordType::RelayEvent, _) => {
            state.relay = Some(parser::parse_relay(record, ctx.dialect)?);
        }

        (RecordType::RelayName, _) => {
            let no_show = match state.relay.as_ref() {
                Some(relay) => relay.no_show,
                None => {
                    return Err(IngestError::Sequence(
                        "relay name record precedes any relay event record".to_string(),
                    ))
                }
            };
            if no_show {
                return Ok(state);
            }

            let team = state.current_team().ok_or_else(|| {
                IngestError::Sequence("relay name record precedes any team record".to_string())
            })?;
            let athlete = parser::parse_athlete(record, ctx.dialect)?;
            team.add_athlete(athlete.clone());

            if let Some(relay) = state.relay.as_mut() {
                relay.members.push(athlete);
            }
        }

        _ => {}
    }

    Ok(state)
}

fn fold(file: &FlatFile, pipeline: Pipeline) -> Result<FoldState> {
    let ctx = FoldContext {
        pipeline,
        dialect: file.description.dialect,
        file_date: &file.description.file_date,
    };

    file.records
        .iter()
        .try_fold(FoldState::default(), |state, record| step(state, record, &ctx))
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Fold a roster file into its single team
pub fn assemble_roster(file: &FlatFile) -> Result<Team> {
    let team = fold(file, Pipeline::Roster)?
        .team
        .ok_or_else(|| IngestError::EmptyFile("No team defined in the roster file".to_string()))?;

    info!("Assembled roster for {} ({} athletes)", team.code, team.athletes().len());
    Ok(team)
}

/// Fold a meet file into its MeetResults aggregate
pub fn assemble_meet(file: &FlatFile, scenario: Scenario) -> Result<MeetResults> {
    let meet = fold(file, Pipeline::Meet(scenario))?
        .meet
        .filter(|m| !m.teams.is_empty())
        .ok_or_else(|| IngestError::EmptyFile("No meet with teams defined in the file".to_string()))?;

    info!(
        "Assembled {} [{}] ({} athletes)",
        meet.describe(),
        scenario,
        meet.teams.iter().map(|t| t.athletes().len()).sum::<usize>()
    );
    Ok(meet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Athlete;
    use crate::parser::{compose_line, Field};

    const D: Dialect = Dialect::Cl2;

    fn header(type_code: &str) -> String {
        compose_line(
            RecordType::FileDescription,
            D,
            &[(Field::FileType, type_code), (Field::FileDate, "07132017")],
        )
    }

    fn meet_line() -> String {
        compose_line(
            RecordType::Meet,
            D,
            &[(Field::MeetName, "Seaside vs Harbor"), (Field::MeetDate, "07122017")],
        )
    }

    fn team_line(code: &str) -> String {
        compose_line(
            RecordType::TeamId,
            D,
            &[(Field::TeamCode, code), (Field::TeamName, "Some Swim Team")],
        )
    }

    fn admin_line(name: &str) -> String {
        compose_line(
            RecordType::IndividualAdmin,
            D,
            &[
                (Field::AthleteName, name),
                (Field::AthleteDob, "01022008"),
                (Field::AthleteGender, "F"),
            ],
        )
    }

    fn event_line(name: &str, finals: &str) -> String {
        compose_line(
            RecordType::IndividualEvent,
            D,
            &[
                (Field::AthleteName, name),
                (Field::AthleteDob, "01022008"),
                (Field::AthleteGender, "F"),
                (Field::FinalsTime, finals),
            ],
        )
    }

    fn relay_line(code: &str, finals: &str) -> String {
        compose_line(
            RecordType::RelayEvent,
            D,
            &[
                (Field::RelayLetter, "A"),
                (Field::RelayTeamCode, code),
                (Field::FinalsTime, finals),
            ],
        )
    }

    fn relay_name_line(name: &str) -> String {
        compose_line(
            RecordType::RelayName,
            D,
            &[
                (Field::AthleteName, name),
                (Field::AthleteDob, "01022008"),
                (Field::AthleteGender, "F"),
            ],
        )
    }

    fn create_test_file(type_code: &str, lines: &[String]) -> FlatFile {
        let mut text = header(type_code);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text.push_str("\nZ0");
        FlatFile::from_text(&text, D).unwrap()
    }

    fn names(team: &Team) -> Vec<String> {
        let mut names: Vec<String> = team.athletes().iter().map(|a| a.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_assemble_roster() {
        let file = create_test_file(
            "20",
            &[team_line("SST"), admin_line("Ertz, Lauren"), admin_line("Smith, Jane")],
        );
        let team = assemble_roster(&file).unwrap();

        assert_eq!(team.code, "SST");
        assert_eq!(names(&team), vec!["Ertz, Lauren", "Smith, Jane"]);
    }

    #[test]
    fn test_roster_second_team_fails() {
        let file = create_test_file("20", &[team_line("SST"), team_line("HBR")]);
        assert!(matches!(assemble_roster(&file), Err(IngestError::DuplicateTeam)));
    }

    #[test]
    fn test_athlete_before_team_fails() {
        let file = create_test_file("20", &[admin_line("Ertz, Lauren"), team_line("SST")]);
        assert!(matches!(assemble_roster(&file), Err(IngestError::Sequence(_))));

        let meet = create_test_file("02", &[meet_line(), event_line("Ertz, Lauren", "1:02.35")]);
        assert!(matches!(
            assemble_meet(&meet, Scenario::MeetResults),
            Err(IngestError::Sequence(_))
        ));
    }

    #[test]
    fn test_sequence_checked_before_record_validity() {
        // Malformed athlete with no team: sequencing wins over validation
        let file = create_test_file("20", &[admin_line("Al")]);
        assert!(matches!(assemble_roster(&file), Err(IngestError::Sequence(_))));
    }

    #[test]
    fn test_empty_roster_fails() {
        let file = create_test_file("20", &[]);
        assert!(matches!(assemble_roster(&file), Err(IngestError::EmptyFile(_))));
    }

    #[test]
    fn test_team_before_meet_fails() {
        let file = create_test_file("02", &[team_line("SST"), meet_line()]);
        assert!(matches!(
            assemble_meet(&file, Scenario::MeetResults),
            Err(IngestError::Sequence(_))
        ));
    }

    #[test]
    fn test_meet_without_teams_is_empty() {
        let file = create_test_file("02", &[meet_line()]);
        assert!(matches!(
            assemble_meet(&file, Scenario::MeetResults),
            Err(IngestError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_assemble_meet_results() {
        let file = create_test_file(
            "02",
            &[
                meet_line(),
                team_line("SST"),
                event_line("Ertz, Lauren", "1:02.35"),
                event_line("Bucher, Josh", "NS"),
                relay_line("VASST", "2:01.33"),
                relay_name_line("Smith, Jane"),
                relay_line("VASST", "NS"),
                relay_name_line("Jones, Ann"),
                team_line("HBR"),
                event_line("Doe, Kim", "1:10.00"),
                event_line("Roe, Pat", "SCR"),
            ],
        );
        let meet = assemble_meet(&file, Scenario::MeetResults).unwrap();

        assert_eq!(meet.info.name, "Seaside vs Harbor");
        assert_eq!(meet.file_date, "2017-07-13");
        assert_eq!(meet.scenario, Scenario::MeetResults);
        assert_eq!(meet.teams.len(), 2);
        assert_eq!(names(&meet.teams[0]), vec!["Ertz, Lauren", "Smith, Jane"]);
        assert_eq!(names(&meet.teams[1]), vec!["Doe, Kim"]);
    }

    #[test]
    fn test_third_team_fails() {
        let file = create_test_file(
            "02",
            &[
                meet_line(),
                team_line("SST"),
                team_line("HBR"),
                team_line("CRK"),
                event_line("Doe, Kim", "1:10.00"),
            ],
        );
        assert!(matches!(
            assemble_meet(&file, Scenario::MeetResults),
            Err(IngestError::Sequence(_))
        ));
    }

    #[test]
    fn test_scratched_relay_keeps_members() {
        let file = create_test_file(
            "02",
            &[
                meet_line(),
                team_line("SST"),
                relay_line("VASST", "SCR"),
                relay_name_line("Smith, Jane"),
                relay_name_line("Jones, Ann"),
                team_line("HBR"),
            ],
        );
        let meet = assemble_meet(&file, Scenario::MeetResults).unwrap();
        assert_eq!(names(&meet.teams[0]), vec!["Jones, Ann", "Smith, Jane"]);
    }

    #[test]
    fn test_entries_keep_no_show_times() {
        let file = create_test_file(
            "01",
            &[meet_line(), team_line("SST"), event_line("Bucher, Josh", "NS")],
        );
        let meet = assemble_meet(&file, Scenario::ByeWeekEntries).unwrap();
        assert_eq!(names(&meet.teams[0]), vec!["Bucher, Josh"]);
    }

    #[test]
    fn test_relay_name_without_relay_fails() {
        let file = create_test_file(
            "02",
            &[meet_line(), team_line("SST"), relay_name_line("Smith, Jane")],
        );
        assert!(matches!(
            assemble_meet(&file, Scenario::MeetResults),
            Err(IngestError::Sequence(_))
        ));
    }

    #[test]
    fn test_team_record_clears_relay() {
        let file = create_test_file(
            "02",
            &[
                meet_line(),
                team_line("SST"),
                relay_line("VASST", "2:01.33"),
                team_line("HBR"),
                relay_name_line("Smith, Jane"),
            ],
        );
        assert!(matches!(
            assemble_meet(&file, Scenario::MeetResults),
            Err(IngestError::Sequence(_))
        ));
    }

    #[test]
    fn test_ertz_time_versus_no_show() {
        let timed = create_test_file(
            "02",
            &[meet_line(), team_line("SST"), event_line("Ertz, Lauren", "1:02.35")],
        );
        let meet = assemble_meet(&timed, Scenario::MeetResults).unwrap();
        let expected = Athlete::new("Ertz, Lauren", "F", "2008-01-02");
        assert!(meet.teams[0].athletes().contains(&expected));

        let no_show = create_test_file(
            "02",
            &[meet_line(), team_line("SST"), event_line("Ertz, Lauren", "NS")],
        );
        let meet = assemble_meet(&no_show, Scenario::MeetResults).unwrap();
        assert!(meet.teams[0].athletes().is_empty());
    }
}
