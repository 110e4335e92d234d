// ⚖️ Reconciliation Engine - apply parsed aggregates to the store
//
// Rosters: full replacement by value identity (see merge.rs).
// Meets: upsert the meet row, then rewrite its credit rows and orphan
// ledger from scratch.
//
// Every batch runs inside one rusqlite::Transaction. Returning early (error
// or cancellation) drops it, which rolls the whole batch back.

use crate::db;
use crate::entities::{Athlete, Meet, MeetResults, Team};
use crate::error::{IngestError, Result};
use crate::merge;
use crate::orphans::{self, Orphan};
use crate::progress::ProgressReporter;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// ============================================================================
// OUTCOMES
// ============================================================================

/// How a batch ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchOutcome<T> {
    /// Every item applied and committed
    Committed(T),
    /// Overwrite confirmation declined; nothing written
    Declined,
    /// Cancelled between items; the batch was rolled back
    Cancelled,
}

impl<T> BatchOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, BatchOutcome::Committed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterOutcome {
    pub team_code: String,
    pub team_id: i64,
    /// Team row did not exist before this merge
    pub new_team: bool,
    pub added: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetOutcome {
    pub meet_id: i64,
    pub description: String,
    /// Meet row already existed; credits and orphans were replaced
    pub updated: bool,
    pub credited: usize,
    pub orphaned: usize,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// Placeholder opponent for bye-week meets
    pub bye_team_code: String,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::with_bye_team("BYE")
    }

    pub fn with_bye_team(code: impl Into<String>) -> Self {
        ReconciliationEngine {
            bye_team_code: code.into(),
        }
    }

    // ========================================================================
    // ROSTERS
    // ========================================================================

    /// Make the persisted roster of `team.code` equal to the parsed one
    pub fn merge_roster(&self, conn: &Connection, team: &Team) -> Result<RosterOutcome> {
        let mut parsed = team.clone();

        let (team_id, new_team) = match db::find_team_by_code(conn, &team.code)? {
            Some(existing) => {
                let id = existing
                    .id
                    .ok_or_else(|| IngestError::TeamNotFound(team.code.clone()))?;
                (id, false)
            }
            None => {
                let id = db::insert_team(conn, team)?;
                info!("Inserted team {} (id {})", team.code, id);
                (id, true)
            }
        };
        parsed.set_id(team_id);

        let persisted = if new_team {
            Default::default()
        } else {
            db::retrieve_athletes(conn, team_id)?
        };

        let mut outcome = RosterOutcome {
            team_code: team.code.clone(),
            team_id,
            new_team,
            added: 0,
            deleted: 0,
            unchanged: 0,
        };

        if persisted.is_empty() {
            // Nothing to diff against
            for athlete in parsed.athletes() {
                db::insert_athlete(conn, athlete)?;
            }
            outcome.added = parsed.athletes().len();
        } else {
            let diff = merge::diff_rosters(&persisted, parsed.athletes());
            for athlete in &diff.to_delete {
                db::remove_athlete(conn, athlete)?;
            }
            for athlete in &diff.to_add {
                db::insert_athlete(conn, athlete)?;
            }
            outcome.added = diff.to_add.len();
            outcome.deleted = diff.to_delete.len();
            outcome.unchanged = diff.unchanged;
        }

        info!(
            "Roster {}: {} added, {} deleted, {} unchanged",
            outcome.team_code, outcome.added, outcome.deleted, outcome.unchanged
        );
        Ok(outcome)
    }

    /// Merge every roster in one transaction
    pub fn apply_rosters(
        &self,
        conn: &mut Connection,
        teams: &[Team],
        progress: &ProgressReporter,
    ) -> Result<BatchOutcome<Vec<RosterOutcome>>> {
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(teams.len());

        for (i, team) in teams.iter().enumerate() {
            if progress.is_cancelled() {
                warn!("Roster batch cancelled before {}; rolling back", team.code);
                return Ok(BatchOutcome::Cancelled);
            }

            let outcome = self.merge_roster(&tx, team).map_err(|e| {
                error!("Roster {} failed, rolling back batch: {}", team.code, e);
                e
            })?;
            progress.report(
                format!(
                    "Team {}: {} added, {} deleted",
                    outcome.team_code, outcome.added, outcome.deleted
                ),
                i + 1,
                teams.len(),
            );
            outcomes.push(outcome);
        }

        tx.commit()?;
        progress.report(
            format!("Committed {} roster(s)", outcomes.len()),
            teams.len(),
            teams.len(),
        );
        Ok(BatchOutcome::Committed(outcomes))
    }

    // ========================================================================
    // MEETS
    // ========================================================================

    /// Attach the placeholder team to a bye-week meet. Missing placeholder
    /// is left for the completeness check to report.
    pub fn attach_bye_team(&self, conn: &Connection, meet: &mut MeetResults) -> Result<bool> {
        if !meet.scenario.is_bye_week()
            || meet.teams.len() >= 2
            || meet.teams.iter().any(|t| t.code == self.bye_team_code)
        {
            return Ok(false);
        }

        match db::find_team_by_code(conn, &self.bye_team_code)? {
            Some(bye) => {
                debug!("Attached {} to {}", bye.code, meet.info.name);
                meet.add_team(bye);
                Ok(true)
            }
            None => {
                warn!("Bye team {} not found in the database", self.bye_team_code);
                Ok(false)
            }
        }
    }

    /// Codes of the two teams a meet will be stored under
    fn team_pair(&self, meet: &MeetResults) -> Option<(String, String)> {
        let first = meet.teams.first()?.code.clone();
        let second = match meet.teams.get(1) {
            Some(team) => team.code.clone(),
            None if meet.scenario.is_bye_week() => self.bye_team_code.clone(),
            None => return None,
        };
        Some((first, second))
    }

    /// Persisted meets the batch would overwrite
    pub fn find_existing_meets(&self, conn: &Connection, batch: &[MeetResults]) -> Result<Vec<Meet>> {
        let mut existing = Vec::new();
        for meet in batch {
            let Some((code1, code2)) = self.team_pair(meet) else {
                continue;
            };
            let date = meet.info.date.format("%Y-%m-%d").to_string();
            if let Some(found) = db::find_meet_by_codes(conn, &code1, &code2, &date)? {
                existing.push(found);
            }
        }
        Ok(existing)
    }

    fn resolve_team_ids(conn: &Connection, meet: &mut MeetResults) -> Result<(i64, i64)> {
        for team in meet.teams.iter_mut() {
            if team.id.is_some() {
                continue;
            }
            let stored = db::find_team_by_code(conn, &team.code)?
                .and_then(|t| t.id)
                .ok_or_else(|| IngestError::TeamNotFound(team.code.clone()))?;
            team.set_id(stored);
        }

        let id_of = |team: &Team| team.id.ok_or_else(|| IngestError::TeamNotFound(team.code.clone()));
        Ok((id_of(&meet.teams[0])?, id_of(&meet.teams[1])?))
    }

    /// Apply one parsed meet inside the caller's transaction
    pub fn ingest_meet(&self, conn: &Connection, meet: &mut MeetResults) -> Result<MeetOutcome> {
        self.attach_bye_team(conn, meet)?;
        if !meet.is_complete() {
            return Err(IngestError::IncompleteMeet {
                meet: meet.info.name.clone(),
                teams: meet.teams.len(),
            });
        }

        let (team1_id, team2_id) = Self::resolve_team_ids(conn, meet)?;
        let meet_date = meet.info.date.format("%Y-%m-%d").to_string();
        let existing = db::find_meet(conn, team1_id, team2_id, &meet_date)?;

        if let Some(stored) = &existing {
            let credits = db::remove_meet_credits(conn, stored.id)?;
            let orphans = orphans::remove_orphans(conn, stored.id)?;
            debug!(
                "Cleared {} credit(s) and {} orphan(s) of meet {}",
                credits, orphans, stored.id
            );
        }

        // Unmatched athletes move from the team to the orphan list
        let mut credited_ids = Vec::new();
        for team in meet.teams.iter_mut() {
            let mut matched: Vec<Athlete> = Vec::new();
            for mut athlete in team.take_athletes() {
                match db::find_athlete_id(conn, &athlete)? {
                    Some(id) => {
                        athlete.id = Some(id);
                        credited_ids.push(id);
                        matched.push(athlete);
                    }
                    None => meet.orphans.push(athlete),
                }
            }
            team.replace_athletes(matched);
        }

        let (meet_id, updated) = match existing {
            Some(stored) => {
                db::update_meet_file_date(conn, stored.id, &meet.file_date)?;
                (stored.id, true)
            }
            None => {
                db::insert_meet(
                    conn,
                    &meet_date,
                    &meet.file_date,
                    team1_id,
                    team2_id,
                    meet.scenario.as_str(),
                )?;
                let stored = db::find_meet(conn, team1_id, team2_id, &meet_date)?
                    .ok_or(IngestError::Db(rusqlite::Error::QueryReturnedNoRows))?;
                (stored.id, false)
            }
        };

        for athlete_id in &credited_ids {
            db::insert_meet_credit(conn, *athlete_id, meet_id)?;
        }

        let ledger: Vec<Orphan> = meet
            .orphans
            .iter()
            .filter_map(|a| Orphan::from_athlete(meet_id, a))
            .collect();
        orphans::insert_orphans(conn, &ledger)?;

        let outcome = MeetOutcome {
            meet_id,
            description: meet.describe(),
            updated,
            credited: credited_ids.len(),
            orphaned: ledger.len(),
        };
        info!(
            "{} meet {} ({}): {} credited, {} orphaned",
            if updated { "Updated" } else { "Inserted" },
            outcome.meet_id,
            outcome.description,
            outcome.credited,
            outcome.orphaned
        );
        Ok(outcome)
    }

    /// Apply a batch of meets in one transaction.
    ///
    /// `confirm_overwrite` is asked once, before any write, when the batch
    /// contains meets that are already stored. Declining writes nothing.
    pub fn apply_meet_results<F>(
        &self,
        conn: &mut Connection,
        batch: &mut [MeetResults],
        confirm_overwrite: F,
        progress: &ProgressReporter,
    ) -> Result<BatchOutcome<Vec<MeetOutcome>>>
    where
        F: FnOnce(&[Meet]) -> bool,
    {
        let existing = self.find_existing_meets(conn, batch)?;
        if !existing.is_empty() && !confirm_overwrite(&existing) {
            info!("Overwrite of {} meet(s) declined", existing.len());
            return Ok(BatchOutcome::Declined);
        }

        let total = batch.len();
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(total);

        for (i, meet) in batch.iter_mut().enumerate() {
            if progress.is_cancelled() {
                warn!("Meet batch cancelled before {}; rolling back", meet.info.name);
                return Ok(BatchOutcome::Cancelled);
            }

            let outcome = self.ingest_meet(&tx, meet).map_err(|e| {
                error!("Meet {} failed, rolling back batch: {}", meet.info.name, e);
                e
            })?;
            progress.report(
                format!(
                    "{}: {} credited, {} orphaned",
                    outcome.description, outcome.credited, outcome.orphaned
                ),
                i + 1,
                total,
            );
            outcomes.push(outcome);
        }

        tx.commit()?;
        progress.report(format!("Committed {} meet(s)", outcomes.len()), total, total);
        Ok(BatchOutcome::Committed(outcomes))
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RAIN-OUT PAIRING
// ============================================================================

/// Merge rain-out halves: for each (first, second) pair, the second meet's
/// lone team joins the first meet and the second meet leaves the batch.
pub fn pair_rain_outs(batch: Vec<MeetResults>, pairs: &[(usize, usize)]) -> Result<Vec<MeetResults>> {
    let mut slots: Vec<Option<MeetResults>> = batch.into_iter().map(Some).collect();

    for &(first, second) in pairs {
        if first == second {
            return Err(IngestError::Pairing(format!("meet {} paired with itself", first)));
        }

        let partner = slots
            .get_mut(second)
            .and_then(Option::take)
            .ok_or_else(|| IngestError::Pairing(format!("no unpaired meet at {}", second)))?;
        let host = slots
            .get_mut(first)
            .and_then(Option::as_mut)
            .ok_or_else(|| IngestError::Pairing(format!("no unpaired meet at {}", first)))?;

        if partner.teams.len() != 1 {
            return Err(IngestError::Pairing(format!(
                "{} has {} teams, expected 1",
                partner.info.name,
                partner.teams.len()
            )));
        }
        if host.teams.len() != 1 {
            return Err(IngestError::Pairing(format!(
                "{} already has {} teams",
                host.info.name,
                host.teams.len()
            )));
        }
        if partner.info.date != host.info.date {
            return Err(IngestError::Pairing(format!(
                "{} and {} are on different dates",
                host.info.name, partner.info.name
            )));
        }

        debug!("Paired {} with {}", partner.describe(), host.describe());
        for team in partner.teams {
            host.add_team(team);
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
