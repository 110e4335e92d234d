// 🗄️ Store - schema and persistence functions over rusqlite
//
// Every function takes `&Connection`; a `rusqlite::Transaction` derefs to
// one, so the reconciliation engine runs the same calls inside its batch.

use crate::entities::{Athlete, Meet, Team};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// Open (or create) the store and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Teams / Athletes
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            last_update DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Athletes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            dob TEXT NOT NULL,
            gender TEXT NOT NULL,
            team_id INTEGER NOT NULL REFERENCES Teams(id),
            last_update DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Meets + credit rows
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Meets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meet_date TEXT NOT NULL,
            file_date TEXT NOT NULL,
            team1_id INTEGER NOT NULL REFERENCES Teams(id),
            team2_id INTEGER NOT NULL REFERENCES Teams(id),
            result_type TEXT NOT NULL,
            last_update DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (team1_id, team2_id, meet_date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Athlete_Meet (
            athlete_id INTEGER NOT NULL REFERENCES Athletes(id) ON DELETE CASCADE,
            meet_id INTEGER NOT NULL REFERENCES Meets(id) ON DELETE CASCADE,
            PRIMARY KEY (athlete_id, meet_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Orphan ledger
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Orphans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL REFERENCES Teams(id),
            name TEXT NOT NULL,
            dob TEXT NOT NULL,
            gender TEXT NOT NULL,
            meet_id INTEGER NOT NULL REFERENCES Meets(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_athlete_identity
         ON Athletes(name, dob, gender, team_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_athletes_team ON Athletes(team_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orphans_meet ON Orphans(meet_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// TEAMS
// ============================================================================

fn team_from_row(row: &Row) -> rusqlite::Result<Team> {
    let mut team = Team::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?);
    team.id = Some(row.get(0)?);
    Ok(team)
}

pub fn find_team_by_code(conn: &Connection, code: &str) -> Result<Option<Team>> {
    let team = conn
        .query_row(
            "SELECT id, code, name FROM Teams WHERE code = ?1",
            params![code],
            team_from_row,
        )
        .optional()?;
    Ok(team)
}

pub fn find_team_by_id(conn: &Connection, id: i64) -> Result<Option<Team>> {
    let team = conn
        .query_row(
            "SELECT id, code, name FROM Teams WHERE id = ?1",
            params![id],
            team_from_row,
        )
        .optional()?;
    Ok(team)
}

pub fn list_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn.prepare("SELECT id, code, name FROM Teams ORDER BY code")?;
    let teams = stmt
        .query_map([], team_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(teams)
}

/// Insert a team row and return its generated id
pub fn insert_team(conn: &Connection, team: &Team) -> Result<i64> {
    conn.execute(
        "INSERT INTO Teams (code, name) VALUES (?1, ?2)",
        params![team.code, team.name],
    )?;
    Ok(conn.last_insert_rowid())
}

// ============================================================================
// ATHLETES
// ============================================================================

fn athlete_from_row(row: &Row) -> rusqlite::Result<Athlete> {
    let athlete = Athlete::new(
        row.get::<_, String>(1)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(2)?,
    );
    Ok(athlete.with_ids(row.get(0)?, row.get(4)?))
}

/// Persisted roster of one team
pub fn retrieve_athletes(conn: &Connection, team_id: i64) -> Result<HashSet<Athlete>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, dob, gender, team_id FROM Athletes WHERE team_id = ?1",
    )?;
    let athletes = stmt
        .query_map(params![team_id], athlete_from_row)?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(athletes)
}

/// Store id of the athlete with the same (name, dob, gender, team id)
pub fn find_athlete_id(conn: &Connection, athlete: &Athlete) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM Athletes
             WHERE name = ?1 AND dob = ?2 AND gender = ?3 AND team_id = ?4",
            params![athlete.name, athlete.dob, athlete.gender, athlete.team_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_athlete(conn: &Connection, athlete: &Athlete) -> Result<i64> {
    conn.execute(
        "INSERT INTO Athletes (name, dob, gender, team_id) VALUES (?1, ?2, ?3, ?4)",
        params![athlete.name, athlete.dob, athlete.gender, athlete.team_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete by value identity; returns the number of rows removed
pub fn remove_athlete(conn: &Connection, athlete: &Athlete) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM Athletes
         WHERE name = ?1 AND dob = ?2 AND gender = ?3 AND team_id = ?4",
        params![athlete.name, athlete.dob, athlete.gender, athlete.team_id],
    )?;
    Ok(removed)
}

// ============================================================================
// MEETS
// ============================================================================

const MEET_COLUMNS: &str = "id, meet_date, file_date, team1_id, team2_id, result_type";

fn meet_from_row(row: &Row) -> rusqlite::Result<Meet> {
    Ok(Meet {
        id: row.get(0)?,
        meet_date: row.get(1)?,
        file_date: row.get(2)?,
        team1_id: row.get(3)?,
        team2_id: row.get(4)?,
        result_type: row.get(5)?,
    })
}

/// Meet between two teams on a date, whichever side each team was listed on
pub fn find_meet(conn: &Connection, team1_id: i64, team2_id: i64, meet_date: &str) -> Result<Option<Meet>> {
    let sql = format!(
        "SELECT {} FROM Meets
         WHERE meet_date = ?3
           AND ((team1_id = ?1 AND team2_id = ?2) OR (team1_id = ?2 AND team2_id = ?1))",
        MEET_COLUMNS
    );
    let meet = conn
        .query_row(&sql, params![team1_id, team2_id, meet_date], meet_from_row)
        .optional()?;
    Ok(meet)
}

/// Same lookup keyed by team codes, for teams whose ids are not resolved yet
pub fn find_meet_by_codes(conn: &Connection, code1: &str, code2: &str, meet_date: &str) -> Result<Option<Meet>> {
    let (Some(t1), Some(t2)) = (find_team_by_code(conn, code1)?, find_team_by_code(conn, code2)?) else {
        return Ok(None);
    };
    match (t1.id, t2.id) {
        (Some(id1), Some(id2)) => find_meet(conn, id1, id2, meet_date),
        _ => Ok(None),
    }
}

pub fn find_meet_by_id(conn: &Connection, meet_id: i64) -> Result<Option<Meet>> {
    let sql = format!("SELECT {} FROM Meets WHERE id = ?1", MEET_COLUMNS);
    let meet = conn
        .query_row(&sql, params![meet_id], meet_from_row)
        .optional()?;
    Ok(meet)
}

pub fn list_meets(conn: &Connection) -> Result<Vec<Meet>> {
    let sql = format!("SELECT {} FROM Meets ORDER BY meet_date, id", MEET_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let meets = stmt
        .query_map([], meet_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(meets)
}

pub fn insert_meet(
    conn: &Connection,
    meet_date: &str,
    file_date: &str,
    team1_id: i64,
    team2_id: i64,
    result_type: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO Meets (meet_date, file_date, team1_id, team2_id, result_type)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![meet_date, file_date, team1_id, team2_id, result_type],
    )?;
    Ok(())
}

/// The only meet column that changes after creation
pub fn update_meet_file_date(conn: &Connection, meet_id: i64, file_date: &str) -> Result<()> {
    conn.execute(
        "UPDATE Meets SET file_date = ?1, last_update = CURRENT_TIMESTAMP WHERE id = ?2",
        params![file_date, meet_id],
    )?;
    Ok(())
}

// ============================================================================
// CREDIT ROWS (Athlete_Meet)
// ============================================================================

pub fn insert_meet_credit(conn: &Connection, athlete_id: i64, meet_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO Athlete_Meet (athlete_id, meet_id) VALUES (?1, ?2)",
        params![athlete_id, meet_id],
    )?;
    Ok(())
}

/// Drop every credit row of a meet, leaving the meet row in place
pub fn remove_meet_credits(conn: &Connection, meet_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM Athlete_Meet WHERE meet_id = ?1", params![meet_id])?;
    Ok(removed)
}

pub fn credited_athletes(conn: &Connection, meet_id: i64) -> Result<Vec<Athlete>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, a.dob, a.gender, a.team_id
         FROM Athletes a JOIN Athlete_Meet am ON am.athlete_id = a.id
         WHERE am.meet_id = ?1
         ORDER BY a.name",
    )?;
    let athletes = stmt
        .query_map(params![meet_id], athlete_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(athletes)
}
