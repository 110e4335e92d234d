// 👻 Orphan Ledger - athletes seen in meet files but missing from the store
//
// Rows are tied to a meet id and replaced wholesale whenever that meet is
// ingested again, so they always agree with the meet's credit rows.

use crate::entities::Athlete;
use crate::error::Result;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    pub meet_id: i64,
    pub team_id: i64,
    pub name: String,
    pub dob: String,
    pub gender: String,
}

impl Orphan {
    /// Snapshot an unmatched athlete for a meet. None when the athlete has
    /// no team id (it was never attached to a resolved team).
    pub fn from_athlete(meet_id: i64, athlete: &Athlete) -> Option<Self> {
        Some(Orphan {
            meet_id,
            team_id: athlete.team_id?,
            name: athlete.name.clone(),
            dob: athlete.dob.clone(),
            gender: athlete.gender.clone(),
        })
    }

    /// "Name - G,  YYYY-MM-DD"
    pub fn athlete_info(&self) -> String {
        format!("{} - {},  {}", self.name, self.gender, self.dob)
    }
}

/// Ledger row joined with what a reader needs to place it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanEntry {
    #[serde(flatten)]
    pub orphan: Orphan,
    pub team_code: String,
    pub meet_date: String,
}

// ============================================================================
// PERSISTENCE
// ============================================================================

pub fn insert_orphan(conn: &Connection, orphan: &Orphan) -> Result<()> {
    conn.execute(
        "INSERT INTO Orphans (team_id, name, dob, gender, meet_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![orphan.team_id, orphan.name, orphan.dob, orphan.gender, orphan.meet_id],
    )?;
    Ok(())
}

pub fn insert_orphans(conn: &Connection, orphans: &[Orphan]) -> Result<usize> {
    for orphan in orphans {
        insert_orphan(conn, orphan)?;
    }
    Ok(orphans.len())
}

/// Clear a meet's ledger ahead of re-ingestion
pub fn remove_orphans(conn: &Connection, meet_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM Orphans WHERE meet_id = ?1", params![meet_id])?;
    Ok(removed)
}

fn entry_from_row(row: &Row) -> rusqlite::Result<OrphanEntry> {
    Ok(OrphanEntry {
        orphan: Orphan {
            meet_id: row.get(0)?,
            team_id: row.get(1)?,
            name: row.get(2)?,
            dob: row.get(3)?,
            gender: row.get(4)?,
        },
        team_code: row.get(5)?,
        meet_date: row.get(6)?,
    })
}

const ENTRY_QUERY: &str = "SELECT o.meet_id, o.team_id, o.name, o.dob, o.gender, t.code, m.meet_date
     FROM Orphans o
     JOIN Teams t ON t.id = o.team_id
     JOIN Meets m ON m.id = o.meet_id";

pub fn orphans_for_meet(conn: &Connection, meet_id: i64) -> Result<Vec<OrphanEntry>> {
    let sql = format!("{} WHERE o.meet_id = ?1 ORDER BY t.code, o.name", ENTRY_QUERY);
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![meet_id], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub fn list_orphans(conn: &Connection) -> Result<Vec<OrphanEntry>> {
    let sql = format!("{} ORDER BY m.meet_date, t.code, o.name", ENTRY_QUERY);
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map([], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::entities::Team;

    fn create_test_meet(conn: &Connection) -> (i64, i64) {
        let t1 = db::insert_team(conn, &Team::new("SST", "Seaside")).unwrap();
        let t2 = db::insert_team(conn, &Team::new("HBR", "Harbor")).unwrap();
        db::insert_meet(conn, "2017-07-12", "2017-07-13", t1, t2, "MEET_RESULTS").unwrap();
        let meet = db::find_meet(conn, t1, t2, "2017-07-12").unwrap().unwrap();
        (meet.id, t1)
    }

    fn create_test_orphan(meet_id: i64, team_id: i64, name: &str) -> Orphan {
        let mut athlete = Athlete::new(name, "M", "2004-05-23");
        athlete.team_id = Some(team_id);
        Orphan::from_athlete(meet_id, &athlete).unwrap()
    }

    #[test]
    fn test_athlete_info() {
        let orphan = create_test_orphan(1, 1, "Bucher, Josh");
        assert_eq!(orphan.athlete_info(), "Bucher, Josh - M,  2004-05-23");
    }

    #[test]
    fn test_from_athlete_requires_team() {
        let athlete = Athlete::new("Bucher, Josh", "M", "2004-05-23");
        assert!(Orphan::from_athlete(1, &athlete).is_none());
    }

    #[test]
    fn test_ledger_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let (meet_id, team_id) = create_test_meet(&conn);

        let orphans = vec![
            create_test_orphan(meet_id, team_id, "Zed, Zoe"),
            create_test_orphan(meet_id, team_id, "Bucher, Josh"),
        ];
        assert_eq!(insert_orphans(&conn, &orphans).unwrap(), 2);

        let entries = orphans_for_meet(&conn, meet_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].orphan.name, "Bucher, Josh");
        assert_eq!(entries[0].team_code, "SST");
        assert_eq!(entries[0].meet_date, "2017-07-12");
        assert_eq!(list_orphans(&conn).unwrap().len(), 2);

        assert_eq!(remove_orphans(&conn, meet_id).unwrap(), 2);
        assert!(orphans_for_meet(&conn, meet_id).unwrap().is_empty());
    }
}
