// 🏁 Team Entity - code identity + athlete set
//
// Parsed teams carry no id; the reconciliation engine fills it in after
// a lookup or insert. Every athlete in the set carries the team's id, so
// assigning the id rebuilds the set (athlete hashes depend on team_id).

use super::Athlete;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Store id, absent until matched or inserted
    pub id: Option<i64>,

    /// Short unique identifier, e.g. "SST"
    pub code: String,

    /// Display name
    pub name: String,

    athletes: HashSet<Athlete>,
}

impl Team {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Team {
            id: None,
            code: code.into(),
            name: name.into(),
            athletes: HashSet::new(),
        }
    }

    /// Add an athlete, stamping it with this team's id first
    pub fn add_athlete(&mut self, mut athlete: Athlete) -> bool {
        athlete.team_id = self.id;
        self.athletes.insert(athlete)
    }

    pub fn remove_athlete(&mut self, athlete: &Athlete) -> bool {
        self.athletes.remove(athlete)
    }

    pub fn athletes(&self) -> &HashSet<Athlete> {
        &self.athletes
    }

    /// Replace the athlete set wholesale (e.g. after resolving store ids)
    pub fn replace_athletes(&mut self, athletes: impl IntoIterator<Item = Athlete>) {
        self.athletes.clear();
        for athlete in athletes {
            self.add_athlete(athlete);
        }
    }

    pub fn take_athletes(&mut self) -> HashSet<Athlete> {
        std::mem::take(&mut self.athletes)
    }

    /// Assign the store id and re-key every athlete under it
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        let athletes = self.take_athletes();
        self.replace_athletes(athletes);
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.id == other.id
    }
}

impl Eq for Team {}

impl Hash for Team {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_team() -> Team {
        let mut team = Team::new("SST", "Seaside Swim Team");
        team.add_athlete(Athlete::new("Ertz, Lauren", "F", "2001-11-20"));
        team.add_athlete(Athlete::new("Bucher, Josh", "M", "2004-05-23"));
        team
    }

    #[test]
    fn test_add_athlete_stamps_team_id() {
        let mut team = Team::new("SST", "Seaside Swim Team");
        team.set_id(3);
        team.add_athlete(Athlete::new("Ertz, Lauren", "F", "2001-11-20"));

        let athlete = team.athletes().iter().next().unwrap();
        assert_eq!(athlete.team_id, Some(3));
    }

    #[test]
    fn test_set_id_rebuilds_athlete_set() {
        let mut team = create_test_team();
        assert!(team.athletes().iter().all(|a| a.team_id.is_none()));

        team.set_id(9);

        assert_eq!(team.athletes().len(), 2);
        assert!(team.athletes().iter().all(|a| a.team_id == Some(9)));

        let mut probe = Athlete::new("Ertz, Lauren", "F", "2001-11-20");
        probe.team_id = Some(9);
        assert!(team.athletes().contains(&probe));
    }

    #[test]
    fn test_duplicate_athlete_ignored() {
        let mut team = create_test_team();
        assert!(!team.add_athlete(Athlete::new("Ertz, Lauren", "F", "2001-11-20")));
        assert_eq!(team.athletes().len(), 2);
    }

    #[test]
    fn test_remove_athlete() {
        let mut team = create_test_team();
        assert!(team.remove_athlete(&Athlete::new("Bucher, Josh", "M", "2004-05-23")));
        assert_eq!(team.athletes().len(), 1);
    }

    #[test]
    fn test_team_equality() {
        let a = Team::new("SST", "Seaside Swim Team");
        let b = Team::new("SST", "Seaside Swimming");
        assert_eq!(a, b);

        let mut c = Team::new("SST", "Seaside Swim Team");
        c.set_id(1);
        assert_ne!(a, c);
        assert_ne!(a, Team::new("HBR", "Harbor"));
    }
}
