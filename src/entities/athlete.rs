// 🏊 Athlete Entity - value identity over (name, dob, gender, team)
//
// "The persisted id is bookkeeping, not identity"
//
// Two athletes parsed from different files (or one parsed, one loaded from
// the store) are the same athlete when their values match. This is what
// lets the roster merge work as a plain set difference.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Athlete - name/gender/dob plus the owning team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    /// Store id, absent until matched or inserted
    pub id: Option<i64>,

    /// "Last, First" with whitespace collapsed
    pub name: String,

    /// Single character, as written in the file
    pub gender: String,

    /// ISO date (YYYY-MM-DD)
    pub dob: String,

    /// Set by Team::add_athlete before the athlete joins any set
    pub team_id: Option<i64>,

    /// Finals time was NS/SCR (meet results only)
    #[serde(default)]
    pub no_show: bool,
}

impl Athlete {
    pub fn new(name: impl Into<String>, gender: impl Into<String>, dob: impl Into<String>) -> Self {
        Athlete {
            id: None,
            name: name.into(),
            gender: gender.into(),
            dob: dob.into(),
            team_id: None,
            no_show: false,
        }
    }

    /// Builder-style constructor for rows read back from the store
    pub fn with_ids(mut self, id: i64, team_id: i64) -> Self {
        self.id = Some(id);
        self.team_id = Some(team_id);
        self
    }
}

impl PartialEq for Athlete {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dob == other.dob
            && self.gender == other.gender
            && self.team_id == other.team_id
    }
}

impl Eq for Athlete {}

impl Hash for Athlete {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.dob.hash(state);
        self.gender.hash(state);
        self.team_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_test_athlete(name: &str, team_id: i64) -> Athlete {
        let mut athlete = Athlete::new(name, "F", "2001-11-20");
        athlete.team_id = Some(team_id);
        athlete
    }

    #[test]
    fn test_equality_ignores_id() {
        let parsed = create_test_athlete("Ertz, Lauren", 1);
        let stored = Athlete::new("Ertz, Lauren", "F", "2001-11-20").with_ids(42, 1);

        assert_eq!(parsed, stored);
        assert_ne!(parsed.id, stored.id);
    }

    #[test]
    fn test_equality_uses_every_value_field() {
        let base = create_test_athlete("Ertz, Lauren", 1);

        let mut other_dob = base.clone();
        other_dob.dob = "2001-11-21".to_string();
        assert_ne!(base, other_dob);

        let mut other_gender = base.clone();
        other_gender.gender = "M".to_string();
        assert_ne!(base, other_gender);

        assert_ne!(base, create_test_athlete("Ertz, Lauren", 2));
        assert_ne!(base, create_test_athlete("Ertz, Laura", 1));
    }

    #[test]
    fn test_hash_set_unifies_sources() {
        let mut set = HashSet::new();
        set.insert(create_test_athlete("Ertz, Lauren", 1));
        set.insert(Athlete::new("Ertz, Lauren", "F", "2001-11-20").with_ids(7, 1));

        assert_eq!(set.len(), 1);
        assert!(set.contains(&create_test_athlete("Ertz, Lauren", 1)));
    }
}
