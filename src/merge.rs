// 🔀 Roster Merge - set difference between persisted and parsed rosters
//
// Full-replacement semantics: after applying the diff the persisted roster
// is exactly the parsed roster. Matching is by athlete value identity, so a
// changed dob or gender shows up as a delete + add pair.

use crate::entities::Athlete;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// ROSTER DIFF
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterDiff {
    /// Persisted athletes missing from the parsed roster
    pub to_delete: Vec<Athlete>,

    /// Parsed athletes with no persisted counterpart
    pub to_add: Vec<Athlete>,

    /// Athletes present on both sides
    pub unchanged: usize,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_add.is_empty()
    }
}

// ============================================================================
// MERGE ENGINE
// ============================================================================

/// Two-pass diff: every parsed athlete knocks its counterpart out of the
/// delete candidates, or lands in the add set when it has none.
pub fn diff_rosters(persisted: &HashSet<Athlete>, parsed: &HashSet<Athlete>) -> RosterDiff {
    let mut delete_candidates = persisted.clone();
    let mut to_add = Vec::new();
    let mut unchanged = 0;

    for athlete in parsed {
        if delete_candidates.remove(athlete) {
            unchanged += 1;
        } else {
            to_add.push(athlete.clone());
        }
    }

    RosterDiff {
        to_delete: delete_candidates.into_iter().collect(),
        to_add,
        unchanged,
    }
}
