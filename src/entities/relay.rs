// 🔗 Relay - transient grouping while assembling a meet file
//
// Relay members are folded into the owning team's athlete set; relays are
// never persisted on their own.

use super::Athlete;

#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    /// "<team code>-<relay letter>"
    pub name: String,

    /// Relay finals time was NS/SCR; its members are dropped
    pub no_show: bool,

    pub members: Vec<Athlete>,
}

impl Relay {
    pub fn new(name: impl Into<String>, no_show: bool) -> Self {
        Relay {
            name: name.into(),
            no_show,
            members: Vec::new(),
        }
    }
}
