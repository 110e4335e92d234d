// Domain Entities
//
// Aggregates are built fresh per input file by the assembler; store ids
// are filled in only by the reconciliation engine.

pub mod athlete;
pub mod meet;
pub mod relay;
pub mod team;

pub use athlete::Athlete;
pub use meet::{Meet, MeetInfo, MeetResults, Scenario};
pub use relay::Relay;
pub use team::Team;
