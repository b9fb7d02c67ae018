pub use self::student::{RosterEntry, Student};
pub use self::team::{NewTeam, Team, TeamId, ValidationError, decode_members, encode_members};

mod student;
mod team;
