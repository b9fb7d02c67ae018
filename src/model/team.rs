use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed team.
#[derive(Clone, Debug)]
pub struct Team {
    pub id: TeamId,
    pub group_name: String,
    pub leader_roll: String,
    pub member_rolls: Vec<String>,
    pub project_title: String,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Leader first, then members in their registration order.
    pub fn rolls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.leader_roll.as_str())
            .chain(self.member_rolls.iter().map(String::as_str))
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ID {} - Leader: {} ({})", self.id, self.leader_roll, self.group_name)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("group name is required")]
    EmptyGroup,
    #[error("team leader is required")]
    EmptyLeader,
    #[error("project title is required")]
    EmptyTitle,
    #[error("select at least one member")]
    NoMembers,
    #[error("member roll numbers cannot be empty")]
    EmptyMember,
    #[error("student {0} is selected more than once")]
    RepeatedMember(String),
    #[error("leader {0} cannot also be a member")]
    LeaderIsMember(String),
}

/// A team request whose fields have been trimmed and checked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewTeam {
    pub group_name: String,
    pub leader_roll: String,
    pub member_rolls: Vec<String>,
    pub project_title: String,
}

impl NewTeam {
    pub fn new<S: AsRef<str>>(
        group_name: &str,
        leader_roll: &str,
        member_rolls: &[S],
        project_title: &str,
    ) -> Result<NewTeam, ValidationError> {
        let group_name = group_name.trim();
        let leader_roll = leader_roll.trim();
        let project_title = project_title.trim();
        let member_rolls = member_rolls
            .iter()
            .map(|m| m.as_ref().trim().to_owned())
            .collect::<Vec<_>>();
        if group_name.is_empty() {
            return Err(ValidationError::EmptyGroup);
        }
        if leader_roll.is_empty() {
            return Err(ValidationError::EmptyLeader);
        }
        if project_title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if member_rolls.is_empty() {
            return Err(ValidationError::NoMembers);
        }
        let mut seen = HashSet::new();
        for member in &member_rolls {
            if member.is_empty() {
                return Err(ValidationError::EmptyMember);
            }
            if member == leader_roll {
                return Err(ValidationError::LeaderIsMember(member.clone()));
            }
            if !seen.insert(member.as_str()) {
                return Err(ValidationError::RepeatedMember(member.clone()));
            }
        }
        Ok(NewTeam {
            group_name: group_name.to_owned(),
            leader_roll: leader_roll.to_owned(),
            member_rolls,
            project_title: project_title.to_owned(),
        })
    }
}

/// Storage form of a member list: a JSON array of roll numbers.
pub fn encode_members(members: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(members)
}

/// Decode a stored member list. NULL and empty columns hold no members, and
/// rows written by older versions used a comma-separated list.
pub fn decode_members(stored: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    let stored = stored.map(str::trim).unwrap_or_default();
    let members: Vec<String> = if stored.is_empty() {
        Vec::new()
    } else if stored.starts_with('[') {
        serde_json::from_str(stored)?
    } else {
        stored.split(',').map(String::from).collect()
    };
    Ok(members
        .into_iter()
        .map(|m| m.trim().to_owned())
        .filter(|m| !m.is_empty())
        .collect())
}
