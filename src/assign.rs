use crate::model::{NewTeam, TeamId, ValidationError, encode_members};
use crate::store::{Failure, LEADER, MEMBER, Store, classify};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Outcome of a team registration that did not hit a fatal error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Registration {
    Created(TeamId),
    /// The leader already leads a team.
    DuplicateLeader,
    /// A student of the team already belongs to another team of the group.
    MemberConflict { roll: String },
    /// The database stayed locked for longer than the busy timeout. The
    /// caller may retry after refreshing the roster.
    StorageBusy,
}

#[derive(Debug, Error)]
pub enum TeamError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot encode member list")]
    Encoding(#[from] serde_json::Error),
    #[error("storage failure")]
    Storage(#[source] sqlx::Error),
}

/// Register a new team. The member-count upper bound and the availability
/// of the chosen students are the caller's business.
pub async fn create_team<S: AsRef<str>>(
    store: &Store,
    group_name: &str,
    leader_roll: &str,
    member_rolls: &[S],
    project_title: &str,
) -> Result<Registration, TeamError> {
    let team = NewTeam::new(group_name, leader_roll, member_rolls, project_title)?;
    register(store, &team).await
}

#[instrument(skip_all, fields(group = %team.group_name, leader = %team.leader_roll))]
pub async fn register(store: &Store, team: &NewTeam) -> Result<Registration, TeamError> {
    match store.leader_exists(&team.leader_roll).await {
        Ok(false) => (),
        Ok(true) => {
            info!("leader already has a team");
            return Ok(Registration::DuplicateLeader);
        }
        Err(err) => return recover(err, None),
    }
    let members = encode_members(&team.member_rolls)?;
    let created_at = Utc::now();
    let mut trans = match store.pool().begin().await {
        Ok(trans) => trans,
        Err(err) => return recover(err, None),
    };
    match insert(&mut trans, team, &members, created_at).await {
        Ok(id) => match trans.commit().await {
            Ok(()) => {
                info!(team = %id, members = ?team.member_rolls, "team created");
                Ok(Registration::Created(id))
            }
            Err(err) => recover(err, None),
        },
        Err((roll, err)) => {
            if let Err(e) = trans.rollback().await {
                warn!(error = %e, "cannot roll back team registration");
            }
            recover(err, roll)
        }
    }
}

/// Insert the team row, then book every student of the team. On failure,
/// report the roll number whose booking failed, if any.
async fn insert(
    trans: &mut Transaction<'_, Sqlite>,
    team: &NewTeam,
    members: &str,
    created_at: DateTime<Utc>,
) -> Result<TeamId, (Option<String>, sqlx::Error)> {
    let id = sqlx::query(
        "INSERT INTO teams (group_name, leader_roll, member_rolls, project_title, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&team.group_name)
    .bind(&team.leader_roll)
    .bind(members)
    .bind(&team.project_title)
    .bind(created_at)
    .execute(&mut **trans)
    .await
    .map_err(|e| (None, e))?
    .last_insert_rowid();
    let rolls = std::iter::once((LEADER, &team.leader_roll))
        .chain(team.member_rolls.iter().map(|m| (MEMBER, m)));
    for (position, (role, roll)) in rolls.enumerate() {
        sqlx::query(
            "INSERT INTO team_members (team_id, group_name, roll_no, role, position)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&team.group_name)
        .bind(roll)
        .bind(role)
        .bind(position as i64)
        .execute(&mut **trans)
        .await
        .map_err(|e| (Some(roll.clone()), e))?;
    }
    Ok(TeamId(id))
}

fn recover(err: sqlx::Error, roll: Option<String>) -> Result<Registration, TeamError> {
    match classify(&err) {
        Failure::UniqueViolation => Ok(match roll {
            None => {
                info!("leader registered concurrently");
                Registration::DuplicateLeader
            }
            Some(roll) => {
                info!(%roll, "student already belongs to a team");
                Registration::MemberConflict { roll }
            }
        }),
        Failure::Busy => {
            debug!(error = %err, "database busy");
            Ok(Registration::StorageBusy)
        }
        Failure::Fault => Err(TeamError::Storage(err)),
    }
}
