use crate::config::DatabaseConfig;
use crate::model::{Team, TeamId, decode_members};
use eyre::{Context, Error};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, SqliteConnection};
use std::time::Duration;
use tracing::{debug, info, warn};

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

pub const LEADER: &str = "leader";
pub const MEMBER: &str = "member";

const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        roll_no TEXT NOT NULL,
        student_name TEXT NOT NULL,
        father_name TEXT,
        student_email TEXT,
        group_name TEXT NOT NULL,
        gender TEXT,
        father_mobile TEXT,
        student_mobile TEXT,
        mode_new TEXT,
        UNIQUE(roll_no, group_name)
    )",
    "CREATE INDEX IF NOT EXISTS idx_students_group ON students(group_name)",
    "CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_name TEXT NOT NULL,
        leader_roll TEXT NOT NULL UNIQUE,
        member_rolls TEXT,
        project_title TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_teams_group ON teams(group_name)",
    "CREATE TABLE IF NOT EXISTS team_members (
        team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
        group_name TEXT NOT NULL,
        roll_no TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('leader', 'member')),
        position INTEGER NOT NULL,
        UNIQUE(group_name, roll_no)
    )",
    "CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id)",
];

/// How a storage error should be reported to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// A uniqueness constraint rejected the write.
    UniqueViolation,
    /// The write lock could not be obtained in time. Retryable.
    Busy,
    /// Anything else.
    Fault,
}

pub fn classify(err: &sqlx::Error) -> Failure {
    match err {
        sqlx::Error::PoolTimedOut => Failure::Busy,
        sqlx::Error::Database(db) if db.is_unique_violation() => Failure::UniqueViolation,
        sqlx::Error::Database(db) => {
            // SQLite reports extended codes, the primary code is the low byte.
            match db.code().and_then(|c| c.parse::<i32>().ok()).map(|c| c & 0xff) {
                Some(SQLITE_BUSY | SQLITE_LOCKED) => Failure::Busy,
                _ => Failure::Fault,
            }
        }
        _ => Failure::Fault,
    }
}

/// Handle on the team registration database. Cloning it is cheap and
/// shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn open(config: &DatabaseConfig) -> Result<Self, Error> {
        if let Some(parent) = config.file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("cannot create database directory {}", parent.display())
                })?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(&config.file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout());
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.busy_timeout().max(Duration::from_secs(1)))
            .connect_with(options)
            .await
            .with_context(|| format!("cannot open database {}", config.file.display()))?;
        debug!(file = %config.file.display(), "database opened");
        let store = Self { pool };
        store.init_schema().await?;
        store.backfill_members().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("cannot create database schema")?;
        }
        Ok(())
    }

    /// Register in `team_members` the students of teams created before the
    /// table existed. Students already booked elsewhere are left out and
    /// show up in the consistency audit.
    async fn backfill_members(&self) -> Result<(), Error> {
        let rows = sqlx::query(
            "SELECT id, group_name, leader_roll, member_rolls, project_title, created_at
             FROM teams t
             WHERE NOT EXISTS (SELECT 1 FROM team_members m WHERE m.team_id = t.id)
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("cannot look for teams to backfill")?;
        if rows.is_empty() {
            return Ok(());
        }
        let mut trans = self.pool.begin().await?;
        for row in &rows {
            let team = team_from_row(row)?;
            for (position, roll) in team.rolls().enumerate() {
                let role = if position == 0 { LEADER } else { MEMBER };
                let inserted = sqlx::query(
                    "INSERT OR IGNORE INTO team_members (team_id, group_name, roll_no, role, position)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(team.id.0)
                .bind(&team.group_name)
                .bind(roll)
                .bind(role)
                .bind(position as i64)
                .execute(&mut *trans)
                .await
                .context("cannot backfill team members")?
                .rows_affected();
                if inserted == 0 {
                    warn!(team = %team.id, roll, "student already belongs to another team");
                }
            }
        }
        trans
            .commit()
            .await
            .context("error when committing transaction")?;
        info!(teams = rows.len(), "backfilled team members");
        Ok(())
    }

    /// Teams of one group, or of every group, in creation order.
    pub async fn teams(&self, group: Option<&str>) -> Result<Vec<Team>, Error> {
        let mut conn = self.pool.acquire().await?;
        teams_with(&mut conn, group).await
    }

    pub async fn leader_exists(&self, leader_roll: &str) -> Result<bool, sqlx::Error> {
        Ok(sqlx::query("SELECT 1 FROM teams WHERE leader_roll = ?")
            .bind(leader_roll)
            .fetch_optional(&self.pool)
            .await?
            .is_some())
    }
}

pub async fn teams_with(conn: &mut SqliteConnection, group: Option<&str>) -> Result<Vec<Team>, Error> {
    sqlx::query(
        "SELECT id, group_name, leader_roll, member_rolls, project_title, created_at
         FROM teams
         WHERE ?1 IS NULL OR group_name = ?1
         ORDER BY id",
    )
    .bind(group)
    .fetch_all(conn)
    .await
    .context("cannot load teams")?
    .iter()
    .map(team_from_row)
    .collect()
}

fn team_from_row(row: &SqliteRow) -> Result<Team, Error> {
    let id = TeamId(row.try_get("id")?);
    let members: Option<String> = row.try_get("member_rolls")?;
    Ok(Team {
        id,
        group_name: row.try_get("group_name")?,
        leader_roll: row.try_get("leader_roll")?,
        member_rolls: decode_members(members.as_deref())
            .with_context(|| format!("invalid member list for team {id}"))?,
        project_title: row
            .try_get::<Option<String>, _>("project_title")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}
