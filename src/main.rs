use crate::admin::{AdminGate, delete_team, list_teams};
use crate::assign::{Registration, create_team};
use crate::config::Config;
use crate::display::*;
use crate::model::{RosterEntry, TeamId};
use crate::roster::{available_students, groups, students};
use crate::store::Store;
use clap::{Parser, Subcommand};
use eyre::{Context, Error, bail, ensure};
use std::path::PathBuf;
use tracing::Level;

mod admin;
mod assign;
mod checks;
mod config;
mod display;
mod import;
mod model;
mod roster;
mod store;

#[derive(Parser)]
#[command(version, author, about)]
struct Options {
    /// Use FILE instead of rteams.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Set verbosity level
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload students from a CSV file
    Import { file: PathBuf },
    /// List student groups
    Groups,
    /// List uploaded students
    Students {
        /// Group to show, "All" for every group
        #[arg(long)]
        group: Option<String>,
    },
    /// List the students of a group who are not in a team yet
    Roster { group: String },
    /// Register a new team
    CreateTeam {
        #[arg(long)]
        group: String,
        /// Roll number, or "roll - name" as shown by the roster
        #[arg(long)]
        leader: String,
        /// Roll number, or "roll - name" as shown by the roster
        #[arg(long = "member", value_name = "MEMBER", required = true)]
        members: Vec<String>,
        #[arg(long)]
        title: String,
    },
    /// List registered teams
    Teams {
        /// Group to show, "All" for every group
        #[arg(long)]
        group: Option<String>,
    },
    /// Delete a team (admin only)
    DeleteTeam {
        id: i64,
        #[arg(long)]
        password: String,
    },
    /// Check that no student belongs to more than one team
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    color_eyre::install()?;
    let options = Options::parse();
    let level = match options.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(options.config.as_deref())?;
    let store = Store::open(&config.database).await?;
    let result = run(&store, &config, options.command).await;
    store.close().await;
    result
}

async fn run(store: &Store, config: &Config, command: Command) -> Result<(), Error> {
    match command {
        Command::Import { file } => {
            let input = std::fs::File::open(&file)
                .with_context(|| format!("cannot open {}", file.display()))?;
            let report = import::import_students(store, input).await?;
            display_import(&report);
        }
        Command::Groups => display_groups(&groups(store).await?),
        Command::Students { group } => {
            display_students(&students(store, group.as_deref()).await?)
        }
        Command::Roster { group } => {
            ensure_known_group(store, &group).await?;
            display_roster(&group, &available_students(store, &group).await?);
        }
        Command::CreateTeam {
            group,
            leader,
            members,
            title,
        } => register_team(store, config, &group, &leader, &members, &title).await?,
        Command::Teams { group } => display_teams(&list_teams(store, group.as_deref()).await?),
        Command::DeleteTeam { id, password } => {
            let gate = AdminGate::new(&config.admin);
            if delete_team(store, &gate, &password, TeamId(id)).await? {
                println!("Team {id} deleted successfully!");
            } else {
                bail!("no team with id {id}");
            }
        }
        Command::Check => {
            let found = checks::audit(store).await?;
            display_double_bookings(&found);
            checks::ensure_consistent(&found)?;
        }
    }
    Ok(())
}

async fn ensure_known_group(store: &Store, group: &str) -> Result<(), Error> {
    ensure!(
        groups(store).await?.iter().any(|g| g == group),
        "unknown group {group}"
    );
    Ok(())
}

/// Play the part of the team-creation form: only students currently on the
/// roster can be chosen, and no more than the configured number of members.
async fn register_team(
    store: &Store,
    config: &Config,
    group: &str,
    leader: &str,
    members: &[String],
    title: &str,
) -> Result<(), Error> {
    let max_members = config.teams.max_members;
    ensure!(
        (1..=max_members).contains(&members.len()),
        "select between 1 and {max_members} team members"
    );
    ensure_known_group(store, group).await?;
    let roster = available_students(store, group).await?;
    ensure!(!roster.is_empty(), "all students of {group} already assigned");
    let leader = RosterEntry::roll_of(leader);
    let members = members
        .iter()
        .map(|m| RosterEntry::roll_of(m))
        .collect::<Vec<_>>();
    for &roll in std::iter::once(&leader).chain(&members) {
        ensure!(
            roster.iter().any(|e| e.roll_no == roll),
            "student {roll} is not available in group {group}"
        );
    }
    match create_team(store, group, leader, &members, title).await? {
        Registration::Created(id) => println!("Team {id} created successfully!"),
        Registration::DuplicateLeader => bail!("this leader already has a team"),
        Registration::MemberConflict { roll } => {
            bail!("student {roll} joined another team meanwhile, check the roster and try again")
        }
        Registration::StorageBusy => {
            bail!("the database is busy, check the roster and try again")
        }
    }
    Ok(())
}
