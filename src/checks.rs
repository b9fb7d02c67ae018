use crate::model::{Team, TeamId};
use crate::store::Store;
use eyre::{Error, bail};
use std::collections::BTreeMap;
use tracing::warn;

/// A student found in more than one team of a group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DoubleBooking {
    pub group_name: String,
    pub roll_no: String,
    pub teams: Vec<TeamId>,
}

/// Find every student booked in several teams of the same group. Teams
/// registered before member bookings were enforced may contain some.
pub fn double_bookings(teams: &[Team]) -> Vec<DoubleBooking> {
    let mut bookings: BTreeMap<(&str, &str), Vec<TeamId>> = BTreeMap::new();
    for team in teams {
        for roll in team.rolls() {
            let entry = bookings.entry((team.group_name.as_str(), roll)).or_default();
            if !entry.contains(&team.id) {
                entry.push(team.id);
            }
        }
    }
    bookings
        .into_iter()
        .filter(|(_, teams)| teams.len() > 1)
        .map(|((group_name, roll_no), teams)| DoubleBooking {
            group_name: group_name.to_owned(),
            roll_no: roll_no.to_owned(),
            teams,
        })
        .collect()
}

pub async fn audit(store: &Store) -> Result<Vec<DoubleBooking>, Error> {
    let teams = store.teams(None).await?;
    let found = double_bookings(&teams);
    for booking in &found {
        warn!(
            group = %booking.group_name,
            student = %booking.roll_no,
            teams = ?booking.teams,
            "student belongs to several teams"
        );
    }
    Ok(found)
}

pub fn ensure_consistent(found: &[DoubleBooking]) -> Result<(), Error> {
    if !found.is_empty() {
        bail!("{} students belong to more than one team", found.len());
    }
    Ok(())
}
