use crate::model::{RosterEntry, Student};
use crate::store::{Store, teams_with};
use eyre::{Context, Error};
use std::collections::HashSet;
use tracing::{instrument, trace};

/// Cohorts known from the uploaded students, sorted by name.
pub async fn groups(store: &Store) -> Result<Vec<String>, Error> {
    Ok(
        sqlx::query_as::<_, (String,)>(
            "SELECT DISTINCT group_name FROM students ORDER BY group_name",
        )
        .fetch_all(store.pool())
        .await
        .context("cannot load groups")?
        .into_iter()
        .map(|(group,)| group)
        .collect(),
    )
}

/// Pseudo-group selecting every cohort in listings.
pub const ALL_GROUPS: &str = "All";

/// Normalize a listing filter: no group, a blank one or `All` select every
/// group.
pub fn group_filter(group: Option<&str>) -> Option<&str> {
    group
        .map(str::trim)
        .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case(ALL_GROUPS))
}

/// Uploaded students of one group or of every group, ordered by group then
/// by name.
pub async fn students(store: &Store, group: Option<&str>) -> Result<Vec<Student>, Error> {
    sqlx::query_as::<_, Student>(
        "SELECT roll_no, student_name,
                COALESCE(father_name, '') AS father_name,
                COALESCE(student_email, '') AS student_email,
                group_name,
                COALESCE(gender, '') AS gender,
                COALESCE(father_mobile, '') AS father_mobile,
                COALESCE(student_mobile, '') AS student_mobile,
                COALESCE(mode_new, '') AS mode_new
         FROM students
         WHERE ?1 IS NULL OR group_name = ?1
         ORDER BY group_name, student_name, roll_no",
    )
    .bind(group_filter(group))
    .fetch_all(store.pool())
    .await
    .context("cannot load students")
}

/// Students of `group` who neither lead nor belong to a team of that group,
/// ordered by name.
///
/// Nothing is cached between calls: the answer is only valid until the next
/// team gets committed.
#[instrument(skip(store))]
pub async fn available_students(store: &Store, group: &str) -> Result<Vec<RosterEntry>, Error> {
    let mut conn = store.pool().acquire().await?;
    let students: Vec<RosterEntry> = sqlx::query_as(
        "SELECT roll_no, student_name FROM students
         WHERE group_name = ?
         ORDER BY student_name, roll_no",
    )
    .bind(group)
    .fetch_all(&mut *conn)
    .await
    .context("cannot load students")?;
    let teams = teams_with(&mut conn, Some(group)).await?;
    let assigned = teams
        .iter()
        .flat_map(|t| t.rolls())
        .map(str::trim)
        .collect::<HashSet<_>>();
    trace!(
        students = students.len(),
        assigned = assigned.len(),
        "computing roster"
    );
    Ok(students
        .into_iter()
        .filter(|s| !assigned.contains(s.roll_no.trim()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::{Registration, create_team};
    use crate::store::testing::*;

    fn rolls(entries: &[RosterEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.roll_no.as_str()).collect()
    }

    #[tokio::test]
    async fn test_groups() {
        let (_dir, store) = scratch_store().await;
        assert!(groups(&store).await.unwrap().is_empty());
        seed_group(&store, "CS2", 2).await;
        seed_group(&store, "CS1", 3).await;
        assert_eq!(groups(&store).await.unwrap(), vec!["CS1", "CS2"]);
    }

    #[test]
    fn test_group_filter() {
        assert_eq!(group_filter(None), None);
        assert_eq!(group_filter(Some("All")), None);
        assert_eq!(group_filter(Some(" all ")), None);
        assert_eq!(group_filter(Some("")), None);
        assert_eq!(group_filter(Some(" CS1 ")), Some("CS1"));
    }

    #[tokio::test]
    async fn test_students_listing() {
        let (_dir, store) = scratch_store().await;
        assert!(students(&store, None).await.unwrap().is_empty());
        seed_group(&store, "CS2", 2).await;
        seed_group(&store, "CS1", 3).await;
        let all = students(&store, Some("All")).await.unwrap();
        assert_eq!(
            all.iter()
                .map(|s| s.roll_no.as_str())
                .collect::<Vec<_>>(),
            vec!["CS1-R01", "CS1-R02", "CS1-R03", "CS2-R01", "CS2-R02"]
        );
        // Columns left empty by the upload read back as empty strings.
        assert_eq!(all[0].father_name, "");
        assert_eq!(all[0].to_string(), "CS1-R01 - Student 01");
        let cs2 = students(&store, Some("CS2")).await.unwrap();
        assert_eq!(cs2.len(), 2);
        assert!(cs2.iter().all(|s| s.group_name == "CS2"));
        // Students in a team are still listed.
        create_team(&store, "CS2", "CS2-R01", &["CS2-R02"], "Proj")
            .await
            .unwrap();
        assert_eq!(students(&store, None).await.unwrap().len(), 5);
        assert!(students(&store, Some("CS9")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_roster_excludes_team_students() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 5).await;
        let roster = available_students(&store, "CS1").await.unwrap();
        assert_eq!(roster.len(), 5);
        assert_eq!(roster[0].to_string(), "CS1-R01 - Student 01");
        assert_eq!(
            create_team(&store, "CS1", "CS1-R01", &["CS1-R02"], "Proj A")
                .await
                .unwrap(),
            Registration::Created(crate::model::TeamId(1))
        );
        let roster = available_students(&store, "CS1").await.unwrap();
        assert_eq!(rolls(&roster), vec!["CS1-R03", "CS1-R04", "CS1-R05"]);
    }

    #[tokio::test]
    async fn test_roster_is_scoped_to_group() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 3).await;
        seed_group(&store, "CS2", 3).await;
        create_team(&store, "CS1", "CS1-R01", &["CS1-R02"], "Proj A")
            .await
            .unwrap();
        assert_eq!(available_students(&store, "CS2").await.unwrap().len(), 3);
        assert!(available_students(&store, "CS3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_roster_is_ordered_by_name() {
        let (_dir, store) = scratch_store().await;
        for (roll, name) in [("R1", "Zoe"), ("R2", "Adam"), ("R3", "Maya")] {
            sqlx::query("INSERT INTO students (roll_no, student_name, group_name) VALUES (?, ?, 'G')")
                .bind(roll)
                .bind(name)
                .execute(store.pool())
                .await
                .unwrap();
        }
        let roster = available_students(&store, "G").await.unwrap();
        assert_eq!(rolls(&roster), vec!["R2", "R3", "R1"]);
    }

    #[tokio::test]
    async fn test_leader_only_team() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 3).await;
        // Teams stored without any member list only book their leader.
        sqlx::query(
            "INSERT INTO teams (group_name, leader_roll, member_rolls, project_title)
             VALUES ('CS1', 'CS1-R02', NULL, 'Solo')",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let roster = available_students(&store, "CS1").await.unwrap();
        assert_eq!(rolls(&roster), vec!["CS1-R01", "CS1-R03"]);
    }

    #[tokio::test]
    async fn test_roster_read_is_idempotent() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 5).await;
        create_team(&store, "CS1", "CS1-R04", &["CS1-R01", "CS1-R05"], "Proj")
            .await
            .unwrap();
        let first = available_students(&store, "CS1").await.unwrap();
        let second = available_students(&store, "CS1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(rolls(&first), vec!["CS1-R02", "CS1-R03"]);
    }
}
