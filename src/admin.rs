use crate::config::AdminConfig;
use crate::model::{Team, TeamId};
use crate::roster::{ALL_GROUPS, group_filter};
use crate::store::Store;
use eyre::{Context, Error, bail};
use tracing::{debug, info, warn};

/// Teams of a group, or of every group when `group` is `None` or `All`.
pub async fn list_teams(store: &Store, group: Option<&str>) -> Result<Vec<Team>, Error> {
    let group = group_filter(group);
    let teams = store.teams(group).await?;
    debug!(group = group.unwrap_or(ALL_GROUPS), teams = teams.len(), "teams listed");
    Ok(teams)
}

/// Shared-password gate in front of destructive operations. The password
/// comes from the configuration file only.
pub struct AdminGate {
    password: Option<String>,
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            password: config.password.clone().filter(|p| !p.is_empty()),
        }
    }

    pub fn check(&self, attempt: &str) -> Result<(), Error> {
        let Some(password) = &self.password else {
            bail!("no admin password is configured, admin operations are disabled");
        };
        if password != attempt {
            warn!("incorrect admin password");
            bail!("incorrect admin password");
        }
        Ok(())
    }
}

/// Delete a team and release its students. Returns `false` if no such
/// team exists.
pub async fn delete_team(
    store: &Store,
    gate: &AdminGate,
    password: &str,
    id: TeamId,
) -> Result<bool, Error> {
    gate.check(password)?;
    let mut trans = store.pool().begin().await?;
    sqlx::query("DELETE FROM team_members WHERE team_id = ?")
        .bind(id.0)
        .execute(&mut *trans)
        .await
        .context("cannot release team members")?;
    let deleted = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(id.0)
        .execute(&mut *trans)
        .await
        .context("cannot delete team")?
        .rows_affected();
    trans
        .commit()
        .await
        .context("error when committing transaction")?;
    if deleted == 1 {
        info!(team = %id, "team deleted");
    }
    Ok(deleted == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::{Registration, create_team};
    use crate::roster::available_students;
    use crate::store::testing::*;

    fn gate() -> AdminGate {
        AdminGate::new(&AdminConfig {
            password: Some("s3cret".into()),
        })
    }

    #[test]
    fn test_gate() {
        assert!(gate().check("s3cret").is_ok());
        assert!(gate().check("S3CRET").is_err());
        assert!(gate().check("").is_err());
        let closed = AdminGate::new(&AdminConfig { password: None });
        assert!(closed.check("").is_err());
        let empty = AdminGate::new(&AdminConfig {
            password: Some(String::new()),
        });
        assert!(empty.check("").is_err());
    }

    #[tokio::test]
    async fn test_list_teams_by_group() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 3).await;
        seed_group(&store, "CS2", 3).await;
        create_team(&store, "CS2", "CS2-R01", &["CS2-R02"], "Beta")
            .await
            .unwrap();
        create_team(&store, "CS1", "CS1-R01", &["CS1-R02", "CS1-R03"], "Alpha")
            .await
            .unwrap();
        let all = list_teams(&store, None).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.project_title.as_str()).collect::<Vec<_>>(),
            vec!["Beta", "Alpha"]
        );
        assert_eq!(list_teams(&store, Some("All")).await.unwrap().len(), 2);
        assert_eq!(list_teams(&store, Some(" all ")).await.unwrap().len(), 2);
        let cs1 = list_teams(&store, Some(" CS1 ")).await.unwrap();
        assert_eq!(cs1.len(), 1);
        assert_eq!(cs1[0].to_string(), format!("ID {} - Leader: CS1-R01 (CS1)", cs1[0].id));
    }

    #[tokio::test]
    async fn test_delete_releases_students() {
        let (_dir, store) = scratch_store().await;
        seed_group(&store, "CS1", 5).await;
        let Registration::Created(id) =
            create_team(&store, "CS1", "CS1-R01", &["CS1-R02"], "Proj A")
                .await
                .unwrap()
        else {
            panic!("team not created");
        };
        assert!(delete_team(&store, &gate(), "wrong", id).await.is_err());
        assert_eq!(list_teams(&store, None).await.unwrap().len(), 1);

        assert!(delete_team(&store, &gate(), "s3cret", id).await.unwrap());
        assert!(list_teams(&store, None).await.unwrap().is_empty());
        assert_eq!(available_students(&store, "CS1").await.unwrap().len(), 5);
        assert!(!delete_team(&store, &gate(), "s3cret", id).await.unwrap());

        // Both the leader and the members may register again.
        assert!(matches!(
            create_team(&store, "CS1", "CS1-R02", &["CS1-R01"], "Proj B")
                .await
                .unwrap(),
            Registration::Created(_)
        ));
    }
}
