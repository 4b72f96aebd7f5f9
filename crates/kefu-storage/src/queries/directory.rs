// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mini-application, agent and assignment queries.
//!
//! The create/assign helpers are administrative writes used to seed a
//! database; the relay itself only reads this data.

use kefu_core::{Agent, AgentId, KefuError, MiniApp, MiniAppId};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};

const MINI_APP_COLUMNS: &str = "id, name, app_key, secret, template_id";

fn mini_app_from_row(row: &Row<'_>) -> rusqlite::Result<MiniApp> {
    Ok(MiniApp {
        id: MiniAppId(row.get(0)?),
        name: row.get(1)?,
        app_key: row.get(2)?,
        secret: row.get(3)?,
        template_id: row.get(4)?,
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: AgentId(row.get(0)?),
        name: row.get(1)?,
        welcome_message: row.get(2)?,
    })
}

pub async fn create_mini_app(
    db: &Database,
    name: &str,
    app_key: &str,
    secret: &str,
    template_id: Option<&str>,
) -> Result<MiniApp, KefuError> {
    let app = MiniApp {
        id: MiniAppId(0),
        name: name.to_string(),
        app_key: app_key.to_string(),
        secret: secret.to_string(),
        template_id: template_id.map(str::to_string),
    };
    db.connection()
        .call(move |conn| -> Result<MiniApp, rusqlite::Error> {
            conn.execute(
                "INSERT INTO mini_apps (name, app_key, secret, template_id) VALUES (?1, ?2, ?3, ?4)",
                params![app.name, app.app_key, app.secret, app.template_id],
            )?;
            Ok(MiniApp {
                id: MiniAppId(conn.last_insert_rowid()),
                ..app
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn create_agent(
    db: &Database,
    name: &str,
    welcome_message: Option<&str>,
) -> Result<Agent, KefuError> {
    let name = name.to_string();
    let welcome_message = welcome_message.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Agent, rusqlite::Error> {
            conn.execute(
                "INSERT INTO agents (name, welcome_message) VALUES (?1, ?2)",
                params![name, welcome_message],
            )?;
            Ok(Agent {
                id: AgentId(conn.last_insert_rowid()),
                name,
                welcome_message,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Assign `agent_id` to `mini_app_id`. Each side can hold one assignment.
pub async fn assign(
    db: &Database,
    mini_app_id: MiniAppId,
    agent_id: AgentId,
) -> Result<(), KefuError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO assignments (mini_app_id, agent_id) VALUES (?1, ?2)",
                params![mini_app_id.0, agent_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_welcome_message(
    db: &Database,
    agent_id: AgentId,
    welcome_message: Option<&str>,
) -> Result<(), KefuError> {
    let welcome_message = welcome_message.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE agents SET welcome_message = ?1 WHERE id = ?2",
                params![welcome_message, agent_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mini_app_by_key(db: &Database, app_key: &str) -> Result<Option<MiniApp>, KefuError> {
    let app_key = app_key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MiniApp>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MINI_APP_COLUMNS} FROM mini_apps WHERE app_key = ?1"),
                params![app_key],
                mini_app_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mini_app(db: &Database, id: MiniAppId) -> Result<Option<MiniApp>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Option<MiniApp>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MINI_APP_COLUMNS} FROM mini_apps WHERE id = ?1"),
                params![id.0],
                mini_app_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn agent(db: &Database, id: AgentId) -> Result<Option<Agent>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Option<Agent>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, name, welcome_message FROM agents WHERE id = ?1",
                params![id.0],
                agent_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn assigned_agent(
    db: &Database,
    mini_app_id: MiniAppId,
) -> Result<Option<AgentId>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Option<AgentId>, rusqlite::Error> {
            conn.query_row(
                "SELECT agent_id FROM assignments WHERE mini_app_id = ?1",
                params![mini_app_id.0],
                |row| row.get(0).map(AgentId),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn is_assigned(
    db: &Database,
    mini_app_id: MiniAppId,
    agent_id: AgentId,
) -> Result<bool, KefuError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM assignments WHERE mini_app_id = ?1 AND agent_id = ?2)",
                params![mini_app_id.0, agent_id.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::seeded_db;

    #[tokio::test]
    async fn lookup_by_key_and_assignment() {
        let (db, _dir, app_id, agent_id) = seeded_db().await;

        let app = mini_app_by_key(&db, "shop").await.unwrap().unwrap();
        assert_eq!(app.id, app_id);
        assert_eq!(app.template_id.as_deref(), Some("tpl-1"));
        assert_eq!(app.secret, "secret");
        assert_eq!(assigned_agent(&db, app_id).await.unwrap(), Some(agent_id));
        assert!(is_assigned(&db, app_id, agent_id).await.unwrap());
        assert!(!is_assigned(&db, app_id, AgentId(agent_id.0 + 1)).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_records_are_none() {
        let (db, _dir, _, _) = seeded_db().await;
        assert!(mini_app_by_key(&db, "shop1").await.unwrap().is_none());
        assert!(mini_app(&db, MiniAppId(999)).await.unwrap().is_none());
        assert!(agent(&db, AgentId(999)).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unassigned_app_has_no_agent() {
        let (db, _dir, _, _) = seeded_db().await;
        let lonely = create_mini_app(&db, "Shop 1", "shop1", "s", None).await.unwrap();
        assert_eq!(assigned_agent(&db, lonely.id).await.unwrap(), None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn agent_serves_at_most_one_app() {
        let (db, _dir, _, agent_id) = seeded_db().await;
        let other = create_mini_app(&db, "Other", "other", "s", None).await.unwrap();
        let err = assign(&db, other.id, agent_id).await.unwrap_err();
        assert_eq!(err.kind(), kefu_core::ErrorKind::Storage);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn welcome_message_can_be_cleared() {
        let (db, _dir, _, agent_id) = seeded_db().await;
        assert_eq!(
            agent(&db, agent_id).await.unwrap().unwrap().welcome_message.as_deref(),
            Some("Welcome!")
        );
        set_welcome_message(&db, agent_id, None).await.unwrap();
        assert_eq!(agent(&db, agent_id).await.unwrap().unwrap().welcome_message, None);
        db.close().await.unwrap();
    }
}
