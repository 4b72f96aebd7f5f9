// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message queries.

use kefu_core::types::{ConversationFilter, ReadSide};
use kefu_core::{AgentId, KefuError, Message, MessageId, NewMessage, SenderRole, UserId};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::{column_ts, format_ts, now};

const MESSAGE_COLUMNS: &str = "id, user_id, agent_id, from_user, content, image_url, \
     read_by_agent, read_by_user, deleted, created_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let from_user: bool = row.get(3)?;
    Ok(Message {
        id: MessageId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        agent_id: AgentId(row.get(2)?),
        sender: if from_user {
            SenderRole::User
        } else {
            SenderRole::Agent
        },
        content: row.get(4)?,
        image_url: row.get(5)?,
        read_by_agent: row.get(6)?,
        read_by_user: row.get(7)?,
        deleted: row.get(8)?,
        created_at: column_ts(row, 9)?,
    })
}

/// Persist a new message, unread on both sides.
pub async fn insert_message(db: &Database, msg: NewMessage) -> Result<Message, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Message, rusqlite::Error> {
            let created_at = now();
            conn.execute(
                "INSERT INTO messages (user_id, agent_id, from_user, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.user_id.0,
                    msg.agent_id.0,
                    msg.sender == SenderRole::User,
                    msg.content,
                    msg.image_url,
                    format_ts(created_at),
                ],
            )?;
            Ok(Message {
                id: MessageId(conn.last_insert_rowid()),
                user_id: msg.user_id,
                agent_id: msg.agent_id,
                sender: msg.sender,
                content: msg.content,
                image_url: msg.image_url,
                read_by_agent: false,
                read_by_user: false,
                deleted: false,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: MessageId) -> Result<Option<Message>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.0],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Non-deleted messages of a conversation in chronological order.
pub async fn list_conversation(
    db: &Database,
    filter: ConversationFilter,
) -> Result<Vec<Message>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_id = ?1 AND (?2 IS NULL OR agent_id = ?2) AND deleted = 0
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(
                params![filter.user_id.0, filter.agent_id.map(|a| a.0)],
                message_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_sent_by_user(db: &Database, user_id: UserId) -> Result<u64, KefuError> {
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE user_id = ?1 AND from_user = 1",
                params![user_id.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Batch-mark the counterpart's unread messages as read by `side`.
pub async fn mark_conversation_read(
    db: &Database,
    filter: ConversationFilter,
    side: ReadSide,
) -> Result<u64, KefuError> {
    let sql = match side {
        ReadSide::Agent => {
            "UPDATE messages SET read_by_agent = 1
             WHERE user_id = ?1 AND (?2 IS NULL OR agent_id = ?2)
               AND from_user = 1 AND read_by_agent = 0"
        }
        ReadSide::User => {
            "UPDATE messages SET read_by_user = 1
             WHERE user_id = ?1 AND (?2 IS NULL OR agent_id = ?2)
               AND from_user = 0 AND read_by_user = 0"
        }
    };
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(sql, params![filter.user_id.0, filter.agent_id.map(|a| a.0)])
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed as u64)
}

/// Mark one agent-sent message read by the user.
///
/// `Ok(false)` for a user-sent message, which is left untouched.
pub async fn mark_read_by_user(db: &Database, id: MessageId) -> Result<bool, KefuError> {
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<bool>, rusqlite::Error> {
            let from_user: Option<bool> = conn
                .query_row(
                    "SELECT from_user FROM messages WHERE id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .optional()?;
            match from_user {
                None => Ok(None),
                Some(true) => Ok(Some(false)),
                Some(false) => {
                    conn.execute(
                        "UPDATE messages SET read_by_user = 1 WHERE id = ?1",
                        params![id.0],
                    )?;
                    Ok(Some(true))
                }
            }
        })
        .await
        .map_err(map_tr_err)?;
    outcome.ok_or_else(|| KefuError::not_found("message", id))
}

pub async fn soft_delete_message(db: &Database, id: MessageId) -> Result<bool, KefuError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("UPDATE messages SET deleted = 1 WHERE id = ?1", params![id.0])
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::seeded_db;
    use crate::queries::users::find_or_create;

    async fn setup() -> (Database, tempfile::TempDir, UserId, AgentId) {
        let (db, dir, app_id, agent_id) = seeded_db().await;
        let (user, _) = find_or_create(&db, "openid-1", app_id).await.unwrap();
        (db, dir, user.id, agent_id)
    }

    #[tokio::test]
    async fn insert_and_list_in_order() {
        let (db, _dir, user, agent) = setup().await;

        let m1 = insert_message(&db, NewMessage::from_user(user, agent, "hello", None))
            .await
            .unwrap();
        let m2 = insert_message(&db, NewMessage::from_agent(agent, user, "hi there", None))
            .await
            .unwrap();
        let m3 = insert_message(
            &db,
            NewMessage::from_user(user, agent, "", Some("https://img/1.png".into())),
        )
        .await
        .unwrap();

        let messages = list_conversation(&db, ConversationFilter::pair(user, agent))
            .await
            .unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m1.id, m2.id, m3.id]);
        assert_eq!(messages[0].sender, SenderRole::User);
        assert_eq!(messages[1].sender, SenderRole::Agent);
        assert!(messages[2].is_image());
        assert_eq!(messages[0], m1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn soft_deleted_messages_are_hidden_but_counted() {
        let (db, _dir, user, agent) = setup().await;
        let m1 = insert_message(&db, NewMessage::from_user(user, agent, "oops", None))
            .await
            .unwrap();

        assert!(soft_delete_message(&db, m1.id).await.unwrap());
        assert!(!soft_delete_message(&db, MessageId(999)).await.unwrap());
        assert!(list_conversation(&db, ConversationFilter::user(user))
            .await
            .unwrap()
            .is_empty());
        assert!(get_message(&db, m1.id).await.unwrap().unwrap().deleted);
        assert_eq!(count_sent_by_user(&db, user).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn agent_read_marks_only_unread_user_messages() {
        let (db, _dir, user, agent) = setup().await;
        let u1 = insert_message(&db, NewMessage::from_user(user, agent, "a", None))
            .await
            .unwrap();
        let a1 = insert_message(&db, NewMessage::from_agent(agent, user, "b", None))
            .await
            .unwrap();
        let filter = ConversationFilter::pair(user, agent);

        assert_eq!(mark_conversation_read(&db, filter, ReadSide::Agent).await.unwrap(), 1);
        assert_eq!(mark_conversation_read(&db, filter, ReadSide::Agent).await.unwrap(), 0);

        let u1 = get_message(&db, u1.id).await.unwrap().unwrap();
        let a1 = get_message(&db, a1.id).await.unwrap().unwrap();
        assert!(u1.read_by_agent);
        assert!(!u1.read_by_user);
        assert!(!a1.read_by_agent);
        assert!(!a1.read_by_user);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn user_read_marks_agent_messages() {
        let (db, _dir, user, agent) = setup().await;
        let a1 = insert_message(&db, NewMessage::from_agent(agent, user, "b", None))
            .await
            .unwrap();

        let changed = mark_conversation_read(&db, ConversationFilter::user(user), ReadSide::User)
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert!(get_message(&db, a1.id).await.unwrap().unwrap().read_by_user);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_read_by_user_skips_user_messages() {
        let (db, _dir, user, agent) = setup().await;
        let u1 = insert_message(&db, NewMessage::from_user(user, agent, "a", None))
            .await
            .unwrap();
        let a1 = insert_message(&db, NewMessage::from_agent(agent, user, "b", None))
            .await
            .unwrap();

        assert!(!mark_read_by_user(&db, u1.id).await.unwrap());
        assert!(mark_read_by_user(&db, a1.id).await.unwrap());
        assert!(!get_message(&db, u1.id).await.unwrap().unwrap().read_by_user);
        assert!(get_message(&db, a1.id).await.unwrap().unwrap().read_by_user);

        let err = mark_read_by_user(&db, MessageId(999)).await.unwrap_err();
        assert_eq!(err.kind(), kefu_core::ErrorKind::NotFound);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn message_for_unknown_user_is_rejected() {
        let (db, _dir, _, agent) = setup().await;
        let err = insert_message(&db, NewMessage::from_user(UserId(999), agent, "x", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kefu_core::ErrorKind::Storage);
        db.close().await.unwrap();
    }
}
