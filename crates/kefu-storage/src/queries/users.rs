// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-user queries.

use chrono::{DateTime, Utc};
use kefu_core::{KefuError, MiniAppId, User, UserId};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::{column_opt_ts, column_ts, format_ts, now};

const USER_COLUMNS: &str = "id, external_id, mini_app_id, subscribed, last_active_at, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        external_id: row.get(1)?,
        mini_app_id: MiniAppId(row.get(2)?),
        subscribed: row.get(3)?,
        last_active_at: column_opt_ts(row, 4)?,
        created_at: column_ts(row, 5)?,
    })
}

fn select_by_external_id(
    conn: &rusqlite::Connection,
    external_id: &str,
) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1"),
        params![external_id],
        user_from_row,
    )
    .optional()
}

pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, KefuError> {
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.0],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<User>, KefuError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| select_by_external_id(conn, &external_id))
        .await
        .map_err(map_tr_err)
}

/// Returns the existing user or inserts a new unsubscribed one.
///
/// Lookup and insert run in one closure on the writer thread, so two racing
/// first contacts for the same identity resolve to the same record.
pub async fn find_or_create(
    db: &Database,
    external_id: &str,
    mini_app_id: MiniAppId,
) -> Result<(User, bool), KefuError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(User, bool), rusqlite::Error> {
            if let Some(user) = select_by_external_id(conn, &external_id)? {
                return Ok((user, false));
            }
            let created_at = now();
            conn.execute(
                "INSERT INTO users (external_id, mini_app_id, subscribed, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![external_id, mini_app_id.0, format_ts(created_at)],
            )?;
            let user = User {
                id: UserId(conn.last_insert_rowid()),
                external_id,
                mini_app_id,
                subscribed: false,
                last_active_at: None,
                created_at,
            };
            Ok((user, true))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn touch(db: &Database, id: UserId, at: DateTime<Utc>) -> Result<(), KefuError> {
    let at = format_ts(at);
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE users SET last_active_at = ?1 WHERE id = ?2",
                params![at, id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KefuError::not_found("user", id));
    }
    Ok(())
}

pub async fn set_subscribed(db: &Database, id: UserId, subscribed: bool) -> Result<(), KefuError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE users SET subscribed = ?1 WHERE id = ?2",
                params![subscribed, id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KefuError::not_found("user", id));
    }
    Ok(())
}
