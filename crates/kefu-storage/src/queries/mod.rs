// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table group.

pub mod directory;
pub mod messages;
pub mod users;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;

/// Current time at the stored precision.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 UTC with millisecond precision; sorts lexicographically.
pub(crate) fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn column_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

pub(crate) fn column_opt_ts(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_ts(idx, &raw)).transpose()
}

#[cfg(test)]
pub(crate) mod test_support {
    use kefu_core::{AgentId, MiniAppId};
    use tempfile::TempDir;

    use crate::database::Database;
    use crate::queries::directory;

    /// A temp database with one mini-app assigned to one agent.
    pub async fn seeded_db() -> (Database, TempDir, MiniAppId, AgentId) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let app = directory::create_mini_app(&db, "Shop", "shop", "secret", Some("tpl-1"))
            .await
            .unwrap();
        let agent = directory::create_agent(&db, "Alice", Some("Welcome!"))
            .await
            .unwrap();
        directory::assign(&db, app.id, agent.id).await.unwrap();
        (db, dir, app.id, agent.id)
    }
}
