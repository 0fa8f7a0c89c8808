// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post and user flag operations: read-only, verified, blocked.

use chrono::{DateTime, Utc};
use rusqlite::params;

use parlor_core::{BlockedUser, ParlorError};

use crate::database::{Database, map_tr_err};

/// Blocks without an expiry are stored with a far-future timestamp so the
/// single `until_ts > now` comparison covers both cases.
const PERMANENT_BLOCK_YEARS: i64 = 100;

pub async fn set_read_only(db: &Database, url: &str, read_only: bool) -> Result<(), ParlorError> {
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            if read_only {
                conn.execute(
                    "INSERT OR IGNORE INTO readonly (url) VALUES (?1)",
                    params![url],
                )?;
            } else {
                conn.execute("DELETE FROM readonly WHERE url = ?1", params![url])?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn is_read_only(db: &Database, url: &str) -> Result<bool, ParlorError> {
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            let found: bool = conn
                .query_row("SELECT 1 FROM readonly WHERE url = ?1", params![url], |_| {
                    Ok(true)
                })
                .unwrap_or(false);
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_verified(db: &Database, user_id: &str, verified: bool) -> Result<(), ParlorError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            if verified {
                conn.execute(
                    "INSERT OR IGNORE INTO verified (user_id) VALUES (?1)",
                    params![user_id],
                )?;
            } else {
                conn.execute("DELETE FROM verified WHERE user_id = ?1", params![user_id])?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn is_verified(db: &Database, user_id: &str) -> Result<bool, ParlorError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let found: bool = conn
                .query_row(
                    "SELECT 1 FROM verified WHERE user_id = ?1",
                    params![user_id],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn verified(db: &Database) -> Result<Vec<String>, ParlorError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM verified ORDER BY user_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for id in rows {
                ids.push(id?);
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_blocked(
    db: &Database,
    user_id: &str,
    status: bool,
    until: Option<DateTime<Utc>>,
) -> Result<(), ParlorError> {
    let user_id = user_id.to_string();
    let until_micros = until
        .unwrap_or_else(|| Utc::now() + chrono::Duration::days(365 * PERMANENT_BLOCK_YEARS))
        .timestamp_micros();
    db.connection()
        .call(move |conn| {
            if status {
                conn.execute(
                    "INSERT INTO blocked (user_id, until_ts) VALUES (?1, ?2)
                     ON CONFLICT(user_id) DO UPDATE SET until_ts = excluded.until_ts",
                    params![user_id, until_micros],
                )?;
            } else {
                conn.execute("DELETE FROM blocked WHERE user_id = ?1", params![user_id])?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn is_blocked(db: &Database, user_id: &str) -> Result<bool, ParlorError> {
    let user_id = user_id.to_string();
    let now = Utc::now().timestamp_micros();
    db.connection()
        .call(move |conn| {
            let found: bool = conn
                .query_row(
                    "SELECT 1 FROM blocked WHERE user_id = ?1 AND until_ts > ?2",
                    params![user_id, now],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn blocked(db: &Database) -> Result<Vec<BlockedUser>, ParlorError> {
    let now = Utc::now().timestamp_micros();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, until_ts FROM blocked WHERE until_ts > ?1 ORDER BY user_id",
            )?;
            let rows = stmt.query_map(params![now], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut users = Vec::new();
            for row in rows {
                let (id, until_micros) = row?;
                users.push(BlockedUser {
                    id,
                    until: DateTime::from_timestamp_micros(until_micros)
                        .unwrap_or_else(Utc::now),
                });
            }
            Ok(users)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("site.db")).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn read_only_flag_round_trip() {
        let (db, _dir) = open_db().await;
        let url = "https://example.com/p1";
        assert!(!is_read_only(&db, url).await.unwrap());

        set_read_only(&db, url, true).await.unwrap();
        assert!(is_read_only(&db, url).await.unwrap());

        set_read_only(&db, url, false).await.unwrap();
        assert!(!is_read_only(&db, url).await.unwrap());
    }

    #[tokio::test]
    async fn verified_round_trip_and_listing() {
        let (db, _dir) = open_db().await;
        set_verified(&db, "u2", true).await.unwrap();
        set_verified(&db, "u1", true).await.unwrap();
        assert!(is_verified(&db, "u1").await.unwrap());
        assert!(!is_verified(&db, "u3").await.unwrap());
        assert_eq!(verified(&db).await.unwrap(), vec!["u1", "u2"]);

        set_verified(&db, "u1", false).await.unwrap();
        assert_eq!(verified(&db).await.unwrap(), vec!["u2"]);
    }

    #[tokio::test]
    async fn expired_blocks_do_not_count() {
        let (db, _dir) = open_db().await;
        set_blocked(
            &db,
            "past",
            true,
            Some(Utc::now() - chrono::Duration::hours(1)),
        )
        .await
        .unwrap();
        set_blocked(
            &db,
            "future",
            true,
            Some(Utc::now() + chrono::Duration::hours(1)),
        )
        .await
        .unwrap();

        assert!(!is_blocked(&db, "past").await.unwrap());
        assert!(is_blocked(&db, "future").await.unwrap());

        let listed = blocked(&db).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "future");
    }

    #[tokio::test]
    async fn permanent_block_and_unblock() {
        let (db, _dir) = open_db().await;
        set_blocked(&db, "u1", true, None).await.unwrap();
        assert!(is_blocked(&db, "u1").await.unwrap());

        set_blocked(&db, "u1", false, None).await.unwrap();
        assert!(!is_blocked(&db, "u1").await.unwrap());
    }
}
