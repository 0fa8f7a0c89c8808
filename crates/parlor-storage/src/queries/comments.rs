// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment CRUD and scan operations over a single site database.

use chrono::{DateTime, Utc};
use rusqlite::params;

use parlor_core::{Comment, DeleteMode, ParlorError, PostInfo};

use crate::database::{Database, map_tr_err};
use crate::queries::{decode, encode};

/// Outcome of a create attempt, resolved inside the write transaction.
enum CreateOutcome {
    Created,
    DuplicateId,
    MissingParent,
}

/// Insert a new comment, enforcing id uniqueness and parent existence
/// within one transaction.
pub async fn create(db: &Database, comment: &Comment) -> Result<String, ParlorError> {
    let comment = comment.clone();
    let id = comment.id.clone();

    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM comments WHERE url = ?1 AND id = ?2",
                    params![comment.locator.url, comment.id],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if exists {
                return Ok(CreateOutcome::DuplicateId);
            }

            if !comment.parent_id.is_empty() {
                let parent_exists: bool = tx
                    .query_row(
                        "SELECT 1 FROM comments WHERE url = ?1 AND id = ?2",
                        params![comment.locator.url, comment.parent_id],
                        |_| Ok(true),
                    )
                    .unwrap_or(false);
                if !parent_exists {
                    return Ok(CreateOutcome::MissingParent);
                }
            }

            tx.execute(
                "INSERT INTO comments (url, id, ts, user_id, deleted, blob)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    comment.locator.url,
                    comment.id,
                    comment.timestamp.timestamp_micros(),
                    comment.user.id,
                    comment.deleted as i64,
                    encode(&comment)?,
                ],
            )?;
            tx.commit()?;
            Ok(CreateOutcome::Created)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        CreateOutcome::Created => Ok(id),
        CreateOutcome::DuplicateId => Err(ParlorError::Conflict(format!(
            "id {id} already exists"
        ))),
        CreateOutcome::MissingParent => Err(ParlorError::Validation(
            "parent comment does not exist in this locator".to_string(),
        )),
    }
}

/// Fetch one comment by url and id.
pub async fn get(db: &Database, url: &str, id: &str) -> Result<Comment, ParlorError> {
    let url = url.to_string();
    let id_owned = id.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            let blob: Option<String> = conn
                .query_row(
                    "SELECT blob FROM comments WHERE url = ?1 AND id = ?2",
                    params![url, id_owned],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            match blob {
                Some(blob) => Ok(Some(decode(&blob)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)?;

    found.ok_or_else(|| ParlorError::NotFound(format!("comment {id}")))
}

/// Replace an existing comment.
pub async fn put(db: &Database, comment: &Comment) -> Result<(), ParlorError> {
    let comment = comment.clone();
    let id = comment.id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE comments SET ts = ?3, user_id = ?4, deleted = ?5, blob = ?6
                 WHERE url = ?1 AND id = ?2",
                params![
                    comment.locator.url,
                    comment.id,
                    comment.timestamp.timestamp_micros(),
                    comment.user.id,
                    comment.deleted as i64,
                    encode(&comment)?,
                ],
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        return Err(ParlorError::NotFound(format!("comment {id}")));
    }
    Ok(())
}

/// All comments for a url in ascending time order. Ranking by score,
/// controversy, or subtree activity happens in the service layer.
pub async fn find(db: &Database, url: &str) -> Result<Vec<Comment>, ParlorError> {
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT blob FROM comments WHERE url = ?1 ORDER BY ts ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![url], |row| row.get::<_, String>(0))?;
            let mut comments = Vec::new();
            for blob in rows {
                comments.push(decode(&blob?)?);
            }
            Ok(comments)
        })
        .await
        .map_err(map_tr_err)
}

/// Newest comments for the whole site, newest first. Deleted comments are
/// always hidden; comments from currently-blocked users are hidden unless
/// the requester is an admin.
pub async fn last(
    db: &Database,
    limit: usize,
    since: Option<DateTime<Utc>>,
    for_admin: bool,
) -> Result<Vec<Comment>, ParlorError> {
    let since_micros = since.map(|t| t.timestamp_micros()).unwrap_or(0);
    let now_micros = Utc::now().timestamp_micros();
    db.connection()
        .call(move |conn| {
            let sql = if for_admin {
                "SELECT blob FROM comments
                 WHERE deleted = 0 AND ts > ?1
                 ORDER BY ts DESC LIMIT ?2"
            } else {
                "SELECT blob FROM comments
                 WHERE deleted = 0 AND ts > ?1
                   AND user_id NOT IN (SELECT user_id FROM blocked WHERE until_ts > ?3)
                 ORDER BY ts DESC LIMIT ?2"
            };
            let mut stmt = conn.prepare(sql)?;
            let mut comments = Vec::new();
            if for_admin {
                let rows = stmt.query_map(params![since_micros, limit as i64], |row| {
                    row.get::<_, String>(0)
                })?;
                for blob in rows {
                    comments.push(decode(&blob?)?);
                }
            } else {
                let rows = stmt.query_map(
                    params![since_micros, limit as i64, now_micros],
                    |row| row.get::<_, String>(0),
                )?;
                for blob in rows {
                    comments.push(decode(&blob?)?);
                }
            }
            Ok(comments)
        })
        .await
        .map_err(map_tr_err)
}

/// Commented pages ordered by last activity, newest first.
pub async fn list(
    db: &Database,
    limit: usize,
    skip: usize,
) -> Result<Vec<PostInfo>, ParlorError> {
    // limit 0 means "no limit"; SQLite treats a negative LIMIT the same way.
    let limit = if limit == 0 { -1 } else { limit as i64 };
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.url,
                        SUM(CASE WHEN c.deleted = 0 THEN 1 ELSE 0 END),
                        MIN(c.ts), MAX(c.ts),
                        EXISTS(SELECT 1 FROM readonly r WHERE r.url = c.url)
                 FROM comments c
                 GROUP BY c.url
                 ORDER BY MAX(c.ts) DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, skip as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })?;
            let mut infos = Vec::new();
            for row in rows {
                let (url, count, first, last, read_only) = row?;
                infos.push(PostInfo {
                    url,
                    count: count.max(0) as usize,
                    first_ts: DateTime::from_timestamp_micros(first),
                    last_ts: DateTime::from_timestamp_micros(last),
                    read_only,
                });
            }
            Ok(infos)
        })
        .await
        .map_err(map_tr_err)
}

/// Count of non-deleted comments for a url. Unknown urls count zero.
pub async fn count(db: &Database, url: &str) -> Result<usize, ParlorError> {
    let url = url.to_string();
    let n: i64 = db
        .connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE url = ?1 AND deleted = 0",
                params![url],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(n as usize)
}

/// Aggregate info for one url.
pub async fn info(db: &Database, url: &str) -> Result<PostInfo, ParlorError> {
    let url_owned = url.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT SUM(CASE WHEN deleted = 0 THEN 1 ELSE 0 END),
                            MIN(ts), MAX(ts),
                            EXISTS(SELECT 1 FROM readonly r WHERE r.url = ?1)
                     FROM comments WHERE url = ?1",
                    params![url_owned.clone()],
                    |row| {
                        Ok((
                            row.get::<_, Option<i64>>(0)?,
                            row.get::<_, Option<i64>>(1)?,
                            row.get::<_, Option<i64>>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )?;
            let (count, first, last, read_only) = row;
            match first {
                None => Ok(None),
                Some(first) => Ok(Some(PostInfo {
                    url: url_owned,
                    count: count.unwrap_or(0).max(0) as usize,
                    first_ts: DateTime::from_timestamp_micros(first),
                    last_ts: last.and_then(DateTime::from_timestamp_micros),
                    read_only,
                })),
            }
        })
        .await
        .map_err(map_tr_err)?;

    found.ok_or_else(|| ParlorError::NotFound(format!("no comments for {url}")))
}

/// Delete one comment: soft scrubs the blob in place, hard removes the row.
pub async fn delete(
    db: &Database,
    url: &str,
    id: &str,
    mode: DeleteMode,
) -> Result<(), ParlorError> {
    match mode {
        DeleteMode::Hard => {
            let url = url.to_string();
            let id_owned = id.to_string();
            let n = db
                .connection()
                .call(move |conn| {
                    let n = conn.execute(
                        "DELETE FROM comments WHERE url = ?1 AND id = ?2",
                        params![url, id_owned],
                    )?;
                    Ok(n)
                })
                .await
                .map_err(map_tr_err)?;
            if n == 0 {
                return Err(ParlorError::NotFound(format!("comment {id}")));
            }
            Ok(())
        }
        DeleteMode::Soft => {
            let mut comment = get(db, url, id).await?;
            comment.mark_deleted(DeleteMode::Soft);
            put(db, &comment).await
        }
    }
}

/// Hard-delete every comment by a user across the site.
pub async fn delete_user(db: &Database, user_id: &str) -> Result<usize, ParlorError> {
    let user_id = user_id.to_string();
    let n = db
        .connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM comments WHERE user_id = ?1", params![user_id])?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(n)
}

/// Drop every record for the site.
pub async fn delete_all(db: &Database) -> Result<(), ParlorError> {
    db.connection()
        .call(|conn| {
            conn.execute_batch(
                "DELETE FROM comments;
                 DELETE FROM readonly;
                 DELETE FROM verified;
                 DELETE FROM blocked;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
