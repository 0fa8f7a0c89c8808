// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over a site database.

pub mod comments;
pub mod meta;

use parlor_core::Comment;

/// Decode a stored comment blob.
pub(crate) fn decode(blob: &str) -> Result<Comment, rusqlite::Error> {
    serde_json::from_str(blob).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Encode a comment for storage.
pub(crate) fn encode(comment: &Comment) -> Result<String, rusqlite::Error> {
    serde_json::to_string(comment).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
