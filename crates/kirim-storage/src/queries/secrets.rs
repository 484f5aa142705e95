// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session token storage behind the opaque `SecretStore` surface.

use kirim_core::KirimError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// The stored token for a session, if any.
pub async fn token_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<String>, KirimError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let token = conn
                .query_row(
                    "SELECT token FROM session_secrets WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(token)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store (or replace) a session's token.
pub async fn set_token(db: &Database, session_id: &str, token: &str) -> Result<(), KirimError> {
    let session_id = session_id.to_string();
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO session_secrets (session_id, token) VALUES (?1, ?2)
                 ON CONFLICT(session_id) DO UPDATE SET token = excluded.token",
                params![session_id, token],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a session's token.
pub async fn delete_token(db: &Database, session_id: &str) -> Result<(), KirimError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM session_secrets WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn token_lifecycle() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        assert!(token_for_session(&db, "628111").await.unwrap().is_none());

        set_token(&db, "628111", "jwt-1").await.unwrap();
        assert_eq!(token_for_session(&db, "628111").await.unwrap().as_deref(), Some("jwt-1"));

        set_token(&db, "628111", "jwt-2").await.unwrap();
        assert_eq!(token_for_session(&db, "628111").await.unwrap().as_deref(), Some("jwt-2"));

        delete_token(&db, "628111").await.unwrap();
        assert!(token_for_session(&db, "628111").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
