// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message persistence.

use kirim_core::types::{NewMessage, SenderType, StoredMessage};
use kirim_core::KirimError;
use rusqlite::params;

use crate::database::Database;

/// Preview length kept on the owning chat.
const PREVIEW_LEN: usize = 100;

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_type, sender_name, message_type, body, \
                               media_url, wa_message_id, is_from_me, created_at";

fn message_from_row(row: &rusqlite::Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    let sender_raw: String = row.get(2)?;
    let sender_type = sender_raw.parse::<SenderType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoredMessage {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_type,
        sender_name: row.get(3)?,
        message_type: row.get(4)?,
        body: row.get(5)?,
        media_url: row.get(6)?,
        wa_message_id: row.get(7)?,
        is_from_me: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Append a message and refresh the owning chat's aggregates (preview,
/// last-message time/type, unread counter for inbound messages).
pub async fn log_message(db: &Database, message: NewMessage) -> Result<StoredMessage, KirimError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (chat_id, sender_type, sender_name, message_type, body,
                                       media_url, wa_message_id, is_from_me)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.chat_id,
                    message.sender_type.to_string(),
                    message.sender_name,
                    message.message_type,
                    message.body,
                    message.media_url,
                    message.wa_message_id,
                    message.is_from_me,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let preview: String = message.body.chars().take(PREVIEW_LEN).collect();
            let unread_bump = i64::from(!message.is_from_me);
            tx.execute(
                "UPDATE chats SET
                     last_message_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     last_message_preview = ?1,
                     last_message_type = ?2,
                     unread_count = unread_count + ?3
                 WHERE id = ?4",
                params![preview, message.message_type, unread_bump, message.chat_id],
            )?;

            let stored = tx.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )?;

            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether a message with this external id was already persisted.
pub async fn message_exists(db: &Database, wa_message_id: &str) -> Result<bool, KirimError> {
    let wa_message_id = wa_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE wa_message_id = ?1",
                params![wa_message_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages of a chat in insertion order.
pub async fn messages_for_chat(
    db: &Database,
    chat_id: i64,
) -> Result<Vec<StoredMessage>, KirimError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![chat_id], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::chats::get_or_create_chat;
    use crate::queries::tenants::create_tenant;
    use kirim_core::types::{ProviderKind, Tenant};
    use tempfile::tempdir;

    async fn setup_chat() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let tenant = Tenant {
            id: "t1".to_string(),
            company_name: "Acme".to_string(),
            status: "active".to_string(),
            provider: ProviderKind::Socket,
            session_id: Some("628111".to_string()),
            cloud_phone_id: None,
            cloud_token: None,
        };
        create_tenant(&db, &tenant).await.unwrap();
        let chat = get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", None, false)
            .await
            .unwrap();
        (db, chat.id, dir)
    }

    fn inbound_text(chat_id: i64, body: &str, wa_id: &str) -> NewMessage {
        NewMessage {
            chat_id,
            sender_type: SenderType::Customer,
            sender_name: Some("Ana".to_string()),
            message_type: "text".to_string(),
            body: body.to_string(),
            media_url: None,
            wa_message_id: Some(wa_id.to_string()),
            is_from_me: false,
        }
    }

    #[tokio::test]
    async fn log_message_appends_in_order() {
        let (db, chat_id, _dir) = setup_chat().await;

        log_message(&db, inbound_text(chat_id, "first", "w1")).await.unwrap();
        log_message(&db, inbound_text(chat_id, "second", "w2")).await.unwrap();

        let messages = messages_for_chat(&db, chat_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "first");
        assert_eq!(messages[1].body, "second");
        assert_eq!(messages[0].sender_type, SenderType::Customer);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn log_message_records_external_id() {
        let (db, chat_id, _dir) = setup_chat().await;

        let stored = log_message(&db, inbound_text(chat_id, "hello", "WAMID.42"))
            .await
            .unwrap();
        assert_eq!(stored.wa_message_id.as_deref(), Some("WAMID.42"));

        assert!(message_exists(&db, "WAMID.42").await.unwrap());
        assert!(!message_exists(&db, "WAMID.99").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn inbound_messages_bump_unread_and_preview() {
        let (db, chat_id, _dir) = setup_chat().await;

        log_message(&db, inbound_text(chat_id, "hello there", "w1")).await.unwrap();

        let (unread, preview): (i64, Option<String>) = db
            .connection()
            .call(move |conn| {
                let row = conn.query_row(
                    "SELECT unread_count, last_message_preview FROM chats WHERE id = ?1",
                    params![chat_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok::<_, rusqlite::Error>(row)
            })
            .await
            .unwrap();
        assert_eq!(unread, 1);
        assert_eq!(preview.as_deref(), Some("hello there"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outbound_messages_do_not_bump_unread() {
        let (db, chat_id, _dir) = setup_chat().await;

        let mut msg = inbound_text(chat_id, "reply", "w1");
        msg.sender_type = SenderType::Agent;
        msg.is_from_me = true;
        log_message(&db, msg).await.unwrap();

        let unread: i64 = db
            .connection()
            .call(move |conn| {
                let n = conn.query_row(
                    "SELECT unread_count FROM chats WHERE id = ?1",
                    params![chat_id],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(unread, 0);

        db.close().await.unwrap();
    }
}
