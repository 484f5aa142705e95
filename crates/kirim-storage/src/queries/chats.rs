// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact and chat upsert operations.
//!
//! Chats are unique per (tenant, contact) and contacts per (tenant, jid);
//! creation is idempotent on those pairs so duplicated webhook deliveries
//! can never fork a conversation.

use kirim_core::types::{Chat, Contact};
use kirim_core::KirimError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

const CHAT_COLUMNS: &str = "id, tenant_id, contact_id, status, assigned_to, last_message_at, \
                            last_message_preview, last_message_type, unread_count";

fn chat_from_row(row: &rusqlite::Row<'_>) -> Result<Chat, rusqlite::Error> {
    Ok(Chat {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact_id: row.get(2)?,
        status: row.get(3)?,
        assigned_to: row.get(4)?,
        last_message_at: row.get(5)?,
        last_message_preview: row.get(6)?,
        last_message_type: row.get(7)?,
        unread_count: row.get(8)?,
    })
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        jid: row.get(2)?,
        display_name: row.get(3)?,
        push_name: row.get(4)?,
        is_group: row.get(5)?,
    })
}

/// Find or create the chat for a (tenant, canonical JID) pair.
///
/// Creates the backing contact when absent; fills in a missing display name
/// when one is provided later. Idempotent on the unique pair.
pub async fn get_or_create_chat(
    db: &Database,
    tenant_id: &str,
    jid: &str,
    display_name: Option<&str>,
    is_group: bool,
) -> Result<Chat, KirimError> {
    let tenant_id = tenant_id.to_string();
    let jid = jid.to_string();
    let display_name = display_name.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<(i64, Option<String>)> = tx
                .query_row(
                    "SELECT id, display_name FROM contacts WHERE tenant_id = ?1 AND jid = ?2",
                    params![tenant_id, jid],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let contact_id = match existing {
                Some((id, stored_name)) => {
                    if stored_name.is_none() && display_name.is_some() {
                        tx.execute(
                            "UPDATE contacts SET display_name = ?1 WHERE id = ?2",
                            params![display_name, id],
                        )?;
                    }
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO contacts (tenant_id, jid, display_name, is_group)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![tenant_id, jid, display_name, is_group],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            let chat: Option<Chat> = tx
                .query_row(
                    &format!(
                        "SELECT {CHAT_COLUMNS} FROM chats
                         WHERE tenant_id = ?1 AND contact_id = ?2"
                    ),
                    params![tenant_id, contact_id],
                    chat_from_row,
                )
                .optional()?;

            let chat = match chat {
                Some(chat) => chat,
                None => {
                    tx.execute(
                        "INSERT INTO chats (tenant_id, contact_id) VALUES (?1, ?2)",
                        params![tenant_id, contact_id],
                    )?;
                    let id = tx.last_insert_rowid();
                    tx.query_row(
                        &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"),
                        params![id],
                        chat_from_row,
                    )?
                }
            };

            tx.commit()?;
            Ok(chat)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a contact by its canonical JID within a tenant.
pub async fn contact_by_jid(
    db: &Database,
    tenant_id: &str,
    jid: &str,
) -> Result<Option<Contact>, KirimError> {
    let tenant_id = tenant_id.to_string();
    let jid = jid.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    "SELECT id, tenant_id, jid, display_name, push_name, is_group
                     FROM contacts WHERE tenant_id = ?1 AND jid = ?2",
                    params![tenant_id, jid],
                    contact_from_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a push-name observation for an existing contact.
pub async fn update_push_name(
    db: &Database,
    tenant_id: &str,
    jid: &str,
    push_name: &str,
) -> Result<(), KirimError> {
    let tenant_id = tenant_id.to_string();
    let jid = jid.to_string();
    let push_name = push_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET push_name = ?1 WHERE tenant_id = ?2 AND jid = ?3",
                params![push_name, tenant_id, jid],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tenants::create_tenant;
    use kirim_core::types::{ProviderKind, Tenant};
    use tempfile::tempdir;

    async fn setup_db_with_tenant() -> (Database, tempfile::TempDir) {
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
        (db, dir)
    }

    #[tokio::test]
    async fn creating_a_chat_twice_yields_the_same_chat() {
        let (db, _dir) = setup_db_with_tenant().await;

        let first = get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Ana"), false)
            .await
            .unwrap();
        let second =
            get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Ana"), false)
                .await
                .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.contact_id, second.contact_id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn chat_creation_records_contact() {
        let (db, _dir) = setup_db_with_tenant().await;

        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Ana"), false)
            .await
            .unwrap();

        let contact = contact_by_jid(&db, "t1", "628123456789@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.display_name.as_deref(), Some("Ana"));
        assert!(!contact.is_group);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn later_display_name_fills_missing_one() {
        let (db, _dir) = setup_db_with_tenant().await;

        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", None, false)
            .await
            .unwrap();
        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Ana"), false)
            .await
            .unwrap();

        let contact = contact_by_jid(&db, "t1", "628123456789@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.display_name.as_deref(), Some("Ana"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn existing_display_name_is_not_overwritten() {
        let (db, _dir) = setup_db_with_tenant().await;

        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Ana"), false)
            .await
            .unwrap();
        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", Some("Other"), false)
            .await
            .unwrap();

        let contact = contact_by_jid(&db, "t1", "628123456789@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.display_name.as_deref(), Some("Ana"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn group_flag_is_persisted() {
        let (db, _dir) = setup_db_with_tenant().await;

        get_or_create_chat(&db, "t1", "628123-1609@g.us", Some("Team"), true)
            .await
            .unwrap();
        let contact = contact_by_jid(&db, "t1", "628123-1609@g.us").await.unwrap().unwrap();
        assert!(contact.is_group);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn push_name_update_is_visible() {
        let (db, _dir) = setup_db_with_tenant().await;

        get_or_create_chat(&db, "t1", "628123456789@s.whatsapp.net", None, false)
            .await
            .unwrap();
        update_push_name(&db, "t1", "628123456789@s.whatsapp.net", "Budi")
            .await
            .unwrap();

        let contact = contact_by_jid(&db, "t1", "628123456789@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.push_name.as_deref(), Some("Budi"));

        db.close().await.unwrap();
    }
}
