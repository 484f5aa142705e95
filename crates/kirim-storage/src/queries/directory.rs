// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Users, system settings, tenant webhooks, and the temporary-linked
//! identifier map.

use kirim_core::types::{TenantWebhook, UserContact};
use kirim_core::KirimError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// Insert or replace a user.
pub async fn upsert_user(
    db: &Database,
    id: &str,
    tenant_id: Option<&str>,
    name: &str,
    role: &str,
    phone_number: Option<&str>,
) -> Result<(), KirimError> {
    let id = id.to_string();
    let tenant_id = tenant_id.map(str::to_string);
    let name = name.to_string();
    let role = role.to_string();
    let phone_number = phone_number.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, tenant_id, name, role, phone_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     tenant_id = excluded.tenant_id,
                     name = excluded.name,
                     role = excluded.role,
                     phone_number = excluded.phone_number",
                params![id, tenant_id, name, role, phone_number],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active users of a tenant with a phone number on file, optionally
/// filtered by role.
pub async fn users_with_phone(
    db: &Database,
    tenant_id: &str,
    roles: &[&str],
) -> Result<Vec<UserContact>, KirimError> {
    let tenant_id = tenant_id.to_string();
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let mut sql = "SELECT id, name, phone_number FROM users
                 WHERE tenant_id = ?1
                   AND phone_number IS NOT NULL
                   AND status = 'active'"
                .to_string();
            if !roles.is_empty() {
                let placeholders: Vec<String> =
                    (0..roles.len()).map(|i| format!("?{}", i + 2)).collect();
                sql.push_str(&format!(" AND role IN ({})", placeholders.join(", ")));
            }

            let mut stmt = conn.prepare(&sql)?;
            let mut bind: Vec<&dyn rusqlite::ToSql> = vec![&tenant_id];
            for role in &roles {
                bind.push(role);
            }
            let rows = stmt.query_map(bind.as_slice(), |row| {
                Ok(UserContact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone_number: row.get(2)?,
                })
            })?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active super-administrators with a phone number on file.
pub async fn super_admins_with_phone(db: &Database) -> Result<Vec<UserContact>, KirimError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, phone_number FROM users
                 WHERE role = 'super_admin'
                   AND status = 'active'
                   AND phone_number IS NOT NULL",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(UserContact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone_number: row.get(2)?,
                })
            })?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert a system setting.
pub async fn set_system_setting(db: &Database, key: &str, value: &str) -> Result<(), KirimError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO system_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A system setting value, if set.
pub async fn system_setting(db: &Database, key: &str) -> Result<Option<String>, KirimError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM system_settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Register an outbound webhook for a tenant. Returns its id.
pub async fn add_tenant_webhook(
    db: &Database,
    tenant_id: &str,
    url: &str,
) -> Result<i64, KirimError> {
    let tenant_id = tenant_id.to_string();
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_webhooks (tenant_id, url) VALUES (?1, ?2)",
                params![tenant_id, url],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All outbound webhooks configured for a tenant.
pub async fn tenant_webhooks(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<TenantWebhook>, KirimError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, url FROM tenant_webhooks
                 WHERE tenant_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![tenant_id], |row| {
                Ok(TenantWebhook {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    url: row.get(2)?,
                })
            })?;
            let mut webhooks = Vec::new();
            for row in rows {
                webhooks.push(row?);
            }
            Ok(webhooks)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a temporary-linked-identifier → permanent number mapping.
pub async fn set_lid_mapping(db: &Database, lid: &str, pn: &str) -> Result<(), KirimError> {
    let lid = lid.to_string();
    let pn = pn.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lid_map (lid, pn) VALUES (?1, ?2)
                 ON CONFLICT(lid) DO UPDATE SET pn = excluded.pn",
                params![lid, pn],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The permanent number for a temporary linked identifier, when known.
pub async fn permanent_number_for_lid(
    db: &Database,
    lid: &str,
) -> Result<Option<String>, KirimError> {
    let lid = lid.to_string();
    db.connection()
        .call(move |conn| {
            let pn = conn
                .query_row(
                    "SELECT pn FROM lid_map WHERE lid = ?1",
                    params![lid],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(pn)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
