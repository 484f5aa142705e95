// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant lookup and provisioning.

use kirim_core::types::{ProviderKind, Tenant};
use kirim_core::KirimError;
use rusqlite::params;

use crate::database::Database;

pub(crate) const TENANT_COLUMNS: &str =
    "id, company_name, status, wa_provider, session_id, cloud_phone_id, cloud_token";

/// Map a row selected with [`TENANT_COLUMNS`] starting at `offset`.
pub(crate) fn tenant_from_row(
    row: &rusqlite::Row<'_>,
    offset: usize,
) -> Result<Tenant, rusqlite::Error> {
    let provider_raw: String = row.get(offset + 3)?;
    let provider = provider_raw.parse::<ProviderKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            offset + 3,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;
    Ok(Tenant {
        id: row.get(offset)?,
        company_name: row.get(offset + 1)?,
        status: row.get(offset + 2)?,
        provider,
        session_id: row.get(offset + 4)?,
        cloud_phone_id: row.get(offset + 5)?,
        cloud_token: row.get(offset + 6)?,
    })
}

/// Insert a tenant.
pub async fn create_tenant(db: &Database, tenant: &Tenant) -> Result<(), KirimError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, company_name, status, wa_provider, session_id,
                                      cloud_phone_id, cloud_token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    tenant.id,
                    tenant.company_name,
                    tenant.status,
                    tenant.provider.to_string(),
                    tenant.session_id,
                    tenant.cloud_phone_id,
                    tenant.cloud_token,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The tenant owning a socket session id, if any.
pub async fn tenant_by_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<Tenant>, KirimError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants WHERE session_id = ?1 LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![session_id], |row| tenant_from_row(row, 0))?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The tenant owning a cloud phone-number id, if any.
pub async fn tenant_by_cloud_phone_id(
    db: &Database,
    phone_id: &str,
) -> Result<Option<Tenant>, KirimError> {
    let phone_id = phone_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants WHERE cloud_phone_id = ?1 LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![phone_id], |row| tenant_from_row(row, 0))?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
