// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign and campaign-job operations, including the transactional claim
//! used by the batch processor.

use kirim_core::types::ClaimedJob;
use kirim_core::KirimError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Campaign, CampaignJob};
use crate::queries::tenants::{tenant_from_row, TENANT_COLUMNS};

/// Maximum stored length of a job's error text.
const ERROR_TEXT_MAX: usize = 500;

/// Insert a campaign. Returns its id.
pub async fn create_campaign(
    db: &Database,
    tenant_id: &str,
    name: &str,
    message_template: &str,
    scheduled_at: &str,
) -> Result<i64, KirimError> {
    let tenant_id = tenant_id.to_string();
    let name = name.to_string();
    let message_template = message_template.to_string();
    let scheduled_at = scheduled_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (tenant_id, name, message_template, scheduled_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tenant_id, name, message_template, scheduled_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a campaign's status (e.g. `paused`).
pub async fn set_campaign_status(
    db: &Database,
    campaign_id: i64,
    status: &str,
) -> Result<(), KirimError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?1 WHERE id = ?2",
                params![status, campaign_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Add one recipient job to a campaign. Returns the job id.
pub async fn add_job(
    db: &Database,
    campaign_id: i64,
    phone_number: &str,
) -> Result<i64, KirimError> {
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaign_jobs (campaign_id, phone_number) VALUES (?1, ?2)",
                params![campaign_id, phone_number],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim up to `limit` pending jobs of due, un-paused campaigns.
///
/// Selection and the transition to `processing` happen in one transaction,
/// so no job is ever visible to two claimants: a row is either still
/// `pending` (claimable) or already `processing` (invisible to this query).
/// Jobs are claimed oldest-first.
pub async fn claim_due_jobs(db: &Database, limit: i64) -> Result<Vec<ClaimedJob>, KirimError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let claimed = {
                let tenant_cols = prefixed_tenant_columns();
                let mut stmt = tx.prepare(&format!(
                    "SELECT j.id, j.campaign_id, j.phone_number, c.message_template, c.name,
                            {tenant_cols}
                     FROM campaign_jobs j
                     JOIN campaigns c ON c.id = j.campaign_id
                     JOIN tenants t ON t.id = c.tenant_id
                     WHERE j.status = 'pending'
                       AND c.scheduled_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                       AND c.status != 'paused'
                     ORDER BY j.created_at ASC, j.id ASC
                     LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok(ClaimedJob {
                        id: row.get(0)?,
                        campaign_id: row.get(1)?,
                        phone_number: row.get(2)?,
                        message_template: row.get(3)?,
                        campaign_name: row.get(4)?,
                        tenant: tenant_from_row(row, 5)?,
                    })
                })?;
                let mut claimed = Vec::new();
                for row in rows {
                    claimed.push(row?);
                }
                claimed
            };

            for job in &claimed {
                tx.execute(
                    "UPDATE campaign_jobs SET status = 'processing' WHERE id = ?1",
                    params![job.id],
                )?;
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn prefixed_tenant_columns() -> String {
    TENANT_COLUMNS
        .split(", ")
        .map(|c| format!("t.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Record a successful send: job becomes `sent`, the campaign's success
/// counter is incremented.
pub async fn mark_job_sent(
    db: &Database,
    job_id: i64,
    campaign_id: i64,
    wa_message_id: Option<&str>,
) -> Result<(), KirimError> {
    let wa_message_id = wa_message_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE campaign_jobs SET status = 'sent',
                     sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     wa_message_id = ?1,
                     error_message = NULL
                 WHERE id = ?2",
                params![wa_message_id, job_id],
            )?;
            tx.execute(
                "UPDATE campaigns SET success_count = success_count + 1 WHERE id = ?1",
                params![campaign_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed send: job becomes `failed` with truncated error text,
/// the campaign's failure counter is incremented.
pub async fn mark_job_failed(
    db: &Database,
    job_id: i64,
    campaign_id: i64,
    error: &str,
) -> Result<(), KirimError> {
    let trimmed: String = error.chars().take(ERROR_TEXT_MAX).collect();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE campaign_jobs SET status = 'failed', error_message = ?1 WHERE id = ?2",
                params![trimmed, job_id],
            )?;
            tx.execute(
                "UPDATE campaigns SET failed_count = failed_count + 1 WHERE id = ?1",
                params![campaign_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a campaign by id.
pub async fn campaign_by_id(db: &Database, campaign_id: i64) -> Result<Campaign, KirimError> {
    db.connection()
        .call(move |conn| {
            let campaign = conn.query_row(
                "SELECT id, tenant_id, name, message_template, scheduled_at, status,
                        success_count, failed_count
                 FROM campaigns WHERE id = ?1",
                params![campaign_id],
                |row| {
                    Ok(Campaign {
                        id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        name: row.get(2)?,
                        message_template: row.get(3)?,
                        scheduled_at: row.get(4)?,
                        status: row.get(5)?,
                        success_count: row.get(6)?,
                        failed_count: row.get(7)?,
                    })
                },
            )?;
            Ok(campaign)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a job by id.
pub async fn job_by_id(db: &Database, job_id: i64) -> Result<CampaignJob, KirimError> {
    db.connection()
        .call(move |conn| {
            let job = conn.query_row(
                "SELECT id, campaign_id, phone_number, status, wa_message_id, error_message,
                        created_at, sent_at
                 FROM campaign_jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    Ok(CampaignJob {
                        id: row.get(0)?,
                        campaign_id: row.get(1)?,
                        phone_number: row.get(2)?,
                        status: row.get(3)?,
                        wa_message_id: row.get(4)?,
                        error_message: row.get(5)?,
                        created_at: row.get(6)?,
                        sent_at: row.get(7)?,
                    })
                },
            )?;
            Ok(job)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
