// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. Migrations run automatically on database open.

use thiserror::Error;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Migration failure, boxed into `KirimError::Storage` by the caller.
#[derive(Debug, Error)]
#[error("migration failed: {0}")]
pub struct MigrationError(#[from] refinery::Error);

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history`
/// table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), MigrationError> {
    embedded::migrations::runner().run(conn)?;
    Ok(())
}
