//! Database configuration module for `leadtrack`.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema (including foreign keys and their cascade rules) always matches the
//! Rust structs without hand-written SQL.

use crate::entities::{AuditLog, Contact, Correspondence, Lead, Note, Reminder, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Fallback database location when neither the config file nor the environment names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/leadtrack.sqlite?mode=rwc";

/// Resolves the database URL: `DATABASE_URL` from the environment wins over the
/// configured value.
#[must_use]
pub fn resolve_database_url(configured: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| configured.to_string())
}

/// Directory holding the database file of a `sqlite://` URL, if it names one.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to the database at `database_url`, creating the
/// directory of a file-backed `SQLite` database first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(dir)?;
    }
    debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables (if missing) using `SeaORM`'s schema generation from entity definitions.
///
/// Referenced tables are created before the tables pointing at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, User).await?;
    create_table(db, Lead).await?;
    create_table(db, Contact).await?;
    create_table(db, Note).await?;
    create_table(db, Reminder).await?;
    create_table(db, Correspondence).await?;
    create_table(db, AuditLog).await?;

    info!("Database tables ensured.");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for index in schema.create_index_from_entity(entity) {
        let mut index = index;
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}
