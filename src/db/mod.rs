//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all portal data. Startup creates any missing tables,
//! runs the legacy data migrations and then adds indexes.

mod migrations;
mod repository;

pub use migrations::*;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::{Registry, SEED_COLLEGES, SEED_STUDENT_GROUPS};

/// Initialize the database connection pool, create the schema and migrate legacy data.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    create_registry_name_indexes(&pool).await;

    // Best-effort: failures are logged and rolled back, startup continues.
    run_legacy_migrations(&pool).await;

    create_indexes(&pool).await?;

    Ok(pool)
}

/// Create tables in their current shape. Existing tables are left untouched; older layouts
/// are brought forward by the legacy migrations.
async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            logo_url TEXT,
            is_approved INTEGER NOT NULL DEFAULT 0,
            status TEXT DEFAULT 'pending',
            admin_notes TEXT,
            reviewed_at TEXT,
            reviewed_by TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS colleges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            is_approved INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS student_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            is_approved INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            title TEXT NOT NULL,
            description TEXT,
            question_type TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            scheduled_start TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            is_approved INTEGER NOT NULL DEFAULT 0,
            admin_notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // college_id / student_group_id are weak references: deleting a registry row leaves
    // the id in place and display falls back to a placeholder.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drive_targets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            drive_id INTEGER NOT NULL REFERENCES drives(id) ON DELETE CASCADE,
            college_id INTEGER,
            custom_college_name TEXT,
            student_group_id INTEGER,
            custom_student_group_name TEXT,
            batch_year TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            drive_id INTEGER NOT NULL REFERENCES drives(id) ON DELETE CASCADE,
            question_text TEXT NOT NULL,
            option_a TEXT,
            option_b TEXT,
            option_c TEXT,
            option_d TEXT,
            correct_answer TEXT,
            difficulty TEXT,
            points INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roll_number TEXT NOT NULL,
            name TEXT,
            email TEXT NOT NULL,
            drive_id INTEGER REFERENCES drives(id) ON DELETE CASCADE,
            company_id INTEGER REFERENCES companies(id),
            is_approved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Declare registry name uniqueness on databases created before it was a constraint.
///
/// Fails (and is logged) when legacy data already holds duplicate names; get-or-create
/// stays correct without the index because it is a single conditional insert.
async fn create_registry_name_indexes(pool: &SqlitePool) {
    for registry in [Registry::College, Registry::StudentGroup] {
        let table = registry.table();
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_name_unique ON {table}(name)"
        );
        if let Err(e) = sqlx::query(&sql).execute(pool).await {
            tracing::warn!("Could not enforce unique {} names: {}", table, e);
        }
    }
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_drives_company_id ON drives(company_id);
        CREATE INDEX IF NOT EXISTS idx_drives_status ON drives(status);
        CREATE INDEX IF NOT EXISTS idx_drive_targets_drive_id ON drive_targets(drive_id);
        CREATE INDEX IF NOT EXISTS idx_questions_drive_id ON questions(drive_id);
        CREATE INDEX IF NOT EXISTS idx_students_drive_id ON students(drive_id);
        CREATE INDEX IF NOT EXISTS idx_students_roll_number ON students(roll_number);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the default colleges and student groups into empty registries.
pub async fn seed_reference_data(repo: &Repository) -> Result<(), AppError> {
    let colleges = repo.seed_registry(Registry::College, SEED_COLLEGES).await?;
    if colleges > 0 {
        tracing::info!("Added {} sample colleges", colleges);
    }

    let groups = repo
        .seed_registry(Registry::StudentGroup, SEED_STUDENT_GROUPS)
        .await?;
    if groups > 0 {
        tracing::info!("Added {} sample student groups", groups);
    }

    Ok(())
}

/// Create the bootstrap admin account if it does not exist yet.
pub async fn ensure_bootstrap_admin(
    repo: &Repository,
    username: &str,
    password: &str,
) -> Result<(), AppError> {
    if repo.admin_exists(username).await? {
        return Ok(());
    }

    let password_hash = crate::auth::hash_password(password)?;
    repo.create_admin(username, &password_hash).await?;
    tracing::info!("Created bootstrap admin account {:?}", username);
    Ok(())
}
