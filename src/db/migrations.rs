//! One-time migrations of data written by older versions of the portal.
//!
//! Two independent routines run at startup, each in its own transaction:
//!
//! * **Targeting**: older drive rows stored their audience as four JSON array columns
//!   (`target_colleges`, `target_student_groups`, `custom_colleges`, `custom_student_groups`).
//!   These are expanded into `drive_targets` rows and the columns are dropped.
//! * **Company status**: older company rows had only the `is_approved` flag, with rejection
//!   marked by storing `REJECTED` as the logo URL. The status and review columns are added
//!   and backfilled.
//!
//! Both detect whether they are needed from the live schema, so running them again is a
//! no-op. A failure rolls the routine back, is logged, and never stops the server starting.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::models::{Registry, StatusCount, LEGACY_REJECTED_LOGO_SENTINEL};

use super::get_or_create_registry_entry;

/// Denormalized targeting columns once stored on `drives`.
pub const LEGACY_TARGET_COLUMNS: [&str; 4] = [
    "target_colleges",
    "target_student_groups",
    "custom_colleges",
    "custom_student_groups",
];

/// Review columns added to `companies` by the status migration.
const COMPANY_STATUS_COLUMNS: [(&str, &str); 4] = [
    ("status", "TEXT DEFAULT 'pending'"),
    ("admin_notes", "TEXT"),
    ("reviewed_at", "TEXT"),
    ("reviewed_by", "TEXT"),
];

/// Outcome of the targeting migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetingMigrationReport {
    /// False when no legacy column was present.
    pub ran: bool,
    pub drives_migrated: usize,
    pub targets_created: usize,
    pub columns_dropped: Vec<String>,
}

/// Legacy targeting of one drive, decoded from its JSON columns.
///
/// Anything that does not decode as a JSON array is treated as empty, and array elements
/// of the wrong shape are skipped, so historical data can never fail the migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTargeting {
    pub college_ids: Vec<i64>,
    pub group_ids: Vec<i64>,
    pub custom_colleges: Vec<String>,
    pub custom_groups: Vec<String>,
}

impl LegacyTargeting {
    pub fn decode(
        target_colleges: Option<&str>,
        target_student_groups: Option<&str>,
        custom_colleges: Option<&str>,
        custom_student_groups: Option<&str>,
    ) -> Self {
        Self {
            college_ids: decode_ids(target_colleges),
            group_ids: decode_ids(target_student_groups),
            custom_colleges: decode_names(custom_colleges),
            custom_groups: decode_names(custom_student_groups),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.college_ids.is_empty()
            && self.group_ids.is_empty()
            && self.custom_colleges.is_empty()
            && self.custom_groups.is_empty()
    }

    /// Expand into (college id, group id) pairs.
    ///
    /// Reference colleges are crossed with reference groups, custom colleges with reference
    /// groups, and reference colleges with custom groups. Custom colleges are never crossed
    /// with custom groups. `custom_college_ids` / `custom_group_ids` are the registry ids
    /// the custom names resolved to, in the same order.
    pub fn pairs(&self, custom_college_ids: &[i64], custom_group_ids: &[i64]) -> Vec<(i64, i64)> {
        let mut pairs = Vec::new();
        for &college_id in self.college_ids.iter().chain(custom_college_ids) {
            for &group_id in &self.group_ids {
                pairs.push((college_id, group_id));
            }
        }
        for &group_id in custom_group_ids {
            for &college_id in &self.college_ids {
                pairs.push((college_id, group_id));
            }
        }
        pairs
    }
}

fn decode_array(raw: Option<&str>) -> Vec<Value> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str::<Vec<Value>>(s).ok())
        .unwrap_or_default()
}

fn decode_ids(raw: Option<&str>) -> Vec<i64> {
    decode_array(raw)
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

fn decode_names(raw: Option<&str>) -> Vec<String> {
    decode_array(raw)
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Column names of `table`, in declaration order.
pub async fn table_columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

/// Run both legacy migrations, logging instead of failing.
pub async fn run_legacy_migrations(pool: &SqlitePool) {
    match migrate_legacy_targeting(pool).await {
        Ok(report) if report.ran => tracing::info!(
            drives = report.drives_migrated,
            targets = report.targets_created,
            "Migrated legacy drive targeting; dropped columns {:?}",
            report.columns_dropped
        ),
        Ok(_) => tracing::debug!("No legacy targeting columns found"),
        Err(e) => tracing::warn!(
            "Legacy targeting migration failed and was rolled back: {}",
            e
        ),
    }

    match migrate_company_status(pool).await {
        Ok(Some(summary)) => {
            tracing::info!("Company status migration completed");
            for entry in summary {
                tracing::info!("  {}: {} companies", entry.status, entry.count);
            }
        }
        Ok(None) => tracing::debug!("Company status columns already present"),
        Err(e) => tracing::warn!(
            "Company status migration failed and was rolled back: {}",
            e
        ),
    }
}

/// Move legacy JSON targeting into `drive_targets` and drop the legacy columns.
///
/// Drives that already have targets are skipped. Everything, including the column drops,
/// happens in one transaction: on error nothing is written and the columns stay.
pub async fn migrate_legacy_targeting(
    pool: &SqlitePool,
) -> Result<TargetingMigrationReport, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let columns = table_columns(&mut tx, "drives").await?;
    let present: Vec<&str> = LEGACY_TARGET_COLUMNS
        .iter()
        .copied()
        .filter(|legacy| columns.iter().any(|c| c == legacy))
        .collect();

    if present.is_empty() {
        return Ok(TargetingMigrationReport::default());
    }

    let select_list = LEGACY_TARGET_COLUMNS
        .iter()
        .map(|legacy| {
            if present.contains(legacy) {
                legacy.to_string()
            } else {
                format!("NULL AS {}", legacy)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let rows = sqlx::query(&format!(
        "SELECT id, {} FROM drives d WHERE NOT EXISTS (SELECT 1 FROM drive_targets t WHERE t.drive_id = d.id) ORDER BY id",
        select_list
    ))
    .fetch_all(&mut *tx)
    .await?;

    let mut report = TargetingMigrationReport {
        ran: true,
        ..Default::default()
    };
    let now = Utc::now().to_rfc3339();

    for row in &rows {
        let drive_id: i64 = row.get("id");
        let legacy = LegacyTargeting::decode(
            legacy_text(row, "target_colleges").as_deref(),
            legacy_text(row, "target_student_groups").as_deref(),
            legacy_text(row, "custom_colleges").as_deref(),
            legacy_text(row, "custom_student_groups").as_deref(),
        );

        if legacy.is_empty() {
            continue;
        }

        let mut custom_college_ids = Vec::with_capacity(legacy.custom_colleges.len());
        for name in &legacy.custom_colleges {
            custom_college_ids
                .push(get_or_create_registry_entry(&mut tx, Registry::College, name).await?);
        }

        let mut custom_group_ids = Vec::with_capacity(legacy.custom_groups.len());
        for name in &legacy.custom_groups {
            custom_group_ids
                .push(get_or_create_registry_entry(&mut tx, Registry::StudentGroup, name).await?);
        }

        for (college_id, group_id) in legacy.pairs(&custom_college_ids, &custom_group_ids) {
            sqlx::query(
                "INSERT INTO drive_targets (drive_id, college_id, student_group_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(drive_id)
            .bind(college_id)
            .bind(group_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            report.targets_created += 1;
        }

        report.drives_migrated += 1;
    }

    for legacy in &present {
        sqlx::query(&format!("ALTER TABLE drives DROP COLUMN {}", legacy))
            .execute(&mut *tx)
            .await?;
        report.columns_dropped.push(legacy.to_string());
    }

    tx.commit().await?;
    Ok(report)
}

/// Legacy columns may hold text, NULL, or whatever an old writer put there.
fn legacy_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).ok().flatten()
}

/// Add the company review columns and backfill `status` from the legacy fields.
///
/// Returns `None` when the `status` column already exists, otherwise the per-status
/// company counts after the backfill.
pub async fn migrate_company_status(
    pool: &SqlitePool,
) -> Result<Option<Vec<StatusCount>>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let columns = table_columns(&mut tx, "companies").await?;
    if columns.iter().any(|c| c == "status") {
        return Ok(None);
    }

    for (name, definition) in COMPANY_STATUS_COLUMNS {
        if !columns.iter().any(|c| c == name) {
            sqlx::query(&format!(
                "ALTER TABLE companies ADD COLUMN {} {}",
                name, definition
            ))
            .execute(&mut *tx)
            .await?;
        }
    }

    sqlx::query(
        r#"UPDATE companies
           SET status = CASE
               WHEN is_approved = 1 THEN 'approved'
               WHEN logo_url = ?1 THEN 'rejected'
               WHEN EXISTS (SELECT 1 FROM drives WHERE drives.company_id = companies.id) THEN 'suspended'
               ELSE 'pending'
           END
           WHERE status IS NULL OR status = 'pending'"#,
    )
    .bind(LEGACY_REJECTED_LOGO_SENTINEL)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE companies SET logo_url = NULL WHERE logo_url = ?")
        .bind(LEGACY_REJECTED_LOGO_SENTINEL)
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query(
        "SELECT status, COUNT(*) AS count FROM companies GROUP BY status ORDER BY status",
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(
        rows.iter()
            .map(|row| StatusCount {
                status: row
                    .get::<Option<String>, _>("status")
                    .unwrap_or_default(),
                count: row.get("count"),
            })
            .collect(),
    ))
}
