//! Database repository for CRUD operations.
//!
//! Lifecycle guards live in the `WHERE` clause of the write they protect, so a check and the
//! change it allows cannot be separated by a concurrent request. When a guarded write touches
//! no row the drive is re-read to tell "not found" apart from "not allowed now".

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    normalize_schedule, resolve_display_name, Company, CompanyStatus, CreateDriveRequest,
    CreateQuestionRequest, CreateStudentRequest, Drive, DriveReviewFilter, DriveStatus,
    DriveTarget, QuestionType, Question, RegisterCompanyRequest, Registry, RegistryEntry, Student,
    TargetSpec, UpdateDriveRequest, UpdateRegistryEntryRequest, DUPLICATE_TITLE_SUFFIX,
    UNKNOWN_COLLEGE, UNKNOWN_GROUP,
};

const COMPANY_COLUMNS: &str = "id, name, email, logo_url, is_approved, status, admin_notes, reviewed_at, reviewed_by, created_at";

const DRIVE_SELECT: &str = r#"SELECT d.id, d.company_id, c.name AS company_name, d.title, d.description,
        d.question_type, d.duration_minutes, d.scheduled_start, d.status, d.is_approved,
        d.admin_notes, d.created_at, d.updated_at,
        (SELECT COUNT(*) FROM questions q WHERE q.drive_id = d.id) AS question_count
    FROM drives d LEFT JOIN companies c ON c.id = d.company_id"#;

const QUESTION_COLUMNS: &str = "id, drive_id, question_text, option_a, option_b, option_c, option_d, correct_answer, difficulty, points, created_at";

/// Current lifecycle position of a drive, read when a guarded write is refused.
struct DriveState {
    status: Option<DriveStatus>,
    is_approved: bool,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== ADMIN OPERATIONS ====================

    pub async fn admin_exists(&self, username: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM admins WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn create_admin(&self, username: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| unique_to_conflict(e, format!("Admin {} already exists", username)))?;
        Ok(())
    }

    pub async fn get_admin_password_hash(&self, username: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT password_hash FROM admins WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("password_hash")))
    }

    // ==================== COMPANY OPERATIONS ====================

    /// Register a company. New companies start `pending`.
    pub async fn create_company(
        &self,
        request: &RegisterCompanyRequest,
        password_hash: &str,
    ) -> Result<Company, AppError> {
        let email = request.email.trim();
        let conflict = || AppError::Conflict(format!("Email {} is already registered", email));

        let existing = sqlx::query("SELECT 1 FROM companies WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(conflict());
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO companies (name, email, password_hash, logo_url, is_approved, status, created_at) VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(request.name.trim())
        .bind(email)
        .bind(password_hash)
        .bind(&request.logo_url)
        .bind(CompanyStatus::Pending.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, conflict().message()))?;

        self.get_company(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("Company vanished after insert".to_string()))
    }

    pub async fn get_company(&self, id: i64) -> Result<Option<Company>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM companies WHERE id = ?", COMPANY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(company_from_row))
    }

    /// Company and stored password hash for a login email.
    pub async fn get_company_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Company, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM companies WHERE email = ?",
            COMPANY_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| (company_from_row(&r), r.get("password_hash"))))
    }

    pub async fn list_companies(
        &self,
        status: Option<CompanyStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Company>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM companies WHERE (?1 IS NULL OR LOWER(status) = ?1) ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            COMPANY_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(company_from_row).collect())
    }

    /// Record an admin decision. The legacy `is_approved` flag follows the status.
    pub async fn review_company(
        &self,
        id: i64,
        status: CompanyStatus,
        admin_notes: Option<&str>,
        reviewer: &str,
    ) -> Result<Company, AppError> {
        let result = sqlx::query(
            "UPDATE companies SET status = ?, is_approved = ?, admin_notes = ?, reviewed_at = ?, reviewed_by = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(status.is_approved() as i32)
        .bind(admin_notes)
        .bind(Utc::now().to_rfc3339())
        .bind(reviewer)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Company {} not found", id)));
        }

        self.get_company(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))
    }

    // ==================== REGISTRY OPERATIONS ====================

    /// Insert `names` as approved entries if the registry is empty. Returns how many were added.
    pub async fn seed_registry(&self, registry: Registry, names: &[&str]) -> Result<usize, AppError> {
        let table = registry.table();
        let count: i64 = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {}", table))
            .fetch_one(&self.pool)
            .await?
            .get("count");
        if count > 0 {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for name in names {
            sqlx::query(&format!(
                "INSERT INTO {} (name, is_approved, created_at) VALUES (?, 1, ?)",
                table
            ))
            .bind(*name)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(names.len())
    }

    /// List entries by name, optionally only approved or only unapproved ones.
    pub async fn list_registry(
        &self,
        registry: Registry,
        approved: Option<bool>,
    ) -> Result<Vec<RegistryEntry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT id, name, is_approved, created_at FROM {} WHERE (?1 IS NULL OR is_approved = ?1) ORDER BY name",
            registry.table()
        ))
        .bind(approved.map(|a| a as i32))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(registry_entry_from_row).collect())
    }

    pub async fn get_registry_entry(
        &self,
        registry: Registry,
        id: i64,
    ) -> Result<Option<RegistryEntry>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT id, name, is_approved, created_at FROM {} WHERE id = ?",
            registry.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(registry_entry_from_row))
    }

    /// Create an entry. Names are matched exactly (case-sensitive).
    pub async fn create_registry_entry(
        &self,
        registry: Registry,
        name: &str,
        is_approved: bool,
    ) -> Result<RegistryEntry, AppError> {
        let name = validate_registry_name(registry, name)?;
        let conflict = || AppError::Conflict(format!("{} {} already exists", registry.label(), name));

        if self.registry_name_taken(registry, name, None).await? {
            return Err(conflict());
        }

        let result = sqlx::query(&format!(
            "INSERT INTO {} (name, is_approved, created_at) VALUES (?, ?, ?)",
            registry.table()
        ))
        .bind(name)
        .bind(is_approved as i32)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, conflict().message()))?;

        self.get_registry_entry(registry, result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal(format!("{} vanished after insert", registry.label())))
    }

    /// Rename and/or (un)approve an entry. A new name must not belong to any other entry.
    pub async fn update_registry_entry(
        &self,
        registry: Registry,
        id: i64,
        request: &UpdateRegistryEntryRequest,
    ) -> Result<RegistryEntry, AppError> {
        let existing = self
            .get_registry_entry(registry, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", registry.label(), id)))?;

        let name = match request.name.as_deref() {
            Some(name) => validate_registry_name(registry, name)?.to_string(),
            None => existing.name.clone(),
        };
        let conflict = || AppError::Conflict(format!("{} {} already exists", registry.label(), name));

        if name != existing.name && self.registry_name_taken(registry, &name, Some(id)).await? {
            return Err(conflict());
        }

        let is_approved = request.is_approved.unwrap_or(existing.is_approved);
        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ?, is_approved = ? WHERE id = ?",
            registry.table()
        ))
        .bind(&name)
        .bind(is_approved as i32)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, conflict().message()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", registry.label(), id)));
        }

        Ok(RegistryEntry {
            name,
            is_approved,
            ..existing
        })
    }

    /// Mark an entry approved. Approving an approved entry is a no-op.
    pub async fn approve_registry_entry(
        &self,
        registry: Registry,
        id: i64,
    ) -> Result<RegistryEntry, AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_approved = 1 WHERE id = ?",
            registry.table()
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", registry.label(), id)));
        }

        self.get_registry_entry(registry, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", registry.label(), id)))
    }

    /// Delete an entry. Targets still referencing its id keep it and display a placeholder.
    pub async fn delete_registry_entry(&self, registry: Registry, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", registry.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", registry.label(), id)));
        }
        Ok(())
    }

    async fn registry_name_taken(
        &self,
        registry: Registry,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(&format!(
            "SELECT 1 FROM {} WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
            registry.table()
        ))
        .bind(name)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    // ==================== TARGET OPERATIONS ====================

    /// Targets of a drive with display names resolved against the registries.
    pub async fn load_targets(&self, drive_id: i64) -> Result<Vec<DriveTarget>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.college_id, t.custom_college_name, c.name AS college_name,
                      t.student_group_id, t.custom_student_group_name, g.name AS student_group_name,
                      t.batch_year
               FROM drive_targets t
               LEFT JOIN colleges c ON c.id = t.college_id
               LEFT JOIN student_groups g ON g.id = t.student_group_id
               WHERE t.drive_id = ?
               ORDER BY t.id"#,
        )
        .bind(drive_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(target_from_row).collect())
    }

    /// Replace the whole target set of a drive the company may still edit.
    pub async fn replace_targets(
        &self,
        company_id: i64,
        drive_id: i64,
        targets: &[TargetSpec],
    ) -> Result<Drive, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE drives SET updated_at = ? WHERE id = ? AND company_id = ? AND is_approved = 0",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(drive_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            return Err(self.edit_refused(company_id, drive_id).await);
        }

        sqlx::query("DELETE FROM drive_targets WHERE drive_id = ?")
            .bind(drive_id)
            .execute(&mut *tx)
            .await?;
        insert_targets(&mut tx, drive_id, targets).await?;

        tx.commit().await?;
        self.get_drive(company_id, drive_id).await
    }

    // ==================== DRIVE OPERATIONS ====================

    /// Create a drive in `draft`. At least one target is required.
    pub async fn create_drive(
        &self,
        company_id: i64,
        request: &CreateDriveRequest,
    ) -> Result<Drive, AppError> {
        let title = validate_title(&request.title)?;
        validate_duration(request.duration_minutes)?;
        let scheduled_start = request
            .scheduled_start
            .as_deref()
            .map(validate_schedule)
            .transpose()?;
        if request.targets.is_empty() {
            return Err(AppError::Validation(
                "At least one target is required".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"INSERT INTO drives (company_id, title, description, question_type, duration_minutes,
                   scheduled_start, status, is_approved, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
        )
        .bind(company_id)
        .bind(title)
        .bind(&request.description)
        .bind(request.question_type.as_str())
        .bind(request.duration_minutes)
        .bind(&scheduled_start)
        .bind(DriveStatus::Draft.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let drive_id = result.last_insert_rowid();

        insert_targets(&mut tx, drive_id, &request.targets).await?;
        tx.commit().await?;

        tracing::info!(drive_id, company_id, "Created drive");
        self.get_drive(company_id, drive_id).await
    }

    /// A drive owned by `company_id`. Other companies' drives are reported as not found.
    pub async fn get_drive(&self, company_id: i64, drive_id: i64) -> Result<Drive, AppError> {
        self.fetch_drive(drive_id, Some(company_id)).await
    }

    /// Any drive, for admin review.
    pub async fn get_drive_for_review(&self, drive_id: i64) -> Result<Drive, AppError> {
        self.fetch_drive(drive_id, None).await
    }

    pub async fn list_company_drives(&self, company_id: i64) -> Result<Vec<Drive>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE d.company_id = ? ORDER BY d.created_at DESC, d.id DESC",
            DRIVE_SELECT
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        self.drives_from_rows(&rows).await
    }

    pub async fn list_drives_for_review(
        &self,
        filter: DriveReviewFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Drive>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE {} ORDER BY d.updated_at DESC, d.id DESC LIMIT ? OFFSET ?",
            DRIVE_SELECT,
            filter.condition()
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        self.drives_from_rows(&rows).await
    }

    /// Update core fields and, when given, replace the targets. Refused once approved.
    pub async fn update_drive(
        &self,
        company_id: i64,
        drive_id: i64,
        request: &UpdateDriveRequest,
    ) -> Result<Drive, AppError> {
        let title = request.title.as_deref().map(validate_title).transpose()?;
        if let Some(duration) = request.duration_minutes {
            validate_duration(duration)?;
        }
        let scheduled_start = request
            .scheduled_start
            .as_deref()
            .map(validate_schedule)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE drives SET
                   title = COALESCE(?, title),
                   description = COALESCE(?, description),
                   duration_minutes = COALESCE(?, duration_minutes),
                   scheduled_start = COALESCE(?, scheduled_start),
                   updated_at = ?
               WHERE id = ? AND company_id = ? AND is_approved = 0"#,
        )
        .bind(title)
        .bind(&request.description)
        .bind(request.duration_minutes)
        .bind(&scheduled_start)
        .bind(Utc::now().to_rfc3339())
        .bind(drive_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            return Err(self.edit_refused(company_id, drive_id).await);
        }

        if let Some(targets) = &request.targets {
            sqlx::query("DELETE FROM drive_targets WHERE drive_id = ?")
                .bind(drive_id)
                .execute(&mut *tx)
                .await?;
            insert_targets(&mut tx, drive_id, targets).await?;
        }

        tx.commit().await?;
        self.get_drive(company_id, drive_id).await
    }

    /// Delete a drive with its targets, questions and students. Refused once approved.
    pub async fn delete_drive(&self, company_id: i64, drive_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Older databases lack ON DELETE CASCADE on the dependent tables.
        for table in ["drive_targets", "questions", "students"] {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE drive_id IN (SELECT id FROM drives WHERE id = ? AND company_id = ? AND is_approved = 0)",
                table
            ))
            .bind(drive_id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        }

        let result =
            sqlx::query("DELETE FROM drives WHERE id = ? AND company_id = ? AND is_approved = 0")
                .bind(drive_id)
                .bind(company_id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            return Err(self.edit_refused(company_id, drive_id).await);
        }

        tx.commit().await?;
        tracing::info!(drive_id, company_id, "Deleted drive");
        Ok(())
    }

    /// `draft -> submitted`, only when the drive has at least one question.
    pub async fn submit_drive(&self, company_id: i64, drive_id: i64) -> Result<Drive, AppError> {
        let result = sqlx::query(
            r#"UPDATE drives SET status = ?, updated_at = ?
               WHERE id = ? AND company_id = ? AND LOWER(status) = 'draft'
                 AND EXISTS (SELECT 1 FROM questions q WHERE q.drive_id = drives.id)"#,
        )
        .bind(DriveStatus::Submitted.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(drive_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let state = self.drive_state(drive_id, Some(company_id)).await?;
            return Err(if state.status != Some(DriveStatus::Draft) {
                AppError::IllegalState("Only draft drives can be submitted".to_string())
            } else {
                AppError::IllegalState(
                    "Add at least one question before submitting the drive".to_string(),
                )
            });
        }

        self.get_drive(company_id, drive_id).await
    }

    /// `submitted -> approved | rejected`, recording the admin's notes.
    pub async fn review_drive(
        &self,
        drive_id: i64,
        approve: bool,
        admin_notes: Option<&str>,
    ) -> Result<Drive, AppError> {
        let status = if approve {
            DriveStatus::Approved
        } else {
            DriveStatus::Rejected
        };

        let result = sqlx::query(
            r#"UPDATE drives SET status = ?, is_approved = ?, admin_notes = ?, updated_at = ?
               WHERE id = ? AND LOWER(status) = 'submitted'"#,
        )
        .bind(status.as_str())
        .bind(approve as i32)
        .bind(admin_notes)
        .bind(Utc::now().to_rfc3339())
        .bind(drive_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.drive_state(drive_id, None).await?;
            return Err(AppError::IllegalState(
                "Only submitted drives can be reviewed".to_string(),
            ));
        }

        tracing::info!(drive_id, status = status.as_str(), "Reviewed drive");
        self.get_drive_for_review(drive_id).await
    }

    /// Company-driven status change. Any status is accepted once the drive is approved.
    pub async fn update_drive_status(
        &self,
        company_id: i64,
        drive_id: i64,
        status: DriveStatus,
    ) -> Result<Drive, AppError> {
        let result = sqlx::query(
            "UPDATE drives SET status = ?, updated_at = ? WHERE id = ? AND company_id = ? AND is_approved = 1",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(drive_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.drive_state(drive_id, Some(company_id)).await?;
            return Err(AppError::IllegalState(
                "Drive must be approved before its status can change".to_string(),
            ));
        }

        self.get_drive(company_id, drive_id).await
    }

    /// Copy a drive with its targets and questions into a new unapproved draft.
    pub async fn duplicate_drive(&self, company_id: i64, drive_id: i64) -> Result<Drive, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"INSERT INTO drives (company_id, title, description, question_type, duration_minutes,
                   scheduled_start, status, is_approved, admin_notes, created_at, updated_at)
               SELECT company_id, title || ?, description, question_type, duration_minutes,
                   NULL, ?, 0, NULL, ?, ?
               FROM drives WHERE id = ? AND company_id = ?"#,
        )
        .bind(DUPLICATE_TITLE_SUFFIX)
        .bind(DriveStatus::Draft.as_str())
        .bind(&now)
        .bind(&now)
        .bind(drive_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Drive {} not found", drive_id)));
        }
        let copy_id = result.last_insert_rowid();

        let targets = sqlx::query(
            r#"INSERT INTO drive_targets (drive_id, college_id, custom_college_name, student_group_id,
                   custom_student_group_name, batch_year, created_at)
               SELECT ?, college_id, custom_college_name, student_group_id,
                   custom_student_group_name, batch_year, ?
               FROM drive_targets WHERE drive_id = ? ORDER BY id"#,
        )
        .bind(copy_id)
        .bind(&now)
        .bind(drive_id)
        .execute(&mut *tx)
        .await?;

        let questions = sqlx::query(
            r#"INSERT INTO questions (drive_id, question_text, option_a, option_b, option_c, option_d,
                   correct_answer, difficulty, points, created_at)
               SELECT ?, question_text, option_a, option_b, option_c, option_d,
                   correct_answer, difficulty, points, ?
               FROM questions WHERE drive_id = ? ORDER BY id"#,
        )
        .bind(copy_id)
        .bind(&now)
        .bind(drive_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            drive_id,
            copy_id,
            targets = targets.rows_affected(),
            questions = questions.rows_affected(),
            "Duplicated drive"
        );
        self.get_drive(company_id, copy_id).await
    }

    async fn fetch_drive(&self, drive_id: i64, company_id: Option<i64>) -> Result<Drive, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE d.id = ?1 AND (?2 IS NULL OR d.company_id = ?2)",
            DRIVE_SELECT
        ))
        .bind(drive_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drive {} not found", drive_id)))?;

        let targets = self.load_targets(drive_id).await?;
        drive_from_row(&row, targets)
    }

    async fn drives_from_rows(&self, rows: &[SqliteRow]) -> Result<Vec<Drive>, AppError> {
        let mut drives = Vec::with_capacity(rows.len());
        for row in rows {
            let targets = self.load_targets(row.get("id")).await?;
            drives.push(drive_from_row(row, targets)?);
        }
        Ok(drives)
    }

    async fn drive_state(
        &self,
        drive_id: i64,
        company_id: Option<i64>,
    ) -> Result<DriveState, AppError> {
        let row = sqlx::query(
            "SELECT status, is_approved FROM drives WHERE id = ?1 AND (?2 IS NULL OR company_id = ?2)",
        )
        .bind(drive_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drive {} not found", drive_id)))?;

        let status: String = row.get("status");
        let is_approved: Option<i32> = row.get("is_approved");
        Ok(DriveState {
            status: DriveStatus::from_str(&status),
            is_approved: is_approved.unwrap_or(0) != 0,
        })
    }

    /// Error for a refused edit: not found, or locked by approval.
    async fn edit_refused(&self, company_id: i64, drive_id: i64) -> AppError {
        match self.drive_state(drive_id, Some(company_id)).await {
            Ok(state) if state.is_approved => {
                AppError::IllegalState("Approved drives cannot be modified".to_string())
            }
            Ok(_) => AppError::Internal(format!("Drive {} changed concurrently", drive_id)),
            Err(e) => e,
        }
    }

    // ==================== QUESTION OPERATIONS ====================

    /// Add one question to a drive that is not yet approved.
    pub async fn add_question(
        &self,
        company_id: i64,
        drive_id: i64,
        request: &CreateQuestionRequest,
    ) -> Result<Question, AppError> {
        validate_question(request)?;

        let mut conn = self.pool.acquire().await?;
        let inserted = insert_question(&mut conn, company_id, drive_id, request).await?;
        drop(conn);

        match inserted {
            Some(id) => self.get_question(id).await,
            None => Err(self.question_refused(company_id, drive_id).await),
        }
    }

    /// Add all questions or none.
    pub async fn add_questions_bulk(
        &self,
        company_id: i64,
        drive_id: i64,
        requests: &[CreateQuestionRequest],
    ) -> Result<usize, AppError> {
        if requests.is_empty() {
            return Err(AppError::Validation("No questions supplied".to_string()));
        }
        for (index, request) in requests.iter().enumerate() {
            validate_question(request).map_err(|e| {
                AppError::Validation(format!("Question {}: {}", index + 1, e.message()))
            })?;
        }

        let mut tx = self.pool.begin().await?;
        for request in requests {
            if insert_question(&mut tx, company_id, drive_id, request)
                .await?
                .is_none()
            {
                drop(tx);
                return Err(self.question_refused(company_id, drive_id).await);
            }
        }
        tx.commit().await?;

        tracing::info!(drive_id, count = requests.len(), "Bulk uploaded questions");
        Ok(requests.len())
    }

    pub async fn list_questions(
        &self,
        company_id: i64,
        drive_id: i64,
    ) -> Result<Vec<Question>, AppError> {
        self.drive_state(drive_id, Some(company_id)).await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM questions WHERE drive_id = ? ORDER BY id",
            QUESTION_COLUMNS
        ))
        .bind(drive_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(question_from_row).collect())
    }

    async fn get_question(&self, id: i64) -> Result<Question, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;
        Ok(question_from_row(&row))
    }

    async fn question_refused(&self, company_id: i64, drive_id: i64) -> AppError {
        match self.drive_state(drive_id, Some(company_id)).await {
            Ok(state) if state.is_approved => AppError::IllegalState(
                "Questions cannot be added to an approved drive".to_string(),
            ),
            Ok(_) => AppError::Internal(format!("Drive {} changed concurrently", drive_id)),
            Err(e) => e,
        }
    }

    // ==================== STUDENT OPERATIONS ====================

    /// Register exam participants against a drive.
    pub async fn register_students(
        &self,
        company_id: i64,
        drive_id: i64,
        requests: &[CreateStudentRequest],
    ) -> Result<Vec<Student>, AppError> {
        if requests.is_empty() {
            return Err(AppError::Validation("No students supplied".to_string()));
        }
        for (index, request) in requests.iter().enumerate() {
            if request.roll_number.trim().is_empty() || request.email.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "Student {}: roll number and email are required",
                    index + 1
                )));
            }
        }

        self.drive_state(drive_id, Some(company_id)).await?;

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut students = Vec::with_capacity(requests.len());

        for request in requests {
            let name = request
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);

            let result = sqlx::query(
                "INSERT INTO students (roll_number, name, email, drive_id, company_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(request.roll_number.trim())
            .bind(&name)
            .bind(request.email.trim())
            .bind(drive_id)
            .bind(company_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            students.push(Student {
                id: result.last_insert_rowid(),
                drive_id,
                company_id,
                roll_number: request.roll_number.trim().to_string(),
                email: request.email.trim().to_string(),
                name,
                created_at: now.clone(),
            });
        }

        tx.commit().await?;
        Ok(students)
    }

    pub async fn list_students(
        &self,
        company_id: i64,
        drive_id: i64,
    ) -> Result<Vec<Student>, AppError> {
        self.drive_state(drive_id, Some(company_id)).await?;

        let rows = sqlx::query(
            "SELECT id, drive_id, company_id, roll_number, email, name, created_at FROM students WHERE drive_id = ? AND company_id = ? ORDER BY roll_number, id",
        )
        .bind(drive_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Student {
                id: row.get("id"),
                drive_id: row.get("drive_id"),
                company_id: row.get("company_id"),
                roll_number: row.get("roll_number"),
                email: row.get("email"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

/// Id of the registry entry named `name`, inserting it unapproved when missing.
///
/// One conditional insert, so concurrent callers cannot both create the name.
pub async fn get_or_create_registry_entry(
    conn: &mut SqliteConnection,
    registry: Registry,
    name: &str,
) -> Result<i64, sqlx::Error> {
    let table = registry.table();

    sqlx::query(&format!(
        "INSERT INTO {table} (name, is_approved, created_at) SELECT ?1, 0, ?2 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = ?1)"
    ))
    .bind(name)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query(&format!(
        "SELECT id FROM {} WHERE name = ? ORDER BY id LIMIT 1",
        table
    ))
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("id"))
}

/// Persist target rows for a drive.
///
/// Custom names are registered (unapproved) when new; the row keeps whichever of id and
/// custom name was supplied. Referenced ids must exist.
async fn insert_targets(
    conn: &mut SqliteConnection,
    drive_id: i64,
    targets: &[TargetSpec],
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();

    for (index, target) in targets.iter().enumerate() {
        let target = target.normalized();

        if target.college_id.is_none()
            && target.custom_college_name.is_none()
            && target.student_group_id.is_none()
            && target.custom_student_group_name.is_none()
        {
            return Err(AppError::Validation(format!(
                "Target {} must name a college or a student group",
                index + 1
            )));
        }

        for (registry, id) in [
            (Registry::College, target.college_id),
            (Registry::StudentGroup, target.student_group_id),
        ] {
            if let Some(id) = id {
                let exists = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?", registry.table()))
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;
                if exists.is_none() {
                    return Err(AppError::NotFound(format!(
                        "{} {} not found",
                        registry.label(),
                        id
                    )));
                }
            }
        }

        if let Some(name) = &target.custom_college_name {
            get_or_create_registry_entry(conn, Registry::College, name).await?;
        }
        if let Some(name) = &target.custom_student_group_name {
            get_or_create_registry_entry(conn, Registry::StudentGroup, name).await?;
        }

        sqlx::query(
            r#"INSERT INTO drive_targets (drive_id, college_id, custom_college_name, student_group_id,
                   custom_student_group_name, batch_year, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(drive_id)
        .bind(target.college_id)
        .bind(&target.custom_college_name)
        .bind(target.student_group_id)
        .bind(&target.custom_student_group_name)
        .bind(&target.batch_year)
        .bind(&now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Insert a question if the drive belongs to the company and is not approved.
/// Returns `None` when the guard refused the insert.
async fn insert_question(
    conn: &mut SqliteConnection,
    company_id: i64,
    drive_id: i64,
    request: &CreateQuestionRequest,
) -> Result<Option<i64>, AppError> {
    let result = sqlx::query(
        r#"INSERT INTO questions (drive_id, question_text, option_a, option_b, option_c, option_d,
               correct_answer, difficulty, points, created_at)
           SELECT id, ?, ?, ?, ?, ?, ?, ?, ?, ?
           FROM drives WHERE id = ? AND company_id = ? AND is_approved = 0"#,
    )
    .bind(request.question_text.trim())
    .bind(&request.option_a)
    .bind(&request.option_b)
    .bind(&request.option_c)
    .bind(&request.option_d)
    .bind(&request.correct_answer)
    .bind(&request.difficulty)
    .bind(request.points_or_default())
    .bind(Utc::now().to_rfc3339())
    .bind(drive_id)
    .bind(company_id)
    .execute(&mut *conn)
    .await?;

    Ok((result.rows_affected() > 0).then(|| result.last_insert_rowid()))
}

fn validate_registry_name(registry: Registry, name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!(
            "{} name must not be empty",
            registry.label()
        )));
    }
    Ok(name)
}

fn validate_title(title: &str) -> Result<&str, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    Ok(title)
}

fn validate_duration(minutes: i64) -> Result<(), AppError> {
    if minutes <= 0 {
        return Err(AppError::Validation(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

fn validate_schedule(raw: &str) -> Result<String, AppError> {
    normalize_schedule(raw)
        .ok_or_else(|| AppError::Validation(format!("Invalid scheduled start {:?}", raw)))
}

fn validate_question(request: &CreateQuestionRequest) -> Result<(), AppError> {
    if request.question_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Question text must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn unique_to_conflict(error: sqlx::Error, message: String) -> AppError {
    match &error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(message),
        _ => error.into(),
    }
}

// Helper functions for row conversion

fn company_from_row(row: &SqliteRow) -> Company {
    let is_approved: Option<i32> = row.get("is_approved");
    let is_approved = is_approved.unwrap_or(0) != 0;
    let status: Option<String> = row.get("status");
    let status = status
        .as_deref()
        .and_then(CompanyStatus::from_str)
        .unwrap_or(if is_approved {
            CompanyStatus::Approved
        } else {
            CompanyStatus::Pending
        });

    Company {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        logo_url: row.get("logo_url"),
        is_approved,
        status,
        admin_notes: row.get("admin_notes"),
        reviewed_at: row.get("reviewed_at"),
        reviewed_by: row.get("reviewed_by"),
        created_at: row
            .get::<Option<String>, _>("created_at")
            .unwrap_or_default(),
    }
}

fn registry_entry_from_row(row: &SqliteRow) -> RegistryEntry {
    let is_approved: Option<i32> = row.get("is_approved");
    RegistryEntry {
        id: row.get("id"),
        name: row.get("name"),
        is_approved: is_approved.unwrap_or(0) != 0,
        created_at: row
            .get::<Option<String>, _>("created_at")
            .unwrap_or_default(),
    }
}

fn target_from_row(row: &SqliteRow) -> DriveTarget {
    let college_id: Option<i64> = row.get("college_id");
    let custom_college_name: Option<String> = row.get("custom_college_name");
    let registry_college: Option<String> = row.get("college_name");
    let student_group_id: Option<i64> = row.get("student_group_id");
    let custom_student_group_name: Option<String> = row.get("custom_student_group_name");
    let registry_group: Option<String> = row.get("student_group_name");

    DriveTarget {
        id: row.get("id"),
        college_name: resolve_display_name(
            custom_college_name.as_deref(),
            college_id,
            registry_college.as_deref(),
            UNKNOWN_COLLEGE,
        ),
        college_id,
        custom_college_name,
        student_group_name: resolve_display_name(
            custom_student_group_name.as_deref(),
            student_group_id,
            registry_group.as_deref(),
            UNKNOWN_GROUP,
        ),
        student_group_id,
        custom_student_group_name,
        batch_year: row.get("batch_year"),
    }
}

fn drive_from_row(row: &SqliteRow, targets: Vec<DriveTarget>) -> Result<Drive, AppError> {
    let status: String = row.get("status");
    let question_type: String = row.get("question_type");
    let is_approved: Option<i32> = row.get("is_approved");

    Ok(Drive {
        id: row.get("id"),
        company_id: row.get("company_id"),
        company_name: row.get("company_name"),
        title: row.get("title"),
        description: row.get("description"),
        question_type: QuestionType::from_str(&question_type).ok_or_else(|| {
            AppError::Database(format!("Unknown question type {:?}", question_type))
        })?,
        targets,
        duration_minutes: row.get("duration_minutes"),
        scheduled_start: row.get("scheduled_start"),
        status: DriveStatus::from_str(&status)
            .ok_or_else(|| AppError::Database(format!("Unknown drive status {:?}", status)))?,
        is_approved: is_approved.unwrap_or(0) != 0,
        admin_notes: row.get("admin_notes"),
        question_count: Some(row.get("question_count")),
        created_at: row
            .get::<Option<String>, _>("created_at")
            .unwrap_or_default(),
        updated_at: row
            .get::<Option<String>, _>("updated_at")
            .unwrap_or_default(),
    })
}

fn question_from_row(row: &SqliteRow) -> Question {
    let points: Option<i64> = row.get("points");
    Question {
        id: row.get("id"),
        drive_id: row.get("drive_id"),
        question_text: row.get("question_text"),
        option_a: row.get("option_a"),
        option_b: row.get("option_b"),
        option_c: row.get("option_c"),
        option_d: row.get("option_d"),
        correct_answer: row.get("correct_answer"),
        difficulty: row.get("difficulty"),
        points: points.unwrap_or(1),
        created_at: row
            .get::<Option<String>, _>("created_at")
            .unwrap_or_default(),
    }
}
