//! Postgres `Store` backend.
//!
//! Each entity lives in its own table as a jsonb document plus mirrored
//! columns for everything the database must enforce or index: ids, tenant
//! scope, and unique keys. Uniqueness is declared as unique indexes and a
//! constraint violation is the sole source of `Duplicate` errors; there are
//! no find-then-save pre-checks here.
//!
//! There are deliberately no foreign-key constraints between scope tables:
//! hard deletes of institutions and branches do not cascade and must leave
//! dependents behind (they are counted and reported to the caller).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::*;
use super::{BranchSummary, DashboardTotals, Orphans, Store, StoreError, StoreResult};

const MIGRATION: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS institutions (
        id uuid PRIMARY KEY,
        code text NOT NULL,
        max_branches integer NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS institutions_code_key ON institutions (code)",
    "CREATE TABLE IF NOT EXISTS branches (
        id uuid PRIMARY KEY,
        institution_id uuid NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS branches_institution_idx ON branches (institution_id)",
    "CREATE TABLE IF NOT EXISTS students (
        id uuid PRIMARY KEY,
        institution_id uuid NOT NULL,
        branch_id uuid NOT NULL,
        admission_number text NOT NULL,
        name_norm text NOT NULL,
        phone_no text,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS students_admission_key
        ON students (institution_id, admission_number)",
    "CREATE INDEX IF NOT EXISTS students_branch_idx ON students (branch_id)",
    "CREATE INDEX IF NOT EXISTS students_name_phone_idx ON students (name_norm, phone_no)",
    "CREATE TABLE IF NOT EXISTS fee_payments (
        id uuid PRIMARY KEY,
        institution_id uuid NOT NULL,
        branch_id uuid NOT NULL,
        student_name_norm text NOT NULL,
        amount bigint NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS fee_payments_student_idx
        ON fee_payments (branch_id, student_name_norm)",
    "CREATE TABLE IF NOT EXISTS users (
        id uuid PRIMARY KEY,
        email_lower text NOT NULL,
        role text NOT NULL,
        institution_id uuid,
        branch_id uuid,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email_lower)",
    "CREATE TABLE IF NOT EXISTS buses (
        id uuid PRIMARY KEY,
        branch_id uuid NOT NULL,
        bus_code text NOT NULL,
        registration_number text NOT NULL,
        operational_status text NOT NULL,
        is_active boolean NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS buses_bus_code_key ON buses (bus_code)",
    "CREATE UNIQUE INDEX IF NOT EXISTS buses_registration_key
        ON buses (registration_number)",
    "CREATE INDEX IF NOT EXISTS buses_branch_idx ON buses (branch_id)",
    "CREATE TABLE IF NOT EXISTS inventory_items (
        id uuid PRIMARY KEY,
        branch_id uuid NOT NULL,
        current_stock bigint NOT NULL,
        min_quantity bigint NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS inventory_branch_idx ON inventory_items (branch_id)",
    "CREATE TABLE IF NOT EXISTS purchase_entries (
        id uuid PRIMARY KEY,
        branch_id uuid NOT NULL,
        item_id uuid NOT NULL,
        created_at timestamptz NOT NULL,
        doc jsonb NOT NULL
    )",
];

pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

fn encode<T: Serialize>(entity: &T) -> StoreResult<Value> {
    serde_json::to_value(entity).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode<T: DeserializeOwned>(doc: Value) -> StoreResult<T> {
    serde_json::from_value(doc).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Map a unique-index violation to the matching `Duplicate`, pass everything
/// else through.
fn map_write_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let what = match db_err.constraint() {
                Some("institutions_code_key") => "institution code",
                Some("students_admission_key") => "admission number",
                Some("users_email_key") => "email",
                Some("buses_bus_code_key") => "bus id",
                Some("buses_registration_key") => "registration number",
                _ => "unique field",
            };
            return StoreError::duplicate(what);
        }
    }
    StoreError::Sqlx(err)
}

impl PgStore {
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        for statement in MIGRATION {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))?;
        }
        tracing::info!("database schema ready");

        Ok(Self {
            pool,
            query_timeout: Duration::from_millis(config.query_timeout_ms),
        })
    }

    /// Run a read with the per-query timeout. A timed-out read is retried
    /// once; writes never take this path because a retried write that
    /// actually landed would mis-report Conflict on unique keys.
    async fn read<T, F, Fut>(&self, query: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, query()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!("storage read timed out, retrying once");
                match tokio::time::timeout(self.query_timeout, query()).await {
                    Ok(result) => Ok(result?),
                    Err(_) => Err(StoreError::Timeout),
                }
            }
        }
    }

    async fn write<T, Fut>(&self, query: Fut) -> StoreResult<T>
    where
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(map_write_err),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn fetch_doc<T: DeserializeOwned>(
        &self,
        sql: &str,
        id: Uuid,
        what: &str,
    ) -> StoreResult<T> {
        let doc: Option<Value> = self
            .read(|| {
                sqlx::query_scalar(sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
            })
            .await?;
        match doc {
            Some(doc) => decode(doc),
            None => Err(StoreError::not_found(what)),
        }
    }

    async fn fetch_docs<T: DeserializeOwned>(
        &self,
        sql: &str,
        bind: Uuid,
    ) -> StoreResult<Vec<T>> {
        let docs: Vec<Value> = self
            .read(|| sqlx::query_scalar(sql).bind(bind).fetch_all(&self.pool))
            .await?;
        docs.into_iter().map(decode).collect()
    }

    /// Whole-record update under a row lock: lock, apply, write back.
    async fn update_doc<T, F>(
        &self,
        table: &str,
        id: Uuid,
        what: &str,
        apply: F,
    ) -> StoreResult<T>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T),
    {
        let mut tx = self.pool.begin().await?;
        let doc: Option<Value> =
            sqlx::query_scalar(&format!("SELECT doc FROM {} WHERE id = $1 FOR UPDATE", table))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found(what));
        };
        let mut entity: T = decode(doc)?;
        apply(&mut entity);
        sqlx::query(&format!("UPDATE {} SET doc = $2 WHERE id = $1", table))
            .bind(id)
            .bind(encode(&entity)?)
            .execute(&mut *tx)
            .await
            .map_err(map_write_err)?;
        tx.commit().await?;
        Ok(entity)
    }

    async fn count(&self, sql: &str, bind: Uuid) -> StoreResult<u64> {
        let count: i64 = self
            .read(|| sqlx::query_scalar(sql).bind(bind).fetch_one(&self.pool))
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read(|| {
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool)
        })
        .await?;
        Ok(())
    }

    // ---- Institutions ----

    async fn create_institution(&self, input: NewInstitution) -> StoreResult<Institution> {
        let institution = Institution::new(input);
        let doc = encode(&institution)?;
        self.write(
            sqlx::query(
                "INSERT INTO institutions (id, code, max_branches, created_at, doc)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(institution.id)
            .bind(&institution.code)
            .bind(institution.max_branches)
            .bind(institution.created_at)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(institution)
    }

    async fn list_institutions(&self) -> StoreResult<Vec<Institution>> {
        let docs: Vec<Value> = self
            .read(|| {
                sqlx::query_scalar("SELECT doc FROM institutions ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
            })
            .await?;
        docs.into_iter().map(decode).collect()
    }

    async fn get_institution(&self, id: Uuid) -> StoreResult<Institution> {
        self.fetch_doc("SELECT doc FROM institutions WHERE id = $1", id, "institution")
            .await
    }

    async fn update_institution(
        &self,
        id: Uuid,
        update: InstitutionUpdate,
    ) -> StoreResult<Institution> {
        let mut tx = self.pool.begin().await?;
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM institutions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found("institution"));
        };
        let mut institution: Institution = decode(doc)?;
        institution.apply(update);
        // The mirrored limit column moves with the document; the branch-limit
        // insert must never see one without the other.
        sqlx::query("UPDATE institutions SET max_branches = $2, doc = $3 WHERE id = $1")
            .bind(id)
            .bind(institution.max_branches)
            .bind(encode(&institution)?)
            .execute(&mut *tx)
            .await
            .map_err(map_write_err)?;
        tx.commit().await?;
        Ok(institution)
    }

    async fn delete_institution(&self, id: Uuid) -> StoreResult<Orphans> {
        let deleted = self
            .write(
                sqlx::query("DELETE FROM institutions WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("institution"));
        }
        Ok(Orphans {
            branches: self
                .count("SELECT count(*) FROM branches WHERE institution_id = $1", id)
                .await?,
            students: self
                .count("SELECT count(*) FROM students WHERE institution_id = $1", id)
                .await?,
            buses: self
                .count(
                    "SELECT count(*) FROM buses WHERE (doc->>'institution_id')::uuid = $1",
                    id,
                )
                .await?,
            fee_payments: self
                .count("SELECT count(*) FROM fee_payments WHERE institution_id = $1", id)
                .await?,
            users: self
                .count("SELECT count(*) FROM users WHERE institution_id = $1", id)
                .await?,
            ..Default::default()
        })
    }

    // ---- Branches ----

    async fn create_branch(&self, input: NewBranch) -> StoreResult<Branch> {
        // Existence first so a missing institution is NotFound, not a
        // silently failed insert.
        self.get_institution(input.institution_id).await?;

        let branch = Branch::new(input);
        let doc = encode(&branch)?;
        // The limit check happens inside the insert so two concurrent
        // creates cannot both slip under max_branches.
        let inserted = self
            .write(
                sqlx::query(
                    "INSERT INTO branches (id, institution_id, created_at, doc)
                     SELECT $1, $2, $3, $4
                     WHERE (SELECT count(*) FROM branches WHERE institution_id = $2)
                         < (SELECT max_branches FROM institutions WHERE id = $2)",
                )
                .bind(branch.id)
                .bind(branch.institution_id)
                .bind(branch.created_at)
                .bind(doc)
                .execute(&self.pool),
            )
            .await?;
        if inserted.rows_affected() == 0 {
            // Zero rows also happens when the institution was deleted between
            // the existence check and the insert; disambiguate before
            // reporting the limit.
            self.get_institution(branch.institution_id).await?;
            return Err(StoreError::BranchLimit);
        }
        Ok(branch)
    }

    async fn get_branch(&self, id: Uuid) -> StoreResult<Branch> {
        self.fetch_doc("SELECT doc FROM branches WHERE id = $1", id, "branch")
            .await
    }

    async fn update_branch(&self, id: Uuid, update: BranchUpdate) -> StoreResult<Branch> {
        self.update_doc::<Branch, _>("branches", id, "branch", |b| b.apply(update))
            .await
    }

    async fn delete_branch(&self, id: Uuid) -> StoreResult<Orphans> {
        let deleted = self
            .write(
                sqlx::query("DELETE FROM branches WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("branch"));
        }
        Ok(Orphans {
            students: self
                .count("SELECT count(*) FROM students WHERE branch_id = $1", id)
                .await?,
            buses: self
                .count("SELECT count(*) FROM buses WHERE branch_id = $1", id)
                .await?,
            fee_payments: self
                .count("SELECT count(*) FROM fee_payments WHERE branch_id = $1", id)
                .await?,
            users: self
                .count("SELECT count(*) FROM users WHERE branch_id = $1", id)
                .await?,
            inventory_items: self
                .count("SELECT count(*) FROM inventory_items WHERE branch_id = $1", id)
                .await?,
            ..Default::default()
        })
    }

    async fn list_branches(&self, institution_id: Uuid) -> StoreResult<Vec<Branch>> {
        self.get_institution(institution_id).await?;
        self.fetch_docs(
            "SELECT doc FROM branches WHERE institution_id = $1 ORDER BY doc->>'branch_name'",
            institution_id,
        )
        .await
    }

    // ---- Students ----

    async fn create_student(&self, input: NewStudent) -> StoreResult<Student> {
        let branch = self.get_branch(input.branch_id).await?;
        let student = Student::new(input, branch.institution_id);
        let doc = encode(&student)?;
        self.write(
            sqlx::query(
                "INSERT INTO students
                     (id, institution_id, branch_id, admission_number, name_norm, phone_no,
                      created_at, doc)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(student.id)
            .bind(student.institution_id)
            .bind(student.branch_id)
            .bind(&student.admission_number)
            .bind(normalized_name(&student.name))
            .bind(student.phone_no.as_deref().map(str::trim))
            .bind(student.created_at)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> StoreResult<Student> {
        self.fetch_doc("SELECT doc FROM students WHERE id = $1", id, "student")
            .await
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> StoreResult<Student> {
        let mut tx = self.pool.begin().await?;
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM students WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found("student"));
        };
        let mut student: Student = decode(doc)?;
        student.apply(update);
        // Name and phone mirrors feed parent verification and payment
        // matching; they move with the document in one transaction.
        sqlx::query(
            "UPDATE students SET name_norm = $2, phone_no = $3, doc = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(normalized_name(&student.name))
        .bind(student.phone_no.as_deref().map(str::trim))
        .bind(encode(&student)?)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;
        tx.commit().await?;
        Ok(student)
    }

    async fn list_students(&self, branch_id: Uuid) -> StoreResult<Vec<Student>> {
        self.fetch_docs(
            "SELECT doc FROM students WHERE branch_id = $1 ORDER BY admission_number",
            branch_id,
        )
        .await
    }

    async fn add_exam(&self, student_id: Uuid, exam: Exam) -> StoreResult<Student> {
        self.update_doc::<Student, _>("students", student_id, "student", |s| {
            s.exams.push(exam);
            s.updated_at = Utc::now();
        })
        .await
    }

    async fn set_attendance(
        &self,
        student_id: Uuid,
        attendance: Attendance,
    ) -> StoreResult<Student> {
        self.update_doc::<Student, _>("students", student_id, "student", |s| {
            s.attendance = Some(attendance);
            s.updated_at = Utc::now();
        })
        .await
    }

    async fn find_student_by_name_phone(
        &self,
        name: &str,
        phone: &str,
    ) -> StoreResult<Option<Student>> {
        let name_norm = normalized_name(name);
        let phone = phone.trim().to_string();
        let doc: Option<Value> = self
            .read(|| {
                sqlx::query_scalar(
                    "SELECT doc FROM students
                     WHERE name_norm = $1 AND phone_no = $2
                     ORDER BY created_at
                     LIMIT 1",
                )
                .bind(&name_norm)
                .bind(&phone)
                .fetch_optional(&self.pool)
            })
            .await?;
        doc.map(decode).transpose()
    }

    // ---- Fee payments ----

    async fn record_payment(&self, input: NewFeePayment) -> StoreResult<FeePayment> {
        let branch = self.get_branch(input.branch_id).await?;
        let payment = FeePayment::new(input, branch.institution_id);
        let doc = encode(&payment)?;
        self.write(
            sqlx::query(
                "INSERT INTO fee_payments
                     (id, institution_id, branch_id, student_name_norm, amount, created_at, doc)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(payment.id)
            .bind(payment.institution_id)
            .bind(payment.branch_id)
            .bind(normalized_name(&payment.student_name))
            .bind(payment.amount)
            .bind(payment.date)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(payment)
    }

    async fn list_payments(&self, branch_id: Uuid) -> StoreResult<Vec<FeePayment>> {
        self.fetch_docs(
            "SELECT doc FROM fee_payments WHERE branch_id = $1 ORDER BY created_at",
            branch_id,
        )
        .await
    }

    async fn payments_for_student(
        &self,
        branch_id: Uuid,
        student_name: &str,
    ) -> StoreResult<Vec<FeePayment>> {
        let name_norm = normalized_name(student_name);
        let docs: Vec<Value> = self
            .read(|| {
                sqlx::query_scalar(
                    "SELECT doc FROM fee_payments
                     WHERE branch_id = $1 AND student_name_norm = $2
                     ORDER BY created_at",
                )
                .bind(branch_id)
                .bind(&name_norm)
                .fetch_all(&self.pool)
            })
            .await?;
        docs.into_iter().map(decode).collect()
    }

    // ---- Users ----

    async fn create_user(&self, input: NewUser, password_hash: String) -> StoreResult<User> {
        let mut user = User::new(input);
        user.password_hash = Some(password_hash);
        // The doc keeps the hash; the serializer skips it on the way out.
        let mut doc = encode(&user)?;
        doc["password_hash"] = json!(user.password_hash);
        self.write(
            sqlx::query(
                "INSERT INTO users
                     (id, email_lower, role, institution_id, branch_id, created_at, doc)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(user.id)
            .bind(user.email.to_lowercase())
            .bind(role_str(user.role))
            .bind(user.institution_id)
            .bind(user.branch_id)
            .bind(user.created_at)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        self.fetch_doc("SELECT doc FROM users WHERE id = $1", id, "user").await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email_lower = email.to_lowercase();
        let doc: Option<Value> = self
            .read(|| {
                sqlx::query_scalar("SELECT doc FROM users WHERE email_lower = $1")
                    .bind(&email_lower)
                    .fetch_optional(&self.pool)
            })
            .await?;
        doc.map(decode).transpose()
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found("user"));
        };
        let mut user: User = decode(doc)?;
        user.apply(update);
        let mut new_doc = encode(&user)?;
        new_doc["password_hash"] = json!(user.password_hash);
        sqlx::query(
            "UPDATE users SET email_lower = $2, institution_id = $3, doc = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(user.email.to_lowercase())
        .bind(user.institution_id)
        .bind(new_doc)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;
        tx.commit().await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let deleted = self
            .write(
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("user"));
        }
        Ok(())
    }

    async fn list_institution_admins(&self) -> StoreResult<Vec<User>> {
        let docs: Vec<Value> = self
            .read(|| {
                sqlx::query_scalar(
                    "SELECT doc FROM users WHERE role = 'institution_admin'
                     ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
            })
            .await?;
        docs.into_iter().map(decode).collect()
    }

    async fn list_staff(&self, branch_id: Uuid) -> StoreResult<Vec<User>> {
        self.fetch_docs(
            "SELECT doc FROM users WHERE role = 'staff' AND branch_id = $1
             ORDER BY doc->>'name'",
            branch_id,
        )
        .await
    }

    // ---- Buses ----

    async fn create_bus(&self, input: NewBus) -> StoreResult<Bus> {
        let branch = self.get_branch(input.branch_id).await?;
        let bus = Bus::new(input, branch.institution_id);
        let doc = encode(&bus)?;
        self.write(
            sqlx::query(
                "INSERT INTO buses
                     (id, branch_id, bus_code, registration_number, operational_status,
                      is_active, created_at, doc)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(bus.id)
            .bind(bus.branch_id)
            .bind(&bus.bus_id)
            .bind(&bus.registration_number)
            .bind(bus.operational_status.as_str())
            .bind(bus.is_active)
            .bind(bus.created_at)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(bus)
    }

    async fn get_bus(&self, id: Uuid) -> StoreResult<Bus> {
        self.fetch_doc("SELECT doc FROM buses WHERE id = $1", id, "bus").await
    }

    async fn list_active_buses(&self, branch_id: Uuid) -> StoreResult<Vec<Bus>> {
        self.fetch_docs(
            "SELECT doc FROM buses WHERE branch_id = $1 AND is_active ORDER BY bus_code",
            branch_id,
        )
        .await
    }

    async fn update_bus(&self, id: Uuid, update: BusUpdate) -> StoreResult<Bus> {
        let mut tx = self.pool.begin().await?;
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM buses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found("bus"));
        };
        let mut bus: Bus = decode(doc)?;
        bus.apply(update);
        sqlx::query(
            "UPDATE buses SET bus_code = $2, registration_number = $3, doc = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&bus.bus_id)
        .bind(&bus.registration_number)
        .bind(encode(&bus)?)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;
        tx.commit().await?;
        Ok(bus)
    }

    async fn set_bus_driver(&self, id: Uuid, mut driver: DriverInfo) -> StoreResult<Bus> {
        driver.assignment_status = if driver.driver_name.is_some() {
            AssignmentStatus::Assigned
        } else {
            AssignmentStatus::NotAssigned
        };
        // Single-statement sub-object replace: no read-modify-write of the
        // whole document.
        let doc: Option<Value> = self
            .write(
                sqlx::query_scalar(
                    "UPDATE buses
                     SET doc = jsonb_set(doc, '{driver}', $2::jsonb)
                               || jsonb_build_object('updated_at', to_jsonb($3::timestamptz))
                     WHERE id = $1
                     RETURNING doc",
                )
                .bind(id)
                .bind(encode(&driver)?)
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?;
        doc.map(decode).transpose()?.ok_or_else(|| StoreError::not_found("bus"))
    }

    async fn set_bus_route(&self, id: Uuid, route: RouteInfo) -> StoreResult<Bus> {
        let doc: Option<Value> = self
            .write(
                sqlx::query_scalar(
                    "UPDATE buses
                     SET doc = jsonb_set(doc, '{route}', $2::jsonb)
                               || jsonb_build_object('updated_at', to_jsonb($3::timestamptz))
                     WHERE id = $1
                     RETURNING doc",
                )
                .bind(id)
                .bind(encode(&route)?)
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?;
        doc.map(decode).transpose()?.ok_or_else(|| StoreError::not_found("bus"))
    }

    async fn merge_bus_maintenance(
        &self,
        id: Uuid,
        maintenance: MaintenanceInfo,
    ) -> StoreResult<Bus> {
        let mut patch = serde_json::Map::new();
        if let Some(v) = maintenance.last_service_date {
            patch.insert("last_service_date".into(), json!(v));
        }
        if let Some(v) = maintenance.next_service_due {
            patch.insert("next_service_due".into(), json!(v));
        }
        if let Some(v) = maintenance.odometer_km {
            patch.insert("odometer_km".into(), json!(v));
        }
        if let Some(v) = maintenance.notes {
            patch.insert("notes".into(), json!(v));
        }
        // Server-side jsonb merge keeps concurrent merges to disjoint
        // fields from losing updates.
        let doc: Option<Value> = self
            .write(
                sqlx::query_scalar(
                    "UPDATE buses
                     SET doc = jsonb_set(doc, '{maintenance}',
                                         (doc->'maintenance') || $2::jsonb)
                               || jsonb_build_object('updated_at', to_jsonb($3::timestamptz))
                     WHERE id = $1
                     RETURNING doc",
                )
                .bind(id)
                .bind(Value::Object(patch))
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?;
        doc.map(decode).transpose()?.ok_or_else(|| StoreError::not_found("bus"))
    }

    async fn merge_bus_safety(&self, id: Uuid, safety: SafetyInfo) -> StoreResult<Bus> {
        let mut patch = serde_json::Map::new();
        patch.insert("gps_enabled".into(), json!(safety.gps_enabled));
        patch.insert("camera_installed".into(), json!(safety.camera_installed));
        patch.insert("first_aid_kit".into(), json!(safety.first_aid_kit));
        patch.insert("fire_extinguisher".into(), json!(safety.fire_extinguisher));
        if let Some(v) = safety.insurance_valid_till {
            patch.insert("insurance_valid_till".into(), json!(v));
        }
        if let Some(v) = safety.fitness_valid_till {
            patch.insert("fitness_valid_till".into(), json!(v));
        }
        let doc: Option<Value> = self
            .write(
                sqlx::query_scalar(
                    "UPDATE buses
                     SET doc = jsonb_set(doc, '{safety}', (doc->'safety') || $2::jsonb)
                               || jsonb_build_object('updated_at', to_jsonb($3::timestamptz))
                     WHERE id = $1
                     RETURNING doc",
                )
                .bind(id)
                .bind(Value::Object(patch))
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?;
        doc.map(decode).transpose()?.ok_or_else(|| StoreError::not_found("bus"))
    }

    async fn update_bus_status(&self, id: Uuid, update: StatusUpdate) -> StoreResult<Bus> {
        let mut tx = self.pool.begin().await?;
        let current: Option<String> = sqlx::query_scalar(
            "SELECT operational_status FROM buses WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            return Err(StoreError::not_found("bus"));
        };
        let current: OperationalStatus = serde_json::from_value(json!(current))
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(expected) = update.expected_status {
            if current != expected {
                return Err(StoreError::StaleStatus);
            }
        }

        let mut patch = serde_json::Map::new();
        let next_status = if let Some(next) = update.operational_status {
            if !current.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: current.as_str(),
                    to: next.as_str(),
                });
            }
            patch.insert("operational_status".into(), json!(next));
            next
        } else {
            current
        };
        if let Some(availability) = update.availability {
            patch.insert("availability".into(), json!(availability));
        }
        if let Some(condition) = update.bus_condition {
            patch.insert("bus_condition".into(), json!(condition));
        }
        patch.insert("updated_at".into(), json!(Utc::now()));

        let doc: Value = sqlx::query_scalar(
            "UPDATE buses SET operational_status = $2, doc = doc || $3::jsonb
             WHERE id = $1
             RETURNING doc",
        )
        .bind(id)
        .bind(next_status.as_str())
        .bind(Value::Object(patch))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        decode(doc)
    }

    async fn deactivate_bus(&self, id: Uuid) -> StoreResult<()> {
        let patch = json!({
            "is_active": false,
            "operational_status": OperationalStatus::OutOfService,
            "updated_at": Utc::now(),
        });
        let updated = self
            .write(
                sqlx::query(
                    "UPDATE buses
                     SET is_active = false, operational_status = 'Out of Service',
                         doc = doc || $2::jsonb
                     WHERE id = $1",
                )
                .bind(id)
                .bind(patch)
                .execute(&self.pool),
            )
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::not_found("bus"));
        }
        Ok(())
    }

    // ---- Inventory ----

    async fn create_inventory_item(&self, input: NewInventoryItem) -> StoreResult<InventoryItem> {
        self.get_branch(input.branch_id).await?;
        let item = InventoryItem::new(input);
        let doc = encode(&item)?;
        self.write(
            sqlx::query(
                "INSERT INTO inventory_items
                     (id, branch_id, current_stock, min_quantity, created_at, doc)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.branch_id)
            .bind(item.current_stock)
            .bind(item.min_quantity)
            .bind(item.created_at)
            .bind(doc)
            .execute(&self.pool),
        )
        .await?;
        Ok(item)
    }

    async fn get_inventory_item(&self, id: Uuid) -> StoreResult<InventoryItem> {
        self.fetch_doc(
            "SELECT doc FROM inventory_items WHERE id = $1",
            id,
            "inventory item",
        )
        .await
    }

    async fn list_inventory(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        self.fetch_docs(
            "SELECT doc FROM inventory_items WHERE branch_id = $1 ORDER BY doc->>'name'",
            branch_id,
        )
        .await
    }

    async fn list_low_stock(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        self.fetch_docs(
            "SELECT doc FROM inventory_items
             WHERE branch_id = $1 AND current_stock < min_quantity
             ORDER BY doc->>'name'",
            branch_id,
        )
        .await
    }

    async fn record_purchase(
        &self,
        item_id: Uuid,
        input: NewPurchaseEntry,
    ) -> StoreResult<PurchaseEntry> {
        let mut tx = self.pool.begin().await?;
        // Stock bump is a single server-side increment, transactional with
        // the purchase insert.
        let branch_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE inventory_items
             SET current_stock = current_stock + $2,
                 doc = jsonb_set(doc, '{current_stock}', to_jsonb(current_stock + $2))
                       || jsonb_build_object('updated_at', to_jsonb($3::timestamptz))
             WHERE id = $1
             RETURNING branch_id",
        )
        .bind(item_id)
        .bind(input.quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(branch_id) = branch_id else {
            return Err(StoreError::not_found("inventory item"));
        };

        let entry = PurchaseEntry::new(input, branch_id, item_id);
        sqlx::query(
            "INSERT INTO purchase_entries (id, branch_id, item_id, created_at, doc)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.branch_id)
        .bind(entry.item_id)
        .bind(entry.created_at)
        .bind(encode(&entry)?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    // ---- Reporting ----

    async fn dashboard_totals(&self) -> StoreResult<DashboardTotals> {
        let (institutions, branches, students, fee_collected): (i64, i64, i64, i64) = self
            .read(|| {
                sqlx::query_as(
                    "SELECT (SELECT count(*) FROM institutions),
                            (SELECT count(*) FROM branches),
                            (SELECT count(*) FROM students),
                            (SELECT coalesce(sum(amount), 0) FROM fee_payments)",
                )
                .fetch_one(&self.pool)
            })
            .await?;
        Ok(DashboardTotals {
            institutions: institutions as u64,
            branches: branches as u64,
            students: students as u64,
            fee_collected,
        })
    }

    async fn recent_branches(&self) -> StoreResult<Vec<BranchSummary>> {
        let rows: Vec<(Uuid, String, String)> = self
            .read(|| {
                sqlx::query_as(
                    "SELECT b.id, b.doc->>'branch_name',
                            coalesce(i.doc->>'name', '')
                     FROM branches b
                     LEFT JOIN institutions i ON i.id = b.institution_id
                     ORDER BY b.created_at DESC
                     LIMIT 20",
                )
                .fetch_all(&self.pool)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, institution_name)| BranchSummary { id, name, institution_name })
            .collect())
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::CompanyAdmin => "company_admin",
        Role::InstitutionAdmin => "institution_admin",
        Role::BranchAdmin => "branch_admin",
        Role::Staff => "staff",
        Role::Parent => "parent",
    }
}
