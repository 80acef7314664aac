use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    AttendanceEntry, AttendanceRecord, BalanceEntry, Bucket, Days, Decision, LeaveBalance,
    LeavePolicy, LeaveRequest, LeaveRequestEntry, LeaveRequestId, LeaveStatus, LeaveType, Role,
    User, UserId,
};

use super::MIGRATION_001_INITIAL;

const DATE_FORMAT: &str = "%Y-%m-%d";

const USER_COLUMNS: &str =
    "id, username, name, email, phone, role, department, position, created_at, updated_at";

const BALANCE_COLUMNS: &str = "id, user_id, year, annual_half_days, sick_half_days, personal_half_days, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, half_days, reason, status, approver_id, remark, decided_at, created_at, updated_at";

const ATTENDANCE_COLUMNS: &str = "id, user_id, work_date, check_in_time, check_out_time, check_in_location, check_out_location, created_at";

/// Result of attempting to decide a leave request inside one transaction.
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    /// Status transition (and deduction, for approvals) committed.
    Applied(LeaveRequest),
    /// The request had already left `pending`; nothing was written.
    NotPending(LeaveStatus),
    /// The bucket no longer covers the request; nothing was written.
    InsufficientBalance { bucket: Bucket, available: Days },
}

/// Result of recording a check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutOutcome {
    Recorded,
    NotCheckedIn,
    AlreadyCheckedOut,
}

/// Repository for persisting and querying users, leave and attendance.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user to the database.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, name, email, phone, role, department, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.department)
        .bind(&user.position)
        .bind(timestamp(user.created_at))
        .bind(timestamp(user.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Persist profile changes for an existing user.
    pub async fn update_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, email = ?, phone = ?, department = ?, position = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.department)
        .bind(&user.position)
        .bind(timestamp(user.updated_at))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by username")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// List all users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let role_str: String = row.get("role");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid role: {}", role_str))?,
            department: row.get("department"),
            position: row.get("position"),
            created_at: parse_timestamp(row.get("created_at"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
        })
    }

    // ========================
    // Balance operations
    // ========================

    /// Get the balance row for a user and year.
    pub async fn get_balance(&self, user_id: UserId, year: i32) -> Result<Option<LeaveBalance>> {
        let row = sqlx::query(&format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE user_id = ? AND year = ?"
        ))
        .bind(user_id.to_string())
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch leave balance")?;

        row.as_ref().map(Self::row_to_balance).transpose()
    }

    /// Insert a default balance row unless one already exists, then return the stored row.
    pub async fn ensure_balance(
        &self,
        user_id: UserId,
        year: i32,
        policy: &LeavePolicy,
    ) -> Result<LeaveBalance> {
        let balance = LeaveBalance::new(user_id, year, policy);
        Self::insert_balance_if_missing(&self.pool, &balance).await?;

        self.get_balance(user_id, year)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Leave balance missing after insert"))
    }

    /// Create policy-default rows for every user without one for `year`.
    /// Returns how many rows were created.
    pub async fn create_missing_balances(&self, year: i32, policy: &LeavePolicy) -> Result<u64> {
        let user_ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE id NOT IN (SELECT user_id FROM leave_balances WHERE year = ?)
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find users without balances")?;

        // Each insert is idempotent on (user_id, year), so a concurrent
        // lazy initialization just makes the count smaller.
        let mut created = 0;
        for id_str in user_ids {
            let user_id = Uuid::parse_str(&id_str).context("Invalid user ID")?;
            let balance = LeaveBalance::new(user_id, year, policy);
            created += Self::insert_balance_if_missing(&self.pool, &balance).await?;
        }

        Ok(created)
    }

    async fn insert_balance_if_missing<'e, E>(executor: E, balance: &LeaveBalance) -> Result<u64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_balances (id, user_id, year, annual_half_days, sick_half_days, personal_half_days, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, year) DO NOTHING
            "#,
        )
        .bind(balance.id.to_string())
        .bind(balance.user_id.to_string())
        .bind(balance.year)
        .bind(balance.annual_leave.half_days())
        .bind(balance.sick_leave.half_days())
        .bind(balance.personal_leave.half_days())
        .bind(timestamp(balance.created_at))
        .bind(timestamp(balance.updated_at))
        .execute(executor)
        .await
        .context("Failed to insert leave balance")?;

        Ok(result.rows_affected())
    }

    /// Overwrite all three buckets for a user and year, creating the row if needed.
    pub async fn set_balance(
        &self,
        user_id: UserId,
        year: i32,
        annual: Days,
        sick: Days,
        personal: Days,
    ) -> Result<LeaveBalance> {
        let now = timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO leave_balances (id, user_id, year, annual_half_days, sick_half_days, personal_half_days, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, year) DO UPDATE SET
                annual_half_days = excluded.annual_half_days,
                sick_half_days = excluded.sick_half_days,
                personal_half_days = excluded.personal_half_days,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(year)
        .bind(annual.half_days())
        .bind(sick.half_days())
        .bind(personal.half_days())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to set leave balance")?;

        self.get_balance(user_id, year)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Leave balance missing after update"))
    }

    /// List balances for a year with owner details, ordered by department then name.
    pub async fn list_balances(&self, year: i32) -> Result<Vec<BalanceEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.year, b.annual_half_days, b.sick_half_days, b.personal_half_days,
                   b.created_at, b.updated_at,
                   u.name AS user_name, u.department AS user_department, u.position AS user_position
            FROM leave_balances b
            JOIN users u ON u.id = b.user_id
            WHERE b.year = ?
            ORDER BY u.department, u.name
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list leave balances")?;

        rows.iter()
            .map(|row| {
                Ok(BalanceEntry {
                    balance: Self::row_to_balance(row)?,
                    user_name: row.get("user_name"),
                    user_department: row.get("user_department"),
                    user_position: row.get("user_position"),
                })
            })
            .collect()
    }

    fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveBalance> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");

        Ok(LeaveBalance {
            id: Uuid::parse_str(&id_str).context("Invalid balance ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            year: row.get("year"),
            annual_leave: Days::from_half_days(row.get("annual_half_days")),
            sick_leave: Days::from_half_days(row.get("sick_half_days")),
            personal_leave: Days::from_half_days(row.get("personal_half_days")),
            created_at: parse_timestamp(row.get("created_at"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
        })
    }

    // ========================
    // Leave request operations
    // ========================

    /// Save a new leave request to the database.
    pub async fn save_leave_request(&self, request: &LeaveRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_requests (id, user_id, leave_type, start_date, end_date, half_days, reason, status, approver_id, remark, decided_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.user_id.to_string())
        .bind(request.leave_type.as_str())
        .bind(request.start_date.format(DATE_FORMAT).to_string())
        .bind(request.end_date.format(DATE_FORMAT).to_string())
        .bind(request.days.half_days())
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.approver_id.map(|id| id.to_string()))
        .bind(&request.remark)
        .bind(request.decided_at.map(timestamp))
        .bind(timestamp(request.created_at))
        .bind(timestamp(request.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save leave request")?;
        Ok(())
    }

    /// Get a leave request by ID.
    pub async fn get_leave_request(&self, id: LeaveRequestId) -> Result<Option<LeaveRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch leave request")?;

        row.as_ref().map(Self::row_to_leave_request).transpose()
    }

    /// List one user's requests, newest first, optionally filtered by status.
    pub async fn list_leave_requests_for_user(
        &self,
        user_id: UserId,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>> {
        let mut query = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE user_id = ?");
        if status.is_some() {
            query.push_str(" AND status = ?");
        }
        query.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut sql_query = sqlx::query(&query).bind(user_id.to_string());
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list leave requests")?;

        rows.iter().map(Self::row_to_leave_request).collect()
    }

    /// List every request with requester details, newest first, optionally filtered by status.
    pub async fn list_leave_requests(
        &self,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequestEntry>> {
        let mut query = String::from(
            r#"
            SELECT l.id, l.user_id, l.leave_type, l.start_date, l.end_date, l.half_days, l.reason,
                   l.status, l.approver_id, l.remark, l.decided_at, l.created_at, l.updated_at,
                   u.name AS user_name, u.department AS user_department
            FROM leave_requests l
            JOIN users u ON u.id = l.user_id
            "#,
        );
        if status.is_some() {
            query.push_str(" WHERE l.status = ?");
        }
        query.push_str(" ORDER BY l.created_at DESC, l.rowid DESC");

        let mut sql_query = sqlx::query(&query);
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list all leave requests")?;

        rows.iter()
            .map(|row| {
                Ok(LeaveRequestEntry {
                    request: Self::row_to_leave_request(row)?,
                    user_name: row.get("user_name"),
                    user_department: row.get("user_department"),
                })
            })
            .collect()
    }

    /// Move a pending request to its terminal status, deducting the balance for approvals.
    ///
    /// Both writes share one transaction. Its first statement is the conditional status
    /// update, so the transaction takes SQLite's write lock before reading anything and
    /// concurrent decisions queue behind it instead of racing past the balance check.
    pub async fn decide_leave_request(
        &self,
        request: &LeaveRequest,
        decision: Decision,
        approver_id: UserId,
        remark: Option<String>,
        policy: &LeavePolicy,
    ) -> Result<DecisionOutcome> {
        let decided_at = Utc::now();
        let status = decision.status();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approver_id = ?, remark = ?, decided_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(approver_id.to_string())
        .bind(&remark)
        .bind(timestamp(decided_at))
        .bind(timestamp(decided_at))
        .bind(request.id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update leave request status")?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back decision")?;
            let current = self
                .get_leave_request(request.id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Leave request {} disappeared", request.id))?;
            return Ok(DecisionOutcome::NotPending(current.status));
        }

        if let (Decision::Approved, Some(bucket)) = (decision, request.leave_type.bucket()) {
            let year = request.balance_year();
            let column = bucket_column(bucket);

            let balance = LeaveBalance::new(request.user_id, year, policy);
            Self::insert_balance_if_missing(&mut *tx, &balance).await?;

            let deducted = sqlx::query(&format!(
                r#"
                UPDATE leave_balances
                SET {column} = {column} - ?, updated_at = ?
                WHERE user_id = ? AND year = ? AND {column} >= ?
                "#
            ))
            .bind(request.days.half_days())
            .bind(timestamp(decided_at))
            .bind(request.user_id.to_string())
            .bind(year)
            .bind(request.days.half_days())
            .execute(&mut *tx)
            .await
            .context("Failed to deduct leave balance")?;

            if deducted.rows_affected() == 0 {
                let available: i64 = sqlx::query_scalar(&format!(
                    "SELECT {column} FROM leave_balances WHERE user_id = ? AND year = ?"
                ))
                .bind(request.user_id.to_string())
                .bind(year)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to read leave balance")?;

                tx.rollback().await.context("Failed to roll back decision")?;
                return Ok(DecisionOutcome::InsufficientBalance {
                    bucket,
                    available: Days::from_half_days(available),
                });
            }
        }

        tx.commit().await.context("Failed to commit decision")?;

        let mut decided = request.clone();
        decided.status = status;
        decided.approver_id = Some(approver_id);
        decided.remark = remark;
        decided.decided_at = Some(decided_at);
        decided.updated_at = decided_at;
        Ok(DecisionOutcome::Applied(decided))
    }

    fn row_to_leave_request(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveRequest> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let leave_type_str: String = row.get("leave_type");
        let status_str: String = row.get("status");
        let approver_id_str: Option<String> = row.get("approver_id");
        let decided_at_str: Option<String> = row.get("decided_at");

        Ok(LeaveRequest {
            id: Uuid::parse_str(&id_str).context("Invalid leave request ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            leave_type: LeaveType::from_str(&leave_type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid leave type: {}", leave_type_str))?,
            start_date: parse_date(row.get("start_date"))?,
            end_date: parse_date(row.get("end_date"))?,
            days: Days::from_half_days(row.get("half_days")),
            reason: row.get("reason"),
            status: LeaveStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid leave status: {}", status_str))?,
            approver_id: approver_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid approver ID")?,
            remark: row.get("remark"),
            decided_at: decided_at_str.map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(row.get("created_at"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
        })
    }

    // ========================
    // Attendance operations
    // ========================

    /// Insert a check-in. Returns false if the user already has a record for that day.
    pub async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (id, user_id, work_date, check_in_time, check_out_time, check_in_location, check_out_location, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, work_date) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.work_date.format(DATE_FORMAT).to_string())
        .bind(timestamp(record.check_in_time))
        .bind(record.check_out_time.map(timestamp))
        .bind(&record.check_in_location)
        .bind(&record.check_out_location)
        .bind(timestamp(record.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save attendance record")?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the check-out for a user's day, at most once.
    pub async fn record_check_out(
        &self,
        user_id: UserId,
        work_date: NaiveDate,
        at: DateTime<Utc>,
        location: Option<&str>,
    ) -> Result<CheckOutOutcome> {
        let work_date_str = work_date.format(DATE_FORMAT).to_string();

        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_time = ?, check_out_location = ?
            WHERE user_id = ? AND work_date = ? AND check_out_time IS NULL
            "#,
        )
        .bind(timestamp(at))
        .bind(location)
        .bind(user_id.to_string())
        .bind(&work_date_str)
        .execute(&self.pool)
        .await
        .context("Failed to record check-out")?;

        if result.rows_affected() > 0 {
            return Ok(CheckOutOutcome::Recorded);
        }

        match self.get_attendance_for_day(user_id, work_date).await? {
            Some(_) => Ok(CheckOutOutcome::AlreadyCheckedOut),
            None => Ok(CheckOutOutcome::NotCheckedIn),
        }
    }

    /// Get a user's record for a given day.
    pub async fn get_attendance_for_day(
        &self,
        user_id: UserId,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = ? AND work_date = ?"
        ))
        .bind(user_id.to_string())
        .bind(work_date.format(DATE_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch attendance record")?;

        row.as_ref().map(Self::row_to_attendance).transpose()
    }

    /// List records within an inclusive date range, newest first, optionally for one user.
    pub async fn list_attendance(
        &self,
        user_id: Option<UserId>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceEntry>> {
        let mut query = String::from(
            r#"
            SELECT a.id, a.user_id, a.work_date, a.check_in_time, a.check_out_time,
                   a.check_in_location, a.check_out_location, a.created_at,
                   u.name AS user_name, u.department AS user_department
            FROM attendance_records a
            JOIN users u ON u.id = a.user_id
            WHERE a.work_date BETWEEN ? AND ?
            "#,
        );
        if user_id.is_some() {
            query.push_str(" AND a.user_id = ?");
        }
        query.push_str(" ORDER BY a.check_in_time DESC");

        let mut sql_query = sqlx::query(&query)
            .bind(from.format(DATE_FORMAT).to_string())
            .bind(to.format(DATE_FORMAT).to_string());
        if let Some(id) = user_id {
            sql_query = sql_query.bind(id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list attendance records")?;

        rows.iter()
            .map(|row| {
                Ok(AttendanceEntry {
                    record: Self::row_to_attendance(row)?,
                    user_name: row.get("user_name"),
                    user_department: row.get("user_department"),
                })
            })
            .collect()
    }

    fn row_to_attendance(row: &sqlx::sqlite::SqliteRow) -> Result<AttendanceRecord> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let check_out_str: Option<String> = row.get("check_out_time");

        Ok(AttendanceRecord {
            id: Uuid::parse_str(&id_str).context("Invalid attendance ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            work_date: parse_date(row.get("work_date"))?,
            check_in_time: parse_timestamp(row.get("check_in_time"))?,
            check_out_time: check_out_str.map(parse_timestamp).transpose()?,
            check_in_location: row.get("check_in_location"),
            check_out_location: row.get("check_out_location"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }
}

/// Column holding a bucket's balance. Only these fixed names are ever interpolated into SQL.
fn bucket_column(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Annual => "annual_half_days",
        Bucket::Sick => "sick_half_days",
        Bucket::Personal => "personal_half_days",
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}

fn parse_date(value: String) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).with_context(|| format!("Invalid date: {}", value))
}
