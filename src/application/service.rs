use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    BalanceEntry, Caller, Days, Decision, LeaveBalance, LeavePolicy, LeaveRequest,
    LeaveRequestEntry, LeaveRequestId, LeaveStatus, LeaveType, NewUser, Role, User, UserId,
    UserUpdate,
};
use crate::storage::{DecisionOutcome, Repository};

use super::AppError;

/// Application service for leave accounting, user accounts and attendance.
/// Every operation takes the authenticated `Caller` it runs on behalf of.
pub struct LeaveService {
    pub(super) repo: Repository,
    pub(super) policy: LeavePolicy,
}

impl LeaveService {
    /// Create a new service with the given repository and default allotments.
    pub fn new(repo: Repository, policy: LeavePolicy) -> Self {
        Self { repo, policy }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, LeavePolicy::default()))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, LeavePolicy::default()))
    }

    /// Replace the allotments used when balance rows are created.
    pub fn with_policy(mut self, policy: LeavePolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================
    // Users
    // ========================

    /// Create the first administrator unless the username is already taken.
    pub async fn bootstrap_admin(&self, username: &str, name: &str) -> Result<User, AppError> {
        if let Some(existing) = self.repo.get_user_by_username(username).await? {
            return Ok(existing);
        }

        let user = User::new(username.to_string(), name.to_string(), Role::Admin);
        self.repo.save_user(&user).await?;
        self.repo
            .ensure_balance(user.id, Utc::now().year(), &self.policy)
            .await?;
        info!(username, "bootstrapped admin account");
        Ok(user)
    }

    /// Resolve the caller context for a username.
    pub async fn caller_for(&self, username: &str) -> Result<Caller, AppError> {
        let user = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;
        Ok(user.caller())
    }

    /// Create a user account and grant it this year's default balance.
    pub async fn create_user(&self, caller: &Caller, new_user: NewUser) -> Result<User, AppError> {
        require_admin(caller, "create users")?;

        let username = new_user.username.trim().to_string();
        let name = new_user.name.trim().to_string();
        if username.is_empty() {
            return Err(AppError::InvalidValue("username must not be empty".into()));
        }
        if name.is_empty() {
            return Err(AppError::InvalidValue("name must not be empty".into()));
        }
        if self.repo.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username));
        }

        let mut user = User::new(username, name, new_user.role.unwrap_or(Role::Employee));
        user.apply(&UserUpdate {
            name: None,
            email: new_user.email,
            phone: new_user.phone,
            department: new_user.department,
            position: new_user.position,
        });

        self.repo.save_user(&user).await?;
        self.repo
            .ensure_balance(user.id, Utc::now().year(), &self.policy)
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "created user");
        Ok(user)
    }

    /// Get a user by ID. Non-admins may only read their own account.
    pub async fn get_user(&self, caller: &Caller, id: UserId) -> Result<User, AppError> {
        if !caller.can_view(id) {
            return Err(AppError::Unauthorized(
                "cannot view another user's account".into(),
            ));
        }
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Get a user by username, with the same visibility rules as `get_user`.
    pub async fn find_user(&self, caller: &Caller, username: &str) -> Result<User, AppError> {
        let user = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;
        if !caller.can_view(user.id) {
            return Err(AppError::Unauthorized(
                "cannot view another user's account".into(),
            ));
        }
        Ok(user)
    }

    /// List all users, newest first.
    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<User>, AppError> {
        require_admin(caller, "list users")?;
        Ok(self.repo.list_users().await?)
    }

    /// Update profile fields. Blank fields are left unchanged.
    pub async fn update_user(
        &self,
        caller: &Caller,
        id: UserId,
        update: UserUpdate,
    ) -> Result<User, AppError> {
        let mut user = self.get_user(caller, id).await?;
        user.apply(&update);
        self.repo.update_user(&user).await?;
        debug!(user_id = %user.id, "updated user profile");
        Ok(user)
    }

    // ========================
    // Leave requests
    // ========================

    /// Submit a leave request for the caller.
    ///
    /// The day count is derived from the dates (both ends inclusive) and checked
    /// against the bucket for the year the leave starts in. Nothing is deducted
    /// until the request is approved.
    pub async fn submit_request(
        &self,
        caller: &Caller,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    ) -> Result<LeaveRequest, AppError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::InvalidValue("a reason is required".into()));
        }

        let request = LeaveRequest::new(caller.user_id, leave_type, start_date, end_date, reason)
            .ok_or(AppError::InvalidDateRange {
                start: start_date,
                end: end_date,
            })?;

        if let Some(bucket) = leave_type.bucket() {
            let balance = self
                .repo
                .ensure_balance(caller.user_id, request.balance_year(), &self.policy)
                .await?;
            if !balance.covers(bucket, request.days) {
                return Err(AppError::InsufficientBalance {
                    bucket,
                    available: balance.available(bucket),
                    requested: request.days,
                });
            }
        }

        self.repo.save_leave_request(&request).await?;
        info!(
            request_id = %request.id,
            user_id = %request.user_id,
            leave_type = %request.leave_type,
            days = %request.days,
            "submitted leave request"
        );
        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// Approval re-checks the balance and deducts it in the same transaction as
    /// the status change; if the balance no longer covers the request the
    /// request stays pending.
    pub async fn decide(
        &self,
        caller: &Caller,
        id: LeaveRequestId,
        decision: Decision,
        remark: Option<String>,
    ) -> Result<LeaveRequest, AppError> {
        require_approver(caller)?;

        let request = self
            .repo
            .get_leave_request(id)
            .await?
            .ok_or_else(|| AppError::LeaveRequestNotFound(id.to_string()))?;

        if !request.is_pending() {
            return Err(AppError::NotPending {
                id: id.to_string(),
                status: request.status,
            });
        }

        let remark = remark
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let outcome = self
            .repo
            .decide_leave_request(&request, decision, caller.user_id, remark, &self.policy)
            .await?;

        match outcome {
            DecisionOutcome::Applied(decided) => {
                info!(
                    request_id = %decided.id,
                    approver_id = %caller.user_id,
                    status = %decided.status,
                    days = %decided.days,
                    "decided leave request"
                );
                Ok(decided)
            }
            DecisionOutcome::NotPending(status) => Err(AppError::NotPending {
                id: id.to_string(),
                status,
            }),
            DecisionOutcome::InsufficientBalance { bucket, available } => {
                warn!(
                    request_id = %id,
                    bucket = %bucket,
                    available = %available,
                    requested = %request.days,
                    "approval refused, balance no longer covers request"
                );
                Err(AppError::InsufficientBalance {
                    bucket,
                    available,
                    requested: request.days,
                })
            }
        }
    }

    /// Get a request. Visible to its owner and to approvers.
    pub async fn get_request(
        &self,
        caller: &Caller,
        id: LeaveRequestId,
    ) -> Result<LeaveRequest, AppError> {
        let request = self
            .repo
            .get_leave_request(id)
            .await?
            .ok_or_else(|| AppError::LeaveRequestNotFound(id.to_string()))?;

        if request.user_id != caller.user_id && !caller.can_approve() {
            return Err(AppError::Unauthorized(
                "cannot view another user's leave request".into(),
            ));
        }
        Ok(request)
    }

    /// The caller's own requests, newest first.
    pub async fn list_my_requests(
        &self,
        caller: &Caller,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self
            .repo
            .list_leave_requests_for_user(caller.user_id, status)
            .await?)
    }

    /// Every request with requester details, newest first.
    pub async fn list_all_requests(
        &self,
        caller: &Caller,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequestEntry>, AppError> {
        require_approver(caller)?;
        Ok(self.repo.list_leave_requests(status).await?)
    }

    // ========================
    // Balances
    // ========================

    /// The caller's balance for `year`, created with default allotments on first access.
    pub async fn get_my_balance(&self, caller: &Caller, year: i32) -> Result<LeaveBalance, AppError> {
        Ok(self
            .repo
            .ensure_balance(caller.user_id, year, &self.policy)
            .await?)
    }

    /// A user's balance for `year`. Non-admins may only read their own.
    pub async fn get_balance(
        &self,
        caller: &Caller,
        user_id: UserId,
        year: i32,
    ) -> Result<LeaveBalance, AppError> {
        let user = self.get_user(caller, user_id).await?;
        Ok(self
            .repo
            .ensure_balance(user.id, year, &self.policy)
            .await?)
    }

    /// All balances for `year` with owner details.
    pub async fn list_balances(
        &self,
        caller: &Caller,
        year: i32,
    ) -> Result<Vec<BalanceEntry>, AppError> {
        require_admin(caller, "list balances")?;
        Ok(self.repo.list_balances(year).await?)
    }

    /// Overwrite a user's three buckets for `year`.
    pub async fn adjust_balance(
        &self,
        caller: &Caller,
        user_id: UserId,
        year: i32,
        annual_leave: Days,
        sick_leave: Days,
        personal_leave: Days,
    ) -> Result<LeaveBalance, AppError> {
        require_admin(caller, "adjust balances")?;

        for (name, value) in [
            ("annual_leave", annual_leave),
            ("sick_leave", sick_leave),
            ("personal_leave", personal_leave),
        ] {
            if value.is_negative() {
                return Err(AppError::InvalidValue(format!(
                    "{} must not be negative (got {})",
                    name, value
                )));
            }
        }

        if self.repo.get_user(user_id).await?.is_none() {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        let balance = self
            .repo
            .set_balance(user_id, year, annual_leave, sick_leave, personal_leave)
            .await?;

        info!(
            user_id = %user_id,
            year,
            annual = %annual_leave,
            sick = %sick_leave,
            personal = %personal_leave,
            admin_id = %caller.user_id,
            "adjusted leave balance"
        );
        Ok(balance)
    }

    /// Create default balances for every user without one for `year`.
    /// Existing rows are left alone. Returns the number of rows created.
    pub async fn initialize_year(&self, caller: &Caller, year: i32) -> Result<u64, AppError> {
        require_admin(caller, "initialize balances")?;
        let created = self.repo.create_missing_balances(year, &self.policy).await?;
        info!(year, created, "initialized leave balances");
        Ok(created)
    }
}

pub(super) fn require_admin(caller: &Caller, action: &str) -> Result<(), AppError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!("only admins may {}", action)))
    }
}

fn require_approver(caller: &Caller) -> Result<(), AppError> {
    if caller.can_approve() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "approval authority (manager or admin) required".into(),
        ))
    }
}
