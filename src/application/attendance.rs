use chrono::{DateTime, Months, NaiveDate, Utc};
use tracing::info;

use crate::domain::{AttendanceEntry, AttendanceRecord, Caller, TodayStatus};
use crate::storage::CheckOutOutcome;

use super::service::require_admin;
use super::{AppError, LeaveService};

/// Inclusive date range for attendance queries.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// The month leading up to and including `today`.
    pub fn last_month(today: NaiveDate) -> Self {
        let from = today.checked_sub_months(Months::new(1)).unwrap_or(today);
        Self { from, to: today }
    }
}

impl LeaveService {
    /// Record the caller's check-in for the calendar day of `at`.
    pub async fn check_in(
        &self,
        caller: &Caller,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<AttendanceRecord, AppError> {
        let record = AttendanceRecord::check_in(caller.user_id, at, location);
        if !self.repo.insert_attendance(&record).await? {
            return Err(AppError::AlreadyCheckedIn(record.work_date));
        }

        info!(user_id = %caller.user_id, date = %record.work_date, "checked in");
        Ok(record)
    }

    /// Record the caller's check-out for the calendar day of `at`.
    pub async fn check_out(
        &self,
        caller: &Caller,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<AttendanceRecord, AppError> {
        let work_date = at.date_naive();
        let outcome = self
            .repo
            .record_check_out(caller.user_id, work_date, at, location.as_deref())
            .await?;

        match outcome {
            CheckOutOutcome::Recorded => {}
            CheckOutOutcome::NotCheckedIn => return Err(AppError::NotCheckedIn(work_date)),
            CheckOutOutcome::AlreadyCheckedOut => {
                return Err(AppError::AlreadyCheckedOut(work_date));
            }
        }

        info!(user_id = %caller.user_id, date = %work_date, "checked out");
        self.repo
            .get_attendance_for_day(caller.user_id, work_date)
            .await?
            .ok_or(AppError::NotCheckedIn(work_date))
    }

    /// Whether the caller has checked in and out on `today`.
    pub async fn today_status(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<TodayStatus, AppError> {
        let record = self
            .repo
            .get_attendance_for_day(caller.user_id, today)
            .await?;
        Ok(record.into())
    }

    /// The caller's own records within `range`, newest first.
    pub async fn my_attendance(
        &self,
        caller: &Caller,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let entries = self
            .repo
            .list_attendance(Some(caller.user_id), range.from, range.to)
            .await?;
        Ok(entries.into_iter().map(|entry| entry.record).collect())
    }

    /// Everyone's records within `range`, newest first.
    pub async fn all_attendance(
        &self,
        caller: &Caller,
        range: DateRange,
    ) -> Result<Vec<AttendanceEntry>, AppError> {
        require_admin(caller, "view all attendance")?;
        Ok(self.repo.list_attendance(None, range.from, range.to).await?)
    }
}
