use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

pub type AttendanceId = Uuid;

/// One working day's check-in (and eventual check-out) for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_location: Option<String>,
    pub check_out_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn check_in(user_id: UserId, at: DateTime<Utc>, location: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            work_date: at.date_naive(),
            check_in_time: at,
            check_out_time: None,
            check_in_location: location,
            check_out_location: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }

    /// Time between check-in and check-out, once checked out.
    pub fn worked(&self) -> Option<chrono::Duration> {
        self.check_out_time.map(|out| out - self.check_in_time)
    }
}

/// A record together with the user's directory details, for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub user_name: String,
    pub user_department: Option<String>,
}

/// Check-in state for a single day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayStatus {
    pub checked_in: bool,
    pub checked_out: bool,
    pub record: Option<AttendanceRecord>,
}

impl From<Option<AttendanceRecord>> for TodayStatus {
    fn from(record: Option<AttendanceRecord>) -> Self {
        Self {
            checked_in: record.is_some(),
            checked_out: record.as_ref().is_some_and(|r| r.is_checked_out()),
            record,
        }
    }
}
