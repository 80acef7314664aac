use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Bucket, Days, UserId};

pub type LeaveBalanceId = Uuid;

/// Yearly leave allotments granted when a balance row is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePolicy {
    pub annual_leave: Days,
    pub sick_leave: Days,
    pub personal_leave: Days,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            annual_leave: Days::whole(10),
            sick_leave: Days::whole(10),
            personal_leave: Days::whole(5),
        }
    }
}

/// Remaining leave for one employee in one calendar year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub id: LeaveBalanceId,
    pub user_id: UserId,
    pub year: i32,
    pub annual_leave: Days,
    pub sick_leave: Days,
    pub personal_leave: Days,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveBalance {
    pub fn new(user_id: UserId, year: i32, policy: &LeavePolicy) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            year,
            annual_leave: policy.annual_leave,
            sick_leave: policy.sick_leave,
            personal_leave: policy.personal_leave,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn available(&self, bucket: Bucket) -> Days {
        match bucket {
            Bucket::Annual => self.annual_leave,
            Bucket::Sick => self.sick_leave,
            Bucket::Personal => self.personal_leave,
        }
    }

    pub fn covers(&self, bucket: Bucket, days: Days) -> bool {
        days <= self.available(bucket)
    }
}

/// A balance row together with the owner's directory details, for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    #[serde(flatten)]
    pub balance: LeaveBalance,
    pub user_name: String,
    pub user_department: Option<String>,
    pub user_position: Option<String>,
}
