use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Days, UserId};

pub type LeaveRequestId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    /// Leave that draws from no balance bucket
    Other,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Personal => "personal",
            LeaveType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "annual" => Some(LeaveType::Annual),
            "sick" => Some(LeaveType::Sick),
            "personal" => Some(LeaveType::Personal),
            "other" => Some(LeaveType::Other),
            _ => None,
        }
    }

    /// The balance bucket this leave type is charged against, if any.
    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            LeaveType::Annual => Some(Bucket::Annual),
            LeaveType::Sick => Some(Bucket::Sick),
            LeaveType::Personal => Some(Bucket::Personal),
            LeaveType::Other => None,
        }
    }
}

impl std::fmt::Display for LeaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LeaveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveType::from_str(s).ok_or_else(|| format!("unknown leave type: {}", s))
    }
}

/// One of the three tracked per-year balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Annual,
    Sick,
    Personal,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Annual => "annual",
            Bucket::Sick => "sick",
            Bucket::Personal => "personal",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(LeaveStatus::Pending),
            "approved" => Some(LeaveStatus::Approved),
            "rejected" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LeaveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveStatus::from_str(s).ok_or_else(|| format!("unknown leave status: {}", s))
    }
}

/// The outcome an approver chooses for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(&self) -> LeaveStatus {
        match self {
            Decision::Approved => LeaveStatus::Approved,
            Decision::Rejected => LeaveStatus::Rejected,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub user_id: UserId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Days,
    pub reason: String,
    pub status: LeaveStatus,
    pub approver_id: Option<UserId>,
    pub remark: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Create a pending request, deriving the day count from the date range.
    /// Returns `None` when `end_date` is before `start_date`.
    pub fn new(
        user_id: UserId,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    ) -> Option<Self> {
        let days = Days::between_inclusive(start_date, end_date)?;
        let now = Utc::now();
        Some(Self {
            id: Uuid::new_v4(),
            user_id,
            leave_type,
            start_date,
            end_date,
            days,
            reason,
            status: LeaveStatus::Pending,
            approver_id: None,
            remark: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Balances are kept per calendar year; a request is charged to the year it starts in.
    pub fn balance_year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }
}

/// A request together with the requester's directory details, for approver listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequestEntry {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub user_name: String,
    pub user_department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_leave_type_roundtrip() {
        for lt in [
            LeaveType::Annual,
            LeaveType::Sick,
            LeaveType::Personal,
            LeaveType::Other,
        ] {
            assert_eq!(LeaveType::from_str(lt.as_str()), Some(lt));
        }
        assert_eq!(LeaveType::from_str("unpaid"), None);
    }

    #[test]
    fn test_only_other_has_no_bucket() {
        assert_eq!(LeaveType::Annual.bucket(), Some(Bucket::Annual));
        assert_eq!(LeaveType::Sick.bucket(), Some(Bucket::Sick));
        assert_eq!(LeaveType::Personal.bucket(), Some(Bucket::Personal));
        assert_eq!(LeaveType::Other.bucket(), None);
    }

    #[test]
    fn test_new_request_is_pending_with_derived_days() {
        let request = LeaveRequest::new(
            Uuid::new_v4(),
            LeaveType::Annual,
            date("2024-01-01"),
            date("2024-01-03"),
            "Family trip".into(),
        )
        .unwrap();

        assert_eq!(request.status, LeaveStatus::Pending);
        assert_eq!(request.days, Days::whole(3));
        assert_eq!(request.balance_year(), 2024);
        assert!(request.approver_id.is_none());
    }

    #[test]
    fn test_new_request_rejects_inverted_range() {
        let request = LeaveRequest::new(
            Uuid::new_v4(),
            LeaveType::Sick,
            date("2024-03-10"),
            date("2024-03-09"),
            "Flu".into(),
        );
        assert!(request.is_none());
    }

    #[test]
    fn test_decision_statuses() {
        assert_eq!(Decision::Approved.status(), LeaveStatus::Approved);
        assert_eq!(Decision::Rejected.status(), LeaveStatus::Rejected);
    }
}
