use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Bucket, Days, LeaveStatus};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Insufficient {bucket} leave: available {available}, requested {requested}")]
    InsufficientBalance {
        bucket: Bucket,
        available: Days,
        requested: Days,
    },

    #[error("Leave request {id} has already been {status}")]
    NotPending { id: String, status: LeaveStatus },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Leave request not found: {0}")]
    LeaveRequestNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Already checked in on {0}")]
    AlreadyCheckedIn(NaiveDate),

    #[error("Not checked in on {0}")]
    NotCheckedIn(NaiveDate),

    #[error("Already checked out on {0}")]
    AlreadyCheckedOut(NaiveDate),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for the "unknown id" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::UserNotFound(_) | AppError::LeaveRequestNotFound(_)
        )
    }
}
