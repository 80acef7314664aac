// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use leavebook::application::LeaveService;
use leavebook::domain::{Caller, NewUser, Role};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LeaveService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LeaveService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Test fixture: one admin, one manager and two employees
pub struct Staff {
    pub admin: Caller,
    pub manager: Caller,
    pub employee: Caller,
    pub other_employee: Caller,
}

impl Staff {
    pub async fn create(service: &LeaveService) -> Result<Self> {
        let admin = service.bootstrap_admin("admin", "Administrator").await?.caller();

        let manager = service
            .create_user(
                &admin,
                NewUser {
                    username: "maria".into(),
                    name: "Maria Rossi".into(),
                    role: Some(Role::Manager),
                    department: Some("Engineering".into()),
                    ..Default::default()
                },
            )
            .await?
            .caller();

        let employee = service
            .create_user(
                &admin,
                NewUser {
                    username: "eve".into(),
                    name: "Eve Bianchi".into(),
                    department: Some("Engineering".into()),
                    position: Some("Developer".into()),
                    ..Default::default()
                },
            )
            .await?
            .caller();

        let other_employee = service
            .create_user(
                &admin,
                NewUser {
                    username: "oscar".into(),
                    name: "Oscar Verdi".into(),
                    department: Some("Sales".into()),
                    ..Default::default()
                },
            )
            .await?
            .caller();

        Ok(Self {
            admin,
            manager,
            employee,
            other_employee,
        })
    }
}
