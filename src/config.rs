use std::env;

use anyhow::{Context, Result};

use crate::domain::{Days, LeavePolicy};

/// Settings read from the environment (and a `.env` file, if present).
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub policy: LeavePolicy,
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = LeavePolicy::default();
        let policy = LeavePolicy {
            annual_leave: days_var("LEAVEBOOK_DEFAULT_ANNUAL", defaults.annual_leave)?,
            sick_leave: days_var("LEAVEBOOK_DEFAULT_SICK", defaults.sick_leave)?,
            personal_leave: days_var("LEAVEBOOK_DEFAULT_PERSONAL", defaults.personal_leave)?,
        };

        let log_json = is_json_format(env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self { policy, log_json })
    }
}

fn days_var(key: &str, default: Days) -> Result<Days> {
    parse_days_setting(key, env::var(key).ok(), default)
}

fn parse_days_setting(key: &str, value: Option<String>, default: Days) -> Result<Days> {
    let Some(value) = value else {
        return Ok(default);
    };

    let days: Days = value
        .parse()
        .with_context(|| format!("{} must be a day count like 10 or 2.5", key))?;
    if days.is_negative() {
        anyhow::bail!("{} must not be negative", key);
    }
    Ok(days)
}

fn is_json_format(value: Option<&str>) -> bool {
    value.is_some_and(|format| format.trim().eq_ignore_ascii_case("json"))
}
