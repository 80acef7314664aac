use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{DateRange, LeaveService};
use crate::config::AppConfig;
use crate::domain::{
    Caller, Days, Decision, LeaveRequest, LeaveStatus, LeaveType, NewUser, Role, User, UserUpdate,
};

/// Leavebook - attendance and leave balances
#[derive(Parser)]
#[command(name = "leavebook")]
#[command(about = "Attendance tracking and leave-balance accounting")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(
        short,
        long,
        env = "LEAVEBOOK_DATABASE",
        default_value = "leavebook.db",
        global = true
    )]
    pub database: String,

    /// Username to act as
    #[arg(long = "as", env = "LEAVEBOOK_USER", global = true)]
    pub acting_as: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database with an administrator account
    Init {
        /// Administrator username
        #[arg(long, default_value = "admin")]
        admin: String,

        /// Administrator display name
        #[arg(long, default_value = "Administrator")]
        name: String,
    },

    /// User account commands
    #[command(subcommand)]
    User(UserCommands),

    /// Leave request commands
    #[command(subcommand)]
    Leave(LeaveCommands),

    /// Leave balance commands
    #[command(subcommand)]
    Balance(BalanceCommands),

    /// Check-in and check-out commands
    #[command(subcommand)]
    Attendance(AttendanceCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account (admin)
    Create {
        /// Login name (must be unique)
        username: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Role: admin, manager, employee
        #[arg(short, long, default_value = "employee")]
        role: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        position: Option<String>,
    },

    /// List all users (admin)
    List,

    /// Show a user's account (defaults to yourself)
    Show {
        username: Option<String>,
    },

    /// Update profile fields (defaults to yourself)
    Update {
        username: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        position: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LeaveCommands {
    /// Submit a leave request
    Submit {
        /// Leave type: annual, sick, personal, other
        #[arg(short = 't', long = "type")]
        leave_type: String,

        /// First day of leave (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last day of leave, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Reason for the request
        #[arg(short, long)]
        reason: String,
    },

    /// List your own requests
    Mine {
        /// Filter by status: pending, approved, rejected
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List everyone's requests (manager/admin)
    All {
        /// Filter by status: pending, approved, rejected
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a single request
    Show {
        /// Request ID
        id: String,
    },

    /// Approve a pending request (manager/admin)
    Approve {
        /// Request ID
        id: String,

        /// Comment recorded with the decision
        #[arg(short, long)]
        remark: Option<String>,
    },

    /// Reject a pending request (manager/admin)
    Reject {
        /// Request ID
        id: String,

        /// Comment recorded with the decision
        #[arg(short, long)]
        remark: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Show a balance (defaults to your own, this year)
    Show {
        #[arg(short, long)]
        year: Option<i32>,

        /// Another user's balance (admin)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// List all balances for a year (admin)
    List {
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Overwrite a user's balance (admin)
    Set {
        username: String,

        #[arg(short, long)]
        year: Option<i32>,

        /// Annual leave days (e.g. "10" or "7.5")
        #[arg(long)]
        annual: String,

        /// Sick leave days
        #[arg(long)]
        sick: String,

        /// Personal leave days
        #[arg(long)]
        personal: String,
    },

    /// Create default balances for every user lacking one (admin)
    InitYear {
        year: i32,
    },
}

#[derive(Subcommand)]
pub enum AttendanceCommands {
    /// Check in for today
    CheckIn {
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Check out for today
    CheckOut {
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Show today's check-in state
    Today,

    /// Your own records (defaults to the last month)
    History {
        /// From date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Everyone's records (admin, defaults to the last month)
    All {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },
}

impl Cli {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let command = match self.command {
            Commands::Init { admin, name } => {
                return run_init(&self.database, &admin, &name, config).await;
            }
            command => command,
        };

        let service = LeaveService::connect(&self.database)
            .await?
            .with_policy(config.policy);
        let caller = resolve_caller(&service, self.acting_as.as_deref()).await?;
        let out = Output { json: self.json };

        match command {
            Commands::Init { .. } => {}
            Commands::User(cmd) => run_user_command(&service, &caller, cmd, out).await?,
            Commands::Leave(cmd) => run_leave_command(&service, &caller, cmd, out).await?,
            Commands::Balance(cmd) => run_balance_command(&service, &caller, cmd, out).await?,
            Commands::Attendance(cmd) => {
                run_attendance_command(&service, &caller, cmd, out).await?
            }
        }

        Ok(())
    }
}

async fn run_init(database: &str, admin: &str, name: &str, config: AppConfig) -> Result<()> {
    let service = LeaveService::init(database)
        .await?
        .with_policy(config.policy);
    let user = service.bootstrap_admin(admin, name).await?;
    println!("Database initialized: {}", database);
    println!("Administrator: {} ({})", user.username, user.id);
    Ok(())
}

async fn resolve_caller(service: &LeaveService, username: Option<&str>) -> Result<Caller> {
    let username =
        username.context("No user given. Pass --as <username> or set LEAVEBOOK_USER")?;
    Ok(service.caller_for(username).await?)
}

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as JSON when requested, otherwise run the table printer.
    fn emit<T: Serialize>(&self, value: &T, table: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table(value);
        }
        Ok(())
    }
}

async fn run_user_command(
    service: &LeaveService,
    caller: &Caller,
    cmd: UserCommands,
    out: Output,
) -> Result<()> {
    match cmd {
        UserCommands::Create {
            username,
            name,
            role,
            email,
            phone,
            department,
            position,
        } => {
            let role: Role = role.parse().map_err(|e| {
                anyhow::anyhow!("{}. Valid roles: admin, manager, employee", e)
            })?;
            let user = service
                .create_user(
                    caller,
                    NewUser {
                        username,
                        name,
                        role: Some(role),
                        email,
                        phone,
                        department,
                        position,
                    },
                )
                .await?;
            out.emit(&user, |u| {
                println!("Created user: {} ({}, {})", u.username, u.role, u.id)
            })?;
        }

        UserCommands::List => {
            let users = service.list_users(caller).await?;
            out.emit(&users, |users| {
                if users.is_empty() {
                    println!("No users found.");
                    return;
                }
                println!(
                    "{:<16} {:<24} {:<10} {:<16} {:<16}",
                    "USERNAME", "NAME", "ROLE", "DEPARTMENT", "POSITION"
                );
                println!("{}", "-".repeat(86));
                for u in users {
                    println!(
                        "{:<16} {:<24} {:<10} {:<16} {:<16}",
                        u.username,
                        u.name,
                        u.role,
                        u.department.as_deref().unwrap_or("-"),
                        u.position.as_deref().unwrap_or("-")
                    );
                }
            })?;
        }

        UserCommands::Show { username } => {
            let user = resolve_user(service, caller, username.as_deref()).await?;
            out.emit(&user, print_user)?;
        }

        UserCommands::Update {
            username,
            name,
            email,
            phone,
            department,
            position,
        } => {
            let user = resolve_user(service, caller, username.as_deref()).await?;
            let user = service
                .update_user(
                    caller,
                    user.id,
                    UserUpdate {
                        name,
                        email,
                        phone,
                        department,
                        position,
                    },
                )
                .await?;
            out.emit(&user, print_user)?;
        }
    }

    Ok(())
}

async fn resolve_user(
    service: &LeaveService,
    caller: &Caller,
    username: Option<&str>,
) -> Result<User> {
    let user = match username {
        Some(name) => service.find_user(caller, name).await?,
        None => service.get_user(caller, caller.user_id).await?,
    };
    Ok(user)
}

fn print_user(user: &User) {
    println!("User: {}", user.username);
    println!("  ID:          {}", user.id);
    println!("  Name:        {}", user.name);
    println!("  Role:        {}", user.role);
    if let Some(email) = &user.email {
        println!("  Email:       {}", email);
    }
    if let Some(phone) = &user.phone {
        println!("  Phone:       {}", phone);
    }
    if let Some(department) = &user.department {
        println!("  Department:  {}", department);
    }
    if let Some(position) = &user.position {
        println!("  Position:    {}", position);
    }
    println!(
        "  Created:     {}",
        user.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

async fn run_leave_command(
    service: &LeaveService,
    caller: &Caller,
    cmd: LeaveCommands,
    out: Output,
) -> Result<()> {
    match cmd {
        LeaveCommands::Submit {
            leave_type,
            from,
            to,
            reason,
        } => {
            let leave_type: LeaveType = leave_type.parse().map_err(|e| {
                anyhow::anyhow!("{}. Valid types: annual, sick, personal, other", e)
            })?;
            let start = parse_date(&from)?;
            let end = parse_date(&to)?;

            let request = service
                .submit_request(caller, leave_type, start, end, reason)
                .await?;
            out.emit(&request, |r| {
                println!(
                    "Submitted {} leave: {} to {} ({} days), pending approval ({})",
                    r.leave_type, r.start_date, r.end_date, r.days, r.id
                )
            })?;
        }

        LeaveCommands::Mine { status } => {
            let status = parse_status(status.as_deref())?;
            let requests = service.list_my_requests(caller, status).await?;
            out.emit(&requests, |requests| print_requests(requests.iter(), None))?;
        }

        LeaveCommands::All { status } => {
            let status = parse_status(status.as_deref())?;
            let entries = service.list_all_requests(caller, status).await?;
            out.emit(&entries, |entries| {
                let names: Vec<&str> = entries.iter().map(|e| e.user_name.as_str()).collect();
                print_requests(entries.iter().map(|e| &e.request), Some(names.as_slice()))
            })?;
        }

        LeaveCommands::Show { id } => {
            let request = service.get_request(caller, parse_id(&id)?).await?;
            out.emit(&request, print_request)?;
        }

        LeaveCommands::Approve { id, remark } => {
            let request = service
                .decide(caller, parse_id(&id)?, Decision::Approved, remark)
                .await?;
            out.emit(&request, |r| {
                println!("Approved {} days of {} leave ({})", r.days, r.leave_type, r.id)
            })?;
        }

        LeaveCommands::Reject { id, remark } => {
            let request = service
                .decide(caller, parse_id(&id)?, Decision::Rejected, remark)
                .await?;
            out.emit(&request, |r| println!("Rejected leave request {}", r.id))?;
        }
    }

    Ok(())
}

fn print_requests<'a>(requests: impl Iterator<Item = &'a LeaveRequest>, names: Option<&[&str]>) {
    let requests: Vec<&LeaveRequest> = requests.collect();
    if requests.is_empty() {
        println!("No leave requests found.");
        return;
    }

    println!(
        "{:<36} {:<16} {:<9} {:<10} {:<10} {:>5} {:<9}",
        "ID", "USER", "TYPE", "FROM", "TO", "DAYS", "STATUS"
    );
    println!("{}", "-".repeat(101));
    for (i, r) in requests.iter().enumerate() {
        let user = names.and_then(|n| n.get(i).copied()).unwrap_or("-");
        println!(
            "{:<36} {:<16} {:<9} {:<10} {:<10} {:>5} {:<9}",
            r.id,
            user,
            r.leave_type,
            r.start_date,
            r.end_date,
            r.days.to_string(),
            r.status
        );
    }
}

fn print_request(request: &LeaveRequest) {
    println!("Leave request: {}", request.id);
    println!("  Type:        {}", request.leave_type);
    println!("  Dates:       {} to {}", request.start_date, request.end_date);
    println!("  Days:        {}", request.days);
    println!("  Reason:      {}", request.reason);
    println!("  Status:      {}", request.status);
    if let Some(approver) = request.approver_id {
        println!("  Decided by:  {}", approver);
    }
    if let Some(decided_at) = request.decided_at {
        println!("  Decided at:  {}", decided_at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(remark) = &request.remark {
        println!("  Remark:      {}", remark);
    }
    println!(
        "  Submitted:   {}",
        request.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

async fn run_balance_command(
    service: &LeaveService,
    caller: &Caller,
    cmd: BalanceCommands,
    out: Output,
) -> Result<()> {
    let this_year = Utc::now().year();

    match cmd {
        BalanceCommands::Show { year, user } => {
            let year = year.unwrap_or(this_year);
            let balance = match user {
                Some(username) => {
                    let user = service.find_user(caller, &username).await?;
                    service.get_balance(caller, user.id, year).await?
                }
                None => service.get_my_balance(caller, year).await?,
            };
            out.emit(&balance, |b| {
                println!("Leave balance for {}", b.year);
                println!("  Annual:      {}", b.annual_leave);
                println!("  Sick:        {}", b.sick_leave);
                println!("  Personal:    {}", b.personal_leave);
            })?;
        }

        BalanceCommands::List { year } => {
            let year = year.unwrap_or(this_year);
            let entries = service.list_balances(caller, year).await?;
            out.emit(&entries, |entries| {
                if entries.is_empty() {
                    println!("No balances for {}.", year);
                    return;
                }
                println!(
                    "{:<24} {:<16} {:>8} {:>8} {:>8}",
                    "NAME", "DEPARTMENT", "ANNUAL", "SICK", "PERSONAL"
                );
                println!("{}", "-".repeat(68));
                for e in entries {
                    println!(
                        "{:<24} {:<16} {:>8} {:>8} {:>8}",
                        e.user_name,
                        e.user_department.as_deref().unwrap_or("-"),
                        e.balance.annual_leave.to_string(),
                        e.balance.sick_leave.to_string(),
                        e.balance.personal_leave.to_string()
                    );
                }
            })?;
        }

        BalanceCommands::Set {
            username,
            year,
            annual,
            sick,
            personal,
        } => {
            let user = service.find_user(caller, &username).await?;
            let balance = service
                .adjust_balance(
                    caller,
                    user.id,
                    year.unwrap_or(this_year),
                    parse_days(&annual)?,
                    parse_days(&sick)?,
                    parse_days(&personal)?,
                )
                .await?;
            out.emit(&balance, |b| {
                println!(
                    "Set {} balance for {}: annual {}, sick {}, personal {}",
                    b.year, user.username, b.annual_leave, b.sick_leave, b.personal_leave
                )
            })?;
        }

        BalanceCommands::InitYear { year } => {
            let created = service.initialize_year(caller, year).await?;
            out.emit(&created, |n| {
                println!("Initialized {} balance(s) for {}", n, year)
            })?;
        }
    }

    Ok(())
}

async fn run_attendance_command(
    service: &LeaveService,
    caller: &Caller,
    cmd: AttendanceCommands,
    out: Output,
) -> Result<()> {
    let now = Utc::now();

    match cmd {
        AttendanceCommands::CheckIn { location } => {
            let record = service.check_in(caller, now, location).await?;
            out.emit(&record, |r| {
                println!("Checked in at {}", r.check_in_time.format("%Y-%m-%d %H:%M:%S"))
            })?;
        }

        AttendanceCommands::CheckOut { location } => {
            let record = service.check_out(caller, now, location).await?;
            out.emit(&record, |r| {
                if let Some(out_time) = r.check_out_time {
                    println!("Checked out at {}", out_time.format("%Y-%m-%d %H:%M:%S"));
                }
            })?;
        }

        AttendanceCommands::Today => {
            let status = service.today_status(caller, now.date_naive()).await?;
            out.emit(&status, |s| match &s.record {
                None => println!("Not checked in today."),
                Some(r) => {
                    println!("Checked in:  {}", r.check_in_time.format("%H:%M:%S"));
                    match r.check_out_time {
                        Some(t) => println!("Checked out: {}", t.format("%H:%M:%S")),
                        None => println!("Checked out: not yet"),
                    }
                }
            })?;
        }

        AttendanceCommands::History { from, to } => {
            let range = parse_range(from.as_deref(), to.as_deref(), now.date_naive())?;
            let records = service.my_attendance(caller, range).await?;
            out.emit(&records, |records| {
                if records.is_empty() {
                    println!("No attendance records found.");
                    return;
                }
                println!(
                    "{:<10} {:<9} {:<9} {:>6} {:<20}",
                    "DATE", "IN", "OUT", "WORKED", "LOCATION"
                );
                println!("{}", "-".repeat(57));
                for r in records {
                    println!(
                        "{:<10} {:<9} {:<9} {:>6} {:<20}",
                        r.work_date,
                        r.check_in_time.format("%H:%M:%S").to_string(),
                        r.check_out_time
                            .map(|t| t.format("%H:%M:%S").to_string())
                            .unwrap_or_else(|| "-".into()),
                        format_worked(r.worked()),
                        r.check_in_location.as_deref().unwrap_or("-")
                    );
                }
            })?;
        }

        AttendanceCommands::All { from, to } => {
            let range = parse_range(from.as_deref(), to.as_deref(), now.date_naive())?;
            let entries = service.all_attendance(caller, range).await?;
            out.emit(&entries, |entries| {
                if entries.is_empty() {
                    println!("No attendance records found.");
                    return;
                }
                println!(
                    "{:<24} {:<16} {:<10} {:<9} {:<9}",
                    "NAME", "DEPARTMENT", "DATE", "IN", "OUT"
                );
                println!("{}", "-".repeat(72));
                for e in entries {
                    println!(
                        "{:<24} {:<16} {:<10} {:<9} {:<9}",
                        e.user_name,
                        e.user_department.as_deref().unwrap_or("-"),
                        e.record.work_date,
                        e.record.check_in_time.format("%H:%M:%S").to_string(),
                        e.record
                            .check_out_time
                            .map(|t| t.format("%H:%M:%S").to_string())
                            .unwrap_or_else(|| "-".into())
                    );
                }
            })?;
        }
    }

    Ok(())
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}

fn parse_range(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<DateRange> {
    let default = DateRange::last_month(today);
    Ok(DateRange {
        from: from.map(parse_date).transpose()?.unwrap_or(default.from),
        to: to.map(parse_date).transpose()?.unwrap_or(default.to),
    })
}

/// Worked time as "H:MM", or "-" while still checked in.
fn format_worked(worked: Option<chrono::Duration>) -> String {
    match worked {
        Some(d) => format!("{}:{:02}", d.num_hours(), d.num_minutes() % 60),
        None => "-".to_string(),
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid request ID format (expected UUID)")
}

fn parse_days(value: &str) -> Result<Days> {
    value
        .parse()
        .with_context(|| format!("Invalid day count '{}'. Use e.g. '10' or '7.5'", value))
}

fn parse_status(status: Option<&str>) -> Result<Option<LeaveStatus>> {
    status
        .map(|s| {
            s.parse::<LeaveStatus>().map_err(|e| {
                anyhow::anyhow!("{}. Valid statuses: pending, approved, rejected", e)
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "leavebook", "--as", "alice", "leave", "submit", "--type", "annual", "--from",
            "2024-01-01", "--to", "2024-01-03", "--reason", "Trip",
        ])
        .unwrap();

        assert_eq!(cli.acting_as.as_deref(), Some("alice"));
        match cli.command {
            Commands::Leave(LeaveCommands::Submit { leave_type, .. }) => {
                assert_eq!(leave_type, "annual")
            }
            _ => panic!("expected leave submit"),
        }
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["leavebook", "leave", "mine", "-d", "team.db", "--as", "eve"])
                .unwrap();
        assert_eq!(cli.database, "team.db");
        assert_eq!(cli.acting_as.as_deref(), Some("eve"));

        let cli = Cli::try_parse_from(["leavebook", "--database", "hr.db", "balance", "list"])
            .unwrap();
        assert_eq!(cli.database, "hr.db");
    }

    #[test]
    fn test_format_worked() {
        assert_eq!(format_worked(None), "-");
        assert_eq!(
            format_worked(Some(chrono::Duration::minutes(8 * 60 + 5))),
            "8:05"
        );
    }

    #[test]
    fn test_parse_range_defaults_to_last_month() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let range = parse_range(None, Some("2024-06-10"), today).unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(
            parse_status(Some("approved")).unwrap(),
            Some(LeaveStatus::Approved)
        );
        assert!(parse_status(Some("cancelled")).is_err());
    }
}
