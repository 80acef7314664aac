use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages accounts and balances, and may decide requests
    Admin,
    /// May decide leave requests
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }

    /// Approval authority: the right to decide leave requests.
    pub fn can_approve(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_str(s).ok_or_else(|| format!("unknown role: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            name,
            email: None,
            phone: None,
            role,
            department: None,
            position: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            role: self.role,
        }
    }

    /// Apply profile changes. Empty or missing fields keep their current value.
    pub fn apply(&mut self, update: &UserUpdate) {
        fn pick(current: &mut Option<String>, new: &Option<String>) {
            if let Some(value) = new.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *current = Some(value.to_string());
            }
        }

        if let Some(name) = update.name.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.name = name.to_string();
        }
        pick(&mut self.email, &update.email);
        pick(&mut self.phone, &update.phone);
        pick(&mut self.department, &update.department);
        pick(&mut self.position, &update.position);
        self.updated_at = Utc::now();
    }
}

/// Input for creating a user account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// Profile fields a user (or an admin) may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// The authenticated identity on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_approve(&self) -> bool {
        self.role.can_approve()
    }

    /// Admins see everyone; other users only themselves.
    pub fn can_view(&self, user_id: UserId) -> bool {
        self.is_admin() || self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Admin, Role::Manager, Role::Employee] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("hr"), None);
    }

    #[test]
    fn test_approval_authority() {
        assert!(Role::Admin.can_approve());
        assert!(Role::Manager.can_approve());
        assert!(!Role::Employee.can_approve());
    }

    #[test]
    fn test_caller_visibility() {
        let alice = User::new("alice".into(), "Alice".into(), Role::Employee);
        let bob = User::new("bob".into(), "Bob".into(), Role::Employee);
        let admin = User::new("root".into(), "Root".into(), Role::Admin);

        assert!(alice.caller().can_view(alice.id));
        assert!(!alice.caller().can_view(bob.id));
        assert!(admin.caller().can_view(bob.id));
    }

    #[test]
    fn test_apply_update_keeps_blank_fields() {
        let mut user = User::new("alice".into(), "Alice".into(), Role::Employee);
        user.department = Some("Engineering".into());

        user.apply(&UserUpdate {
            name: Some("  ".into()),
            email: Some("alice@example.com".into()),
            department: Some(String::new()),
            ..Default::default()
        });

        assert_eq!(user.name, "Alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.department.as_deref(), Some("Engineering"));
        assert_eq!(user.position, None);
    }
}
