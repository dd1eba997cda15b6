use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Staff and learner roles. The set is closed: role strings coming out of the
/// database or a JWT are parsed with [`Role::parse`], and anything
/// unrecognized yields `None` so that legacy rows fail closed instead of
/// falling through a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Trader,
    Coach,
    Assistant,
    Leader,
    SuperAdmin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "trader" => Some(Role::Trader),
            "coach" => Some(Role::Coach),
            "assistant" => Some(Role::Assistant),
            "leader" => Some(Role::Leader),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Trader => "trader",
            Role::Coach => "coach",
            Role::Assistant => "assistant",
            Role::Leader => "leader",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Frozen,
    Deleted,
}

impl AccountStatus {
    pub fn parse(s: &str) -> Option<AccountStatus> {
        match s {
            "active" => Some(AccountStatus::Active),
            "frozen" => Some(AccountStatus::Frozen),
            "deleted" => Some(AccountStatus::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Deleted => "deleted",
        }
    }
}

/// One row of the identity graph. `role` and `status` are kept as raw strings
/// so a bad row never poisons a whole result set; the typed accessors parse on
/// demand and fail closed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub leader_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn parsed_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn parsed_status(&self) -> Option<AccountStatus> {
        AccountStatus::parse(&self.status)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.parsed_status(), Some(AccountStatus::Active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::Student,
            Role::Trader,
            Role::Coach,
            Role::Assistant,
            Role::Leader,
            Role::SuperAdmin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        assert_eq!(Role::parse("superadmin"), None);
        assert_eq!(Role::parse("ADMIN"), None);
        assert_eq!(Role::parse(""), None);
    }
}
