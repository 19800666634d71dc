use serde::{Deserialize, Serialize};

/// Application role, carried in the token's `groups` claim.
///
/// Declared from most to least privileged; `Ord` follows that order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Supervisor,
    Worker,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Supervisor, Role::Worker, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Supervisor => "SUPERVISOR",
            Role::Worker => "WORKER",
            Role::Viewer => "VIEWER",
        }
    }

    /// Parse a group name, ignoring case. Unknown groups yield `None` so that
    /// identity-provider groups unrelated to this application are skipped.
    pub fn from_group(group: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(group.trim()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = demeter_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_group(s)
            .ok_or_else(|| demeter_core::DomainError::validation(format!("unknown role '{s}'")))
    }
}
