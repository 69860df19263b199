//! Authenticated caller.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Visitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Visitor => "Visitor",
        }
    }

    /// Parses a `role` claim. Unknown roles yield `None`.
    pub fn from_claim(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else if s.eq_ignore_ascii_case("visitor") {
            Some(Role::Visitor)
        } else {
            None
        }
    }
}

/// Identity attached to a request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub user_name: String,
    pub role: Option<Role>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_visitor(&self) -> bool {
        self.role == Some(Role::Visitor)
    }
}
