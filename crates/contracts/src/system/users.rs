use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an employee as listed in the user source.
///
/// Parsed case-insensitively; `Analista` and `Supervisor` are the privileged
/// roles that may search by SED as well as by account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Analista,
    Supervisor,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_uppercase().as_str() {
            "ANALISTA" => Role::Analista,
            "SUPERVISOR" => Role::Supervisor,
            _ => Role::Other(trimmed.to_string()),
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Analista | Role::Supervisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Analista => f.write_str("ANALISTA"),
            Role::Supervisor => f.write_str("SUPERVISOR"),
            Role::Other(name) => f.write_str(&name.to_uppercase()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.to_string()
    }
}
