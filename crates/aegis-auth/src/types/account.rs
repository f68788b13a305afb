//! End-user account record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An end-user account on whose behalf tokens are issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Unique account id.
    pub id: Uuid,

    /// Login identifier (email or username).
    pub login: String,

    /// When the account last authenticated interactively. Feeds the
    /// `auth_time` claim when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<OffsetDateTime>,
}

impl Account {
    /// Creates a new account with a random id.
    #[must_use]
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            login: login.into(),
            last_login_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let account = Account::new("user@example.com");
        assert_eq!(account.login, "user@example.com");
        assert!(account.last_login_at.is_none());
    }
}
