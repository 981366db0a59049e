use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_text_enum;

define_text_enum!(
    /// Account role. Hosts own homestays, guests book them.
    UserRole {
        Admin => "admin",
        Host => "host",
        Guest => "guest",
    }
);

define_text_enum!(
    /// Accounts start `inactive` until the e-mail address is verified.
    UserStatus {
        Active => "active",
        Inactive => "inactive",
    }
);

impl UserRole {
    /// Roles admitted to the host route group.
    pub fn is_host_like(&self) -> bool {
        matches!(self, UserRole::Host | UserRole::Admin)
    }
}

/// A stored account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
}

/// Partial update. `phone: Some(None)` clears the stored phone number.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub status: Option<UserStatus>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_host_like_roles() {
        assert!(UserRole::Host.is_host_like());
        assert!(UserRole::Admin.is_host_like());
        assert!(!UserRole::Guest.is_host_like());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            name: "Lan".into(),
            phone: None,
            email: "lan@example.com".into(),
            password_hash: "$2b$secret".into(),
            role: UserRole::Guest,
            status: UserStatus::Active,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "guest");
    }
}
