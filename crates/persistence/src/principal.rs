//! The authenticated session principal.
//!
//! Authentication happens elsewhere; this is the shape the identity
//! provider hands to calling code, which uses it to scope façade calls
//! (for example "appointments where `doctorId` is this doctor").

use serde::{Deserialize, Serialize};

use crate::schema::Role;

/// An authenticated user as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user's identifier.
    pub id: String,
    /// The user's email.
    pub email: String,
    /// The role string exactly as stored (`ADMIN`, `admin`, `DOCTOR`, ...).
    pub role: String,
}

impl Principal {
    /// Creates a principal.
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: role.into(),
        }
    }

    /// Parses the role, ignoring case. `None` for unknown roles.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    /// Returns `true` if the principal is an administrator.
    ///
    /// Stored data carries both `ADMIN` and the legacy `admin`, so the
    /// comparison ignores case.
    pub fn is_admin(&self) -> bool {
        Role::Admin.matches(&self.role)
    }

    /// Returns `true` if the principal holds `role`, ignoring case.
    pub fn has_role(&self, role: Role) -> bool {
        role.matches(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_check_ignores_case() {
        assert!(Principal::new("1", "a@x.io", "admin").is_admin());
        assert!(Principal::new("1", "a@x.io", "ADMIN").is_admin());
        assert!(!Principal::new("1", "a@x.io", "DOCTOR").is_admin());
    }

    #[test]
    fn test_role_parsing() {
        let principal = Principal::new("1", "d@x.io", "Doctor");
        assert_eq!(principal.role(), Some(Role::Doctor));
        assert!(principal.has_role(Role::Doctor));
        assert_eq!(Principal::new("1", "n@x.io", "nurse").role(), None);
    }
}
