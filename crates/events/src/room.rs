//! Rooms and session room assignment.

use std::fmt;
use std::str::FromStr;

use hms_persistence::Principal;
use hms_persistence::schema::Role;
use thiserror::Error;

/// A named broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every session of one user, keyed `user:<id>`.
    User(String),
    /// Every session of users holding a role, keyed `role:<ROLE>`.
    Role(Role),
    /// Every administrator session, keyed `admin`.
    Admin,
}

/// A room key that names no room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// The key matches none of `user:<id>`, `role:<ROLE>` or `admin`.
    #[error("invalid room key: {0}")]
    InvalidKey(String),
}

impl Room {
    /// The key sessions subscribe under.
    ///
    /// Role keys use the canonical role spelling, so `admin` and `ADMIN`
    /// users end up in the same role room.
    pub fn key(&self) -> String {
        match self {
            Room::User(id) => format!("user:{}", id),
            Room::Role(role) => format!("role:{}", role.as_str()),
            Room::Admin => "admin".to_string(),
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Room {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "admin" {
            return Ok(Room::Admin);
        }
        match s.split_once(':') {
            Some(("user", id)) if !id.is_empty() => Ok(Room::User(id.to_string())),
            Some(("role", role)) => role
                .parse()
                .map(Room::Role)
                .map_err(|_| RoomError::InvalidKey(s.to_string())),
            _ => Err(RoomError::InvalidKey(s.to_string())),
        }
    }
}

/// The rooms a signed-in session joins: its user room, its role room when
/// the role is known, and `admin` for administrators of either spelling.
pub fn rooms_for(principal: &Principal) -> Vec<Room> {
    let mut rooms = vec![Room::User(principal.id.clone())];
    if let Some(role) = principal.role() {
        rooms.push(Room::Role(role));
    }
    if principal.is_admin() {
        rooms.push(Room::Admin);
    }
    rooms
}
