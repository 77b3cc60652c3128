//! Enumerated field domains.
//!
//! Stored values are plain strings. The enums here define which strings are
//! legal and give callers typed access to them; they never rewrite what is
//! already stored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User role.
///
/// Stored data holds `ADMIN`, `DOCTOR`, `PATIENT` and, for older admin
/// accounts, a lowercase `admin`. Parsing is case-insensitive so both admin
/// spellings map to [`Role::Admin`], but the stored spelling is left alone.
///
/// ```
/// use hms_persistence::schema::Role;
///
/// assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
/// assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
/// assert_eq!(Role::Admin.stored_variants(), &["ADMIN", "admin"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Hospital administrator.
    Admin,
    /// Doctor with a Doctor profile.
    Doctor,
    /// Patient with a Patient profile.
    Patient,
}

impl Role {
    /// All roles.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Doctor, Role::Patient];

    /// Canonical (uppercase) spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
        }
    }

    /// Every spelling of this role found in stored data.
    pub fn stored_variants(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["ADMIN", "admin"],
            Role::Doctor => &["DOCTOR"],
            Role::Patient => &["PATIENT"],
        }
    }

    /// Returns `true` if `value` is a spelling accepted on write.
    pub fn is_stored_spelling(value: &str) -> bool {
        Role::ALL
            .iter()
            .any(|role| role.stored_variants().contains(&value))
    }

    /// Case-insensitive comparison against a stored role string.
    pub fn matches(&self, value: &str) -> bool {
        value.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.matches(s))
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// Generates the exact-match string mapping shared by the status enums.
macro_rules! stored_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Exact-match parse of a stored value.
            pub fn from_stored(value: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.as_str() == value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum! {
    /// Appointment lifecycle status.
    AppointmentStatus {
        /// Requested, awaiting the doctor.
        Pending => "PENDING",
        /// Accepted by the doctor.
        Confirmed => "CONFIRMED",
        /// Declined by the doctor.
        Rejected => "REJECTED",
        /// Cancelled by either side.
        Cancelled => "CANCELLED",
        /// Took place.
        Completed => "COMPLETED",
        /// Moved to another slot.
        Rescheduled => "RESCHEDULED",
    }
}

stored_enum! {
    /// Bill payment status.
    BillStatus {
        /// Settled.
        Paid => "PAID",
        /// Issued, not yet settled.
        Pending => "PENDING",
        /// Past its due date.
        Overdue => "OVERDUE",
        /// Voided.
        Cancelled => "CANCELLED",
    }
}

stored_enum! {
    /// Status of prescriptions, lab tests and medical records.
    OrderStatus {
        /// Ordered, not yet acted on.
        Pending => "PENDING",
        /// In effect or in progress.
        Active => "ACTIVE",
        /// Finished.
        Completed => "COMPLETED",
        /// Withdrawn.
        Cancelled => "CANCELLED",
    }
}
