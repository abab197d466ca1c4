use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::session::errors::EmailError;
use crate::session::errors::ProfileError;
use crate::session::errors::RoleError;
use crate::session::errors::UserIdError;

/// User aggregate entity.
///
/// `refresh_token` is the single session slot: the only refresh token the
/// service will currently exchange for this user, or `None` when signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
    pub profile: Profile,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 parser and normalized to trimmed lowercase so
/// that uniqueness and lookup are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: impl AsRef<str>) -> Result<Self, EmailError> {
        let normalized = email.as_ref().trim().to_lowercase();

        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role of a user, carried in access tokens and checked by route guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "student")]
    Student,
    #[serde(rename = "clearingOfficer")]
    ClearingOfficer,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::ClearingOfficer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::ClearingOfficer => "clearingOfficer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "clearingOfficer" => Ok(Role::ClearingOfficer),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields of a user. Not involved in the session protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub student_id: Option<String>,
    pub phone_number: Option<String>,
}

impl Profile {
    /// Build a validated profile.
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    /// * `InvalidName` - Name contains characters other than letters and spaces
    /// * `InvalidStudentId` - Student ID is not in the `00-0000` format
    /// * `InvalidPhoneNumber` - Phone number is not 7-15 digits with optional `+`
    pub fn new(
        first_name: Option<String>,
        last_name: Option<String>,
        student_id: Option<String>,
        phone_number: Option<String>,
    ) -> Result<Self, ProfileError> {
        let first_name = non_blank(first_name).map(Self::valid_name).transpose()?;
        let last_name = non_blank(last_name).map(Self::valid_name).transpose()?;
        let student_id = non_blank(student_id)
            .map(Self::valid_student_id)
            .transpose()?;
        let phone_number = non_blank(phone_number)
            .map(Self::valid_phone_number)
            .transpose()?;

        Ok(Self {
            first_name,
            last_name,
            student_id,
            phone_number,
        })
    }

    fn valid_name(name: String) -> Result<String, ProfileError> {
        if name.chars().all(|c| c.is_alphabetic() || c == ' ') {
            Ok(name)
        } else {
            Err(ProfileError::InvalidName(name))
        }
    }

    fn valid_student_id(student_id: String) -> Result<String, ProfileError> {
        let bytes = student_id.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[2] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || b.is_ascii_digit());

        if well_formed {
            Ok(student_id)
        } else {
            Err(ProfileError::InvalidStudentId(student_id))
        }
    }

    fn valid_phone_number(phone_number: String) -> Result<String, ProfileError> {
        let digits = phone_number.strip_prefix('+').unwrap_or(&phone_number);

        if (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
            Ok(phone_number)
        } else {
            Err(ProfileError::InvalidPhoneNumber(phone_number))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Plaintext password that satisfies the registration policy.
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a digit
/// and a special character.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    const MIN_LENGTH: usize = 8;

    pub fn new(password: String) -> Result<Self, ProfileError> {
        if password.chars().count() < Self::MIN_LENGTH {
            return Err(ProfileError::WeakPassword(format!(
                "must be at least {} characters long",
                Self::MIN_LENGTH
            )));
        }

        let requirements: [(fn(&char) -> bool, &str); 4] = [
            (char::is_ascii_uppercase, "must contain at least one uppercase letter"),
            (char::is_ascii_lowercase, "must contain at least one lowercase letter"),
            (char::is_ascii_digit, "must contain at least one number"),
            (
                |c: &char| !c.is_alphanumeric() && !c.is_whitespace(),
                "must contain at least one special character",
            ),
        ];

        for (matches, message) in requirements {
            if !password.chars().any(|c| matches(&c)) {
                return Err(ProfileError::WeakPassword(message.to_string()));
            }
        }

        Ok(Self(password))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Command to register a new user with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub password: NewPassword,
    pub role: Role,
    pub profile: Profile,
}

/// Command to sign in with an email and password
pub struct LoginCommand {
    pub email: EmailAddress,
    pub password: String,
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of register and login: the user plus a fresh token pair.
///
/// The refresh token is meant for the cookie only, never the response body.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful refresh: a new access token and the rotated
/// refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedSession {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity attached to a request by the authentication guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}
