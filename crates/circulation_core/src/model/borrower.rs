//! Borrower record and its closed user-type variant.

use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const USER_ID_MAX: usize = 50;
pub const BORROWER_NAME_MAX: usize = 200;

/// Kind of person holding loans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    Teacher,
}

/// Stored tag -> display label.
pub const USER_TYPE_CHOICES: &[(UserType, &str)] = &[
    (UserType::Student, "Student"),
    (UserType::Teacher, "Teacher"),
];

impl UserType {
    /// Tag persisted in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }

    /// Human-readable label from `USER_TYPE_CHOICES`.
    pub fn label(self) -> &'static str {
        USER_TYPE_CHOICES
            .iter()
            .find_map(|(kind, label)| (*kind == self).then_some(*label))
            .unwrap_or_else(|| self.as_str())
    }
}

/// Person eligible to hold loans, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    /// Unique external identifier.
    pub user_id: String,
    pub name: String,
    pub user_type: UserType,
}

impl Borrower {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, user_type: UserType) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            user_type,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("user_id", &self.user_id, USER_ID_MAX)?;
        require_text("name", &self.name, BORROWER_NAME_MAX)
    }
}

impl Display for Borrower {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.user_type.label())
    }
}
