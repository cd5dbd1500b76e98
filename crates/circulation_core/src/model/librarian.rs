//! Librarian staff record.

use crate::model::asset::AssetRef;
use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const LIBRARIAN_NAME_MAX: usize = 200;
pub const EMPLOYEE_ID_MAX: usize = 50;

/// Staff member. Keyed by `employee_id`; has no relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Librarian {
    pub name: String,
    /// Unique staff identifier.
    pub employee_id: String,
    pub photo: Option<AssetRef>,
    /// Free-text notes.
    pub info: Option<String>,
}

impl Librarian {
    pub fn new(name: impl Into<String>, employee_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            employee_id: employee_id.into(),
            photo: None,
            info: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("employee_id", &self.employee_id, EMPLOYEE_ID_MAX)?;
        require_text("name", &self.name, LIBRARIAN_NAME_MAX)
    }
}

impl Display for Librarian {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
