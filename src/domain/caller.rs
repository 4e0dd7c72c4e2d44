use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Anonymous,
}

/// Who is invoking an operation, as established by the transport layer.
///
/// Passed explicitly into every operation that needs it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Caller {
    pub role: Role,
    pub id: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            role: Role::Anonymous,
            id: None,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            role: Role::Admin,
            id: Some(id.into()),
        }
    }

    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            role: Role::Staff,
            id: Some(id.into()),
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Staff)
    }

    /// Fails with `Forbidden` unless the caller is admin or staff.
    pub fn require_operator(&self, action: &'static str) -> Result<()> {
        if self.is_operator() {
            Ok(())
        } else {
            Err(TrackerError::Forbidden(action))
        }
    }
}
