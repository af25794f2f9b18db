use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a logical database connection (the data source
/// container, not one of its sessions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Data source descriptor handed to a sweep job by the idle detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceInfo {
    pub id: ResourceId,
    pub name: String,
}

impl DataSourceInfo {
    pub fn new(id: impl Into<ResourceId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
        }
    }
}

/// What a session is opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionPurpose {
    /// Statements typed by the user
    User,
    /// Data filters issued on behalf of the user
    UserFilter,
    /// Script execution
    UserScript,
    /// Internal housekeeping (pings, idle rollbacks)
    Util,
    /// Metadata reads
    Meta,
    /// Metadata modifications
    MetaDdl,
}

impl ExecutionPurpose {
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User | Self::UserFilter | Self::UserScript)
    }
}

/// Named point inside a transaction that a rollback can stop at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint {
    pub id: u64,
    pub name: Option<String>,
}

impl Savepoint {
    pub fn new(id: u64, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
        }
    }
}

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Information,
    Warning,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Information => write!(f, "INFO"),
            MessageType::Warning => write!(f, "WARNING"),
            MessageType::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_display() {
        let id = ResourceId::from("ds-1");
        assert_eq!(id.to_string(), "ds-1");
        assert_eq!(id.as_str(), "ds-1");
        assert_eq!(id, ResourceId::new(String::from("ds-1")));
    }

    #[test]
    fn test_purpose_classification() {
        assert!(ExecutionPurpose::UserScript.is_user());
        assert!(!ExecutionPurpose::Util.is_user());
        assert!(!ExecutionPurpose::MetaDdl.is_user());
    }
}
