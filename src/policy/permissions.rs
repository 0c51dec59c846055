//! Permission checks
//!
//! Authentication lives outside this crate. The workflow only asks yes/no
//! questions about a record through `RecordPermissions`.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Caller permissions on records.
pub trait RecordPermissions: Send + Sync {
    fn can_edit(&self, record: &Record) -> bool;

    fn can_delete(&self, record: &Record) -> bool;

    fn can_publish(&self, record: &Record) -> bool;

    /// Removing the Live copy needs the same right as publishing it.
    fn can_delete_from_live(&self, record: &Record) -> bool {
        self.can_publish(record)
    }

    /// Identity recorded in the audit log.
    fn operator(&self) -> Option<&str> {
        None
    }
}

/// Fixed set of grants, independent of the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    pub edit: bool,
    pub delete: bool,
    pub publish: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl Grants {
    /// Every permission.
    pub fn all() -> Self {
        Self {
            edit: true,
            delete: true,
            publish: true,
            operator: None,
        }
    }

    /// No permission at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Edit and delete drafts, but not publish.
    pub fn author() -> Self {
        Self {
            edit: true,
            delete: true,
            ..Self::default()
        }
    }

    pub fn with_edit(mut self, allowed: bool) -> Self {
        self.edit = allowed;
        self
    }

    pub fn with_delete(mut self, allowed: bool) -> Self {
        self.delete = allowed;
        self
    }

    pub fn with_publish(mut self, allowed: bool) -> Self {
        self.publish = allowed;
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

impl RecordPermissions for Grants {
    fn can_edit(&self, _record: &Record) -> bool {
        self.edit
    }

    fn can_delete(&self, _record: &Record) -> bool {
        self.delete
    }

    fn can_publish(&self, _record: &Record) -> bool {
        self.publish
    }

    fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn test_delete_from_live_follows_publish() {
        let record = Record::new(RecordId::Persisted(1), "Page", "Page");
        assert!(Grants::all().can_delete_from_live(&record));
        assert!(!Grants::author().can_delete_from_live(&record));
    }

    #[test]
    fn test_builders() {
        let grants = Grants::none().with_publish(true).with_operator("ops");
        let record = Record::new(RecordId::Persisted(1), "Page", "Page");
        assert!(grants.can_publish(&record));
        assert!(!grants.can_edit(&record));
        assert_eq!(grants.operator(), Some("ops"));
    }
}
