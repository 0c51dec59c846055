//! Versioned record payload
//!
//! A record is the unit the admin edits: identity, type information, a title
//! and free-form fields. Stage rows and version-history rows hold full copies
//! of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RecordId;

/// Submitted form values, keyed by field name.
pub type FormData = Map<String, Value>;

/// Form keys that map onto the record title.
const TITLE_KEYS: [&str; 2] = ["Title", "title"];

/// Form keys that must never overwrite the identity.
const ID_KEYS: [&str; 2] = ["ID", "id"];

/// A record of a versioned type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identity.
    pub id: RecordId,
    /// Concrete class of the record.
    pub class_name: String,
    /// Root table of the class hierarchy; stages and history are keyed by it.
    pub base_table: String,
    /// Display title.
    pub title: String,
    /// All other field values.
    pub fields: Map<String, Value>,
    /// Set by the store on every write.
    pub last_edited: Option<DateTime<Utc>>,
    /// Forces the next write to create a version even without field changes.
    #[serde(skip)]
    pub force_changed: bool,
}

impl Record {
    /// Creates an empty record of the given class.
    pub fn new(
        id: RecordId,
        class_name: impl Into<String>,
        base_table: impl Into<String>,
    ) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            base_table: base_table.into(),
            title: String::new(),
            fields: Map::new(),
            last_edited: None,
            force_changed: false,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets a single field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Merges submitted form values into this record.
    ///
    /// Title keys update the title, id keys are ignored, everything else is
    /// written into the field map.
    pub fn save_from(&mut self, form: &FormData) {
        for (key, value) in form {
            if ID_KEYS.contains(&key.as_str()) {
                continue;
            }
            if TITLE_KEYS.contains(&key.as_str()) {
                self.title = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Marks the record as changed regardless of its field values.
    pub fn force_change(&mut self) {
        self.force_changed = true;
    }

    /// True if `other` carries the same title and fields.
    pub fn same_content(&self, other: &Record) -> bool {
        self.title == other.title && self.fields == other.fields
    }
}
