use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque task identifier. Fresh ids are UUID v4 strings; ids read back
/// from the slot are kept verbatim, whatever scheme wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do item. The serde shape is the storage contract: `text`
/// (with `title` accepted as a legacy spelling on read) and `date` as an
/// RFC 3339 string, omitted entirely while no due date is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(alias = "title")]
    pub text: String,
    pub completed: bool,
    #[serde(
        rename = "date",
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due: Option<OffsetDateTime>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            text: text.into(),
            completed: false,
            due: None,
        }
    }

    pub fn with_due(text: impl Into<String>, due: OffsetDateTime) -> Self {
        Self {
            due: Some(due),
            ..Self::new(text)
        }
    }
}
