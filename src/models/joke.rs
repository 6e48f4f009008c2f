use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ObjectId;

/// A stored joke.
///
/// `updated_at` is never earlier than `created_at`; the store enforces this
/// when applying updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joke {
    /// Unique identifier, assigned at creation and never reassigned
    pub id: ObjectId,
    /// The joke text (non-empty)
    pub joke: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Joke {
    /// Create a new joke with a fresh identifier.
    ///
    /// Both timestamps come from a single clock reading so a freshly created
    /// joke always has `updated_at == created_at`.
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            joke: text.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields changed by an update.
///
/// The creation timestamp is deliberately absent: it belongs to the stored
/// document and is never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JokeUpdate {
    /// Identifier of the joke to update
    pub id: ObjectId,
    /// Replacement text
    pub joke: String,
    /// New modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl JokeUpdate {
    /// Build an update stamped with the current time.
    pub fn now(id: ObjectId, text: impl Into<String>) -> Self {
        Self {
            id,
            joke: text.into(),
            updated_at: Utc::now(),
        }
    }
}
