use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Upvote,
    Save,
}

impl EngagementKind {
    pub fn table(self) -> &'static str {
        match self {
            EngagementKind::Upvote => "upvotes",
            EngagementKind::Save => "saved_posts",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            EngagementKind::Upvote => "upvoted",
            EngagementKind::Save => "saved",
        }
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementKind::Upvote => write!(f, "upvote"),
            EngagementKind::Save => write!(f, "save"),
        }
    }
}

/// (user, post) pair; the table carries a unique constraint on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub user_id: Uuid,
    pub post_id: Uuid,
}
