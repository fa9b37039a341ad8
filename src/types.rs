/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Statement kinds the query builder can render.
/// Also used in affected-row errors to name the failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Insert,
    Update,
    SoftDelete,
    Select,
    Count,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "create",
            Operation::Update => "update",
            Operation::SoftDelete => "soft delete",
            Operation::Select => "select",
            Operation::Count => "count",
            Operation::Delete => "hard delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
