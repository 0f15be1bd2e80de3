//! Error types for quest content and quest runtime.

use std::path::PathBuf;

use crate::quest::definition::ObjectiveKey;

/// Authoring errors found while loading or validating quest content.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("quest '{quest_id}': invalid objective type '{category}' at index {index}")]
    InvalidCategory {
        quest_id: String,
        index: usize,
        category: String,
    },

    #[error("quest '{0}' has no objectives")]
    NoObjectives(String),

    #[error("quest '{quest_id}': objective {key} requires {count}, must be at least 1")]
    InvalidCount {
        quest_id: String,
        key: ObjectiveKey,
        count: i32,
    },

    #[error("quest '{quest_id}': negative reward '{field}'")]
    NegativeReward { quest_id: String, field: String },

    #[error("quest '{quest_id}': duplicate objective {key}")]
    DuplicateObjective { quest_id: String, key: ObjectiveKey },

    #[error("duplicate quest id '{0}'")]
    DuplicateQuest(String),

    #[error("quest '{quest_id}' references unknown quest giver '{giver_id}'")]
    UnknownGiver { quest_id: String, giver_id: String },

    #[error("quest chain cycle: {}", .0.join(" -> "))]
    ChainCycle(Vec<String>),
}

/// Failures of quest journal and quest instance operations.
///
/// Rejections that are an expected part of play (a report that doesn't
/// apply, turning in a quest that isn't ready) are plain `false` returns,
/// not errors.
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("quest giver '{0}' not found")]
    GiverNotFound(String),

    #[error("quest '{0}' not found")]
    QuestNotFound(String),

    #[error("quest '{quest_id}' is not offered by '{giver_id}'")]
    NotOffered { quest_id: String, giver_id: String },

    #[error("quest '{0}' is already active")]
    AlreadyActive(String),

    #[error("quest '{0}' is not active")]
    NotActive(String),

    #[error("report {report} exceeded the quest chain depth limit of {limit}")]
    ChainTooDeep { report: String, limit: usize },

    #[error("save for quest '{quest_id}' does not match its definition: {reason}")]
    SaveMismatch { quest_id: String, reason: String },
}

/// Errors loading [`crate::config::QuestConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
