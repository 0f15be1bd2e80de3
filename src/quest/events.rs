//! Quest Event Types
//!
//! Reports flow into the journal; updates flow out of it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::definition::{ObjectiveCategory, ObjectiveKey};
use super::state::QuestState;

/// A countable change relevant to objective progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub category: ObjectiveCategory,
    pub target_id: String,
    /// Signed: negative when progress is lost
    pub delta: i32,
}

impl Report {
    pub fn new(category: ObjectiveCategory, target_id: impl Into<String>, delta: i32) -> Self {
        Self {
            category,
            target_id: target_id.into(),
            delta,
        }
    }

    pub fn item(item_id: impl Into<String>, delta: i32) -> Self {
        Self::new(ObjectiveCategory::Item, item_id, delta)
    }

    pub fn monster(monster_id: impl Into<String>, delta: i32) -> Self {
        Self::new(ObjectiveCategory::Monster, monster_id, delta)
    }

    pub fn quest(quest_id: impl Into<String>, delta: i32) -> Self {
        Self::new(ObjectiveCategory::Quest, quest_id, delta)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {:+}", self.category, self.target_id, self.delta)
    }
}

/// Gameplay events that can trigger quest progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuestEvent {
    /// Player killed a monster
    MonsterKilled {
        /// Entity prototype ID (e.g., "wolf", "slime")
        entity_type: String,
    },

    /// Items entered the player's inventory
    ItemCollected { item_id: String, count: i32 },

    /// Items left the player's inventory (used, dropped, sold)
    ItemLost { item_id: String, count: i32 },

    /// Player talked to an NPC
    NpcInteraction { npc_id: String },

    /// Player reached a location
    LocationReached { location_id: String },
}

impl From<QuestEvent> for Report {
    fn from(event: QuestEvent) -> Self {
        match event {
            QuestEvent::MonsterKilled { entity_type } => Report::monster(entity_type, 1),
            QuestEvent::ItemCollected { item_id, count } => Report::item(item_id, count),
            QuestEvent::ItemLost { item_id, count } => Report::item(item_id, count.saturating_neg()),
            QuestEvent::NpcInteraction { npc_id } => {
                Report::new(ObjectiveCategory::Npc, npc_id, 1)
            }
            QuestEvent::LocationReached { location_id } => {
                Report::new(ObjectiveCategory::Location, location_id, 1)
            }
        }
    }
}

/// Outbound notification of a quest transition, for UI refresh and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QuestUpdate {
    Accepted {
        quest_id: String,
        state: QuestState,
    },
    Progressed {
        quest_id: String,
        objective: ObjectiveKey,
        current: i32,
        required: i32,
    },
    /// Every objective is met; the quest waits at its completion giver
    BecameCompletable {
        quest_id: String,
        completion_giver_id: String,
    },
    /// Lost progress dropped a ready quest back to active
    Regressed { quest_id: String },
    Completed { quest_id: String },
    Cancelled { quest_id: String },
}
