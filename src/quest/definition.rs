//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files and then resolved
//! into immutable definitions shared by every instance of a quest.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub giver_npc: String,
    /// NPC that takes the turn-in, when it isn't the giver
    #[serde(default)]
    pub complete_npc: Option<String>,
    #[serde(default)]
    pub auto_complete: bool,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub rewards: Option<RawReward>,
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    #[serde(rename = "type")]
    pub category: String,
    pub target: String,
    #[serde(default = "default_count")]
    pub count: i32,
    /// Take the items from the player on turn-in
    #[serde(default)]
    pub remove_on_completion: bool,
}

fn default_count() -> i32 {
    1
}

/// Raw reward as it appears in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReward {
    #[serde(default)]
    pub exp: i32,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub items: Vec<RawItemReward>,
}

/// Item reward entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawItemReward {
    pub id: String,
    #[serde(default = "default_count")]
    pub count: i32,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// What kind of countable thing an objective tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveCategory {
    /// Hold X items of type Y
    Item,
    /// Kill X monsters of type Y
    Monster,
    /// Complete another quest
    Quest,
    /// Talk to a specific NPC
    Npc,
    /// Reach a specific location
    Location,
}

impl ObjectiveCategory {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "item" | "collect_item" | "collect" => Some(ObjectiveCategory::Item),
            "monster" | "kill_monster" | "kill" => Some(ObjectiveCategory::Monster),
            "quest" | "complete_quest" => Some(ObjectiveCategory::Quest),
            "npc" | "talk_to" | "talk" => Some(ObjectiveCategory::Npc),
            "location" | "reach_location" | "reach" => Some(ObjectiveCategory::Location),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveCategory::Item => "item",
            ObjectiveCategory::Monster => "monster",
            ObjectiveCategory::Quest => "quest",
            ObjectiveCategory::Npc => "npc",
            ObjectiveCategory::Location => "location",
        }
    }
}

impl fmt::Display for ObjectiveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an objective within a definition: compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectiveKey {
    pub category: ObjectiveCategory,
    pub target_id: String,
}

impl ObjectiveKey {
    pub fn new(category: ObjectiveCategory, target_id: impl Into<String>) -> Self {
        Self {
            category,
            target_id: target_id.into(),
        }
    }
}

impl fmt::Display for ObjectiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.target_id)
    }
}

/// A resolved quest objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Objective {
    pub category: ObjectiveCategory,
    /// Target item/monster/quest/npc/location ID
    pub target_id: String,
    pub required_count: i32,
    pub remove_on_completion: bool,
}

impl Objective {
    pub fn new(category: ObjectiveCategory, target_id: impl Into<String>, required_count: i32) -> Self {
        Self {
            category,
            target_id: target_id.into(),
            required_count,
            remove_on_completion: false,
        }
    }

    /// Consume the tracked items when the quest is turned in
    pub fn removed_on_completion(mut self) -> Self {
        self.remove_on_completion = true;
        self
    }

    pub fn key(&self) -> ObjectiveKey {
        ObjectiveKey::new(self.category, self.target_id.clone())
    }

    pub fn matches(&self, category: ObjectiveCategory, target_id: &str) -> bool {
        self.category == category && self.target_id == target_id
    }

    pub fn from_raw(raw: &RawObjective) -> Option<Self> {
        let category = ObjectiveCategory::from_str(&raw.category)?;
        Some(Self {
            category,
            target_id: raw.target.clone(),
            required_count: raw.count,
            remove_on_completion: raw.remove_on_completion,
        })
    }
}

/// Quest rewards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub gold: i32,
    pub exp: i32,
    /// item_id -> count
    pub items: BTreeMap<String, i32>,
}

impl Reward {
    pub fn from_raw(raw: &RawReward) -> Self {
        let mut items = BTreeMap::new();
        for item in &raw.items {
            *items.entry(item.id.clone()).or_insert(0) += item.count;
        }
        Self {
            gold: raw.gold,
            exp: raw.exp,
            items,
        }
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone, Serialize)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// NPC that offers this quest
    pub giver_id: String,
    /// NPC that accepts the turn-in; the giver when `None`
    pub completion_giver_id: Option<String>,
    /// Complete as soon as every objective is met, without a turn-in
    pub auto_complete: bool,
    pub objectives: Vec<Objective>,
    pub rewards: Reward,
}

impl QuestDefinition {
    pub fn new(id: impl Into<String>, giver_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            giver_id: giver_id.into(),
            completion_giver_id: None,
            auto_complete: false,
            objectives: Vec::new(),
            rewards: Reward::default(),
        }
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_completion_giver(mut self, giver_id: impl Into<String>) -> Self {
        self.completion_giver_id = Some(giver_id.into());
        self
    }

    pub fn with_rewards(mut self, gold: i32, exp: i32) -> Self {
        self.rewards.gold = gold;
        self.rewards.exp = exp;
        self
    }

    pub fn with_reward_item(mut self, item_id: impl Into<String>, count: i32) -> Self {
        *self.rewards.items.entry(item_id.into()).or_insert(0) += count;
        self
    }

    pub fn auto_completing(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// Create a definition from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, DefinitionError> {
        let objectives = raw
            .objectives
            .iter()
            .enumerate()
            .map(|(index, o)| {
                Objective::from_raw(o).ok_or_else(|| DefinitionError::InvalidCategory {
                    quest_id: raw.id.clone(),
                    index,
                    category: o.category.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let definition = Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            giver_id: raw.giver_npc.clone(),
            completion_giver_id: raw.complete_npc.clone().filter(|id| !id.is_empty()),
            auto_complete: raw.auto_complete,
            objectives,
            rewards: raw.rewards.as_ref().map(Reward::from_raw).unwrap_or_default(),
        };

        definition.validate()?;
        Ok(definition)
    }

    /// Check the invariants authored content must hold
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.objectives.is_empty() {
            return Err(DefinitionError::NoObjectives(self.id.clone()));
        }

        let mut seen = HashSet::new();
        for objective in &self.objectives {
            let key = objective.key();
            if objective.required_count < 1 {
                return Err(DefinitionError::InvalidCount {
                    quest_id: self.id.clone(),
                    key,
                    count: objective.required_count,
                });
            }
            if !seen.insert(key.clone()) {
                return Err(DefinitionError::DuplicateObjective {
                    quest_id: self.id.clone(),
                    key,
                });
            }
        }

        let negative = |field: &str| DefinitionError::NegativeReward {
            quest_id: self.id.clone(),
            field: field.to_string(),
        };
        if self.rewards.gold < 0 {
            return Err(negative("gold"));
        }
        if self.rewards.exp < 0 {
            return Err(negative("exp"));
        }
        if let Some((item_id, _)) = self.rewards.items.iter().find(|(_, count)| **count < 0) {
            return Err(negative(item_id));
        }

        Ok(())
    }

    /// The NPC that accepts the turn-in
    pub fn completion_giver(&self) -> &str {
        self.completion_giver_id.as_deref().unwrap_or(&self.giver_id)
    }

    pub fn get_objective(&self, key: &ObjectiveKey) -> Option<&Objective> {
        self.objectives
            .iter()
            .find(|o| o.matches(key.category, &key.target_id))
    }

    /// Quests whose completion this quest counts toward its objectives
    pub fn required_quests(&self) -> impl Iterator<Item = &str> {
        self.objectives
            .iter()
            .filter(|o| o.category == ObjectiveCategory::Quest)
            .map(|o| o.target_id.as_str())
    }
}
