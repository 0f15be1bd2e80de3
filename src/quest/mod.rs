//! Quest System Module
//!
//! TOML-defined quests with per-objective progress ledgers, quest-giver
//! hand-off, and completion reports that drive quest chains.

pub mod api;
pub mod definition;
pub mod events;
pub mod journal;
pub mod registry;
pub mod state;

pub use api::{GiverRegistry, Inventory, PlayerStats, QuestContext};
pub use definition::{Objective, ObjectiveCategory, ObjectiveKey, QuestDefinition, Reward};
pub use events::{QuestEvent, QuestUpdate, Report};
pub use journal::{JournalSettings, QuestJournal};
pub use registry::QuestRegistry;
pub use state::{ProgressEntry, QuestInstance, QuestSave, QuestState};
