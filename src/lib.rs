pub mod config;
pub mod error;
pub mod inventory;
pub mod npc;
pub mod quest;

pub use config::QuestConfig;
pub use error::{ConfigError, DefinitionError, QuestError};
pub use inventory::{Backpack, PlayerStatus};
pub use npc::{NpcDirectory, QuestGiver};
