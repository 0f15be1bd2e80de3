use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::DefinitionError;
use crate::quest::api::GiverRegistry;
use crate::quest::definition::QuestDefinition;

// ============================================================================
// Quest Giver
// ============================================================================

/// Raw giver entry as it appears in TOML (keyed by NPC id)
#[derive(Debug, Clone, Deserialize)]
pub struct RawGiver {
    pub display_name: String,
}

/// An NPC that offers quests and takes turn-ins
#[derive(Debug, Clone)]
pub struct QuestGiver {
    pub id: String,
    pub display_name: String,
    /// Quests the player can accept here
    offers: Vec<Arc<QuestDefinition>>,
    /// Quests the player can turn in here
    ready: Vec<Arc<QuestDefinition>>,
}

impl QuestGiver {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            offers: Vec::new(),
            ready: Vec::new(),
        }
    }

    pub fn offers(&self) -> &[Arc<QuestDefinition>] {
        &self.offers
    }

    pub fn ready(&self) -> &[Arc<QuestDefinition>] {
        &self.ready
    }

    /// Whether the giver should show a quest marker
    pub fn has_quest_activity(&self) -> bool {
        !self.offers.is_empty() || !self.ready.is_empty()
    }
}

fn add_unique(list: &mut Vec<Arc<QuestDefinition>>, quest: &Arc<QuestDefinition>) {
    if !list.iter().any(|q| q.id == quest.id) {
        list.push(Arc::clone(quest));
    }
}

fn remove_by_id(list: &mut Vec<Arc<QuestDefinition>>, quest_id: &str) {
    list.retain(|q| q.id != quest_id);
}

// ============================================================================
// NPC Directory
// ============================================================================

/// All quest givers, keyed by NPC id
#[derive(Debug, Default)]
pub struct NpcDirectory {
    givers: HashMap<String, QuestGiver>,
}

impl NpcDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all giver definitions from `<data_dir>/givers`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), DefinitionError> {
        let givers_dir = data_dir.join("givers");

        if !givers_dir.exists() {
            warn!("Givers directory does not exist: {:?}", givers_dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(&givers_dir).map_err(|source| DefinitionError::Io {
            path: givers_dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| DefinitionError::Io {
                path: givers_dir.clone(),
                source,
            })?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "toml") {
                let content = std::fs::read_to_string(&path).map_err(|source| DefinitionError::Io {
                    path: path.clone(),
                    source,
                })?;

                // Parse as table of givers
                let table: HashMap<String, RawGiver> =
                    toml::from_str(&content).map_err(|source| DefinitionError::Parse {
                        path: path.clone(),
                        source,
                    })?;

                for (id, raw) in table {
                    if self.givers.contains_key(&id) {
                        warn!("Duplicate giver ID '{}' in {:?}, overwriting", id, path);
                    }
                    self.insert(QuestGiver::new(&id, &raw.display_name));
                }
            }
        }

        info!("Loaded {} quest givers", self.givers.len());
        Ok(())
    }

    pub fn insert(&mut self, giver: QuestGiver) {
        self.givers.insert(giver.id.clone(), giver);
    }

    pub fn get(&self, giver_id: &str) -> Option<&QuestGiver> {
        self.givers.get(giver_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &QuestGiver> {
        self.givers.values()
    }

    pub fn len(&self) -> usize {
        self.givers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.givers.is_empty()
    }

    fn giver_mut(&mut self, giver_id: &str) -> Option<&mut QuestGiver> {
        let giver = self.givers.get_mut(giver_id);
        if giver.is_none() {
            warn!("Quest giver '{}' not found", giver_id);
        }
        giver
    }
}

impl GiverRegistry for NpcDirectory {
    fn contains(&self, giver_id: &str) -> bool {
        self.givers.contains_key(giver_id)
    }

    fn add_offer(&mut self, giver_id: &str, quest: &Arc<QuestDefinition>) {
        if let Some(giver) = self.giver_mut(giver_id) {
            add_unique(&mut giver.offers, quest);
        }
    }

    fn remove_offer(&mut self, giver_id: &str, quest_id: &str) {
        if let Some(giver) = self.giver_mut(giver_id) {
            remove_by_id(&mut giver.offers, quest_id);
        }
    }

    fn add_ready(&mut self, giver_id: &str, quest: &Arc<QuestDefinition>) {
        if let Some(giver) = self.giver_mut(giver_id) {
            add_unique(&mut giver.ready, quest);
        }
    }

    fn remove_ready(&mut self, giver_id: &str, quest_id: &str) {
        if let Some(giver) = self.giver_mut(giver_id) {
            remove_by_id(&mut giver.ready, quest_id);
        }
    }

    fn is_offering(&self, giver_id: &str, quest_id: &str) -> bool {
        self.get(giver_id)
            .is_some_and(|g| g.offers.iter().any(|q| q.id == quest_id))
    }

    fn is_ready(&self, giver_id: &str, quest_id: &str) -> bool {
        self.get(giver_id)
            .is_some_and(|g| g.ready.iter().any(|q| q.id == quest_id))
    }
}
