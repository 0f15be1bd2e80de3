//! Quest Registry
//!
//! Loads, validates, and caches quest definitions from TOML files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::api::GiverRegistry;
use super::definition::{QuestDefinition, RawQuestFile};
use crate::error::DefinitionError;

/// Registry for all quest definitions
#[derive(Debug, Default)]
pub struct QuestRegistry {
    quests: HashMap<String, Arc<QuestDefinition>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all quest definitions from `<data_dir>/quests`, recursively.
    /// Returns the number of quests loaded.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, DefinitionError> {
        let quests_dir = data_dir.join("quests");
        info!("Loading quests from {:?}", quests_dir);

        if !quests_dir.exists() {
            warn!("Quest directory does not exist: {:?}", quests_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_toml_files(&quests_dir, &mut paths)?;
        paths.sort();

        for path in &paths {
            self.load_quest_file(path)?;
        }

        info!("Loaded {} quest definitions", paths.len());
        Ok(paths.len())
    }

    /// Load a single quest file
    fn load_quest_file(&mut self, path: &Path) -> Result<(), DefinitionError> {
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: RawQuestFile = toml::from_str(&content).map_err(|source| DefinitionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let quest = QuestDefinition::from_raw(&raw.quest)?;
        info!("Loaded quest: {} ({})", quest.name, quest.id);
        self.insert(quest)
    }

    /// Add a definition; ids must be unique
    pub fn insert(&mut self, quest: QuestDefinition) -> Result<(), DefinitionError> {
        quest.validate()?;
        if self.quests.contains_key(&quest.id) {
            return Err(DefinitionError::DuplicateQuest(quest.id));
        }
        self.quests.insert(quest.id.clone(), Arc::new(quest));
        Ok(())
    }

    /// Cross-check definitions against each other and the known givers.
    ///
    /// Unknown givers and quest chain cycles are errors. A quest objective
    /// naming a quest that doesn't exist can never be met, which is logged.
    pub fn validate(&self, givers: &dyn GiverRegistry) -> Result<(), DefinitionError> {
        for quest in self.sorted() {
            for giver_id in [quest.giver_id.as_str(), quest.completion_giver()] {
                if !givers.contains(giver_id) {
                    return Err(DefinitionError::UnknownGiver {
                        quest_id: quest.id.clone(),
                        giver_id: giver_id.to_string(),
                    });
                }
            }

            for required in quest.required_quests() {
                if !self.quests.contains_key(required) {
                    warn!(
                        "Quest '{}' references non-existent quest '{}'",
                        quest.id, required
                    );
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(DefinitionError::ChainCycle(cycle));
        }

        Ok(())
    }

    /// Put every quest on offer at its giver
    pub fn populate_offers(&self, givers: &mut dyn GiverRegistry) {
        for quest in self.sorted() {
            givers.add_offer(&quest.giver_id, quest);
        }
    }

    /// A quest whose completion depends, through quest objectives, on itself
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            id: &'a str,
            quests: &'a HashMap<String, Arc<QuestDefinition>>,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(id) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|p| *p == id).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|p| p.to_string()).collect();
                    cycle.push(id.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            let quest = quests.get(id)?;
            marks.insert(id, Mark::Visiting);
            path.push(id);
            for required in quest.required_quests() {
                if let Some(cycle) = visit(required, quests, marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(id, Mark::Done);
            None
        }

        let mut ids: Vec<&str> = self.quests.keys().map(String::as_str).collect();
        ids.sort_unstable();

        let mut marks = HashMap::new();
        for id in ids {
            let mut path = Vec::new();
            if let Some(cycle) = visit(id, &self.quests, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// Length of the longest quest chain, counted in completion reports.
    ///
    /// Assumes the chains are acyclic; a cycle is cut where it closes.
    pub fn longest_chain(&self) -> usize {
        fn depth<'a>(
            id: &'a str,
            quests: &'a HashMap<String, Arc<QuestDefinition>>,
            memo: &mut HashMap<&'a str, usize>,
            visiting: &mut Vec<&'a str>,
        ) -> usize {
            if let Some(known) = memo.get(id) {
                return *known;
            }
            let Some(quest) = quests.get(id) else {
                return 0;
            };
            if visiting.contains(&id) {
                return 0;
            }

            visiting.push(id);
            let deepest = quest
                .required_quests()
                .filter(|required| quests.contains_key(*required))
                .map(|required| depth(required, quests, memo, visiting) + 1)
                .max()
                .unwrap_or(0);
            visiting.pop();

            memo.insert(id, deepest);
            deepest
        }

        let mut memo = HashMap::new();
        let mut visiting = Vec::new();
        self.quests
            .keys()
            .map(|id| depth(id, &self.quests, &mut memo, &mut visiting))
            .max()
            .unwrap_or(0)
    }

    fn sorted(&self) -> Vec<&Arc<QuestDefinition>> {
        let mut quests: Vec<_> = self.quests.values().collect();
        quests.sort_by(|a, b| a.id.cmp(&b.id));
        quests
    }

    /// Get a quest by ID
    pub fn get(&self, quest_id: &str) -> Option<Arc<QuestDefinition>> {
        self.quests.get(quest_id).cloned()
    }

    /// Get all quest IDs
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.quests.keys()
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<QuestDefinition>> {
        self.quests.values()
    }

    /// Get quests offered by a specific NPC
    pub fn quests_for_giver(&self, giver_id: &str) -> Vec<Arc<QuestDefinition>> {
        self.sorted()
            .into_iter()
            .filter(|q| q.giver_id == giver_id)
            .cloned()
            .collect()
    }

    /// Quests that count `quest_id`'s completion toward an objective
    pub fn dependents(&self, quest_id: &str) -> Vec<Arc<QuestDefinition>> {
        self.sorted()
            .into_iter()
            .filter(|q| q.required_quests().any(|id| id == quest_id))
            .cloned()
            .collect()
    }

    pub fn contains(&self, quest_id: &str) -> bool {
        self.quests.contains_key(quest_id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

/// Recursively collect `.toml` files under `dir`
fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), DefinitionError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DefinitionError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| DefinitionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}
