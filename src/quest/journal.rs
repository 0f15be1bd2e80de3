//! Quest Journal
//!
//! Tracks the player's accepted quests and broadcasts progress reports to
//! every active one. Completion and cancellation reports emitted by quests
//! are fed back in, so finishing one quest can advance (or auto-complete)
//! another within the same call.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::api::QuestContext;
use super::definition::QuestDefinition;
use super::events::Report;
use super::registry::QuestRegistry;
use super::state::{QuestInstance, QuestSave, QuestState};
use crate::error::QuestError;

/// Runtime knobs for the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalSettings {
    /// Longest completion cascade one call may trigger
    pub max_chain_depth: usize,
    /// Feed reward grants and turn-in consumption back as item reports
    pub inventory_reports: bool,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            max_chain_depth: 32,
            inventory_reports: true,
        }
    }
}

/// Reports waiting to be broadcast, with the cascade depth that produced them
type ReportQueue = VecDeque<(Report, usize)>;

/// All of the player's quests, active and resolved
#[derive(Debug, Default)]
pub struct QuestJournal {
    settings: JournalSettings,
    /// Non-terminal quests, in acceptance order
    active: Vec<QuestInstance>,
    /// Completed and cancelled quests, in resolution order
    history: Vec<QuestInstance>,
}

impl QuestJournal {
    pub fn new(settings: JournalSettings) -> Self {
        Self {
            settings,
            active: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn settings(&self) -> &JournalSettings {
        &self.settings
    }

    /// Accept a quest currently offered by `giver_id`
    pub fn accept(
        &mut self,
        ctx: &mut QuestContext<'_>,
        definition: Arc<QuestDefinition>,
        giver_id: &str,
    ) -> Result<QuestState, QuestError> {
        let quest_id = definition.id.clone();

        if self.position(&quest_id).is_some() {
            return Err(QuestError::AlreadyActive(quest_id));
        }

        ctx.givers.resolve(giver_id)?;
        if !ctx.givers.is_offering(giver_id, &quest_id) {
            return Err(QuestError::NotOffered {
                quest_id,
                giver_id: giver_id.to_string(),
            });
        }

        let instance = QuestInstance::accept(definition, giver_id, ctx)?;
        self.active.push(instance);

        let mut queue = ReportQueue::new();
        self.settle(ctx, 0, &mut queue);
        self.drain(ctx, queue)?;

        Ok(self.state_of(&quest_id))
    }

    /// Broadcast a report to every active quest. Returns how many accepted it.
    ///
    /// `ChainTooDeep` means the report and the cascade up to the limit were
    /// applied, rewards included; only the reports past the limit were
    /// dropped.
    pub fn receive_report(
        &mut self,
        ctx: &mut QuestContext<'_>,
        report: Report,
    ) -> Result<usize, QuestError> {
        let mut queue = ReportQueue::new();
        let accepted = self.dispatch(ctx, &report, 0, &mut queue);
        self.drain(ctx, queue)?;
        Ok(accepted)
    }

    /// Turn in an active quest. Returns false if it isn't ready.
    ///
    /// On `ChainTooDeep` the quest is still complete and its rewards are
    /// granted; the completion reports past the limit were dropped.
    pub fn complete(&mut self, ctx: &mut QuestContext<'_>, quest_id: &str) -> Result<bool, QuestError> {
        let index = self
            .position(quest_id)
            .ok_or_else(|| QuestError::NotActive(quest_id.to_string()))?;

        if !self.active[index].complete(ctx) {
            debug!("Quest '{}' is not ready to complete", quest_id);
            return Ok(false);
        }

        let mut queue = ReportQueue::new();
        self.settle(ctx, 0, &mut queue);
        self.drain(ctx, queue)?;
        Ok(true)
    }

    /// Abandon an active quest
    pub fn cancel(&mut self, ctx: &mut QuestContext<'_>, quest_id: &str) -> Result<bool, QuestError> {
        let index = self
            .position(quest_id)
            .ok_or_else(|| QuestError::NotActive(quest_id.to_string()))?;

        if !self.active[index].cancel(ctx) {
            return Ok(false);
        }

        let mut queue = ReportQueue::new();
        self.settle(ctx, 0, &mut queue);
        self.drain(ctx, queue)?;
        Ok(true)
    }

    /// Fan one report out to every active quest, then settle the results
    fn dispatch(
        &mut self,
        ctx: &mut QuestContext<'_>,
        report: &Report,
        depth: usize,
        queue: &mut ReportQueue,
    ) -> usize {
        let mut accepted = 0;
        for instance in &mut self.active {
            if instance.receive_report(report, ctx) {
                accepted += 1;
            }
        }
        debug!("Report {} accepted by {} quest(s) at depth {}", report, accepted, depth);

        self.settle(ctx, depth, queue);
        accepted
    }

    /// Complete ready auto-complete quests, retire resolved ones, and queue
    /// whatever they emitted one level deeper.
    fn settle(&mut self, ctx: &mut QuestContext<'_>, depth: usize, queue: &mut ReportQueue) {
        for instance in &mut self.active {
            if instance.definition().auto_complete && instance.state() == QuestState::Completable {
                instance.complete(ctx);
            }
        }

        self.retire_resolved();

        while let Some(report) = ctx.take_inventory_report() {
            if self.settings.inventory_reports {
                queue.push_back((report, depth + 1));
            }
        }
        while let Some(report) = ctx.take_report() {
            queue.push_back((report, depth + 1));
        }
    }

    fn drain(&mut self, ctx: &mut QuestContext<'_>, mut queue: ReportQueue) -> Result<(), QuestError> {
        while let Some((report, depth)) = queue.pop_front() {
            if depth > self.settings.max_chain_depth {
                error!(
                    "Quest chain exceeded depth {} at report {}, dropping it and {} pending report(s); \
                     quests resolved before the limit stay resolved",
                    self.settings.max_chain_depth,
                    report,
                    queue.len()
                );
                ctx.discard_reports();
                return Err(QuestError::ChainTooDeep {
                    report: report.to_string(),
                    limit: self.settings.max_chain_depth,
                });
            }
            self.dispatch(ctx, &report, depth, &mut queue);
        }
        Ok(())
    }

    fn retire_resolved(&mut self) {
        if !self.active.iter().any(|q| q.state().is_terminal()) {
            return;
        }
        let (resolved, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|q| q.state().is_terminal());
        self.active = active;
        self.history.extend(resolved);
    }

    fn position(&self, quest_id: &str) -> Option<usize> {
        self.active.iter().position(|q| q.id() == quest_id)
    }

    fn state_of(&self, quest_id: &str) -> QuestState {
        self.get(quest_id)
            .map(QuestInstance::state)
            .unwrap_or(QuestState::Cancelled)
    }

    /// The active instance of a quest, else its most recent resolved one
    pub fn get(&self, quest_id: &str) -> Option<&QuestInstance> {
        self.active
            .iter()
            .find(|q| q.id() == quest_id)
            .or_else(|| self.history.iter().rev().find(|q| q.id() == quest_id))
    }

    pub fn active(&self) -> &[QuestInstance] {
        &self.active
    }

    pub fn history(&self) -> &[QuestInstance] {
        &self.history
    }

    pub fn is_active(&self, quest_id: &str) -> bool {
        self.position(quest_id).is_some()
    }

    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.history
            .iter()
            .any(|q| q.id() == quest_id && q.state() == QuestState::Complete)
    }

    /// Save data for every quest, resolved ones first
    pub fn snapshot(&self) -> Vec<QuestSave> {
        self.history
            .iter()
            .chain(self.active.iter())
            .map(QuestInstance::to_save)
            .collect()
    }

    /// Rebuild the journal from save data.
    ///
    /// Every save is checked before anything is applied, so a failed
    /// restore leaves the journal and the givers as they were.
    pub fn restore(
        &mut self,
        ctx: &mut QuestContext<'_>,
        saves: &[QuestSave],
        registry: &QuestRegistry,
    ) -> Result<(), QuestError> {
        let mut restored: Vec<QuestInstance> = Vec::with_capacity(saves.len());
        for save in saves {
            let definition = registry
                .get(&save.quest_id)
                .ok_or_else(|| QuestError::QuestNotFound(save.quest_id.clone()))?;

            let instance = QuestInstance::from_save(save, definition, &*ctx.givers)?;
            if !instance.state().is_terminal()
                && (self.is_active(instance.id())
                    || restored
                        .iter()
                        .any(|q| !q.state().is_terminal() && q.id() == instance.id()))
            {
                return Err(QuestError::AlreadyActive(instance.id().to_string()));
            }
            restored.push(instance);
        }

        for instance in restored {
            instance.reattach(&mut *ctx.givers);
            if instance.state().is_terminal() {
                self.history.push(instance);
            } else {
                self.active.push(instance);
            }
        }

        info!(
            "Restored {} active and {} resolved quest(s)",
            self.active.len(),
            self.history.len()
        );

        let mut queue = ReportQueue::new();
        self.settle(ctx, 0, &mut queue);
        self.drain(ctx, queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Backpack, PlayerStatus};
    use crate::npc::{NpcDirectory, QuestGiver};
    use crate::quest::api::{GiverRegistry, Inventory};
    use crate::quest::definition::{Objective, ObjectiveCategory, ObjectiveKey};
    use crate::quest::events::{QuestEvent, QuestUpdate};
    use crate::quest::state::ProgressEntry;

    /// Registry plus givers with every quest on offer
    fn world(quests: Vec<QuestDefinition>) -> (QuestRegistry, NpcDirectory) {
        let mut registry = QuestRegistry::new();
        for quest in quests {
            registry.insert(quest).unwrap();
        }
        let mut npcs = NpcDirectory::new();
        npcs.insert(QuestGiver::new("elder", "Elder"));
        npcs.insert(QuestGiver::new("tanner", "Tanner"));
        registry.populate_offers(&mut npcs);
        (registry, npcs)
    }

    fn kill(id: &str, giver: &str, monster: &str, count: i32) -> QuestDefinition {
        QuestDefinition::new(id, giver).with_objective(Objective::new(ObjectiveCategory::Monster, monster, count))
    }

    fn after(id: &str, giver: &str, previous: &str) -> QuestDefinition {
        QuestDefinition::new(id, giver).with_objective(Objective::new(ObjectiveCategory::Quest, previous, 1))
    }

    fn quest_key(id: &str) -> ObjectiveKey {
        ObjectiveKey::new(ObjectiveCategory::Quest, id)
    }

    /// Ledger and state agree for every tracked quest
    fn assert_coherent(journal: &QuestJournal) {
        for quest in journal.active() {
            let met = quest.objectives().all(|(o, count)| count >= o.required_count);
            assert_eq!(met, quest.state() == QuestState::Completable, "quest {}", quest.id());
        }
    }

    #[test]
    fn test_report_reaches_every_active_quest() {
        let (registry, mut npcs) = world(vec![
            kill("wolves", "elder", "wolf", 2),
            kill("more_wolves", "tanner", "wolf", 3),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("wolves").unwrap(), "elder").unwrap();
        journal.accept(&mut ctx, registry.get("more_wolves").unwrap(), "tanner").unwrap();

        let accepted = journal.receive_report(&mut ctx, Report::monster("wolf", 2)).unwrap();
        assert_eq!(accepted, 2);
        assert_eq!(journal.get("wolves").unwrap().state(), QuestState::Completable);
        assert_eq!(journal.get("more_wolves").unwrap().state(), QuestState::Active);

        // The completable quest refuses more; the other keeps counting
        let accepted = journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();
        assert_eq!(accepted, 1);
        assert_eq!(journal.get("more_wolves").unwrap().state(), QuestState::Completable);
        assert_coherent(&journal);
    }

    #[test]
    fn test_zero_delta_changes_nothing() {
        let (registry, mut npcs) = world(vec![kill("wolves", "elder", "wolf", 2)]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("wolves").unwrap(), "elder").unwrap();
        let before = journal.snapshot();
        assert_eq!(journal.receive_report(&mut ctx, Report::monster("wolf", 0)).unwrap(), 0);
        assert_eq!(journal.snapshot(), before);
    }

    #[test]
    fn test_accept_checks_offers() {
        let (registry, mut npcs) = world(vec![kill("wolves", "elder", "wolf", 2)]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();
        let wolves = registry.get("wolves").unwrap();

        assert!(matches!(
            journal.accept(&mut ctx, Arc::clone(&wolves), "tanner"),
            Err(QuestError::NotOffered { .. })
        ));
        assert!(matches!(
            journal.accept(&mut ctx, Arc::clone(&wolves), "stranger"),
            Err(QuestError::GiverNotFound(_))
        ));

        journal.accept(&mut ctx, Arc::clone(&wolves), "elder").unwrap();
        assert!(matches!(
            journal.accept(&mut ctx, Arc::clone(&wolves), "elder"),
            Err(QuestError::AlreadyActive(_))
        ));
        assert!(matches!(
            journal.complete(&mut ctx, "nothing"),
            Err(QuestError::NotActive(_))
        ));
    }

    #[test]
    fn test_completion_advances_chained_quest() {
        let (registry, mut npcs) = world(vec![
            kill("A", "elder", "wolf", 1),
            after("B", "elder", "A"),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("A").unwrap(), "elder").unwrap();
        journal.accept(&mut ctx, registry.get("B").unwrap(), "elder").unwrap();
        journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();

        assert!(journal.complete(&mut ctx, "A").unwrap());

        let b = journal.get("B").unwrap();
        assert_eq!(b.progress(&quest_key("A")), Some(1));
        assert_eq!(b.state(), QuestState::Completable);
        assert!(ctx.givers.is_ready("elder", "B"));
        assert!(journal.is_completed("A"));
        assert!(!journal.is_active("A"));
        assert_coherent(&journal);
    }

    #[test]
    fn test_cancel_retracts_chain_credit() {
        // C counts completions of A; cancelling a later attempt retracts one
        let (registry, mut npcs) = world(vec![
            kill("A", "elder", "wolf", 1),
            after("C", "tanner", "A"),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("C").unwrap(), "tanner").unwrap();
        journal.accept(&mut ctx, registry.get("A").unwrap(), "elder").unwrap();
        assert!(journal.cancel(&mut ctx, "A").unwrap());

        let c = journal.get("C").unwrap();
        assert_eq!(c.progress(&quest_key("A")), Some(-1));
        assert_eq!(c.state(), QuestState::Active);
        assert!(ctx.givers.is_offering("elder", "A"));
        assert_eq!(journal.get("A").unwrap().state(), QuestState::Cancelled);

        // Re-accepting creates a fresh instance
        journal.accept(&mut ctx, registry.get("A").unwrap(), "elder").unwrap();
        assert_eq!(journal.get("A").unwrap().state(), QuestState::Active);
        assert_eq!(journal.history().len(), 1);
    }

    #[test]
    fn test_auto_complete_chain_resolves_in_one_call() {
        let (registry, mut npcs) = world(vec![
            kill("A", "elder", "wolf", 1),
            after("B", "elder", "A").auto_completing().with_rewards(5, 0),
            after("C", "tanner", "B").auto_completing().with_rewards(7, 0),
            after("D", "tanner", "C"),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        for (id, giver) in [("A", "elder"), ("B", "elder"), ("C", "tanner"), ("D", "tanner")] {
            journal.accept(&mut ctx, registry.get(id).unwrap(), giver).unwrap();
        }
        journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();
        assert!(journal.complete(&mut ctx, "A").unwrap());

        assert!(journal.is_completed("B"));
        assert!(journal.is_completed("C"));
        assert_eq!(journal.get("D").unwrap().state(), QuestState::Completable);
        assert_eq!(journal.active().len(), 1);

        let completed: Vec<_> = ctx
            .drain_updates()
            .into_iter()
            .filter_map(|u| match u {
                QuestUpdate::Completed { quest_id } => Some(quest_id),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec!["A", "B", "C"]);
        drop(ctx);
        assert_eq!(stats.gold, 12);
    }

    #[test]
    fn test_chain_depth_guard() {
        let (registry, mut npcs) = world(vec![
            kill("A", "elder", "wolf", 1),
            after("B", "elder", "A").auto_completing(),
            after("C", "elder", "B").auto_completing(),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::new(JournalSettings {
            max_chain_depth: 1,
            inventory_reports: true,
        });

        for id in ["A", "B", "C"] {
            journal.accept(&mut ctx, registry.get(id).unwrap(), "elder").unwrap();
        }
        journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();

        let result = journal.complete(&mut ctx, "A");
        assert!(matches!(result, Err(QuestError::ChainTooDeep { limit: 1, .. })));
        // The turn-in itself stands
        assert!(journal.is_completed("A"));
        assert!(!journal.is_active("A"));
        // B completed at depth 1; its report was dropped before reaching C
        assert!(journal.is_completed("B"));
        assert_eq!(journal.get("C").unwrap().state(), QuestState::Active);
        assert_eq!(ctx.pending_reports().count(), 0);
    }

    #[test]
    fn test_turn_in_consumption_updates_other_item_quests() {
        let pelts = QuestDefinition::new("pelts", "tanner")
            .with_objective(Objective::new(ObjectiveCategory::Item, "wolf_pelt", 2).removed_on_completion());
        let coat = QuestDefinition::new("coat", "elder")
            .with_objective(Objective::new(ObjectiveCategory::Item, "wolf_pelt", 2));
        let (registry, mut npcs) = world(vec![pelts, coat]);
        let mut bag = Backpack::new().with_item("wolf_pelt", 2);
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("pelts").unwrap(), "tanner").unwrap();
        journal.accept(&mut ctx, registry.get("coat").unwrap(), "elder").unwrap();
        assert_eq!(journal.get("coat").unwrap().state(), QuestState::Completable);

        assert!(journal.complete(&mut ctx, "pelts").unwrap());
        assert_eq!(ctx.inventory.held_count("wolf_pelt"), 0);

        let coat = journal.get("coat").unwrap();
        assert_eq!(coat.state(), QuestState::Active);
        assert!(!ctx.givers.is_ready("elder", "coat"));
        assert_coherent(&journal);
    }

    #[test]
    fn test_inventory_reports_can_be_disabled() {
        let pelts = QuestDefinition::new("pelts", "tanner")
            .with_objective(Objective::new(ObjectiveCategory::Item, "wolf_pelt", 2).removed_on_completion());
        let coat = QuestDefinition::new("coat", "elder")
            .with_objective(Objective::new(ObjectiveCategory::Item, "wolf_pelt", 2));
        let (registry, mut npcs) = world(vec![pelts, coat]);
        let mut bag = Backpack::new().with_item("wolf_pelt", 2);
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::new(JournalSettings {
            max_chain_depth: 32,
            inventory_reports: false,
        });

        journal.accept(&mut ctx, registry.get("pelts").unwrap(), "tanner").unwrap();
        journal.accept(&mut ctx, registry.get("coat").unwrap(), "elder").unwrap();
        journal.complete(&mut ctx, "pelts").unwrap();

        assert_eq!(journal.get("coat").unwrap().state(), QuestState::Completable);
    }

    #[test]
    fn test_complete_twice_grants_once() {
        let (registry, mut npcs) = world(vec![kill("wolves", "elder", "wolf", 1).with_rewards(30, 40)]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("wolves").unwrap(), "elder").unwrap();
        assert!(!journal.complete(&mut ctx, "wolves").unwrap());
        journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();
        assert!(journal.complete(&mut ctx, "wolves").unwrap());
        // Resolved quests are no longer active
        assert!(matches!(
            journal.complete(&mut ctx, "wolves"),
            Err(QuestError::NotActive(_))
        ));
        drop(ctx);
        assert_eq!(stats, PlayerStatus { gold: 30, exp: 40 });
    }

    #[test]
    fn test_snapshot_and_restore() {
        let quests = || {
            vec![
                kill("A", "elder", "wolf", 1),
                kill("B", "tanner", "boar", 3),
                kill("C", "tanner", "bear", 1),
            ]
        };
        let (registry, mut npcs) = world(quests());
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        for (id, giver) in [("A", "elder"), ("B", "tanner"), ("C", "tanner")] {
            journal.accept(&mut ctx, registry.get(id).unwrap(), giver).unwrap();
        }
        journal.receive_report(&mut ctx, Report::monster("wolf", 1)).unwrap();
        journal.complete(&mut ctx, "A").unwrap();
        journal.receive_report(&mut ctx, Report::monster("boar", 2)).unwrap();
        journal.receive_report(&mut ctx, Report::monster("bear", 1)).unwrap();

        let json = serde_json::to_string(&journal.snapshot()).unwrap();
        let saves: Vec<QuestSave> = serde_json::from_str(&json).unwrap();

        let (registry, mut npcs) = world(quests());
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut restored = QuestJournal::default();
        restored.restore(&mut ctx, &saves, &registry).unwrap();

        assert!(restored.is_completed("A"));
        assert!(!ctx.givers.is_offering("elder", "A"));
        assert_eq!(
            restored.get("B").unwrap().progress(&ObjectiveKey::new(ObjectiveCategory::Monster, "boar")),
            Some(2)
        );
        assert_eq!(restored.get("C").unwrap().state(), QuestState::Completable);
        assert!(ctx.givers.is_ready("tanner", "C"));
        assert!(!ctx.givers.is_offering("tanner", "B"));
        assert_eq!(restored.snapshot(), saves);
    }

    #[test]
    fn test_shipped_village_content() {
        let data_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let mut npcs = NpcDirectory::new();
        npcs.load_from_directory(&data_dir).unwrap();
        let mut registry = QuestRegistry::new();
        registry.load_from_directory(&data_dir).unwrap();
        registry.validate(&npcs).unwrap();
        registry.populate_offers(&mut npcs);

        let mut bag = Backpack::new().with_item("wolf_pelt", 1);
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        for (id, giver) in [
            ("village_hero", "elder_villager"),
            ("wolf_pelts", "tanner"),
            ("thin_the_pack", "hunter"),
        ] {
            journal.accept(&mut ctx, registry.get(id).unwrap(), giver).unwrap();
        }

        for _ in 0..5 {
            let event = QuestEvent::MonsterKilled {
                entity_type: "wolf".to_string(),
            };
            journal.receive_report(&mut ctx, event.into()).unwrap();
        }
        assert!(ctx.givers.is_ready("elder_villager", "thin_the_pack"));

        ctx.inventory.grant("wolf_pelt", 2);
        let event = QuestEvent::ItemCollected {
            item_id: "wolf_pelt".to_string(),
            count: 2,
        };
        journal.receive_report(&mut ctx, event.into()).unwrap();
        assert!(ctx.givers.is_ready("tanner", "wolf_pelts"));

        assert!(journal.complete(&mut ctx, "thin_the_pack").unwrap());
        assert!(journal.is_active("village_hero"));
        assert!(journal.complete(&mut ctx, "wolf_pelts").unwrap());
        assert!(journal.is_completed("village_hero"));
        assert!(journal.active().is_empty());

        assert_eq!(ctx.inventory.held_count("wolf_pelt"), 0);
        assert_eq!(ctx.inventory.held_count("leather_gloves"), 1);
        assert_eq!(ctx.inventory.held_count("health_potion"), 3);
        drop(ctx);
        assert_eq!(stats, PlayerStatus { gold: 75, exp: 240 });
    }

    #[test]
    fn test_failed_restore_changes_nothing() {
        let (registry, mut npcs) = world(vec![
            kill("A", "elder", "wolf", 1),
            kill("B", "tanner", "boar", 1),
        ]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        let save = |quest_id: &str, giver_id: &str, target: &str, count: i32| QuestSave {
            quest_id: quest_id.to_string(),
            giver_id: giver_id.to_string(),
            state: QuestState::Active,
            progress: vec![ProgressEntry {
                category: ObjectiveCategory::Monster,
                target_id: target.to_string(),
                count,
            }],
        };

        // A later save for an unknown quest
        let saves = [save("A", "elder", "wolf", 1), save("gone", "elder", "wolf", 0)];
        assert!(matches!(
            journal.restore(&mut ctx, &saves, &registry),
            Err(QuestError::QuestNotFound(_))
        ));
        assert!(journal.active().is_empty());
        assert!(journal.history().is_empty());
        assert!(ctx.givers.is_offering("elder", "A"));
        assert!(!ctx.givers.is_ready("elder", "A"));

        // The same quest active twice
        let saves = [save("B", "tanner", "boar", 0), save("B", "tanner", "boar", 1)];
        assert!(matches!(
            journal.restore(&mut ctx, &saves, &registry),
            Err(QuestError::AlreadyActive(_))
        ));
        assert!(journal.active().is_empty());
        assert!(ctx.givers.is_offering("tanner", "B"));
        assert!(ctx.updates().is_empty());

        // A save that no longer fits its definition
        let saves = [save("A", "elder", "wolf", 1), save("B", "tanner", "bear", 1)];
        assert!(matches!(
            journal.restore(&mut ctx, &saves, &registry),
            Err(QuestError::SaveMismatch { .. })
        ));
        assert!(journal.active().is_empty());
        assert!(ctx.givers.is_offering("elder", "A"));
    }

    #[test]
    fn test_huge_item_report_does_not_overflow() {
        let (registry, mut npcs) = world(vec![
            QuestDefinition::new("gems", "elder").with_objective(Objective::new(ObjectiveCategory::Item, "gem", 3)),
        ]);
        let mut bag = Backpack::new().with_item("gem", 1);
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        journal.accept(&mut ctx, registry.get("gems").unwrap(), "elder").unwrap();
        let accepted = journal.receive_report(&mut ctx, Report::item("gem", i32::MAX)).unwrap();
        assert_eq!(accepted, 1);

        let gems = journal.get("gems").unwrap();
        assert_eq!(gems.progress(&ObjectiveKey::new(ObjectiveCategory::Item, "gem")), Some(i32::MAX));
        assert_eq!(gems.state(), QuestState::Completable);
        assert_coherent(&journal);
    }

    #[test]
    fn test_restore_unknown_quest() {
        let (registry, mut npcs) = world(vec![kill("A", "elder", "wolf", 1)]);
        let mut bag = Backpack::new();
        let mut stats = PlayerStatus::default();
        let mut ctx = QuestContext::new(&mut bag, &mut stats, &mut npcs);
        let mut journal = QuestJournal::default();

        let save = QuestSave {
            quest_id: "gone".to_string(),
            giver_id: "elder".to_string(),
            state: QuestState::Active,
            progress: Vec::new(),
        };
        assert!(matches!(
            journal.restore(&mut ctx, &[save], &registry),
            Err(QuestError::QuestNotFound(_))
        ));
    }
}
