//! Quest Collaborator API
//!
//! The ports a quest instance talks to, and the context object that carries
//! them into every quest operation.

use std::collections::VecDeque;
use std::sync::Arc;

use super::definition::QuestDefinition;
use super::events::{QuestUpdate, Report};
use crate::error::QuestError;

/// Player item storage
pub trait Inventory {
    fn held_count(&self, item_id: &str) -> i32;
    fn grant(&mut self, item_id: &str, count: i32);
    /// Remove `count` items. Returns false (and removes nothing) if short.
    fn consume(&mut self, item_id: &str, count: i32) -> bool;
}

/// Player gold and experience
pub trait PlayerStats {
    fn add_gold(&mut self, amount: i32);
    fn add_exp(&mut self, amount: i32);
}

/// Lookup of quest givers and their offer / ready-to-turn-in lists
pub trait GiverRegistry {
    fn contains(&self, giver_id: &str) -> bool;

    fn resolve(&self, giver_id: &str) -> Result<(), QuestError> {
        if self.contains(giver_id) {
            Ok(())
        } else {
            Err(QuestError::GiverNotFound(giver_id.to_string()))
        }
    }

    fn add_offer(&mut self, giver_id: &str, quest: &Arc<QuestDefinition>);
    fn remove_offer(&mut self, giver_id: &str, quest_id: &str);
    fn add_ready(&mut self, giver_id: &str, quest: &Arc<QuestDefinition>);
    fn remove_ready(&mut self, giver_id: &str, quest_id: &str);

    fn is_offering(&self, giver_id: &str, quest_id: &str) -> bool;
    fn is_ready(&self, giver_id: &str, quest_id: &str) -> bool;
}

/// Reports and updates produced while a quest operation runs
#[derive(Debug, Default)]
pub struct Outbox {
    reports: VecDeque<Report>,
    inventory_reports: VecDeque<Report>,
    updates: Vec<QuestUpdate>,
}

/// Context object passed to every quest operation
///
/// Borrows the player's ports for the duration of a call and collects
/// whatever the call emits.
pub struct QuestContext<'a> {
    pub inventory: &'a mut dyn Inventory,
    pub stats: &'a mut dyn PlayerStats,
    pub givers: &'a mut dyn GiverRegistry,
    outbox: Outbox,
}

impl<'a> QuestContext<'a> {
    pub fn new(
        inventory: &'a mut dyn Inventory,
        stats: &'a mut dyn PlayerStats,
        givers: &'a mut dyn GiverRegistry,
    ) -> Self {
        Self {
            inventory,
            stats,
            givers,
            outbox: Outbox::default(),
        }
    }

    /// Queue a report for the journal to broadcast
    pub(crate) fn emit_report(&mut self, report: Report) {
        self.outbox.reports.push_back(report);
    }

    /// Queue a report describing an inventory change made by a quest
    pub(crate) fn emit_inventory_report(&mut self, report: Report) {
        self.outbox.inventory_reports.push_back(report);
    }

    pub(crate) fn notify(&mut self, update: QuestUpdate) {
        self.outbox.updates.push(update);
    }

    pub(crate) fn take_report(&mut self) -> Option<Report> {
        self.outbox.reports.pop_front()
    }

    pub(crate) fn take_inventory_report(&mut self) -> Option<Report> {
        self.outbox.inventory_reports.pop_front()
    }

    pub(crate) fn discard_reports(&mut self) {
        self.outbox.reports.clear();
        self.outbox.inventory_reports.clear();
    }

    /// Reports emitted but not yet broadcast
    pub fn pending_reports(&self) -> impl Iterator<Item = &Report> {
        self.outbox.inventory_reports.iter().chain(self.outbox.reports.iter())
    }

    pub fn updates(&self) -> &[QuestUpdate] {
        &self.outbox.updates
    }

    /// Take every update emitted so far
    pub fn drain_updates(&mut self) -> Vec<QuestUpdate> {
        std::mem::take(&mut self.outbox.updates)
    }
}
