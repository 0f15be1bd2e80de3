//! Quest State Tracking
//!
//! One accepted quest: its progress ledger, its state, and the transitions
//! that move it between quest givers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::api::{GiverRegistry, QuestContext};
use super::definition::{Objective, ObjectiveCategory, ObjectiveKey, QuestDefinition};
use super::events::{QuestUpdate, Report};
use crate::error::QuestError;

/// Status of an accepted quest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    /// In progress
    Active,
    /// All objectives met, ready to turn in
    Completable,
    /// Turned in, rewards granted
    Complete,
    /// Abandoned by the player
    Cancelled,
}

impl QuestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestState::Active => "active",
            QuestState::Completable => "completable",
            QuestState::Complete => "complete",
            QuestState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestState::Complete | QuestState::Cancelled)
    }
}

/// Saved progress on a single objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub category: ObjectiveCategory,
    pub target_id: String,
    pub count: i32,
}

/// The minimal state needed to resume a quest instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSave {
    pub quest_id: String,
    pub giver_id: String,
    pub state: QuestState,
    pub progress: Vec<ProgressEntry>,
}

/// An accepted quest and its progress ledger
#[derive(Debug, Clone)]
pub struct QuestInstance {
    definition: Arc<QuestDefinition>,
    giver_id: String,
    completion_giver_id: String,
    state: QuestState,
    /// Current count per objective; keys are exactly the definition's objectives
    ledger: HashMap<ObjectiveKey, i32>,
    accepted_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    /// Accept `definition` from `giver_id`.
    ///
    /// Item objectives start at the player's current held count, so a quest
    /// for items already carried may be completable straight away.
    pub fn accept(
        definition: Arc<QuestDefinition>,
        giver_id: &str,
        ctx: &mut QuestContext<'_>,
    ) -> Result<Self, QuestError> {
        let completion_giver_id = definition.completion_giver().to_string();
        ctx.givers.resolve(&completion_giver_id)?;

        let ledger = definition
            .objectives
            .iter()
            .map(|o| {
                let count = match o.category {
                    ObjectiveCategory::Item => ctx.inventory.held_count(&o.target_id),
                    _ => 0,
                };
                (o.key(), count)
            })
            .collect();

        let mut instance = Self {
            definition,
            giver_id: giver_id.to_string(),
            completion_giver_id,
            state: QuestState::Active,
            ledger,
            accepted_at: Utc::now(),
            resolved_at: None,
        };

        ctx.givers.remove_offer(&instance.giver_id, &instance.definition.id);

        if instance.check_completable() {
            instance.mark_completable(ctx);
        }

        info!("Quest '{}' accepted from '{}'", instance.id(), instance.giver_id);
        ctx.notify(QuestUpdate::Accepted {
            quest_id: instance.definition.id.clone(),
            state: instance.state,
        });

        Ok(instance)
    }

    /// Rebuild an instance from saved progress and bring the giver lists
    /// back in line with it.
    pub fn resume(
        save: &QuestSave,
        definition: Arc<QuestDefinition>,
        ctx: &mut QuestContext<'_>,
    ) -> Result<Self, QuestError> {
        let instance = Self::from_save(save, definition, &*ctx.givers)?;
        instance.reattach(&mut *ctx.givers);
        debug!("Quest '{}' resumed as {}", instance.id(), instance.state.as_str());
        Ok(instance)
    }

    /// Check a save against its definition without touching any giver.
    ///
    /// Non-terminal states are re-derived from the saved ledger.
    pub(crate) fn from_save(
        save: &QuestSave,
        definition: Arc<QuestDefinition>,
        givers: &dyn GiverRegistry,
    ) -> Result<Self, QuestError> {
        let mismatch = |reason: String| QuestError::SaveMismatch {
            quest_id: save.quest_id.clone(),
            reason,
        };

        if save.quest_id != definition.id {
            return Err(mismatch(format!("save is for definition '{}'", definition.id)));
        }

        givers.resolve(&save.giver_id)?;
        let completion_giver_id = definition.completion_giver().to_string();
        givers.resolve(&completion_giver_id)?;

        let mut ledger = HashMap::with_capacity(save.progress.len());
        for entry in &save.progress {
            let key = ObjectiveKey::new(entry.category, entry.target_id.clone());
            if definition.get_objective(&key).is_none() {
                return Err(mismatch(format!("unknown objective {}", key)));
            }
            if ledger.insert(key.clone(), entry.count).is_some() {
                return Err(mismatch(format!("objective {} saved twice", key)));
            }
        }
        if let Some(missing) = definition
            .objectives
            .iter()
            .find(|o| !ledger.contains_key(&o.key()))
        {
            return Err(mismatch(format!("objective {} missing", missing.key())));
        }

        let mut instance = Self {
            definition,
            giver_id: save.giver_id.clone(),
            completion_giver_id,
            state: save.state,
            ledger,
            accepted_at: Utc::now(),
            resolved_at: None,
        };

        if save.state.is_terminal() {
            instance.resolved_at = Some(Utc::now());
        } else {
            instance.state = if instance.check_completable() {
                QuestState::Completable
            } else {
                QuestState::Active
            };
            if instance.state != save.state {
                warn!(
                    "Quest '{}' saved as {} but its progress says {}",
                    instance.id(),
                    save.state.as_str(),
                    instance.state.as_str()
                );
            }
        }

        Ok(instance)
    }

    /// Put a rebuilt instance back on its givers' lists
    pub(crate) fn reattach(&self, givers: &mut dyn GiverRegistry) {
        match self.state {
            // Cancelled quests stay on offer
            QuestState::Cancelled => {}
            QuestState::Active | QuestState::Complete => {
                givers.remove_offer(&self.giver_id, &self.definition.id);
            }
            QuestState::Completable => {
                givers.remove_offer(&self.giver_id, &self.definition.id);
                givers.add_ready(&self.completion_giver_id, &self.definition);
            }
        }
    }

    /// Apply a progress report. Returns false if the report was ignored.
    ///
    /// A quest that is ready to turn in accepts no further positive
    /// progress, but losing progress can drop it back to active.
    pub fn receive_report(&mut self, report: &Report, ctx: &mut QuestContext<'_>) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        if report.delta == 0 {
            return false;
        }

        if self.state == QuestState::Completable && report.delta > 0 {
            return false;
        }

        for objective in &self.definition.objectives {
            if !objective.matches(report.category, &report.target_id) {
                continue;
            }

            let key = objective.key();
            let Some(current) = self.ledger.get_mut(&key) else {
                continue;
            };
            *current = current.saturating_add(report.delta);

            debug!(
                "Quest '{}' objective {} now {}/{}",
                self.definition.id, key, current, objective.required_count
            );
            ctx.notify(QuestUpdate::Progressed {
                quest_id: self.definition.id.clone(),
                objective: key,
                current: *current,
                required: objective.required_count,
            });
        }

        let was_completable = self.state == QuestState::Completable;
        if self.check_completable() {
            if !was_completable {
                self.mark_completable(ctx);
            }
        } else {
            if was_completable {
                ctx.givers
                    .remove_ready(&self.completion_giver_id, &self.definition.id);
                info!("Quest '{}' is no longer ready to turn in", self.id());
                ctx.notify(QuestUpdate::Regressed {
                    quest_id: self.definition.id.clone(),
                });
            }
            self.state = QuestState::Active;
        }

        true
    }

    /// Turn the quest in. Returns false unless it is completable.
    pub fn complete(&mut self, ctx: &mut QuestContext<'_>) -> bool {
        if self.state != QuestState::Completable {
            return false;
        }

        ctx.givers
            .remove_ready(&self.completion_giver_id, &self.definition.id);

        self.state = QuestState::Complete;
        self.resolved_at = Some(Utc::now());

        let rewards = &self.definition.rewards;
        ctx.stats.add_gold(rewards.gold);
        ctx.stats.add_exp(rewards.exp);
        for (item_id, count) in &rewards.items {
            ctx.inventory.grant(item_id, *count);
            ctx.emit_inventory_report(Report::item(item_id.clone(), *count));
        }

        for objective in &self.definition.objectives {
            if objective.category != ObjectiveCategory::Item || !objective.remove_on_completion {
                continue;
            }

            let consumed = ctx
                .inventory
                .consume(&objective.target_id, objective.required_count);
            if consumed {
                ctx.emit_inventory_report(Report::item(
                    objective.target_id.clone(),
                    -objective.required_count,
                ));
            } else {
                error!(
                    "Quest '{}' turned in without {} x{} in the inventory",
                    self.definition.id, objective.target_id, objective.required_count
                );
            }
            debug_assert!(
                consumed,
                "quest ledger claimed items the inventory does not hold"
            );
        }

        info!(
            "Quest '{}' completed: +{} gold, +{} exp",
            self.definition.id, rewards.gold, rewards.exp
        );
        ctx.notify(QuestUpdate::Completed {
            quest_id: self.definition.id.clone(),
        });
        ctx.emit_report(Report::quest(self.definition.id.clone(), 1));

        true
    }

    /// Abandon the quest and put it back on offer. Returns false if the
    /// quest was already resolved.
    pub fn cancel(&mut self, ctx: &mut QuestContext<'_>) -> bool {
        if self.state.is_terminal() {
            warn!(
                "Ignoring cancel of quest '{}' in state {}",
                self.definition.id,
                self.state.as_str()
            );
            return false;
        }

        if self.state == QuestState::Completable {
            ctx.givers
                .remove_ready(&self.completion_giver_id, &self.definition.id);
        }

        self.state = QuestState::Cancelled;
        self.resolved_at = Some(Utc::now());
        ctx.givers.add_offer(&self.giver_id, &self.definition);

        info!("Quest '{}' cancelled", self.definition.id);
        ctx.notify(QuestUpdate::Cancelled {
            quest_id: self.definition.id.clone(),
        });
        ctx.emit_report(Report::quest(self.definition.id.clone(), -1));

        true
    }

    fn mark_completable(&mut self, ctx: &mut QuestContext<'_>) {
        self.state = QuestState::Completable;
        ctx.givers
            .add_ready(&self.completion_giver_id, &self.definition);
        info!(
            "Quest '{}' ready to turn in at '{}'",
            self.definition.id, self.completion_giver_id
        );
        ctx.notify(QuestUpdate::BecameCompletable {
            quest_id: self.definition.id.clone(),
            completion_giver_id: self.completion_giver_id.clone(),
        });
    }

    /// Every objective has reached its required count
    fn check_completable(&self) -> bool {
        self.definition.objectives.iter().all(|o| {
            self.ledger
                .get(&o.key())
                .is_some_and(|count| *count >= o.required_count)
        })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &Arc<QuestDefinition> {
        &self.definition
    }

    pub fn giver_id(&self) -> &str {
        &self.giver_id
    }

    pub fn completion_giver_id(&self) -> &str {
        &self.completion_giver_id
    }

    pub fn state(&self) -> QuestState {
        self.state
    }

    pub fn progress(&self, key: &ObjectiveKey) -> Option<i32> {
        self.ledger.get(key).copied()
    }

    /// Objectives with their current counts, in definition order
    pub fn objectives(&self) -> impl Iterator<Item = (&Objective, i32)> + '_ {
        self.definition
            .objectives
            .iter()
            .map(|o| (o, self.ledger.get(&o.key()).copied().unwrap_or(0)))
    }

    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn to_save(&self) -> QuestSave {
        QuestSave {
            quest_id: self.definition.id.clone(),
            giver_id: self.giver_id.clone(),
            state: self.state,
            progress: self
                .objectives()
                .map(|(o, count)| ProgressEntry {
                    category: o.category,
                    target_id: o.target_id.clone(),
                    count,
                })
                .collect(),
        }
    }
}
