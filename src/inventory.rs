use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::quest::api::{Inventory, PlayerStats};

/// Item counts held by the player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Backpack {
    items: BTreeMap<String, i32>,
}

impl Backpack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item_id: &str, count: i32) -> Self {
        self.grant(item_id, count);
        self
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, i32)> {
        self.items.iter().map(|(id, count)| (id.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Inventory for Backpack {
    fn held_count(&self, item_id: &str) -> i32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    fn grant(&mut self, item_id: &str, count: i32) {
        if count <= 0 {
            return;
        }
        *self.items.entry(item_id.to_string()).or_insert(0) += count;
        debug!("Granted {} x{}", item_id, count);
    }

    fn consume(&mut self, item_id: &str, count: i32) -> bool {
        let held = self.held_count(item_id);
        if count < 0 || held < count {
            return false;
        }
        if held == count {
            self.items.remove(item_id);
        } else {
            self.items.insert(item_id.to_string(), held - count);
        }
        debug!("Consumed {} x{}", item_id, count);
        true
    }
}

/// Gold and experience totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub gold: i32,
    pub exp: i32,
}

impl PlayerStats for PlayerStatus {
    fn add_gold(&mut self, amount: i32) {
        self.gold += amount;
    }

    fn add_exp(&mut self, amount: i32) {
        self.exp += amount;
    }
}
