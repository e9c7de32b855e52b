//! One-time store unlocks

use serde::{Deserialize, Serialize};

/// Catalogue keys, in store display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreItemKey {
    UnlockUpgrades,
    GoldenCannon,
    UnlockJump,
}

impl StoreItemKey {
    pub const ALL: [StoreItemKey; 3] = [
        StoreItemKey::UnlockUpgrades,
        StoreItemKey::GoldenCannon,
        StoreItemKey::UnlockJump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreItemKey::UnlockUpgrades => "unlockUpgrades",
            StoreItemKey::GoldenCannon => "goldenCannon",
            StoreItemKey::UnlockJump => "unlockJump",
        }
    }

    fn catalogue(&self) -> (&'static str, u64, &'static str) {
        match self {
            StoreItemKey::UnlockUpgrades => {
                ("Upgrade Shop", 100, "Unlocks the Upgrade Shop.")
            }
            StoreItemKey::GoldenCannon => {
                ("Golden Cannon", 250, "Gives your cannon a shiny golden finish.")
            }
            StoreItemKey::UnlockJump => ("Jump", 200, "Unlocks the ability to jump."),
        }
    }
}

/// A store entry and whether it has been bought
#[derive(Debug, Clone, PartialEq)]
pub struct StoreItem {
    pub key: StoreItemKey,
    pub name: &'static str,
    pub cost: u64,
    pub description: &'static str,
    pub purchased: bool,
}

impl StoreItem {
    pub fn new(key: StoreItemKey) -> Self {
        let (name, cost, description) = key.catalogue();
        Self {
            key,
            name,
            cost,
            description,
            purchased: false,
        }
    }

    pub fn record(&self) -> StoreItemRecord {
        StoreItemRecord {
            key: self.key,
            purchased: self.purchased,
        }
    }
}

/// Persisted form of a store item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreItemRecord {
    pub key: StoreItemKey,
    pub purchased: bool,
}

/// All store items, in display order
#[derive(Debug, Clone)]
pub struct StoreSystem {
    items: Vec<StoreItem>,
}

impl Default for StoreSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSystem {
    pub fn new() -> Self {
        Self {
            items: StoreItemKey::ALL.into_iter().map(StoreItem::new).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreItem> {
        self.items.iter()
    }

    pub fn get(&self, key: StoreItemKey) -> Option<&StoreItem> {
        self.items.iter().find(|item| item.key == key)
    }

    pub fn is_purchased(&self, key: StoreItemKey) -> bool {
        self.get(key).is_some_and(|item| item.purchased)
    }

    pub fn records(&self) -> Vec<StoreItemRecord> {
        self.items.iter().map(StoreItem::record).collect()
    }

    /// Flip the purchased flag; returns the updated item
    pub(super) fn mark_purchased(&mut self, key: StoreItemKey) -> Option<&StoreItem> {
        let item = self.items.iter_mut().find(|item| item.key == key)?;
        item.purchased = true;
        Some(item)
    }

    pub(crate) fn restore(&mut self, record: &StoreItemRecord) {
        if let Some(item) = self.items.iter_mut().find(|item| item.key == record.key) {
            item.purchased = record.purchased;
        }
    }

    pub(crate) fn reset(&mut self) {
        for item in &mut self.items {
            item.purchased = false;
        }
    }
}
