//! Repeatable upgrades
//!
//! Each upgrade drives one gameplay parameter through a monotonic, capped
//! formula of its level. Costs grow geometrically.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Price of every upgrade at level 0
pub const INITIAL_UPGRADE_COST: u64 = 1;
/// Multiplicative cost growth per purchase (rounded up)
pub const COST_GROWTH: f64 = 1.25;

/// Cost after one more purchase. Always strictly greater than `cost`.
pub fn next_cost(cost: u64) -> u64 {
    let grown = (cost as f64 * COST_GROWTH).ceil() as u64;
    grown.max(cost.saturating_add(1))
}

/// Progression axes, in shop display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKey {
    BlockValue,
    CannonInterval,
    MaxBlocks,
    PlayerSpeed,
    BlockDespawnTime,
}

impl UpgradeKey {
    pub const ALL: [UpgradeKey; 5] = [
        UpgradeKey::BlockValue,
        UpgradeKey::CannonInterval,
        UpgradeKey::MaxBlocks,
        UpgradeKey::PlayerSpeed,
        UpgradeKey::BlockDespawnTime,
    ];

    /// Stable key used in saves
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeKey::BlockValue => "blockValue",
            UpgradeKey::CannonInterval => "cannonInterval",
            UpgradeKey::MaxBlocks => "maxBlocks",
            UpgradeKey::PlayerSpeed => "playerSpeed",
            UpgradeKey::BlockDespawnTime => "blockDespawnTime",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            UpgradeKey::BlockValue => "Block Value",
            UpgradeKey::CannonInterval => "Cannon Speed",
            UpgradeKey::MaxBlocks => "Max Blocks",
            UpgradeKey::PlayerSpeed => "Player Speed",
            UpgradeKey::BlockDespawnTime => "Block Despawn Time",
        }
    }

    /// Parameter value at level 0
    pub fn base(&self) -> f64 {
        match self {
            UpgradeKey::BlockValue => BLOCK_BASE_VALUE,
            UpgradeKey::CannonInterval => BASE_SHOOT_INTERVAL_SECS,
            UpgradeKey::MaxBlocks => BASE_MAX_BLOCKS,
            UpgradeKey::PlayerSpeed => BASE_PLAYER_SPEED,
            UpgradeKey::BlockDespawnTime => BASE_BLOCK_DESPAWN_SECS,
        }
    }

    /// Parameter value at a given level (monotonic, capped)
    pub fn value_at(&self, level: u32) -> f64 {
        let lvl = level as f64;
        let base = self.base();
        match self {
            UpgradeKey::BlockValue => (base * 1.2f64.powf(lvl)).min(BLOCK_VALUE_CAP),
            UpgradeKey::CannonInterval => (base * 0.9f64.powf(lvl)).max(CANNON_INTERVAL_FLOOR),
            UpgradeKey::MaxBlocks => (base + lvl).min(MAX_BLOCKS_CAP),
            UpgradeKey::PlayerSpeed => (base * 1.15f64.powf(lvl)).min(PLAYER_SPEED_CAP),
            UpgradeKey::BlockDespawnTime => (base + 0.5 * lvl).min(BLOCK_DESPAWN_CAP),
        }
    }

    /// Presentation of a parameter value
    pub fn format_value(&self, value: f64) -> String {
        match self {
            UpgradeKey::BlockValue => format!("{:.2}", value),
            UpgradeKey::CannonInterval => format!("{:.2}s", value),
            UpgradeKey::MaxBlocks => format!("{}", value.floor() as i64),
            UpgradeKey::PlayerSpeed => format!("{:.1}", value),
            UpgradeKey::BlockDespawnTime => format!("{:.1}s", value),
        }
    }
}

/// One upgrade's current state
#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    key: UpgradeKey,
    level: u32,
    cost: u64,
}

impl Upgrade {
    pub fn new(key: UpgradeKey) -> Self {
        Self {
            key,
            level: 0,
            cost: INITIAL_UPGRADE_COST,
        }
    }

    pub fn key(&self) -> UpgradeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Current purchase price
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Parameter value at the current level
    pub fn value(&self) -> f64 {
        self.key.value_at(self.level)
    }

    /// Parameter value after one more purchase
    pub fn next_value(&self) -> f64 {
        self.key.value_at(self.level.saturating_add(1))
    }

    /// Change the next purchase would make (magnitude, for display)
    pub fn value_increase(&self) -> f64 {
        (self.next_value() - self.value()).abs()
    }

    pub fn format_value(&self, value: f64) -> String {
        self.key.format_value(value)
    }

    pub fn record(&self) -> UpgradeRecord {
        UpgradeRecord {
            key: self.key,
            level: self.level,
            cost: self.cost,
        }
    }

    fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
        self.cost = next_cost(self.cost);
    }
}

/// Persisted form of an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRecord {
    pub key: UpgradeKey,
    pub level: u32,
    pub cost: u64,
}

/// Registry of all upgrades, in display order
#[derive(Debug, Clone)]
pub struct UpgradeSystem {
    upgrades: Vec<Upgrade>,
}

impl Default for UpgradeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeSystem {
    pub fn new() -> Self {
        Self {
            upgrades: UpgradeKey::ALL.into_iter().map(Upgrade::new).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Upgrade> {
        self.upgrades.iter()
    }

    pub fn get(&self, key: UpgradeKey) -> &Upgrade {
        // Built from UpgradeKey::ALL, so every key is present
        &self.upgrades[Self::index(key)]
    }

    pub fn records(&self) -> Vec<UpgradeRecord> {
        self.upgrades.iter().map(Upgrade::record).collect()
    }

    /// Bump level and cost; returns the updated upgrade
    pub(super) fn level_up(&mut self, key: UpgradeKey) -> &Upgrade {
        let upgrade = &mut self.upgrades[Self::index(key)];
        upgrade.level_up();
        upgrade
    }

    /// Put a saved level/cost back. Costs below the initial price are raised to it.
    pub(super) fn restore(&mut self, record: &UpgradeRecord) {
        let upgrade = &mut self.upgrades[Self::index(record.key)];
        upgrade.level = record.level;
        upgrade.cost = record.cost.max(INITIAL_UPGRADE_COST);
    }

    pub(super) fn reset(&mut self) {
        for upgrade in &mut self.upgrades {
            *upgrade = Upgrade::new(upgrade.key);
        }
    }

    fn index(key: UpgradeKey) -> usize {
        match key {
            UpgradeKey::BlockValue => 0,
            UpgradeKey::CannonInterval => 1,
            UpgradeKey::MaxBlocks => 2,
            UpgradeKey::PlayerSpeed => 3,
            UpgradeKey::BlockDespawnTime => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cost_growth_rounds_up() {
        assert_eq!(next_cost(1), 2);
        assert_eq!(next_cost(2), 3);
        assert_eq!(next_cost(3), 4);
        assert_eq!(next_cost(8), 10);
    }

    #[test]
    fn test_level_zero_is_base() {
        for key in UpgradeKey::ALL {
            assert_eq!(key.value_at(0), key.base(), "{:?}", key);
        }
    }

    #[test]
    fn test_documented_caps() {
        assert_eq!(UpgradeKey::CannonInterval.value_at(10_000), CANNON_INTERVAL_FLOOR);
        assert_eq!(UpgradeKey::MaxBlocks.value_at(10_000), MAX_BLOCKS_CAP);
        assert_eq!(UpgradeKey::PlayerSpeed.value_at(10_000), PLAYER_SPEED_CAP);
        assert_eq!(UpgradeKey::BlockDespawnTime.value_at(10_000), BLOCK_DESPAWN_CAP);
        assert_eq!(UpgradeKey::BlockValue.value_at(u32::MAX), BLOCK_VALUE_CAP);
    }

    #[test]
    fn test_block_value_first_level() {
        assert!((UpgradeKey::BlockValue.value_at(1) - 1.2).abs() < 1e-12);
        assert_eq!(UpgradeKey::MaxBlocks.value_at(2), 5.0);
        assert_eq!(UpgradeKey::BlockDespawnTime.value_at(1), 1.0);
    }

    #[test]
    fn test_key_names_match_saved_form() {
        for key in UpgradeKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn test_formatting() {
        assert_eq!(UpgradeKey::BlockValue.format_value(1.2), "1.20");
        assert_eq!(UpgradeKey::CannonInterval.format_value(4.5), "4.50s");
        assert_eq!(UpgradeKey::MaxBlocks.format_value(4.0), "4");
        assert_eq!(UpgradeKey::PlayerSpeed.format_value(6.9), "6.9");
        assert_eq!(UpgradeKey::BlockDespawnTime.format_value(1.0), "1.0s");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut system = UpgradeSystem::new();
        system.level_up(UpgradeKey::PlayerSpeed);
        system.level_up(UpgradeKey::PlayerSpeed);
        system.reset();
        let speed = system.get(UpgradeKey::PlayerSpeed);
        assert_eq!(speed.level(), 0);
        assert_eq!(speed.cost(), INITIAL_UPGRADE_COST);
    }

    #[test]
    fn test_cannon_interval_decreases_others_increase() {
        let interval = Upgrade::new(UpgradeKey::CannonInterval);
        assert!(interval.next_value() < interval.value());
        assert!((interval.value_increase() - 0.5).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_cost_strictly_increases(cost in 1u64..1_000_000_000) {
            prop_assert!(next_cost(cost) > cost);
        }

        #[test]
        fn prop_values_are_monotonic_and_capped(level in 0u32..5_000) {
            for key in UpgradeKey::ALL {
                let now = key.value_at(level);
                let next = key.value_at(level + 1);
                match key {
                    UpgradeKey::CannonInterval => {
                        prop_assert!(next <= now);
                        prop_assert!(next >= CANNON_INTERVAL_FLOOR);
                    }
                    _ => prop_assert!(next >= now),
                }
                prop_assert!(now.is_finite());
            }
            prop_assert!(UpgradeKey::MaxBlocks.value_at(level) <= MAX_BLOCKS_CAP);
            prop_assert!(UpgradeKey::PlayerSpeed.value_at(level) <= PLAYER_SPEED_CAP);
            prop_assert!(UpgradeKey::BlockDespawnTime.value_at(level) <= BLOCK_DESPAWN_CAP);
            prop_assert!(UpgradeKey::BlockValue.value_at(level) <= BLOCK_VALUE_CAP);
        }
    }
}
