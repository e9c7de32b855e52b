//! Currency and progression
//!
//! [`Economy`] is the single owner of coins, upgrade levels and store unlocks.
//! It is constructed once by the host and handed by reference to whatever
//! needs it. Derived gameplay parameters are only ever recomputed from an
//! upgrade level or restored from a save, never assigned ad hoc.

mod store;
mod upgrades;

pub use store::{StoreItem, StoreItemKey, StoreItemRecord, StoreSystem};
pub use upgrades::{
    COST_GROWTH, INITIAL_UPGRADE_COST, Upgrade, UpgradeKey, UpgradeRecord, UpgradeSystem,
    next_cost,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{EventBus, GameEvent};
use crate::settings::VolumeSettings;

/// Live balance state
#[derive(Debug, Clone, PartialEq)]
pub struct EconomySettings {
    coins: i64,
    /// Kept only so old saves round-trip
    score: i64,
    block_value: f64,
    cannon_interval: f64,
    block_despawn_time: f64,
    player_speed: f64,
    max_blocks: f64,
    upgrades_unlocked: bool,
    /// Fallback copy of the sound preferences for saving
    volume: VolumeSettings,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            coins: 0,
            score: 0,
            block_value: UpgradeKey::BlockValue.base(),
            cannon_interval: UpgradeKey::CannonInterval.base(),
            block_despawn_time: UpgradeKey::BlockDespawnTime.base(),
            player_speed: UpgradeKey::PlayerSpeed.base(),
            max_blocks: UpgradeKey::MaxBlocks.base(),
            upgrades_unlocked: false,
            volume: VolumeSettings::default(),
        }
    }
}

impl EconomySettings {
    pub fn coins(&self) -> i64 {
        self.coins
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Coins per collected block (rounded on award)
    pub fn block_value(&self) -> f64 {
        self.block_value
    }

    /// Seconds between cannon shots
    pub fn cannon_interval(&self) -> f64 {
        self.cannon_interval
    }

    /// Seconds a landed block stays on the ground
    pub fn block_despawn_time(&self) -> f64 {
        self.block_despawn_time
    }

    /// Pixels per tick
    pub fn player_speed(&self) -> f64 {
        self.player_speed
    }

    /// Live block cap
    pub fn max_blocks(&self) -> f64 {
        self.max_blocks
    }

    pub fn upgrades_unlocked(&self) -> bool {
        self.upgrades_unlocked
    }

    pub fn volume(&self) -> &VolumeSettings {
        &self.volume
    }

    /// Current value of the parameter an upgrade drives
    pub fn value_of(&self, key: UpgradeKey) -> f64 {
        match key {
            UpgradeKey::BlockValue => self.block_value,
            UpgradeKey::CannonInterval => self.cannon_interval,
            UpgradeKey::MaxBlocks => self.max_blocks,
            UpgradeKey::PlayerSpeed => self.player_speed,
            UpgradeKey::BlockDespawnTime => self.block_despawn_time,
        }
    }

    fn set_value(&mut self, key: UpgradeKey, value: f64) {
        match key {
            UpgradeKey::BlockValue => self.block_value = value,
            UpgradeKey::CannonInterval => self.cannon_interval = value,
            UpgradeKey::MaxBlocks => self.max_blocks = value,
            UpgradeKey::PlayerSpeed => self.player_speed = value,
            UpgradeKey::BlockDespawnTime => self.block_despawn_time = value,
        }
    }
}

/// Serialized `gameSettings` object of a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub coins: i64,
    pub score: i64,
    pub current_block_value: f64,
    pub current_cannon_interval: f64,
    pub current_block_despawn_time: f64,
    pub current_player_speed: f64,
    pub current_max_blocks: f64,
    #[serde(flatten)]
    pub volume: VolumeSettings,
}

/// Field name in [`SettingsRecord`] holding an upgrade's current value
fn record_field(key: UpgradeKey) -> &'static str {
    match key {
        UpgradeKey::BlockValue => "currentBlockValue",
        UpgradeKey::CannonInterval => "currentCannonInterval",
        UpgradeKey::MaxBlocks => "currentMaxBlocks",
        UpgradeKey::PlayerSpeed => "currentPlayerSpeed",
        UpgradeKey::BlockDespawnTime => "currentBlockDespawnTime",
    }
}

/// Coins, upgrades and store, wired to the event bus
#[derive(Debug)]
pub struct Economy {
    settings: EconomySettings,
    upgrades: UpgradeSystem,
    store: StoreSystem,
    bus: EventBus,
}

impl Economy {
    pub fn new(bus: EventBus) -> Self {
        Self {
            settings: EconomySettings::default(),
            upgrades: UpgradeSystem::new(),
            store: StoreSystem::new(),
            bus,
        }
    }

    pub fn settings(&self) -> &EconomySettings {
        &self.settings
    }

    pub fn upgrades(&self) -> &UpgradeSystem {
        &self.upgrades
    }

    pub fn store(&self) -> &StoreSystem {
        &self.store
    }

    pub fn coins(&self) -> i64 {
        self.settings.coins
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        i64::try_from(cost).is_ok_and(|cost| self.settings.coins >= cost)
    }

    /// Apply a delta and return the new total. No floor is enforced here;
    /// purchase paths check affordability before debiting.
    pub fn change_coins(&mut self, delta: i64, silent: bool) -> i64 {
        self.settings.coins = self.settings.coins.saturating_add(delta);
        if !silent {
            self.bus.publish(GameEvent::CoinsChanged(self.settings.coins));
        }
        self.settings.coins
    }

    /// Buy one level of an upgrade. Returns false, changing nothing, if it
    /// is not affordable.
    pub fn try_purchase_upgrade(&mut self, key: UpgradeKey) -> bool {
        let cost = self.upgrades.get(key).cost();
        if !self.can_afford(cost) {
            log::debug!("Cannot afford {} ({} < {})", key.as_str(), self.coins(), cost);
            return false;
        }

        self.change_coins(-(cost as i64), true);
        let upgrade = self.upgrades.level_up(key).clone();
        self.settings.set_value(key, upgrade.value());
        log::info!(
            "Purchased {} level {} (next cost {})",
            key.as_str(),
            upgrade.level(),
            upgrade.cost()
        );

        self.bus.publish(GameEvent::UpgradePurchased(upgrade));
        self.bus.publish(GameEvent::CoinsChanged(self.settings.coins));
        true
    }

    /// Buy a one-time store item. Fails if already owned or not affordable.
    pub fn try_purchase_store_item(&mut self, key: StoreItemKey) -> bool {
        let Some(item) = self.store.get(key) else {
            return false;
        };
        if item.purchased || !self.can_afford(item.cost) {
            return false;
        }

        let cost = item.cost;
        self.change_coins(-(cost as i64), true);
        let Some(item) = self.store.mark_purchased(key).cloned() else {
            return false;
        };
        if key == StoreItemKey::UnlockUpgrades {
            self.settings.upgrades_unlocked = true;
        }
        log::info!("Purchased store item {}", key.as_str());

        self.bus.publish(GameEvent::StoreItemPurchased(item));
        self.bus.publish(GameEvent::CoinsChanged(self.settings.coins));
        true
    }

    /// New-game reset of upgrades, derived values, coins and score.
    /// Store items are left alone; see [`Economy::reset_store`].
    pub fn reset_all(&mut self) {
        self.upgrades.reset();
        for key in UpgradeKey::ALL {
            self.settings.set_value(key, key.base());
        }
        self.settings.coins = 0;
        self.settings.score = 0;
        log::info!("Upgrades reset");

        self.bus.publish(GameEvent::UpgradesReset);
        self.bus.publish(GameEvent::CoinsChanged(0));
    }

    /// Clear every store purchase and re-lock the upgrade shop
    pub fn reset_store(&mut self) {
        self.store.reset();
        self.settings.upgrades_unlocked = false;
        log::info!("Store reset");
        self.bus.publish(GameEvent::StoreReset);
    }

    /// Keep the saved copy of the sound preferences current
    pub fn sync_volume(&mut self, volume: &VolumeSettings) {
        self.settings.volume = *volume;
    }

    pub fn serialize(&self) -> SettingsRecord {
        let s = &self.settings;
        SettingsRecord {
            coins: s.coins,
            score: s.score,
            current_block_value: s.block_value,
            current_cannon_interval: s.cannon_interval,
            current_block_despawn_time: s.block_despawn_time,
            current_player_speed: s.player_speed,
            current_max_blocks: s.max_blocks,
            volume: s.volume,
        }
    }

    /// Restore settings from a saved `gameSettings` object. Missing or
    /// malformed fields fall back to defaults; this never fails.
    pub fn deserialize(&mut self, record: &Value) {
        let Some(obj) = record.as_object() else {
            log::warn!("Saved settings are not an object, using defaults");
            return;
        };

        self.settings.coins = obj.get("coins").and_then(read_integer).unwrap_or(0);
        self.settings.score = obj.get("score").and_then(read_integer).unwrap_or(0);

        for key in UpgradeKey::ALL {
            let field = record_field(key);
            let value = match obj.get(field).and_then(Value::as_f64) {
                Some(v) if v.is_finite() && v > 0.0 => v,
                Some(_) => {
                    log::warn!("Invalid saved {field}, using base value");
                    key.base()
                }
                None => key.base(),
            };
            self.settings.set_value(key, value);
        }

        let volume = serde_json::from_value::<VolumeSettings>(record.clone())
            .map(VolumeSettings::sanitized)
            .unwrap_or_else(|_| {
                log::warn!("Saved volume settings incomplete, using defaults");
                VolumeSettings::default()
            });
        self.settings.volume = volume;
    }

    /// Put saved upgrade levels and costs back, recomputing the parameter of
    /// each restored upgrade from its level
    pub fn restore_upgrades(&mut self, records: &[UpgradeRecord]) {
        for record in records {
            self.upgrades.restore(record);
            let value = self.upgrades.get(record.key).value();
            self.settings.set_value(record.key, value);
        }
    }

    /// Put saved store flags back, re-applying unlock side effects
    pub fn restore_store(&mut self, records: &[StoreItemRecord]) {
        for record in records {
            self.store.restore(record);
        }
        self.settings.upgrades_unlocked = self.store.is_purchased(StoreItemKey::UnlockUpgrades);
    }
}

/// Integer field that may have been written as a float
fn read_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::events::EventKind;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded(bus: &EventBus, kinds: &[EventKind]) -> Rc<RefCell<Vec<GameEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in kinds {
            let log = log.clone();
            bus.subscribe(*kind, move |ev| log.borrow_mut().push(ev.clone()));
        }
        log
    }

    #[test]
    fn test_first_block_value_purchase() {
        let mut eco = Economy::new(EventBus::new());
        assert!(!eco.try_purchase_upgrade(UpgradeKey::BlockValue));
        assert_eq!(eco.coins(), 0);
        assert_eq!(eco.upgrades().get(UpgradeKey::BlockValue).level(), 0);

        eco.change_coins(10, false);
        assert!(eco.try_purchase_upgrade(UpgradeKey::BlockValue));
        let upgrade = eco.upgrades().get(UpgradeKey::BlockValue);
        assert_eq!(upgrade.level(), 1);
        assert_eq!(upgrade.cost(), 2);
        assert_eq!(eco.coins(), 9);
        assert!((eco.settings().block_value() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_failed_purchase_is_idempotent() {
        let mut eco = Economy::new(EventBus::new());
        eco.change_coins(1, true);
        assert!(eco.try_purchase_upgrade(UpgradeKey::MaxBlocks));
        // Now costs 2 with 0 coins
        for _ in 0..5 {
            assert!(!eco.try_purchase_upgrade(UpgradeKey::MaxBlocks));
        }
        assert_eq!(eco.coins(), 0);
        assert_eq!(eco.upgrades().get(UpgradeKey::MaxBlocks).level(), 1);
        assert_eq!(eco.settings().max_blocks(), 4.0);
    }

    #[test]
    fn test_purchase_publishes_upgrade_then_coins() {
        let bus = EventBus::new();
        let log = recorded(&bus, &[EventKind::UpgradePurchased, EventKind::CoinsChanged]);
        let mut eco = Economy::new(bus);
        eco.change_coins(5, true);
        assert!(eco.try_purchase_upgrade(UpgradeKey::PlayerSpeed));

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert!(matches!(&log[0], GameEvent::UpgradePurchased(u) if u.level() == 1));
        assert_eq!(log[1], GameEvent::CoinsChanged(4));
    }

    #[test]
    fn test_silent_change_does_not_publish() {
        let bus = EventBus::new();
        let log = recorded(&bus, &[EventKind::CoinsChanged]);
        let mut eco = Economy::new(bus);
        assert_eq!(eco.change_coins(3, true), 3);
        assert!(log.borrow().is_empty());
        assert_eq!(eco.change_coins(-5, false), -2);
        assert_eq!(*log.borrow(), vec![GameEvent::CoinsChanged(-2)]);
    }

    #[test]
    fn test_store_item_bought_once() {
        let mut eco = Economy::new(EventBus::new());
        eco.change_coins(300, true);
        assert!(eco.try_purchase_store_item(StoreItemKey::GoldenCannon));
        assert_eq!(eco.coins(), 50);

        eco.change_coins(1000, true);
        assert!(!eco.try_purchase_store_item(StoreItemKey::GoldenCannon));
        assert_eq!(eco.coins(), 1050);
        assert!(eco.store().is_purchased(StoreItemKey::GoldenCannon));
    }

    #[test]
    fn test_unlock_upgrades_side_effect() {
        let bus = EventBus::new();
        let log = recorded(&bus, &[EventKind::StoreItemPurchased]);
        let mut eco = Economy::new(bus);
        assert!(!eco.try_purchase_store_item(StoreItemKey::UnlockUpgrades));
        assert!(!eco.settings().upgrades_unlocked());

        eco.change_coins(100, true);
        assert!(eco.try_purchase_store_item(StoreItemKey::UnlockUpgrades));
        assert!(eco.settings().upgrades_unlocked());
        assert_eq!(log.borrow().len(), 1);

        eco.reset_store();
        assert!(!eco.settings().upgrades_unlocked());
        assert!(!eco.store().is_purchased(StoreItemKey::UnlockUpgrades));
    }

    #[test]
    fn test_reset_all_keeps_store() {
        let bus = EventBus::new();
        let log = recorded(&bus, &[EventKind::UpgradesReset, EventKind::CoinsChanged]);
        let mut eco = Economy::new(bus);
        eco.change_coins(500, true);
        assert!(eco.try_purchase_store_item(StoreItemKey::UnlockJump));
        for key in UpgradeKey::ALL {
            assert!(eco.try_purchase_upgrade(key));
        }
        log.borrow_mut().clear();

        eco.reset_all();
        for key in UpgradeKey::ALL {
            assert_eq!(eco.upgrades().get(key).level(), 0);
            assert_eq!(eco.settings().value_of(key), key.base());
        }
        assert_eq!(eco.coins(), 0);
        assert!(eco.store().is_purchased(StoreItemKey::UnlockJump));
        assert_eq!(
            *log.borrow(),
            vec![GameEvent::UpgradesReset, GameEvent::CoinsChanged(0)]
        );
    }

    #[test]
    fn test_deserialize_tolerates_missing_and_bad_fields() {
        let mut eco = Economy::new(EventBus::new());
        eco.deserialize(&serde_json::json!({
            "coins": 42.0,
            "currentCannonInterval": -3,
            "currentPlayerSpeed": "fast",
            "currentMaxBlocks": 7
        }));
        let s = eco.settings();
        assert_eq!(s.coins(), 42);
        assert_eq!(s.score(), 0);
        assert_eq!(s.cannon_interval(), BASE_SHOOT_INTERVAL_SECS);
        assert_eq!(s.player_speed(), BASE_PLAYER_SPEED);
        assert_eq!(s.block_value(), BLOCK_BASE_VALUE);
        assert_eq!(s.max_blocks(), 7.0);
        assert_eq!(*s.volume(), VolumeSettings::default());
    }

    #[test]
    fn test_deserialize_non_object_changes_nothing() {
        let mut eco = Economy::new(EventBus::new());
        eco.change_coins(12, true);
        eco.deserialize(&serde_json::json!([1, 2, 3]));
        assert_eq!(eco.coins(), 12);
    }

    #[test]
    fn test_restore_upgrades_recomputes_values() {
        let mut eco = Economy::new(EventBus::new());
        eco.restore_upgrades(&[UpgradeRecord {
            key: UpgradeKey::MaxBlocks,
            level: 4,
            cost: 3,
        }]);
        let upgrade = eco.upgrades().get(UpgradeKey::MaxBlocks);
        assert_eq!(upgrade.level(), 4);
        assert_eq!(upgrade.cost(), 3);
        assert_eq!(eco.settings().max_blocks(), 7.0);
    }

    #[test]
    fn test_restore_store_relocks_shop() {
        let mut eco = Economy::new(EventBus::new());
        eco.restore_store(&[StoreItemRecord {
            key: StoreItemKey::UnlockUpgrades,
            purchased: true,
        }]);
        assert!(eco.settings().upgrades_unlocked());
    }

    #[test]
    fn test_settings_record_field_names() {
        let eco = Economy::new(EventBus::new());
        let json = serde_json::to_value(eco.serialize()).unwrap();
        for field in UpgradeKey::ALL.map(record_field) {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json.get("musicVolume").is_some());
        assert!(json.get("coins").is_some());
    }

    proptest! {
        #[test]
        fn prop_coin_round_trip(start in -1_000_000i64..1_000_000, delta in -1_000_000i64..1_000_000) {
            let mut eco = Economy::new(EventBus::new());
            eco.change_coins(start, true);
            eco.change_coins(delta, false);
            prop_assert_eq!(eco.change_coins(-delta, false), start);
        }

        #[test]
        fn prop_purchases_track_value_formula(key_idx in 0usize..5, buys in 1u32..60) {
            let key = UpgradeKey::ALL[key_idx];
            let mut eco = Economy::new(EventBus::new());
            eco.change_coins(i64::MAX / 2, true);
            let mut last_cost = eco.upgrades().get(key).cost();
            for n in 1..=buys {
                prop_assert!(eco.try_purchase_upgrade(key));
                let upgrade = eco.upgrades().get(key);
                prop_assert_eq!(upgrade.level(), n);
                prop_assert!(upgrade.cost() > last_cost);
                last_cost = upgrade.cost();
                prop_assert_eq!(eco.settings().value_of(key), key.value_at(n));
            }
            prop_assert!(eco.settings().cannon_interval() >= CANNON_INTERVAL_FLOOR);
        }

        #[test]
        fn prop_serialize_round_trip(coins in -10_000i64..10_000_000, score in 0i64..1000, buys in proptest::collection::vec(0usize..5, 0..40)) {
            let mut eco = Economy::new(EventBus::new());
            eco.change_coins(i64::MAX / 2, true);
            for idx in buys {
                eco.try_purchase_upgrade(UpgradeKey::ALL[idx]);
            }
            eco.change_coins(coins - eco.coins(), true);
            eco.settings.score = score;

            let saved = serde_json::to_value(eco.serialize()).unwrap();
            let mut restored = Economy::new(EventBus::new());
            restored.deserialize(&saved);
            prop_assert_eq!(restored.serialize(), eco.serialize());
        }
    }
}
