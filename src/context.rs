//! Shared game context
//!
//! One instance, built by the host, lent to every mode and to the frame loop.
//! Bus handlers never touch the context directly; they set flags or queue
//! sounds that [`GameContext::flush`] drains once per frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::audio::{SoundEffect, SoundManager};
use crate::economy::Economy;
use crate::events::{EventBus, EventKind, GameEvent, SubscriptionId};
use crate::modes::GameMode;
use crate::persistence::SaveManager;

#[derive(Debug)]
pub struct GameContext {
    pub bus: EventBus,
    pub economy: Economy,
    pub sound: SoundManager,
    pub saves: SaveManager,
    save_requested: Rc<Cell<bool>>,
    queued_sounds: Rc<RefCell<Vec<SoundEffect>>>,
    subscriptions: Vec<SubscriptionId>,
}

impl GameContext {
    pub fn new(bus: EventBus, saves: SaveManager) -> Self {
        let mut sound = SoundManager::new(bus.clone());
        sound.load_sound(SoundEffect::Coin);
        sound.load_sound(SoundEffect::Cannon);
        sound.load_sound(SoundEffect::Purchase);
        sound.load_music(SoundEffect::MainTheme);

        let save_requested = Rc::new(Cell::new(false));
        let queued_sounds = Rc::new(RefCell::new(Vec::new()));
        let mut subscriptions = Vec::new();

        for kind in [EventKind::CoinsChanged, EventKind::VolumeChanged] {
            let flag = save_requested.clone();
            subscriptions.push(bus.subscribe(kind, move |_| flag.set(true)));
        }
        // Settings writes volume changes back when closed
        let flag = save_requested.clone();
        subscriptions.push(bus.subscribe(EventKind::StateExited, move |ev| {
            if let GameEvent::StateExited(GameMode::Settings) = ev {
                flag.set(true);
            }
        }));

        let queue = queued_sounds.clone();
        subscriptions.push(bus.subscribe(EventKind::BlockCollected, move |_| {
            queue.borrow_mut().push(SoundEffect::Coin);
        }));
        let queue = queued_sounds.clone();
        subscriptions.push(bus.subscribe(EventKind::CannonFired, move |_| {
            queue.borrow_mut().push(SoundEffect::Cannon);
        }));
        for kind in [EventKind::UpgradePurchased, EventKind::StoreItemPurchased] {
            let queue = queued_sounds.clone();
            subscriptions.push(bus.subscribe(kind, move |_| {
                queue.borrow_mut().push(SoundEffect::Purchase);
            }));
        }

        Self {
            economy: Economy::new(bus.clone()),
            bus,
            sound,
            saves,
            save_requested,
            queued_sounds,
            subscriptions,
        }
    }

    /// Apply the stored save, if any. Returns whether one was found.
    pub fn load_saved(&mut self) -> bool {
        let Some(record) = self.saves.load() else {
            log::info!("No saved game found, starting fresh");
            return false;
        };
        self.saves.apply_save(&mut self.economy, &record);
        self.sound.apply_settings(*self.economy.settings().volume());
        // Applying publishes coinsChanged; nothing new to write back
        self.save_requested.set(false);
        true
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.sound.toggle_mute();
        self.economy.sync_volume(self.sound.settings());
        muted
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.sound.set_music_volume(volume);
        self.economy.sync_volume(self.sound.settings());
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sound.set_sfx_volume(volume);
        self.economy.sync_volume(self.sound.settings());
    }

    /// Ask for a save at the end of this frame
    pub fn request_save(&self) {
        self.save_requested.set(true);
    }

    pub fn save_pending(&self) -> bool {
        self.save_requested.get()
    }

    /// Wipe progress, store unlocks and the stored save
    pub fn reset_progress(&mut self) {
        self.economy.reset_all();
        self.economy.reset_store();
        self.saves.clear();
        self.save_requested.set(false);
    }

    /// Play queued sounds and perform at most one pending save
    pub fn flush(&mut self) {
        let sounds: Vec<SoundEffect> = self.queued_sounds.borrow_mut().drain(..).collect();
        for effect in sounds {
            self.sound.play_sound(effect);
        }

        if self.save_requested.replace(false) {
            if let Err(err) = self.saves.save(&self.economy) {
                log::error!("Save failed: {}", err);
            }
        }
    }
}

impl Drop for GameContext {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::UpgradeKey;
    use crate::persistence::{MemoryStorage, STORAGE_KEY};

    fn context() -> (GameContext, MemoryStorage) {
        let storage = MemoryStorage::new();
        let saves = SaveManager::new(Box::new(storage.clone()));
        (GameContext::new(EventBus::new(), saves), storage)
    }

    #[test]
    fn test_coin_change_saves_once_per_flush() {
        let (mut ctx, storage) = context();
        ctx.economy.change_coins(5, false);
        ctx.economy.change_coins(5, false);
        assert!(ctx.save_pending());

        ctx.flush();
        assert!(!ctx.save_pending());
        let raw = storage.raw(STORAGE_KEY).unwrap();
        assert!(raw.contains("\"coins\":10"));
    }

    #[test]
    fn test_silent_change_does_not_save() {
        let (mut ctx, storage) = context();
        ctx.economy.change_coins(5, true);
        ctx.flush();
        assert!(storage.raw(STORAGE_KEY).is_none());
    }

    #[test]
    fn test_mute_is_mirrored_into_economy() {
        let (mut ctx, _) = context();
        assert!(ctx.toggle_mute());
        assert!(ctx.economy.settings().volume().is_muted);
        assert!(ctx.save_pending());

        ctx.set_music_volume(0.4);
        assert!(!ctx.economy.settings().volume().is_muted);
        assert_eq!(ctx.economy.settings().volume().music_volume, 0.4);
    }

    #[test]
    fn test_load_round_trip() {
        let (mut ctx, storage) = context();
        ctx.economy.change_coins(50, false);
        assert!(ctx.economy.try_purchase_upgrade(UpgradeKey::BlockValue));
        ctx.set_sfx_volume(0.3);
        ctx.flush();

        let saves = SaveManager::new(Box::new(storage));
        let mut restored = GameContext::new(EventBus::new(), saves);
        assert!(restored.load_saved());
        assert!(!restored.save_pending());
        assert_eq!(restored.economy.coins(), 49);
        assert_eq!(restored.economy.upgrades().get(UpgradeKey::BlockValue).level(), 1);
        assert_eq!(restored.sound.settings().sfx_volume, 0.3);
    }

    #[test]
    fn test_reset_progress_clears_everything() {
        let (mut ctx, storage) = context();
        ctx.economy.change_coins(500, false);
        assert!(ctx.economy.try_purchase_store_item(crate::economy::StoreItemKey::UnlockUpgrades));
        ctx.flush();
        assert!(storage.raw(STORAGE_KEY).is_some());

        ctx.reset_progress();
        assert_eq!(ctx.economy.coins(), 0);
        assert!(!ctx.economy.settings().upgrades_unlocked());
        assert!(storage.raw(STORAGE_KEY).is_none());
    }

    #[test]
    fn test_closing_settings_requests_save() {
        let (ctx, _) = context();
        ctx.bus.publish(GameEvent::StateExited(GameMode::Store));
        assert!(!ctx.save_pending());
        ctx.bus.publish(GameEvent::StateExited(GameMode::Settings));
        assert!(ctx.save_pending());
    }

    #[test]
    fn test_drop_releases_subscriptions() {
        let bus = EventBus::new();
        let ctx = GameContext::new(bus.clone(), SaveManager::new(Box::new(MemoryStorage::new())));
        assert_eq!(bus.subscriber_count(EventKind::CoinsChanged), 1);
        drop(ctx);
        assert_eq!(bus.subscriber_count(EventKind::CoinsChanged), 0);
    }
}
