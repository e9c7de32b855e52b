//! Game mode state machine
//!
//! Exactly one [`Mode`] is active. Transitions come from key presses, clicks,
//! or a `ChangeState` event on the bus; each publishes `StateExited`, swaps
//! the mode, runs the new mode's enter hook and publishes `StateEntered`, all
//! before the publish that caused it returns.
//!
//! The mode, world and clock live in a core shared with the bus handler that
//! performs transitions. A request that arrives while the machine itself
//! holds the core (mid-tick or mid-click) waits in a queue that is drained as
//! soon as the core is released, still within the same call.

pub mod screens;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::context::GameContext;
use crate::economy::{Economy, StoreItemKey, StoreSystem};
use crate::events::{EventBus, EventKind, GameEvent, SubscriptionId};
use crate::platform::Key;
use crate::renderer::shapes;
use crate::sim::{StepReport, TickInput, World};
use crate::ui::Frame;

pub use screens::{
    ChangelogScreen, PlayingHud, SettingsClick, SettingsScreen, StoreScreen, UpgradeScreen,
};

/// Transitions followed per drain before giving up on a cycle
const MAX_TRANSITIONS_PER_DRAIN: usize = 8;

/// Which screen is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    Menu,
    Playing,
    Upgrade,
    Settings,
    Store,
    Changelog,
}

impl GameMode {
    pub const ALL: [GameMode; 6] = [
        GameMode::Menu,
        GameMode::Playing,
        GameMode::Upgrade,
        GameMode::Settings,
        GameMode::Store,
        GameMode::Changelog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Menu => "menu",
            GameMode::Playing => "playing",
            GameMode::Upgrade => "upgrade",
            GameMode::Settings => "settings",
            GameMode::Store => "store",
            GameMode::Changelog => "changelog",
        }
    }
}

/// The active mode and the UI state only it needs
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Menu,
    Playing(PlayingHud),
    Upgrade(UpgradeScreen),
    Settings(SettingsScreen),
    Store(StoreScreen),
    Changelog(ChangelogScreen),
}

impl Mode {
    pub fn kind(&self) -> GameMode {
        match self {
            Mode::Menu => GameMode::Menu,
            Mode::Playing(_) => GameMode::Playing,
            Mode::Upgrade(_) => GameMode::Upgrade,
            Mode::Settings(_) => GameMode::Settings,
            Mode::Store(_) => GameMode::Store,
            Mode::Changelog(_) => GameMode::Changelog,
        }
    }
}

#[derive(Debug)]
struct Core {
    mode: Mode,
    world: World,
    /// Seconds since start, all modes
    clock: f64,
    changelog_wanted: bool,
}

impl Core {
    /// Build the state for `next`
    fn enter(&mut self, next: GameMode, store: &StoreSystem) -> Mode {
        let (w, h) = (self.world.arena.width, self.world.arena.height);
        match next {
            GameMode::Menu => Mode::Menu,
            GameMode::Playing => Mode::Playing(PlayingHud::default()),
            GameMode::Upgrade => Mode::Upgrade(UpgradeScreen::layout(
                w,
                h,
                store.is_purchased(StoreItemKey::UnlockUpgrades),
            )),
            GameMode::Settings => Mode::Settings(SettingsScreen::layout(w, h, false)),
            GameMode::Store => Mode::Store(StoreScreen::layout(w, h, store)),
            GameMode::Changelog => {
                self.changelog_wanted = true;
                Mode::Changelog(ChangelogScreen::loading(w, h))
            }
        }
    }
}

/// Everything the transition handler on the bus needs
#[derive(Debug)]
struct Shared {
    bus: EventBus,
    core: RefCell<Core>,
    /// Store state screens are laid out from, kept current by store events
    store: RefCell<StoreSystem>,
    /// `ChangeState` requests not yet followed
    requested: RefCell<VecDeque<GameMode>>,
    draining: Cell<bool>,
    max_blocks_hit: Cell<bool>,
}

impl Shared {
    fn core_busy(&self) -> bool {
        self.core.try_borrow_mut().is_err()
    }

    /// Follow queued requests in order. Leaves them queued if the core is
    /// held further up the stack; that holder drains once it lets go.
    fn drain(&self) {
        if self.draining.replace(true) {
            return;
        }
        let mut hops = 0;
        loop {
            if self.core_busy() {
                break;
            }
            let next = self.requested.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            if hops == MAX_TRANSITIONS_PER_DRAIN {
                log::warn!("Transition loop detected, dropping pending requests");
                self.requested.borrow_mut().clear();
                break;
            }
            self.transition(next);
            hops += 1;
        }
        self.draining.set(false);
    }

    /// Exit the current mode and enter `next`. Returns false if `next` is
    /// already active.
    fn transition(&self, next: GameMode) -> bool {
        let prev = self.core.borrow().mode.kind();
        if prev == next {
            return false;
        }

        log::info!("Exited {}", prev.as_str());
        self.bus.publish(GameEvent::StateExited(prev));

        {
            let mut core = self.core.borrow_mut();
            let mode = core.enter(next, &self.store.borrow());
            core.mode = mode;
        }
        log::info!("Entered {}", next.as_str());
        self.bus.publish(GameEvent::StateEntered(next));
        true
    }
}

/// Owns the active mode and the world it plays over
#[derive(Debug)]
pub struct ModeMachine {
    shared: Rc<Shared>,
    subscriptions: Vec<SubscriptionId>,
}

impl ModeMachine {
    /// Start in the menu
    pub fn new(world: World, bus: EventBus, economy: &Economy) -> Self {
        let shared = Rc::new(Shared {
            bus: bus.clone(),
            core: RefCell::new(Core {
                mode: Mode::Menu,
                world,
                clock: 0.0,
                changelog_wanted: false,
            }),
            store: RefCell::new(economy.store().clone()),
            requested: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            max_blocks_hit: Cell::new(false),
        });

        // Queue before follow; a request raised mid-transition is kept
        // while the follower is still running
        let s = shared.clone();
        let queue = bus.subscribe(EventKind::ChangeState, move |ev| {
            if let GameEvent::ChangeState(next) = ev {
                s.requested.borrow_mut().push_back(*next);
            }
        });
        let s = shared.clone();
        let follow = bus.subscribe(EventKind::ChangeState, move |_| s.drain());

        let s = shared.clone();
        let bought = bus.subscribe(EventKind::StoreItemPurchased, move |ev| {
            if let GameEvent::StoreItemPurchased(item) = ev {
                s.store.borrow_mut().restore(&item.record());
            }
        });
        let s = shared.clone();
        let reset = bus.subscribe(EventKind::StoreReset, move |_| s.store.borrow_mut().reset());
        let s = shared.clone();
        let capped = bus.subscribe(EventKind::MaxBlocksReached, move |_| {
            s.max_blocks_hit.set(true)
        });

        bus.publish(GameEvent::StateEntered(GameMode::Menu));
        log::info!("Entered {}", GameMode::Menu.as_str());

        Self {
            shared,
            subscriptions: vec![queue, follow, bought, reset, capped],
        }
    }

    pub fn current(&self) -> GameMode {
        self.shared.core.borrow().mode.kind()
    }

    pub fn mode(&self) -> Ref<'_, Mode> {
        Ref::map(self.shared.core.borrow(), |core| &core.mode)
    }

    pub fn world(&self) -> Ref<'_, World> {
        Ref::map(self.shared.core.borrow(), |core| &core.world)
    }

    pub fn world_mut(&mut self) -> RefMut<'_, World> {
        RefMut::map(self.shared.core.borrow_mut(), |core| &mut core.world)
    }

    /// Publish a transition request; it has been followed when this returns
    pub fn request(&mut self, next: GameMode) {
        self.shared.bus.publish(GameEvent::ChangeState(next));
        self.process_events();
    }

    /// Follow any `ChangeState` left queued while the core was held
    pub fn process_events(&mut self) {
        self.shared.drain();
    }

    /// Exit the current mode and enter `next` directly. Returns false if
    /// `next` is already active.
    pub fn change_state(&mut self, next: GameMode) -> bool {
        // Requests raised by the hooks wait until this one completes
        self.shared.draining.set(true);
        let changed = self.shared.transition(next);
        self.shared.draining.set(false);
        self.process_events();
        changed
    }

    /// Advance one fixed tick. The world only moves while playing.
    pub fn update(
        &mut self,
        input: &TickInput,
        ctx: &mut GameContext,
        dt: f64,
    ) -> Option<StepReport> {
        *self.shared.store.borrow_mut() = ctx.economy.store().clone();
        self.process_events();

        let report = {
            let mut guard = self.shared.core.borrow_mut();
            let core = &mut *guard;
            core.clock += dt;
            match &mut core.mode {
                Mode::Playing(hud) => {
                    let report = core.world.step(input, &mut ctx.economy, dt);
                    if self.shared.max_blocks_hit.replace(false) {
                        hud.raise_notice(core.clock);
                    }
                    Some(report)
                }
                _ => None,
            }
        };

        self.process_events();
        report
    }

    /// Route a key press. Returns true if it did something.
    pub fn handle_key(&mut self, key: Key, ctx: &mut GameContext) -> bool {
        ctx.sound.ensure_music();

        if key == Key::Char('m') {
            ctx.toggle_mute();
            return true;
        }

        let target = match (self.current(), key) {
            (GameMode::Menu, Key::Space) => Some(GameMode::Playing),
            (
                GameMode::Upgrade | GameMode::Settings | GameMode::Store | GameMode::Changelog,
                Key::Escape,
            ) => Some(GameMode::Playing),
            (GameMode::Playing, Key::Char('u')) => Some(GameMode::Upgrade),
            (GameMode::Upgrade, Key::Char('u')) => Some(GameMode::Playing),
            (GameMode::Playing | GameMode::Menu, Key::Char('s')) => Some(GameMode::Settings),
            (GameMode::Settings, Key::Char('s')) => Some(GameMode::Playing),
            (GameMode::Playing | GameMode::Menu, Key::Char('t')) => Some(GameMode::Store),
            (GameMode::Store, Key::Char('t')) => Some(GameMode::Playing),
            _ => None,
        };

        match target {
            Some(next) => {
                self.request(next);
                true
            }
            None => false,
        }
    }

    /// Route a pointer click in canvas pixels. Returns true if it hit something.
    pub fn handle_click(&mut self, x: f32, y: f32, ctx: &mut GameContext) -> bool {
        ctx.sound.ensure_music();

        let (hit, next) = {
            let mut guard = self.shared.core.borrow_mut();
            let core = &mut *guard;
            let (w, h) = (core.world.arena.width, core.world.arena.height);

            match &mut core.mode {
                Mode::Upgrade(screen) => match screen.hit(x, y) {
                    Some(key) => {
                        if ctx.economy.try_purchase_upgrade(key) {
                            ctx.request_save();
                        }
                        (true, None)
                    }
                    None => (false, None),
                },
                Mode::Store(screen) => match screen.hit(x, y) {
                    Some(key) => {
                        if ctx.economy.try_purchase_store_item(key) {
                            ctx.request_save();
                            *screen = StoreScreen::layout(w, h, ctx.economy.store());
                        }
                        (true, None)
                    }
                    None => (false, None),
                },
                Mode::Settings(screen) => match screen.click(x, y) {
                    SettingsClick::Back => (true, Some(GameMode::Playing)),
                    SettingsClick::ArmReset => (true, None),
                    SettingsClick::ConfirmReset => {
                        log::info!("Resetting all progress");
                        ctx.reset_progress();
                        core.world.blocks.clear();
                        (true, Some(GameMode::Playing))
                    }
                    SettingsClick::Panel => (false, None),
                },
                Mode::Changelog(screen) if screen.back.contains(x, y) => {
                    (true, Some(GameMode::Playing))
                }
                Mode::Changelog(_) | Mode::Menu | Mode::Playing(_) => (false, None),
            }
        };

        match next {
            Some(next) => self.request(next),
            None => self.process_events(),
        }
        hit
    }

    /// Adopt a new canvas size, re-laying out the active screen
    pub fn resize(&mut self, width: f32, height: f32, ctx: &GameContext) {
        {
            let mut guard = self.shared.core.borrow_mut();
            let core = &mut *guard;
            core.world.resize(width, height);
            let (w, h) = (core.world.arena.width, core.world.arena.height);
            match &mut core.mode {
                Mode::Upgrade(screen) => {
                    let unlocked = ctx.economy.settings().upgrades_unlocked();
                    *screen = UpgradeScreen::layout(w, h, unlocked);
                }
                Mode::Store(screen) => *screen = StoreScreen::layout(w, h, ctx.economy.store()),
                Mode::Settings(screen) => {
                    *screen = SettingsScreen::layout(w, h, screen.reset_armed)
                }
                Mode::Changelog(screen) => {
                    *screen = ChangelogScreen::layout(w, h, std::mem::take(&mut screen.lines));
                }
                Mode::Menu | Mode::Playing(_) => {}
            }
        }
        self.process_events();
    }

    /// True once after entering the changelog; the host should fetch it
    pub fn take_changelog_request(&mut self) -> bool {
        std::mem::take(&mut self.shared.core.borrow_mut().changelog_wanted)
    }

    /// Hand fetched changelog text (or the fetch error) to the screen
    pub fn set_changelog(&mut self, text: Result<String, String>) {
        let mut core = self.shared.core.borrow_mut();
        let Mode::Changelog(screen) = &mut core.mode else {
            log::debug!("Changelog arrived after leaving the screen");
            return;
        };
        screen.lines = match text {
            Ok(text) => text.lines().map(str::to_owned).collect(),
            Err(err) => {
                log::error!("Failed to load changelog: {}", err);
                vec![screens::CHANGELOG_FAILED.to_string()]
            }
        };
    }

    /// Build this frame's geometry and text
    pub fn render(&self, ctx: &GameContext) -> Frame {
        let core = self.shared.core.borrow();
        let mut frame = Frame::default();
        let golden = ctx.economy.store().is_purchased(StoreItemKey::GoldenCannon);
        frame.extend_vertices(shapes::world(&core.world, golden));

        match &core.mode {
            Mode::Menu => screens::render_menu(&mut frame, &core.world),
            Mode::Playing(hud) => hud.render(&mut frame, &core.world, &ctx.economy, core.clock),
            Mode::Upgrade(screen) => screen.render(&mut frame, &core.world, &ctx.economy),
            Mode::Settings(screen) => {
                screen.render(&mut frame, &core.world, ctx.sound.settings())
            }
            Mode::Store(screen) => screen.render(&mut frame, &core.world, &ctx.economy),
            Mode::Changelog(screen) => screen.render(&mut frame, &core.world),
        }
        frame
    }
}

impl Drop for ModeMachine {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.shared.bus.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::UpgradeKey;
    use crate::persistence::{MemoryStorage, STORAGE_KEY, SaveManager};
    use crate::sim::Arena;

    fn setup() -> (ModeMachine, GameContext, MemoryStorage) {
        let bus = EventBus::new();
        let storage = MemoryStorage::new();
        let ctx = GameContext::new(bus.clone(), SaveManager::new(Box::new(storage.clone())));
        let world = World::new(Arena::new(1000.0, 800.0), 7, bus.clone());
        let machine = ModeMachine::new(world, bus, &ctx.economy);
        (machine, ctx, storage)
    }

    fn transitions(bus: &EventBus) -> Rc<RefCell<Vec<GameEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::StateExited, EventKind::StateEntered] {
            let log = log.clone();
            bus.subscribe(kind, move |ev| log.borrow_mut().push(ev.clone()));
        }
        log
    }

    #[test]
    fn test_starts_in_menu() {
        let (machine, _, _) = setup();
        assert_eq!(machine.current(), GameMode::Menu);
    }

    #[test]
    fn test_change_state_event_runs_exit_then_enter_once() {
        let (mut machine, ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        let log = transitions(&ctx.bus);

        ctx.bus.publish(GameEvent::ChangeState(GameMode::Upgrade));

        assert_eq!(machine.current(), GameMode::Upgrade);
        assert_eq!(
            *log.borrow(),
            vec![
                GameEvent::StateExited(GameMode::Playing),
                GameEvent::StateEntered(GameMode::Upgrade),
            ]
        );
    }

    #[test]
    fn test_published_change_state_enters_before_publish_returns() {
        let (mut machine, ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        let entered = Rc::new(Cell::new(false));
        let e = entered.clone();
        ctx.bus.subscribe(EventKind::StateEntered, move |_| e.set(true));

        // Publisher outside the machine, between frames
        ctx.bus.publish(GameEvent::ChangeState(GameMode::Store));
        assert!(entered.get());
        assert!(matches!(*machine.mode(), Mode::Store(_)));
    }

    #[test]
    fn test_change_state_during_tick_is_followed_in_same_update() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        // Published mid-step while the world is borrowed
        let bus = ctx.bus.clone();
        ctx.bus.subscribe(EventKind::PlayerMoved, move |_| {
            bus.publish(GameEvent::ChangeState(GameMode::Settings));
        });
        let input = TickInput {
            left: true,
            right: false,
        };
        assert!(machine.update(&input, &mut ctx, 1.0 / 60.0).is_some());
        assert_eq!(machine.current(), GameMode::Settings);
    }

    #[test]
    fn test_store_events_reach_upgrade_layout() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        ctx.economy.change_coins(100, true);
        assert!(ctx.economy.try_purchase_store_item(StoreItemKey::UnlockUpgrades));

        ctx.bus.publish(GameEvent::ChangeState(GameMode::Upgrade));
        let mode = machine.mode();
        let Mode::Upgrade(screen) = &*mode else {
            panic!("not in upgrade mode");
        };
        assert!(!screen.locked);
    }

    #[test]
    fn test_same_mode_is_ignored() {
        let (mut machine, ctx, _) = setup();
        let log = transitions(&ctx.bus);
        assert!(!machine.change_state(GameMode::Menu));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_key_map() {
        let (mut machine, mut ctx, _) = setup();
        assert!(!machine.handle_key(Key::Char('u'), &mut ctx));
        assert_eq!(machine.current(), GameMode::Menu);

        machine.handle_key(Key::Char('t'), &mut ctx);
        assert_eq!(machine.current(), GameMode::Store);
        machine.handle_key(Key::Escape, &mut ctx);
        assert_eq!(machine.current(), GameMode::Playing);

        machine.handle_key(Key::Char('u'), &mut ctx);
        assert_eq!(machine.current(), GameMode::Upgrade);
        machine.handle_key(Key::Char('u'), &mut ctx);
        assert_eq!(machine.current(), GameMode::Playing);

        machine.handle_key(Key::Char('s'), &mut ctx);
        assert_eq!(machine.current(), GameMode::Settings);
        machine.handle_key(Key::Char('s'), &mut ctx);
        assert_eq!(machine.current(), GameMode::Playing);

        // Escape does nothing while playing
        assert!(!machine.handle_key(Key::Escape, &mut ctx));
        assert_eq!(machine.current(), GameMode::Playing);
    }

    #[test]
    fn test_mute_key_works_everywhere() {
        let (mut machine, mut ctx, _) = setup();
        assert!(machine.handle_key(Key::Char('m'), &mut ctx));
        assert!(ctx.sound.settings().is_muted);
        assert!(ctx.economy.settings().volume().is_muted);
        assert_eq!(machine.current(), GameMode::Menu);
    }

    #[test]
    fn test_world_frozen_outside_playing() {
        let (mut machine, mut ctx, _) = setup();
        let input = TickInput::default();
        assert_eq!(machine.update(&input, &mut ctx, 0.1), None);
        assert_eq!(machine.world().time, 0.0);

        machine.change_state(GameMode::Playing);
        assert!(machine.update(&input, &mut ctx, 0.1).is_some());
        assert_eq!(machine.world().ticks, 1);

        machine.change_state(GameMode::Store);
        machine.update(&input, &mut ctx, 0.1);
        assert_eq!(machine.world().ticks, 1);
    }

    #[test]
    fn test_world_survives_mode_switches() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        let input = TickInput {
            left: true,
            right: false,
        };
        machine.update(&input, &mut ctx, 1.0 / 60.0);
        let x = machine.world().player.pos.x;

        machine.change_state(GameMode::Settings);
        machine.change_state(GameMode::Playing);
        assert_eq!(machine.world().player.pos.x, x);
    }

    #[test]
    fn test_click_buys_upgrade() {
        let (mut machine, mut ctx, storage) = setup();
        ctx.economy.change_coins(500, true);
        assert!(ctx.economy.try_purchase_store_item(StoreItemKey::UnlockUpgrades));
        machine.change_state(GameMode::Playing);
        machine.change_state(GameMode::Upgrade);

        let r = {
            let mode = machine.mode();
            let Mode::Upgrade(screen) = &*mode else {
                panic!("not in upgrade mode");
            };
            assert!(!screen.locked);
            screen.buttons[0].1
        };

        assert!(machine.handle_click(r.center_x(), r.center_y(), &mut ctx));
        assert_eq!(ctx.economy.upgrades().get(UpgradeKey::BlockValue).level(), 1);
        ctx.flush();
        assert!(storage.raw(STORAGE_KEY).is_some());
    }

    #[test]
    fn test_locked_shop_ignores_clicks() {
        let (mut machine, mut ctx, _) = setup();
        ctx.economy.change_coins(500, true);
        machine.change_state(GameMode::Upgrade);
        assert!(!machine.handle_click(500.0, 400.0, &mut ctx));
        assert_eq!(ctx.economy.coins(), 500);
    }

    #[test]
    fn test_store_click_removes_button() {
        let (mut machine, mut ctx, _) = setup();
        ctx.economy.change_coins(100, true);
        machine.change_state(GameMode::Store);

        let (key, r) = {
            let mode = machine.mode();
            let Mode::Store(screen) = &*mode else {
                panic!("not in store mode");
            };
            screen.buttons[0]
        };
        assert_eq!(key, StoreItemKey::UnlockUpgrades);

        assert!(machine.handle_click(r.center_x(), r.center_y(), &mut ctx));
        assert!(ctx.economy.settings().upgrades_unlocked());
        let mode = machine.mode();
        let Mode::Store(screen) = &*mode else {
            panic!("left store mode");
        };
        assert_eq!(screen.buttons.len(), 2);
        assert_eq!(ctx.economy.coins(), 0);
    }

    #[test]
    fn test_settings_reset_wipes_progress() {
        let (mut machine, mut ctx, storage) = setup();
        ctx.economy.change_coins(300, false);
        assert!(ctx.economy.try_purchase_store_item(StoreItemKey::GoldenCannon));
        ctx.flush();

        machine.change_state(GameMode::Settings);
        let (rx, ry) = {
            let mode = machine.mode();
            let Mode::Settings(screen) = &*mode else {
                panic!("not in settings mode");
            };
            (screen.reset.center_x(), screen.reset.center_y())
        };

        assert!(machine.handle_click(rx, ry, &mut ctx));
        assert_eq!(machine.current(), GameMode::Settings);
        assert_eq!(ctx.economy.coins(), 50);

        assert!(machine.handle_click(rx, ry, &mut ctx));
        assert_eq!(machine.current(), GameMode::Playing);
        assert_eq!(ctx.economy.coins(), 0);
        assert!(!ctx.economy.store().is_purchased(StoreItemKey::GoldenCannon));
        assert!(storage.raw(STORAGE_KEY).is_none());
    }

    #[test]
    fn test_leaving_settings_requests_save() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Settings);
        assert!(!ctx.save_pending());
        machine.handle_click(1.0, 1.0, &mut ctx);
        assert_eq!(machine.current(), GameMode::Playing);
        assert!(ctx.save_pending());
    }

    #[test]
    fn test_changelog_load_and_failure() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Changelog);
        assert!(machine.take_changelog_request());
        assert!(!machine.take_changelog_request());

        machine.set_changelog(Ok("v1.1\n- Store\nv1.0".to_string()));
        {
            let mode = machine.mode();
            let Mode::Changelog(screen) = &*mode else {
                panic!("not in changelog mode");
            };
            assert_eq!(screen.lines, vec!["v1.1", "- Store", "v1.0"]);
        }

        machine.set_changelog(Err("404".to_string()));
        {
            let mode = machine.mode();
            let Mode::Changelog(screen) = &*mode else {
                panic!("not in changelog mode");
            };
            assert_eq!(screen.lines, vec![screens::CHANGELOG_FAILED]);
        }

        machine.handle_key(Key::Escape, &mut ctx);
        assert_eq!(machine.current(), GameMode::Playing);
    }

    #[test]
    fn test_max_blocks_raises_notice() {
        let (mut machine, mut ctx, _) = setup();
        machine.change_state(GameMode::Playing);
        ctx.bus.publish(GameEvent::MaxBlocksReached { current: 3, max: 3 });
        machine.update(&TickInput::default(), &mut ctx, 1.0 / 60.0);

        {
            let mode = machine.mode();
            let Mode::Playing(hud) = &*mode else {
                panic!("not playing");
            };
            assert!(hud.notice_since.is_some());
        }
        let frame = machine.render(&ctx);
        assert!(frame.labels.iter().any(|l| l.text == "Maximum Blocks Reached (3)"));
    }

    #[test]
    fn test_transition_cycle_is_bounded() {
        let (mut machine, ctx, _) = setup();
        // Every entry asks to go somewhere else
        let bus = ctx.bus.clone();
        ctx.bus.subscribe(EventKind::StateEntered, move |ev| {
            let next = match ev {
                GameEvent::StateEntered(GameMode::Store) => GameMode::Settings,
                _ => GameMode::Store,
            };
            bus.publish(GameEvent::ChangeState(next));
        });
        machine.request(GameMode::Playing);
        // Terminates with something active and nothing left over
        assert!(GameMode::ALL.contains(&machine.current()));
        machine.process_events();
    }

    #[test]
    fn test_resize_relayouts_screen() {
        let (mut machine, ctx, _) = setup();
        machine.change_state(GameMode::Settings);
        machine.resize(500.0, 400.0, &ctx);
        {
            let mode = machine.mode();
            let Mode::Settings(screen) = &*mode else {
                panic!("not in settings mode");
            };
            assert_eq!(screen.panel.w, 300.0);
        }
        assert_eq!(machine.world().arena.width, 500.0);
    }

    #[test]
    fn test_mode_names() {
        let names: Vec<&str> = GameMode::ALL.iter().map(GameMode::as_str).collect();
        assert_eq!(
            names,
            vec!["menu", "playing", "upgrade", "settings", "store", "changelog"]
        );
    }

    #[test]
    fn test_drop_releases_subscriptions() {
        let (machine, ctx, _) = setup();
        assert_eq!(ctx.bus.subscriber_count(EventKind::ChangeState), 2);
        drop(machine);
        assert_eq!(ctx.bus.subscriber_count(EventKind::ChangeState), 0);
    }
}
