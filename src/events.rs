//! Typed publish/subscribe bus
//!
//! Every subsystem talks through a shared [`EventBus`]. Delivery is synchronous:
//! `publish` runs each matching handler on the caller's stack, in subscription
//! order, before returning. Handlers may publish further events; a handler that
//! is already running is skipped rather than re-entered.

use std::cell::RefCell;
use std::rc::Rc;

use crate::economy::{StoreItem, Upgrade};
use crate::modes::GameMode;
use crate::sim::BlockRef;

/// Every message that flows over the bus
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// New coin total
    CoinsChanged(i64),
    /// Upgrade state after a successful purchase
    UpgradePurchased(Upgrade),
    UpgradesReset,
    /// Store item state after a successful purchase
    StoreItemPurchased(StoreItem),
    StoreReset,
    /// Request a mode transition
    ChangeState(GameMode),
    StateEntered(GameMode),
    StateExited(GameMode),
    /// Cannon wanted to fire but the live block cap was hit
    MaxBlocksReached { current: usize, max: usize },
    VolumeChanged { music: f32, sfx: f32, is_muted: bool },
    CannonFired { x: f32, y: f32, angle: f32, power: f32 },
    PlayerMoved { x: f32, y: f32 },
    CannonMoved { x: f32, y: f32 },
    BlockDespawned(BlockRef),
    /// Player caught a block worth `value` coins
    BlockCollected { x: f32, y: f32, value: i64 },
}

/// Event name, used to route handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CoinsChanged,
    UpgradePurchased,
    UpgradesReset,
    StoreItemPurchased,
    StoreReset,
    ChangeState,
    StateEntered,
    StateExited,
    MaxBlocksReached,
    VolumeChanged,
    CannonFired,
    PlayerMoved,
    CannonMoved,
    BlockDespawned,
    BlockCollected,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::CoinsChanged(_) => EventKind::CoinsChanged,
            GameEvent::UpgradePurchased(_) => EventKind::UpgradePurchased,
            GameEvent::UpgradesReset => EventKind::UpgradesReset,
            GameEvent::StoreItemPurchased(_) => EventKind::StoreItemPurchased,
            GameEvent::StoreReset => EventKind::StoreReset,
            GameEvent::ChangeState(_) => EventKind::ChangeState,
            GameEvent::StateEntered(_) => EventKind::StateEntered,
            GameEvent::StateExited(_) => EventKind::StateExited,
            GameEvent::MaxBlocksReached { .. } => EventKind::MaxBlocksReached,
            GameEvent::VolumeChanged { .. } => EventKind::VolumeChanged,
            GameEvent::CannonFired { .. } => EventKind::CannonFired,
            GameEvent::PlayerMoved { .. } => EventKind::PlayerMoved,
            GameEvent::CannonMoved { .. } => EventKind::CannonMoved,
            GameEvent::BlockDespawned(_) => EventKind::BlockDespawned,
            GameEvent::BlockCollected { .. } => EventKind::BlockCollected,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<RefCell<dyn FnMut(&GameEvent)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
}

/// Shared publish/subscribe hub. Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.registry.borrow().handlers.len();
        write!(f, "EventBus({count} handlers)")
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        let handler: Handler = Rc::new(RefCell::new(handler));
        registry.handlers.push((id, kind, handler));
        id
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.handlers.len();
        registry.handlers.retain(|(sid, _, _)| *sid != id);
        registry.handlers.len() != before
    }

    /// Deliver an event to every handler of its kind, in subscription order
    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        // Snapshot the matching handlers so they can subscribe/publish freely
        let handlers: Vec<Handler> = self
            .registry
            .borrow()
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();

        for handler in handlers {
            match handler.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(&event),
                Err(_) => log::warn!("Skipping re-entrant {:?} handler", kind),
            }
        }
    }

    /// Number of handlers registered for a kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(GameEvent::UpgradesReset);
        assert_eq!(bus.subscriber_count(EventKind::UpgradesReset), 0);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            bus.subscribe(EventKind::CoinsChanged, move |_| log.borrow_mut().push(tag));
        }
        bus.publish(GameEvent::CoinsChanged(5));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_only_matching_kind_is_delivered() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bus.subscribe(EventKind::CoinsChanged, move |ev| {
            if let GameEvent::CoinsChanged(total) = ev {
                h.set(h.get() + *total);
            }
        });
        bus.publish(GameEvent::UpgradesReset);
        bus.publish(GameEvent::CoinsChanged(7));
        assert_eq!(hits.get(), 7);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = bus.subscribe(EventKind::StoreReset, move |_| h.set(h.get() + 1));
        bus.publish(GameEvent::StoreReset);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(GameEvent::StoreReset);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_cascade_across_kinds_completes() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = bus.clone();
        bus.subscribe(EventKind::UpgradesReset, move |_| {
            inner.publish(GameEvent::CoinsChanged(0));
        });
        let s = seen.clone();
        bus.subscribe(EventKind::CoinsChanged, move |ev| s.borrow_mut().push(ev.clone()));

        bus.publish(GameEvent::UpgradesReset);
        assert_eq!(*seen.borrow(), vec![GameEvent::CoinsChanged(0)]);
    }

    #[test]
    fn test_self_republish_does_not_recurse() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let inner = bus.clone();
        let c = calls.clone();
        bus.subscribe(EventKind::StoreReset, move |_| {
            c.set(c.get() + 1);
            inner.publish(GameEvent::StoreReset);
        });
        bus.publish(GameEvent::StoreReset);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            GameEvent::MaxBlocksReached { current: 3, max: 3 }.kind(),
            EventKind::MaxBlocksReached
        );
        assert_eq!(
            GameEvent::ChangeState(GameMode::Store).kind(),
            EventKind::ChangeState
        );
    }
}
