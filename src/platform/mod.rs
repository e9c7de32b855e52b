//! Platform abstraction layer
//!
//! Browser-independent pieces of the host glue:
//! - Key names from DOM keyboard events
//! - Held movement keys
//! - Debounced deferred actions

use crate::sim::TickInput;

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Space,
    Escape,
    /// Any single printable character, lowercased
    Char(char),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "Left" => Some(Key::Left),
            "ArrowRight" | "Right" => Some(Key::Right),
            " " | "Spacebar" => Some(Key::Space),
            "Escape" | "Esc" => Some(Key::Escape),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c.to_ascii_lowercase())),
                    _ => None,
                }
            }
        }
    }

    /// Keys whose browser default (scrolling) should be suppressed
    pub fn blocks_default(&self) -> bool {
        matches!(self, Key::Left | Key::Right | Key::Space)
    }
}

/// Which movement keys are currently down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub fn press(&mut self, key: Key) {
        match key {
            Key::Left | Key::Char('a') => self.left = true,
            Key::Right | Key::Char('d') => self.right = true,
            _ => {}
        }
    }

    pub fn release(&mut self, key: Key) {
        match key {
            Key::Left | Key::Char('a') => self.left = false,
            Key::Right | Key::Char('d') => self.right = false,
            _ => {}
        }
    }

    /// Drop all held keys (e.g. when the window loses focus)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn tick_input(&self) -> TickInput {
        TickInput {
            left: self.left,
            right: self.right,
        }
    }
}

/// Replace-pending-timer debounce. Scheduling again before the deadline moves
/// the deadline, so only the last request in a burst fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debouncer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// Request the action, cancelling any pending one
    pub fn schedule(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once, when the deadline has passed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
