//! Cannon Tycoon - an idle/arcade hybrid where a cannon lobs blocks and you catch them
//!
//! Core modules:
//! - `events`: Typed publish/subscribe bus shared by every subsystem
//! - `economy`: Coins, upgrades and one-time store unlocks
//! - `sim`: Per-tick behaviour of the player, cannon and blocks
//! - `modes`: Game mode state machine (menu, playing, shops, settings, changelog)
//! - `persistence`: Save/load of the economy to LocalStorage
//! - `audio`: Procedural sound effects and music
//! - `renderer`: WebGPU rendering pipeline
//! - `platform`: Browser/native platform helpers (input, debounce)

pub mod audio;
pub mod context;
pub mod economy;
pub mod events;
pub mod modes;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod ui;

pub use context::GameContext;
pub use economy::Economy;
pub use events::{EventBus, EventKind, GameEvent};
pub use modes::{GameMode, ModeMachine};
pub use settings::VolumeSettings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (the game was tuned per-frame at 60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Base values of the upgradeable parameters
    pub const BLOCK_BASE_VALUE: f64 = 1.0;
    pub const BASE_SHOOT_INTERVAL_SECS: f64 = 5.0;
    pub const BASE_BLOCK_DESPAWN_SECS: f64 = 0.5;
    /// Pixels per tick
    pub const BASE_PLAYER_SPEED: f64 = 6.0;
    pub const BASE_MAX_BLOCKS: f64 = 3.0;

    /// Hard caps on upgrade values
    pub const BLOCK_VALUE_CAP: f64 = 1_000_000.0;
    pub const CANNON_INTERVAL_FLOOR: f64 = 0.05;
    pub const MAX_BLOCKS_CAP: f64 = 20.0;
    pub const PLAYER_SPEED_CAP: f64 = 10.0;
    pub const BLOCK_DESPAWN_CAP: f64 = 6.0;

    /// Game object dimensions (pixels)
    pub const PLAYER_WIDTH: f32 = 16.0 * 5.0;
    pub const PLAYER_HEIGHT: f32 = 16.0 * 6.0;
    pub const BLOCK_SIZE: f32 = 15.0;
    /// How far above the bottom edge the ground sits
    pub const GROUND_OFFSET: f32 = 20.0;
    pub const CANNON_X_OFFSET: f32 = 20.0;

    /// Gravity per tick at a 600px tall arena; scales with height
    pub const GRAVITY_PER_600PX: f32 = 0.2;
    /// Blocks fall at a fraction of gravity for longer arcs
    pub const BLOCK_GRAVITY_SCALE: f32 = 0.75;
    /// Velocity multiplier on the single allowed bounce
    pub const BOUNCE_DAMPING: f32 = 0.6;

    /// Cannon aiming
    pub const CANNON_MUZZLE_DISTANCE: f32 = 30.0;
    /// Fraction of the remaining angle covered each tick
    pub const CANNON_TURN_RATE: f32 = 0.02;
    pub const CANNON_MIN_POWER: f32 = 5.0;
    pub const CANNON_MAX_POWER: f32 = 34.0;
    /// Ticks between target rerolls (3-6 seconds at 60 Hz)
    pub const CANNON_RETARGET_MIN_TICKS: f32 = 180.0;
    pub const CANNON_RETARGET_MAX_TICKS: f32 = 360.0;

    /// Presentation timings (seconds)
    pub const LANDING_EFFECT_SECS: f64 = 0.3;
    pub const MAX_BLOCKS_NOTICE_SECS: f64 = 2.0;

    /// Delay before saving after the last resize (milliseconds)
    pub const RESIZE_SAVE_DEBOUNCE_MS: f64 = 500.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Shortest signed angular distance from `from` to `to`
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}
