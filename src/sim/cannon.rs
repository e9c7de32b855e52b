//! The cannon on the right edge
//!
//! Aiming eases toward a randomly chosen target; the target and shot power
//! are rerolled every few seconds. Firing is gated by the economy's shot
//! interval and live block cap.

use glam::Vec2;
use rand::Rng;

use super::block::Block;
use super::world::Arena;
use crate::angle_delta;
use crate::consts::*;
use crate::economy::EconomySettings;
use crate::events::{EventBus, GameEvent};

/// Ticks before the first retarget
const FIRST_RETARGET_TICKS: u32 = 60;
/// Ballistic preview resolution
const TRAJECTORY_STEPS: usize = 100;
/// Share of the preview that is drawn
const TRAJECTORY_SHOWN: f32 = 0.25;

/// What happened when the cannon's turn came up
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    /// Interval not yet elapsed
    NotReady,
    /// Ready, but the live block cap was hit
    Suppressed,
    Fired(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cannon {
    pub pos: Vec2,
    /// Barrel angle in radians (0 = +x, y grows downward)
    pub angle: f32,
    pub target: Vec2,
    /// Muzzle speed in px per tick
    pub power: f32,
    retarget_ticks: u32,
    /// World time of the last shot
    pub last_shot: f64,
}

impl Cannon {
    pub fn new(arena: &Arena) -> Self {
        let pos = Self::mount_point(arena);
        Self {
            pos,
            angle: -std::f32::consts::FRAC_PI_4,
            target: pos - Vec2::splat(100.0),
            power: (CANNON_MIN_POWER + CANNON_MAX_POWER) * 0.5,
            retarget_ticks: FIRST_RETARGET_TICKS,
            last_shot: 0.0,
        }
    }

    fn mount_point(arena: &Arena) -> Vec2 {
        Vec2::new(arena.width - CANNON_X_OFFSET, arena.height * 0.5)
    }

    /// Move to the mount point of a resized arena
    pub fn fit_to(&mut self, arena: &Arena) {
        self.pos = Self::mount_point(arena);
    }

    /// Angle pointing from the cannon to its target
    pub fn target_angle(&self) -> f32 {
        let d = self.target - self.pos;
        d.y.atan2(d.x)
    }

    /// Unit vector along the barrel
    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.angle.cos(), self.angle.sin())
    }

    /// Where blocks leave the barrel
    pub fn muzzle(&self) -> Vec2 {
        self.pos + self.direction() * CANNON_MUZZLE_DISTANCE
    }

    /// One tick of aiming: count down to the next retarget, then turn a fixed
    /// fraction of the remaining angle.
    pub fn aim<R: Rng>(&mut self, rng: &mut R, arena: &Arena) {
        self.retarget_ticks = self.retarget_ticks.saturating_sub(1);
        if self.retarget_ticks == 0 {
            self.retarget(rng, arena);
        }
        self.angle += angle_delta(self.angle, self.target_angle()) * CANNON_TURN_RATE;
    }

    /// Pick a new target and power, and schedule the next reroll
    pub fn retarget<R: Rng>(&mut self, rng: &mut R, arena: &Arena) {
        self.target = Vec2::new(
            rng.random_range(arena.width * 0.1..arena.width * 0.9),
            rng.random_range(arena.height * 0.1..arena.height * 0.6),
        );
        self.power = rng.random_range(CANNON_MIN_POWER..CANNON_MAX_POWER);
        self.retarget_ticks =
            rng.random_range(CANNON_RETARGET_MIN_TICKS..CANNON_RETARGET_MAX_TICKS) as u32;
        log::debug!("Cannon retarget {:?} power {:.1}", self.target, self.power);
    }

    pub fn ready(&self, now: f64, interval: f64) -> bool {
        now - self.last_shot >= interval
    }

    /// Fire if the interval has elapsed. At the live block cap the shot is
    /// suppressed, `MaxBlocksReached` is published and the timer is left
    /// running so the next tick tries again.
    pub fn try_fire(
        &mut self,
        now: f64,
        live_blocks: usize,
        settings: &EconomySettings,
        bus: &EventBus,
        id: u32,
        hue: f32,
    ) -> FireOutcome {
        if !self.ready(now, settings.cannon_interval()) {
            return FireOutcome::NotReady;
        }

        let max = settings.max_blocks().floor().max(0.0) as usize;
        if live_blocks >= max {
            bus.publish(GameEvent::MaxBlocksReached {
                current: live_blocks,
                max,
            });
            return FireOutcome::Suppressed;
        }

        self.last_shot = now;
        let muzzle = self.muzzle();
        let block = Block::new(
            id,
            muzzle,
            self.direction() * self.power,
            settings.block_despawn_time(),
            hue,
        );
        bus.publish(GameEvent::CannonFired {
            x: muzzle.x,
            y: muzzle.y,
            angle: self.angle,
            power: self.power,
        });
        FireOutcome::Fired(block)
    }

    /// Leading part of the predicted flight path from the muzzle
    pub fn trajectory(&self, arena: &Arena) -> Vec<Vec2> {
        let gravity = arena.gravity() * BLOCK_GRAVITY_SCALE;
        let shown = (TRAJECTORY_STEPS as f32 * TRAJECTORY_SHOWN) as usize;
        let mut pos = self.muzzle();
        let mut vel = self.direction() * self.power;
        let mut points = Vec::with_capacity(shown);
        for _ in 0..shown {
            points.push(pos);
            vel += gravity;
            pos += vel;
        }
        points
    }
}
