//! The arena and its per-tick step
//!
//! Order within a tick: player movement, cannon aim, cannon fire, then every
//! block (newest first) is moved, checked against the player and checked for
//! despawn.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::block::Block;
use super::cannon::{Cannon, FireOutcome};
use super::player::{Player, TickInput};
use crate::consts::*;
use crate::economy::Economy;
use crate::events::{EventBus, GameEvent};

/// Playfield dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn ground_y(&self) -> f32 {
        self.height - GROUND_OFFSET
    }

    /// Per-tick gravity, scaled so arcs look the same at any height
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(0.0, GRAVITY_PER_600PX * self.height / 600.0)
    }
}

/// What a single step did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub collected: u32,
    pub coins_earned: i64,
    pub despawned: u32,
    pub fired: bool,
    pub suppressed: bool,
}

/// Player, cannon and live blocks
#[derive(Debug, Clone)]
pub struct World {
    pub arena: Arena,
    pub player: Player,
    pub cannon: Cannon,
    pub blocks: Vec<Block>,
    /// Seconds of simulated play
    pub time: f64,
    pub ticks: u64,
    rng: Pcg32,
    next_id: u32,
    bus: EventBus,
}

impl World {
    pub fn new(arena: Arena, seed: u64, bus: EventBus) -> Self {
        Self {
            arena,
            player: Player::new(&arena),
            cannon: Cannon::new(&arena),
            blocks: Vec::new(),
            time: 0.0,
            ticks: 0,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
            bus,
        }
    }

    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Adopt new canvas dimensions and re-seat the fixed entities
    pub fn resize(&mut self, width: f32, height: f32) {
        self.arena = Arena::new(width, height);
        self.player.fit_to(&self.arena);
        self.cannon.fit_to(&self.arena);
        log::debug!("Arena resized to {}x{}", self.arena.width, self.arena.height);

        self.bus.publish(GameEvent::PlayerMoved {
            x: self.player.pos.x,
            y: self.player.pos.y,
        });
        self.bus.publish(GameEvent::CannonMoved {
            x: self.cannon.pos.x,
            y: self.cannon.pos.y,
        });
    }

    /// Advance one fixed tick
    pub fn step(&mut self, input: &TickInput, economy: &mut Economy, dt: f64) -> StepReport {
        let mut report = StepReport::default();
        self.time += dt;
        self.ticks += 1;
        let now = self.time;

        let speed = economy.settings().player_speed() as f32;
        if self.player.update(input, speed, &self.arena) {
            self.bus.publish(GameEvent::PlayerMoved {
                x: self.player.pos.x,
                y: self.player.pos.y,
            });
        }

        self.cannon.aim(&mut self.rng, &self.arena);
        let hue = self.rng.random_range(0.0..360.0);
        match self.cannon.try_fire(
            now,
            self.blocks.len(),
            economy.settings(),
            &self.bus,
            self.next_id,
            hue,
        ) {
            FireOutcome::Fired(block) => {
                self.next_id += 1;
                self.blocks.push(block);
                report.fired = true;
            }
            FireOutcome::Suppressed => report.suppressed = true,
            FireOutcome::NotReady => {}
        }

        let catcher = self.player.aabb();
        let value = economy.settings().block_value().round() as i64;
        for i in (0..self.blocks.len()).rev() {
            self.blocks[i].update(&self.arena, now);

            if self.blocks[i].aabb().overlaps(&catcher) {
                let block = self.blocks.remove(i);
                economy.change_coins(value, false);
                self.bus.publish(GameEvent::BlockCollected {
                    x: block.pos.x,
                    y: block.pos.y,
                    value,
                });
                report.collected += 1;
                report.coins_earned += value;
            } else if self.blocks[i].should_despawn(now) {
                let block = self.blocks.remove(i);
                self.bus.publish(GameEvent::BlockDespawned(block.to_ref()));
                report.despawned += 1;
            }
        }

        report
    }
}
