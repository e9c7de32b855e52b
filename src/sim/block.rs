//! Falling blocks fired by the cannon

use glam::Vec2;

use super::collision::Aabb;
use super::world::Arena;
use crate::consts::*;

/// Lightweight handle published when a block leaves the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRef {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// A block in flight or resting on the ground
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: u32,
    /// Center position
    pub pos: Vec2,
    /// Pixels per tick
    pub vel: Vec2,
    pub size: f32,
    /// Only one wall/ceiling bounce is allowed per block
    pub has_bounced: bool,
    pub landed: bool,
    /// World time of landing
    pub landed_at: Option<f64>,
    /// Seconds to stay after landing, fixed at spawn
    pub despawn_after: f64,
    /// Color hue in degrees
    pub hue: f32,
}

impl Block {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, despawn_after: f64, hue: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            size: BLOCK_SIZE,
            has_bounced: false,
            landed: false,
            landed_at: None,
            despawn_after,
            hue,
        }
    }

    /// Advance one tick. `now` is the world time after this tick.
    pub fn update(&mut self, arena: &Arena, now: f64) {
        if self.landed {
            return;
        }

        self.vel += arena.gravity() * BLOCK_GRAVITY_SCALE;
        self.pos += self.vel;

        let half = self.size * 0.5;
        if !self.has_bounced {
            if self.pos.y - half <= 0.0 && self.vel.y < 0.0 {
                self.pos.y = half;
                self.vel.y *= -BOUNCE_DAMPING;
                self.has_bounced = true;
            } else if (self.pos.x - half <= 0.0 && self.vel.x < 0.0)
                || (self.pos.x + half >= arena.width && self.vel.x > 0.0)
            {
                self.pos.x = self.pos.x.clamp(half, arena.width - half);
                self.vel.x *= -BOUNCE_DAMPING;
                self.has_bounced = true;
            }
        }

        let ground = arena.ground_y();
        if self.pos.y + half >= ground {
            self.pos.y = ground - half;
            self.vel = Vec2::ZERO;
            self.landed = true;
            self.landed_at = Some(now);
        }
    }

    /// Landed and has sat out its despawn time (inclusive)
    pub fn should_despawn(&self, now: f64) -> bool {
        match self.landed_at {
            Some(t) if self.landed => now - t >= self.despawn_after,
            _ => false,
        }
    }

    /// Progress (0..1) of the landing flash, if it is still showing
    pub fn landing_effect(&self, now: f64) -> Option<f32> {
        let t = now - self.landed_at?;
        (t < LANDING_EFFECT_SECS).then(|| (t / LANDING_EFFECT_SECS) as f32)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(self.size))
    }

    pub fn to_ref(&self) -> BlockRef {
        BlockRef {
            id: self.id,
            x: self.pos.x,
            y: self.pos.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::new(800.0, 600.0)
    }

    #[test]
    fn test_gravity_accelerates_downward() {
        let mut block = Block::new(1, Vec2::new(400.0, 100.0), Vec2::ZERO, 0.5, 0.0);
        block.update(&arena(), 0.0);
        let g = arena().gravity().y * BLOCK_GRAVITY_SCALE;
        assert!((block.vel.y - g).abs() < 1e-6);
        assert!((block.pos.y - (100.0 + g)).abs() < 1e-6);
    }

    #[test]
    fn test_ceiling_bounce_only_once() {
        let a = arena();
        let mut block = Block::new(1, Vec2::new(400.0, 10.0), Vec2::new(0.0, -10.0), 0.5, 0.0);
        block.update(&a, 0.0);
        assert!(block.has_bounced);
        assert!(block.vel.y > 0.0);

        // A second wall hit passes straight through the bounce check
        block.pos = Vec2::new(790.0, 200.0);
        block.vel = Vec2::new(10.0, 0.0);
        block.update(&a, 0.0);
        assert!(block.vel.x > 0.0);
    }

    #[test]
    fn test_side_wall_bounce_damps() {
        let a = arena();
        let mut block = Block::new(1, Vec2::new(5.0, 200.0), Vec2::new(-10.0, 0.0), 0.5, 0.0);
        block.update(&a, 0.0);
        assert!(block.has_bounced);
        assert!((block.vel.x - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_lands_on_ground() {
        let a = arena();
        let start_y = a.ground_y() - BLOCK_SIZE * 0.5 - 0.01;
        let mut block = Block::new(1, Vec2::new(400.0, start_y), Vec2::new(3.0, 4.0), 0.5, 0.0);
        block.update(&a, 2.0);
        assert!(block.landed);
        assert_eq!(block.vel, Vec2::ZERO);
        assert_eq!(block.landed_at, Some(2.0));
        assert_eq!(block.pos.y + BLOCK_SIZE * 0.5, a.ground_y());

        // Landed blocks stay put
        let pos = block.pos;
        block.update(&a, 2.1);
        assert_eq!(block.pos, pos);
    }

    #[test]
    fn test_despawn_window_is_inclusive() {
        let mut block = Block::new(1, Vec2::ZERO, Vec2::ZERO, 0.5, 0.0);
        assert!(!block.should_despawn(100.0));
        block.landed = true;
        block.landed_at = Some(1.0);
        assert!(!block.should_despawn(1.49));
        assert!(block.should_despawn(1.5));
    }

    #[test]
    fn test_landing_effect_window() {
        let mut block = Block::new(1, Vec2::ZERO, Vec2::ZERO, 0.5, 0.0);
        assert_eq!(block.landing_effect(1.0), None);
        block.landed = true;
        block.landed_at = Some(1.0);
        assert_eq!(block.landing_effect(1.0), Some(0.0));
        assert!(block.landing_effect(1.4).is_none());
    }
}
