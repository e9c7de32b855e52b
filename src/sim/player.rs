//! The catcher sprite at the bottom of the arena

use glam::Vec2;

use super::collision::Aabb;
use super::world::Arena;
use crate::consts::*;

/// Direction the sprite faces (for animation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Held movement keys for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
}

impl TickInput {
    /// -1, 0 or 1; opposing keys cancel
    pub fn axis(&self) -> f32 {
        (self.right as i32 - self.left as i32) as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Center position
    pub pos: Vec2,
    pub size: Vec2,
    pub facing: Facing,
    pub moving: bool,
}

impl Player {
    pub fn new(arena: &Arena) -> Self {
        let size = Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT);
        Self {
            pos: Vec2::new(arena.width * 0.5, arena.ground_y() - size.y * 0.5),
            size,
            facing: Facing::default(),
            moving: false,
        }
    }

    /// Move horizontally by `speed` px in the held direction. Returns true if
    /// the position changed.
    pub fn update(&mut self, input: &TickInput, speed: f32, arena: &Arena) -> bool {
        let axis = input.axis();
        self.moving = axis != 0.0;
        if axis < 0.0 {
            self.facing = Facing::Left;
        } else if axis > 0.0 {
            self.facing = Facing::Right;
        }

        let before = self.pos.x;
        self.pos.x = self.clamp_x(self.pos.x + axis * speed, arena);
        self.pos.x != before
    }

    /// Re-seat the sprite on the ground of a resized arena
    pub fn fit_to(&mut self, arena: &Arena) {
        self.pos.y = arena.ground_y() - self.size.y * 0.5;
        self.pos.x = self.clamp_x(self.pos.x, arena);
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }

    fn clamp_x(&self, x: f32, arena: &Arena) -> f32 {
        let half = self.size.x * 0.5;
        x.clamp(half, (arena.width - half).max(half))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_centered_on_ground() {
        let arena = Arena::new(800.0, 600.0);
        let player = Player::new(&arena);
        assert_eq!(player.pos.x, 400.0);
        assert_eq!(player.pos.y, 580.0 - PLAYER_HEIGHT * 0.5);
    }

    #[test]
    fn test_moves_at_speed_and_faces_direction() {
        let arena = Arena::new(800.0, 600.0);
        let mut player = Player::new(&arena);
        let left = TickInput { left: true, right: false };
        assert!(player.update(&left, 6.0, &arena));
        assert_eq!(player.pos.x, 394.0);
        assert_eq!(player.facing, Facing::Left);
        assert!(player.moving);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let arena = Arena::new(800.0, 600.0);
        let mut player = Player::new(&arena);
        let both = TickInput { left: true, right: true };
        assert!(!player.update(&both, 6.0, &arena));
        assert!(!player.moving);
    }

    #[test]
    fn test_clamped_to_arena() {
        let arena = Arena::new(800.0, 600.0);
        let mut player = Player::new(&arena);
        let right = TickInput { left: false, right: true };
        for _ in 0..200 {
            player.update(&right, 10.0, &arena);
        }
        assert_eq!(player.pos.x, 800.0 - PLAYER_WIDTH * 0.5);
        assert!(!player.update(&right, 10.0, &arena));
    }

    #[test]
    fn test_fit_to_smaller_arena() {
        let mut player = Player::new(&Arena::new(800.0, 600.0));
        player.pos.x = 780.0;
        let small = Arena::new(400.0, 300.0);
        player.fit_to(&small);
        assert_eq!(player.pos.x, 400.0 - PLAYER_WIDTH * 0.5);
        assert_eq!(player.pos.y, small.ground_y() - PLAYER_HEIGHT * 0.5);
    }
}
