//! Axis-aligned box overlap
//!
//! Every catchable thing in the arena is an upright rectangle, so a plain
//! AABB test is all the collision the game needs.

use glam::Vec2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box of the given size centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// True if the boxes share interior area (touching edges don't count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = Aabb::from_center(Vec2::new(0.0, 0.0), Vec2::splat(10.0));
        let b = Aabb::from_center(Vec2::new(8.0, 3.0), Vec2::splat(10.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Aabb::from_center(Vec2::new(0.0, 0.0), Vec2::splat(10.0));
        let b = Aabb::from_center(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_separated_on_one_axis() {
        let player = Aabb::from_center(Vec2::new(100.0, 500.0), Vec2::new(80.0, 96.0));
        let block = Aabb::from_center(Vec2::new(100.0, 300.0), Vec2::splat(15.0));
        assert!(!player.overlaps(&block));
    }

    #[test]
    fn test_center_and_size() {
        let a = Aabb::from_center(Vec2::new(5.0, 7.0), Vec2::new(4.0, 2.0));
        assert_eq!(a.center(), Vec2::new(5.0, 7.0));
        assert_eq!(a.size(), Vec2::new(4.0, 2.0));
        assert!(a.contains_point(Vec2::new(6.0, 7.5)));
        assert!(!a.contains_point(Vec2::new(8.0, 7.0)));
    }
}
