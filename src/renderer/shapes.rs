//! Shape generation for 2D primitives
//!
//! All coordinates are screen pixels with y growing downward; the pipeline
//! maps them to clip space.

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::{Vertex, colors};
use crate::sim::{Block, Cannon, Facing, Player, World};
use crate::ui::Rect;

/// Filled axis-aligned rectangle
pub fn rect(r: Rect, color: [f32; 4]) -> Vec<Vertex> {
    let (x0, y0, x1, y1) = (r.x, r.y, r.x + r.w, r.y + r.h);
    vec![
        Vertex::new(x0, y0, color),
        Vertex::new(x1, y0, color),
        Vertex::new(x0, y1, color),
        Vertex::new(x0, y1, color),
        Vertex::new(x1, y0, color),
        Vertex::new(x1, y1, color),
    ]
}

/// Rectangle border of the given thickness, drawn inside `r`
pub fn rect_outline(r: Rect, thickness: f32, color: [f32; 4]) -> Vec<Vertex> {
    let t = thickness.min(r.w / 2.0).min(r.h / 2.0);
    let mut vertices = Vec::with_capacity(24);
    vertices.extend(rect(Rect::new(r.x, r.y, r.w, t), color));
    vertices.extend(rect(Rect::new(r.x, r.y + r.h - t, r.w, t), color));
    vertices.extend(rect(Rect::new(r.x, r.y + t, t, r.h - 2.0 * t), color));
    vertices.extend(rect(Rect::new(r.x + r.w - t, r.y + t, t, r.h - 2.0 * t), color));
    vertices
}

/// Thick line from `a` to `b`
pub fn segment(a: Vec2, b: Vec2, width: f32, color: [f32; 4]) -> Vec<Vertex> {
    let dir = (b - a).normalize_or_zero();
    let perp = Vec2::new(-dir.y, dir.x) * (width / 2.0);

    let (a1, a2, b1, b2) = (a + perp, a - perp, b + perp, b - perp);
    vec![
        Vertex::new(a1.x, a1.y, color),
        Vertex::new(a2.x, a2.y, color),
        Vertex::new(b1.x, b1.y, color),
        Vertex::new(b1.x, b1.y, color),
        Vertex::new(a2.x, a2.y, color),
        Vertex::new(b2.x, b2.y, color),
    ]
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a ring (hollow circle)
pub fn ring(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 6) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        let (c1, s1) = (theta1.cos(), theta1.sin());
        let (c2, s2) = (theta2.cos(), theta2.sin());
        let inner1 = center + Vec2::new(c1, s1) * inner_radius;
        let outer1 = center + Vec2::new(c1, s1) * outer_radius;
        let inner2 = center + Vec2::new(c2, s2) * inner_radius;
        let outer2 = center + Vec2::new(c2, s2) * outer_radius;

        // Two triangles per segment
        vertices.push(Vertex::new(inner1.x, inner1.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(inner2.x, inner2.y, color));

        vertices.push(Vertex::new(inner2.x, inner2.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(outer2.x, outer2.y, color));
    }

    vertices
}

/// HSV (hue in degrees, s/v in 0..1) to RGBA
pub fn hsv_to_rgb(hue: f32, s: f32, v: f32, alpha: f32) -> [f32; 4] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [r + m, g + m, b + m, alpha]
}

fn player(p: &Player) -> Vec<Vertex> {
    let half = p.size / 2.0;
    let top = p.pos - half;
    let mut vertices = Vec::new();

    // Basket on the lower third, body above
    let basket_h = p.size.y / 3.0;
    vertices.extend(rect(
        Rect::new(top.x + 6.0, top.y + 14.0, p.size.x - 12.0, p.size.y - basket_h - 14.0),
        colors::PLAYER_BODY,
    ));
    vertices.extend(circle(
        Vec2::new(p.pos.x, top.y + 16.0),
        16.0,
        colors::PLAYER_BODY,
        20,
    ));
    vertices.extend(rect(
        Rect::new(top.x, p.pos.y + half.y - basket_h, p.size.x, basket_h),
        colors::PLAYER_BASKET,
    ));

    let eye_dx = match p.facing {
        Facing::Left => -7.0,
        Facing::Right => 7.0,
    };
    // Bob slightly while walking
    let bob = if p.moving { 1.5 } else { 0.0 };
    vertices.extend(circle(
        Vec2::new(p.pos.x + eye_dx, top.y + 13.0 - bob),
        3.0,
        colors::PLAYER_EYE,
        10,
    ));
    vertices
}

fn cannon(c: &Cannon, golden: bool) -> Vec<Vertex> {
    let barrel = if golden {
        colors::CANNON_GOLD
    } else {
        colors::CANNON_BARREL
    };
    let mut vertices = segment(c.pos, c.muzzle(), 14.0, barrel);
    vertices.extend(circle(c.pos, 12.0, colors::CANNON_BASE, 20));
    vertices
}

fn block(b: &Block, now: f64) -> Vec<Vertex> {
    let half = b.size / 2.0;
    let r = Rect::new(b.pos.x - half, b.pos.y - half, b.size, b.size);
    let mut vertices = rect(r, hsv_to_rgb(b.hue, 0.7, 0.95, 1.0));
    vertices.extend(rect_outline(r, 1.5, colors::BLOCK_OUTLINE));

    if let Some(progress) = b.landing_effect(now) {
        let radius = b.size * (0.5 + progress * 1.5);
        let mut color = colors::LANDING_RING;
        color[3] *= 1.0 - progress;
        vertices.extend(ring(b.pos, radius - 2.0, radius, color, 24));
    }
    vertices
}

/// Ground, trajectory preview, cannon, blocks and player
pub fn world(world: &World, golden_cannon: bool) -> Vec<Vertex> {
    let arena = world.arena;
    let ground = arena.ground_y();
    let mut vertices = rect(
        Rect::new(0.0, ground, arena.width, arena.height - ground),
        colors::GROUND,
    );
    vertices.extend(rect(
        Rect::new(0.0, ground, arena.width, 3.0),
        colors::GROUND_EDGE,
    ));

    for point in world.cannon.trajectory(&arena).iter().step_by(2) {
        vertices.extend(circle(*point, 2.0, colors::TRAJECTORY, 6));
    }
    vertices.extend(cannon(&world.cannon, golden_cannon));
    for b in &world.blocks {
        vertices.extend(block(b, world.time));
    }
    vertices.extend(player(&world.player));
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::sim::Arena;

    #[test]
    fn test_rect_is_two_triangles() {
        let v = rect(Rect::new(0.0, 0.0, 10.0, 5.0), colors::TEXT);
        assert_eq!(v.len(), 6);
        assert!(v.iter().all(|v| v.position[0] <= 10.0 && v.position[1] <= 5.0));
    }

    #[test]
    fn test_circle_vertex_count() {
        assert_eq!(circle(Vec2::ZERO, 1.0, colors::TEXT, 12).len(), 36);
        assert_eq!(ring(Vec2::ZERO, 1.0, 2.0, colors::TEXT, 12).len(), 72);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0, 1.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0, 1.0), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0, 0.5), [0.0, 0.0, 1.0, 0.5]);
        // Wraps around
        assert_eq!(hsv_to_rgb(360.0, 1.0, 1.0, 1.0), hsv_to_rgb(0.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn test_golden_cannon_changes_barrel() {
        let w = World::new(Arena::new(800.0, 600.0), 1, EventBus::new());
        let plain = world(&w, false);
        let gold = world(&w, true);
        assert_eq!(plain.len(), gold.len());
        assert!(gold.iter().any(|v| v.color == colors::CANNON_GOLD));
        assert!(!plain.iter().any(|v| v.color == colors::CANNON_GOLD));
    }
}
