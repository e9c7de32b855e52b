//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Colors for game elements
pub mod colors {
    pub const SKY: [f32; 4] = [0.53, 0.81, 0.92, 1.0];
    pub const GROUND: [f32; 4] = [0.35, 0.55, 0.25, 1.0];
    pub const GROUND_EDGE: [f32; 4] = [0.25, 0.4, 0.18, 1.0];
    pub const PLAYER_BODY: [f32; 4] = [0.85, 0.55, 0.3, 1.0];
    pub const PLAYER_BASKET: [f32; 4] = [0.55, 0.35, 0.15, 1.0];
    pub const PLAYER_EYE: [f32; 4] = [0.1, 0.1, 0.1, 1.0];
    pub const CANNON_BASE: [f32; 4] = [0.3, 0.3, 0.35, 1.0];
    pub const CANNON_BARREL: [f32; 4] = [0.15, 0.15, 0.18, 1.0];
    pub const CANNON_GOLD: [f32; 4] = [0.95, 0.78, 0.2, 1.0];
    pub const TRAJECTORY: [f32; 4] = [1.0, 1.0, 1.0, 0.5];
    pub const BLOCK_OUTLINE: [f32; 4] = [0.0, 0.0, 0.0, 0.6];
    pub const LANDING_RING: [f32; 4] = [1.0, 1.0, 1.0, 0.8];
    pub const DIM: [f32; 4] = [0.0, 0.0, 0.0, 0.5];
    pub const PANEL: [f32; 4] = [0.12, 0.12, 0.16, 0.92];
    pub const PANEL_BORDER: [f32; 4] = [0.8, 0.8, 0.85, 1.0];
    pub const BUTTON: [f32; 4] = [0.25, 0.45, 0.75, 1.0];
    pub const BUTTON_DISABLED: [f32; 4] = [0.3, 0.3, 0.33, 1.0];
    pub const BUTTON_DANGER: [f32; 4] = [0.75, 0.2, 0.2, 1.0];
    pub const PURCHASED: [f32; 4] = [0.2, 0.55, 0.3, 1.0];
    pub const TEXT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const TEXT_DARK: [f32; 4] = [0.1, 0.1, 0.1, 1.0];
    pub const TEXT_GOOD: [f32; 4] = [0.4, 1.0, 0.4, 1.0];
    pub const TEXT_BAD: [f32; 4] = [1.0, 0.4, 0.4, 1.0];
    pub const TEXT_WARN: [f32; 4] = [1.0, 0.3, 0.2, 1.0];
    pub const TEXT_MUTED: [f32; 4] = [0.75, 0.75, 0.8, 1.0];
}
