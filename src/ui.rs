//! Screen-space layout and text overlay model
//!
//! Shapes go to the GPU as vertices; text is handed to the host as
//! [`TextLabel`]s and drawn by the DOM.

use crate::renderer::vertex::Vertex;

/// Axis-aligned screen rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Panel of a fraction of the screen, centered
    pub fn centered_panel(screen_w: f32, screen_h: f32, frac_w: f32, frac_h: f32) -> Self {
        let w = screen_w * frac_w;
        let h = screen_h * frac_h;
        Self::new((screen_w - w) / 2.0, (screen_h - h) / 2.0, w, h)
    }

    /// Edges count as inside
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl Align {
    /// CSS translate that anchors text at its x coordinate
    pub fn css_translate(&self) -> &'static str {
        match self {
            Align::Left => "translate(0, -50%)",
            Align::Center => "translate(-50%, -50%)",
            Align::Right => "translate(-100%, -50%)",
        }
    }
}

/// One line of text, anchored vertically at its middle
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Font size in px
    pub size: f32,
    pub color: [f32; 4],
    pub align: Align,
    pub bold: bool,
}

impl TextLabel {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size: 16.0,
            color: [1.0, 1.0, 1.0, 1.0],
            align: Align::Center,
            bold: false,
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// CSS `rgba(...)` for the label color
    pub fn css_color(&self) -> String {
        let [r, g, b, a] = self.color;
        format!(
            "rgba({}, {}, {}, {:.2})",
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            a
        )
    }
}

/// Everything drawn in one frame
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub vertices: Vec<Vertex>,
    pub labels: Vec<TextLabel>,
}

impl Frame {
    pub fn push_label(&mut self, label: TextLabel) {
        self.labels.push(label);
    }

    pub fn extend_vertices(&mut self, vertices: impl IntoIterator<Item = Vertex>) {
        self.vertices.extend(vertices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_panel() {
        let panel = Rect::centered_panel(1000.0, 800.0, 0.5, 0.25);
        assert_eq!(panel, Rect::new(250.0, 300.0, 500.0, 200.0));
        assert_eq!(panel.center_x(), 500.0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(30.0, 30.0));
        assert!(!r.contains(30.1, 15.0));
        assert!(!r.contains(9.9, 15.0));
    }

    #[test]
    fn test_label_css_color() {
        let label = TextLabel::new("Coins", 0.0, 0.0).color([1.0, 0.0, 0.5, 1.0]);
        assert_eq!(label.css_color(), "rgba(255, 0, 128, 1.00)");
    }
}
