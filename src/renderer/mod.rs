//! WebGPU rendering module
//!
//! Everything is built CPU-side as flat-colored triangles in pixel space and
//! uploaded once per frame.

pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use pipeline::RenderState;
pub use vertex::Vertex;
