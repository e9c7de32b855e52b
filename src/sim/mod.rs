//! Arena simulation
//!
//! Per-tick behaviour of the player, cannon and blocks:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering or platform dependencies
//!
//! Gameplay parameters are read from the [`Economy`](crate::economy::Economy)
//! each tick; coins are awarded through it.

pub mod block;
pub mod cannon;
pub mod collision;
pub mod player;
pub mod world;

pub use block::{Block, BlockRef};
pub use cannon::{Cannon, FireOutcome};
pub use collision::Aabb;
pub use player::{Facing, Player, TickInput};
pub use world::{Arena, StepReport, World};
