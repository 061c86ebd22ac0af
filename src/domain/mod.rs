//! Player data domain types.
//!
//! These shapes are owned by the data repository and only pass through the
//! HTTP layer; the lifecycle core never inspects them.

pub mod player;
pub mod weapon;

pub use player::{PlayerData, Vector2};
pub use weapon::Weapon;
