//! Player state as stored by the data repository.

use serde::{Deserialize, Serialize};

use crate::domain::weapon::Weapon;

/// A 2-D game entity with a position, an orientation and a loadout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerData {
    /// (x, y) coordinates in world space.
    pub position: Vector2,
    /// Angle in radians, 0 points to the right.
    pub orientation: f64,
    /// Whether the player is currently able to fire.
    pub can_fire: bool,
    /// Equipped weapons.
    pub weapons: Vec<Weapon>,
    /// Health as a fraction between 0 and 1.
    pub health: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}
