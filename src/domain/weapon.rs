use serde::{Deserialize, Serialize};

/// A weapon carried by a player.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Weapon {
    pub name: String,
    pub damage: f64,
}

impl Weapon {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage: 0.0,
        }
    }
}
