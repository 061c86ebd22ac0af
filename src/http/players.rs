//! JSON payload for player data.

use serde::{Deserialize, Serialize};

use crate::domain::{PlayerData, Weapon};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerDataJson {
    pub position_x: f64,
    pub position_y: f64,
    pub orientation: f64,
    pub can_fire: bool,
    pub weapons: Vec<WeaponDataJson>,
    pub health: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeaponDataJson {
    pub name: String,
    pub damage: f64,
}

impl From<&PlayerData> for PlayerDataJson {
    fn from(player: &PlayerData) -> Self {
        Self {
            position_x: player.position.x,
            position_y: player.position.y,
            orientation: player.orientation,
            can_fire: player.can_fire,
            weapons: player.weapons.iter().map(WeaponDataJson::from).collect(),
            health: player.health,
        }
    }
}

impl From<&Weapon> for WeaponDataJson {
    fn from(weapon: &Weapon) -> Self {
        Self {
            name: weapon.name.clone(),
            damage: weapon.damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vector2;

    #[test]
    fn flattens_position_and_uses_pascal_case() {
        let player = PlayerData {
            position: Vector2 { x: 1.5, y: -2.0 },
            orientation: 0.25,
            can_fire: true,
            weapons: vec![Weapon {
                name: "butterfly".into(),
                damage: 12.0,
            }],
            health: 0.75,
        };

        let json = serde_json::to_value(PlayerDataJson::from(&player)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "PositionX": 1.5,
                "PositionY": -2.0,
                "Orientation": 0.25,
                "CanFire": true,
                "Weapons": [{ "Name": "butterfly", "Damage": 12.0 }],
                "Health": 0.75,
            })
        );
    }

    #[test]
    fn empty_loadout_serializes_as_empty_list() {
        let json = serde_json::to_value(PlayerDataJson::from(&PlayerData::default())).unwrap();
        assert_eq!(json["Weapons"], serde_json::json!([]));
    }
}
