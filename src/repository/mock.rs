//! In-memory repository serving a fixed roster.

use async_trait::async_trait;

use crate::domain::{PlayerData, Vector2, Weapon};
use crate::repository::{PlayerDataRepository, RepositoryError};

/// Repository that always returns a single player holding a "butterfly".
#[derive(Debug, Clone, Default)]
pub struct MockRepository;

impl MockRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlayerDataRepository for MockRepository {
    async fn players(&self) -> Result<Vec<PlayerData>, RepositoryError> {
        Ok(vec![PlayerData {
            position: Vector2::default(),
            weapons: vec![Weapon::named("butterfly")],
            ..PlayerData::default()
        }])
    }
}
