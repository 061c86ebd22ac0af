//! Player data repository abstraction.
//!
//! # Responsibilities
//! - Retrieve player records for request handlers
//! - Allow backends (database, in-memory, remote service) to be swapped
//!   without touching the HTTP layer
//!
//! # Design Decisions
//! - Object safe (`Arc<dyn PlayerDataRepository>`) so the router state stays
//!   free of generics
//! - Handlers call it once per request; the server lifecycle never does

pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::PlayerData;

pub use mock::MockRepository;

/// Errors surfaced by a repository backend. The mock never fails; real
/// backends report through this type.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PlayerDataRepository: Send + Sync {
    /// Returns all player records available in the data source.
    async fn players(&self) -> Result<Vec<PlayerData>, RepositoryError>;
}
