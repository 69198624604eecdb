use async_trait::async_trait;
use thiserror::Error;

use motorpool_core::domain::vehicle::{ActorId, Plate, StateCounts, Vehicle};

pub mod admin;
pub mod json;
pub mod memory;
pub mod vehicle;

pub use admin::SqlAdminRepository;
pub use json::JsonStore;
pub use memory::{InMemoryAdminRepository, InMemoryVehicleRepository};
pub use vehicle::SqlVehicleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document error: {0}")]
    Document(#[from] serde_json::Error),
    #[error("duplicate key: {0}")]
    Conflict(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_by_plate(&self, plate: &Plate) -> Result<Option<Vehicle>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the plate already exists.
    async fn insert(&self, vehicle: &Vehicle) -> Result<(), RepositoryError>;

    /// Returns `false` when no record with the vehicle's plate exists.
    async fn update(&self, vehicle: &Vehicle) -> Result<bool, RepositoryError>;

    /// Returns `false` when no record with the plate exists.
    async fn delete(&self, plate: &Plate) -> Result<bool, RepositoryError>;

    /// All vehicles, ordered by plate.
    async fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError>;

    async fn state_counts(&self) -> Result<StateCounts, RepositoryError>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn is_admin(&self, actor: &ActorId) -> Result<bool, RepositoryError>;

    /// Returns `true` when a record was created, `false` when the actor was
    /// already present. Seeding at startup relies on this being idempotent.
    async fn insert_if_absent(&self, actor: &ActorId) -> Result<bool, RepositoryError>;
}
