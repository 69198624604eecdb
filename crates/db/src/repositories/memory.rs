use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use motorpool_core::domain::vehicle::{ActorId, Plate, StateCounts, Vehicle, VehicleState};

use super::{AdminRepository, RepositoryError, VehicleRepository};

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: RwLock<HashMap<String, Vehicle>>,
}

#[async_trait::async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn find_by_plate(&self, plate: &Plate) -> Result<Option<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.get(plate.as_str()).cloned())
    }

    async fn insert(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles.contains_key(vehicle.plate.as_str()) {
            return Err(RepositoryError::Conflict(vehicle.plate.to_string()));
        }

        vehicles.insert(vehicle.plate.to_string(), vehicle.clone());
        Ok(())
    }

    async fn update(&self, vehicle: &Vehicle) -> Result<bool, RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        let Some(slot) = vehicles.get_mut(vehicle.plate.as_str()) else {
            return Ok(false);
        };

        *slot = vehicle.clone();
        Ok(true)
    }

    async fn delete(&self, plate: &Plate) -> Result<bool, RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        Ok(vehicles.remove(plate.as_str()).is_some())
    }

    async fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        let mut all: Vec<Vehicle> = vehicles.values().cloned().collect();
        all.sort_by(|left, right| left.plate.as_str().cmp(right.plate.as_str()));
        Ok(all)
    }

    async fn state_counts(&self) -> Result<StateCounts, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        let mut counts = StateCounts::default();
        for vehicle in vehicles.values() {
            match vehicle.state {
                VehicleState::Stored => counts.stored += 1,
                VehicleState::CheckedOut => counts.checked_out += 1,
            }
        }

        Ok(counts)
    }
}

#[derive(Default)]
pub struct InMemoryAdminRepository {
    admins: RwLock<HashSet<String>>,
}

#[async_trait::async_trait]
impl AdminRepository for InMemoryAdminRepository {
    async fn is_admin(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let admins = self.admins.read().await;
        Ok(admins.contains(actor.as_str()))
    }

    async fn insert_if_absent(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let mut admins = self.admins.write().await;
        Ok(admins.insert(actor.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use motorpool_core::domain::vehicle::{ActorId, Plate, Vehicle};

    use crate::repositories::{AdminRepository, RepositoryError, VehicleRepository};

    use super::{InMemoryAdminRepository, InMemoryVehicleRepository};

    #[tokio::test]
    async fn vehicle_round_trip_and_duplicate_detection() {
        let repo = InMemoryVehicleRepository::default();
        let vehicle =
            Vehicle::new(Plate::new("AB-123-CD"), "lena", ActorId("100".to_owned()), Utc::now());

        repo.insert(&vehicle).await.expect("insert");
        assert_eq!(repo.find_by_plate(&vehicle.plate).await.expect("find"), Some(vehicle.clone()));

        let error = repo.insert(&vehicle).await.expect_err("duplicate");
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_set_behaves_like_the_sql_repository() {
        let repo = InMemoryAdminRepository::default();
        let actor = ActorId("100".to_owned());

        assert!(!repo.is_admin(&actor).await.expect("is_admin"));
        assert!(repo.insert_if_absent(&actor).await.expect("insert"));
        assert!(!repo.insert_if_absent(&actor).await.expect("reinsert"));
        assert!(repo.is_admin(&actor).await.expect("is_admin"));
    }
}
