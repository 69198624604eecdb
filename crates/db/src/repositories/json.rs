use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use motorpool_core::domain::vehicle::{ActorId, Plate, StateCounts, Vehicle, VehicleState};

use super::{AdminRepository, RepositoryError, VehicleRepository};

/// Flat-file store: one JSON document holding every record, read, modified
/// and written back whole. The mutex serializes read-modify-write cycles so
/// concurrent handlers cannot lose updates to each other.
pub struct JsonStore {
    path: PathBuf,
    guard: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    vehicles: BTreeMap<String, Vehicle>,
    #[serde(default)]
    admins: BTreeSet<String>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    async fn load(&self) -> Result<StoreDocument, RepositoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(StoreDocument::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn persist(&self, document: &StoreDocument) -> Result<(), RepositoryError> {
        let raw = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VehicleRepository for JsonStore {
    async fn find_by_plate(&self, plate: &Plate) -> Result<Option<Vehicle>, RepositoryError> {
        let _held = self.guard.lock().await;
        let document = self.load().await?;
        Ok(document.vehicles.get(plate.as_str()).cloned())
    }

    async fn insert(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        let _held = self.guard.lock().await;
        let mut document = self.load().await?;

        if document.vehicles.contains_key(vehicle.plate.as_str()) {
            return Err(RepositoryError::Conflict(vehicle.plate.to_string()));
        }

        document.vehicles.insert(vehicle.plate.to_string(), vehicle.clone());
        self.persist(&document).await
    }

    async fn update(&self, vehicle: &Vehicle) -> Result<bool, RepositoryError> {
        let _held = self.guard.lock().await;
        let mut document = self.load().await?;

        let Some(slot) = document.vehicles.get_mut(vehicle.plate.as_str()) else {
            return Ok(false);
        };
        *slot = vehicle.clone();

        self.persist(&document).await?;
        Ok(true)
    }

    async fn delete(&self, plate: &Plate) -> Result<bool, RepositoryError> {
        let _held = self.guard.lock().await;
        let mut document = self.load().await?;

        if document.vehicles.remove(plate.as_str()).is_none() {
            return Ok(false);
        }

        self.persist(&document).await?;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let _held = self.guard.lock().await;
        let document = self.load().await?;
        // BTreeMap keys are the plates, so iteration order is already by plate.
        Ok(document.vehicles.into_values().collect())
    }

    async fn state_counts(&self) -> Result<StateCounts, RepositoryError> {
        let _held = self.guard.lock().await;
        let document = self.load().await?;

        let mut counts = StateCounts::default();
        for vehicle in document.vehicles.values() {
            match vehicle.state {
                VehicleState::Stored => counts.stored += 1,
                VehicleState::CheckedOut => counts.checked_out += 1,
            }
        }

        Ok(counts)
    }
}

#[async_trait::async_trait]
impl AdminRepository for JsonStore {
    async fn is_admin(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let _held = self.guard.lock().await;
        let document = self.load().await?;
        Ok(document.admins.contains(actor.as_str()))
    }

    async fn insert_if_absent(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let _held = self.guard.lock().await;
        let mut document = self.load().await?;

        if !document.admins.insert(actor.to_string()) {
            return Ok(false);
        }

        self.persist(&document).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use motorpool_core::domain::vehicle::{ActorId, Plate, Vehicle, VehicleState};

    use crate::repositories::{AdminRepository, RepositoryError, VehicleRepository};

    use super::JsonStore;

    fn vehicle(plate: &str) -> Vehicle {
        Vehicle::new(Plate::new(plate), "lena", ActorId("100".to_owned()), Utc::now())
    }

    fn store(dir: &tempfile::TempDir) -> JsonStore {
        JsonStore::new(dir.path().join("motorpool.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);

        assert!(store.list_all().await.expect("list").is_empty());
        assert!(!store.is_admin(&ActorId("100".to_owned())).await.expect("is_admin"));
    }

    #[tokio::test]
    async fn records_survive_reopening_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = store(&dir);
        first.insert(&vehicle("AB-123-CD")).await.expect("insert");

        let reopened = store(&dir);
        let found = reopened.find_by_plate(&Plate::new("AB-123-CD")).await.expect("find");

        assert_eq!(found.expect("present").owner_name, "lena");
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.insert(&vehicle("AB-123-CD")).await.expect("insert");

        let error = store.insert(&vehicle("AB-123-CD")).await.expect_err("duplicate");
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_plate_reports_false() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.insert(&vehicle("AB-123-CD")).await.expect("insert");

        assert!(!store.delete(&Plate::new("ZZ-999-ZZ")).await.expect("delete"));
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_plate_and_counts_follow_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        for plate in ["CC-3", "AA-1", "BB-2"] {
            store.insert(&vehicle(plate)).await.expect("insert");
        }

        let mut out = store
            .find_by_plate(&Plate::new("AA-1"))
            .await
            .expect("find")
            .expect("present");
        out.set_state(VehicleState::CheckedOut, &ActorId("100".to_owned()), Utc::now());
        assert!(store.update(&out).await.expect("update"));

        let plates: Vec<String> = store
            .list_all()
            .await
            .expect("list")
            .into_iter()
            .map(|vehicle| vehicle.plate.to_string())
            .collect();
        assert_eq!(plates, vec!["AA-1", "BB-2", "CC-3"]);

        let counts = store.state_counts().await.expect("counts");
        assert_eq!((counts.stored, counts.checked_out), (2, 1));
    }

    #[tokio::test]
    async fn admin_seeding_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        let actor = ActorId("652050350454472734".to_owned());

        assert!(store.insert_if_absent(&actor).await.expect("first"));
        assert!(!store.insert_if_absent(&actor).await.expect("second"));
        assert!(store.is_admin(&actor).await.expect("is_admin"));
    }
}
