use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use motorpool_core::domain::vehicle::{ActorId, Plate, StateCounts, Vehicle, VehicleState};

use super::{RepositoryError, VehicleRepository};
use crate::DbPool;

pub struct SqlVehicleRepository {
    pool: DbPool,
}

impl SqlVehicleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "plate, owner_name, owner_id, state, public, shared, \
                              created_at, updated_at, updated_by";

#[async_trait::async_trait]
impl VehicleRepository for SqlVehicleRepository {
    async fn find_by_plate(&self, plate: &Plate) -> Result<Option<Vehicle>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM vehicle WHERE plate = ?"))
                .bind(plate.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(row_to_vehicle).transpose()
    }

    async fn insert(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vehicle \
             (plate, owner_name, owner_id, state, public, shared, created_at, updated_at, updated_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(vehicle.plate.as_str())
        .bind(&vehicle.owner_name)
        .bind(vehicle.owner_id.as_str())
        .bind(vehicle.state.as_str())
        .bind(vehicle.public)
        .bind(vehicle.shared)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .bind(vehicle.updated_by.as_ref().map(ActorId::as_str))
        .execute(&self.pool)
        .await
        .map_err(|error| match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(vehicle.plate.to_string())
            }
            _ => RepositoryError::from(error),
        })?;

        Ok(())
    }

    async fn update(&self, vehicle: &Vehicle) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE vehicle SET owner_name = ?, owner_id = ?, state = ?, public = ?, \
             shared = ?, updated_at = ?, updated_by = ? WHERE plate = ?",
        )
        .bind(&vehicle.owner_name)
        .bind(vehicle.owner_id.as_str())
        .bind(vehicle.state.as_str())
        .bind(vehicle.public)
        .bind(vehicle.shared)
        .bind(vehicle.updated_at)
        .bind(vehicle.updated_by.as_ref().map(ActorId::as_str))
        .bind(vehicle.plate.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, plate: &Plate) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM vehicle WHERE plate = ?")
            .bind(plate.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM vehicle ORDER BY plate"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_vehicle).collect()
    }

    async fn state_counts(&self) -> Result<StateCounts, RepositoryError> {
        let rows = sqlx::query("SELECT state, COUNT(*) AS count FROM vehicle GROUP BY state")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = StateCounts::default();
        for row in &rows {
            let state: String = row.try_get("state")?;
            let count: i64 = row.try_get("count")?;
            match state.parse::<VehicleState>() {
                Ok(VehicleState::Stored) => counts.stored = count as u64,
                Ok(VehicleState::CheckedOut) => counts.checked_out = count as u64,
                Err(_) => {
                    return Err(RepositoryError::Decode(format!(
                        "unexpected state value `{state}` in vehicle table"
                    )))
                }
            }
        }

        Ok(counts)
    }
}

fn row_to_vehicle(row: &SqliteRow) -> Result<Vehicle, RepositoryError> {
    let state: String = row.try_get("state")?;
    let state = state
        .parse::<VehicleState>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Vehicle {
        plate: Plate(row.try_get::<String, _>("plate")?),
        owner_name: row.try_get("owner_name")?,
        owner_id: ActorId(row.try_get::<String, _>("owner_id")?),
        state,
        public: row.try_get("public")?,
        shared: row.try_get("shared")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
        updated_by: row.try_get::<Option<String>, _>("updated_by")?.map(ActorId),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use motorpool_core::domain::vehicle::{ActorId, Plate, Vehicle, VehicleState};

    use crate::connect_with_settings;
    use crate::migrations;
    use crate::repositories::{RepositoryError, VehicleRepository};

    use super::SqlVehicleRepository;

    async fn repository() -> SqlVehicleRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlVehicleRepository::new(pool)
    }

    fn vehicle(plate: &str) -> Vehicle {
        Vehicle::new(Plate::new(plate), "lena", ActorId("100".to_owned()), Utc::now())
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let repo = repository().await;
        let vehicle = vehicle("AB-123-CD");

        repo.insert(&vehicle).await.expect("insert");
        let found = repo.find_by_plate(&vehicle.plate).await.expect("find");

        assert_eq!(found, Some(vehicle));
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict_and_keeps_the_original() {
        let repo = repository().await;
        let original = vehicle("AB-123-CD");
        repo.insert(&original).await.expect("insert");

        let mut imposter = vehicle("AB-123-CD");
        imposter.owner_name = "marc".to_owned();
        let error = repo.insert(&imposter).await.expect_err("duplicate plate");

        assert!(matches!(error, RepositoryError::Conflict(ref plate) if plate == "AB-123-CD"));
        let found = repo.find_by_plate(&original.plate).await.expect("find");
        assert_eq!(found.expect("present").owner_name, "lena");
    }

    #[tokio::test]
    async fn update_returns_false_for_missing_plate() {
        let repo = repository().await;
        let absent = vehicle("ZZ-999-ZZ");

        assert!(!repo.update(&absent).await.expect("update"));
    }

    #[tokio::test]
    async fn delete_returns_false_and_leaves_store_unchanged_for_missing_plate() {
        let repo = repository().await;
        repo.insert(&vehicle("AB-123-CD")).await.expect("insert");

        let removed = repo.delete(&Plate::new("ZZ-999-ZZ")).await.expect("delete");

        assert!(!removed);
        assert_eq!(repo.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn state_change_survives_round_trip() {
        let repo = repository().await;
        let mut vehicle = vehicle("AB-123-CD");
        repo.insert(&vehicle).await.expect("insert");

        let actor = ActorId("200".to_owned());
        vehicle.set_state(VehicleState::CheckedOut, &actor, Utc::now());
        assert!(repo.update(&vehicle).await.expect("update"));

        let found = repo.find_by_plate(&vehicle.plate).await.expect("find").expect("present");
        assert_eq!(found.state, VehicleState::CheckedOut);
        assert_eq!(found.updated_by, Some(actor));
        assert!(found.updated_at.is_some());
    }

    #[tokio::test]
    async fn list_is_ordered_by_plate() {
        let repo = repository().await;
        for plate in ["CC-3", "AA-1", "BB-2"] {
            repo.insert(&vehicle(plate)).await.expect("insert");
        }

        let plates: Vec<String> = repo
            .list_all()
            .await
            .expect("list")
            .into_iter()
            .map(|vehicle| vehicle.plate.to_string())
            .collect();

        assert_eq!(plates, vec!["AA-1", "BB-2", "CC-3"]);
    }

    #[tokio::test]
    async fn state_counts_split_by_state() {
        let repo = repository().await;
        let actor = ActorId("100".to_owned());

        for plate in ["AA-1", "BB-2", "CC-3"] {
            repo.insert(&vehicle(plate)).await.expect("insert");
        }
        let mut out = repo.find_by_plate(&Plate::new("BB-2")).await.expect("find").expect("row");
        out.set_state(VehicleState::CheckedOut, &actor, Utc::now());
        repo.update(&out).await.expect("update");

        let counts = repo.state_counts().await.expect("counts");
        assert_eq!(counts.stored, 2);
        assert_eq!(counts.checked_out, 1);
        assert_eq!(counts.total(), 3);
    }
}
