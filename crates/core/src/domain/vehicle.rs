use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plate(pub String);

impl Plate {
    /// Plates are opaque identifiers; surrounding whitespace from command
    /// input is stripped, nothing else is normalized.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Plate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const VALID_STATES: &[&str] = &["stored", "checked-out"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleState {
    Stored,
    CheckedOut,
}

impl VehicleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::CheckedOut => "checked-out",
        }
    }

    /// Marker shown next to a vehicle in rendered listings and presence text.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Stored => "🔴",
            Self::CheckedOut => "🔵",
        }
    }
}

impl std::str::FromStr for VehicleState {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stored" => Ok(Self::Stored),
            "checked-out" => Ok(Self::CheckedOut),
            other => Err(DomainError::InvalidState { given: other.to_owned() }),
        }
    }
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: Plate,
    pub owner_name: String,
    pub owner_id: ActorId,
    pub state: VehicleState,
    pub public: bool,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<ActorId>,
}

impl Vehicle {
    pub fn new(
        plate: Plate,
        owner_name: impl Into<String>,
        owner_id: ActorId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            plate,
            owner_name: owner_name.into(),
            owner_id,
            state: VehicleState::Stored,
            public: false,
            shared: false,
            created_at,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn is_owned_by(&self, actor: &ActorId) -> bool {
        self.owner_id == *actor
    }

    /// Applies a state change and stamps the audit fields.
    pub fn set_state(&mut self, next: VehicleState, actor: &ActorId, at: DateTime<Utc>) {
        self.state = next;
        self.updated_at = Some(at);
        self.updated_by = Some(actor.clone());
    }

    pub fn set_visibility(&mut self, public: bool, actor: &ActorId, at: DateTime<Utc>) {
        self.public = public;
        self.updated_at = Some(at);
        self.updated_by = Some(actor.clone());
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub stored: u64,
    pub checked_out: u64,
}

impl StateCounts {
    pub fn total(&self) -> u64 {
        self.stored + self.checked_out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::errors::DomainError;

    use super::{ActorId, Plate, Vehicle, VehicleState};

    fn vehicle() -> Vehicle {
        Vehicle::new(Plate::new("AB-123-CD"), "lena", ActorId("100".to_owned()), Utc::now())
    }

    #[test]
    fn plates_are_trimmed_but_otherwise_opaque() {
        assert_eq!(Plate::new("  AB-123-CD "), Plate::new("AB-123-CD"));
        assert_ne!(Plate::new("ab-123-cd"), Plate::new("AB-123-CD"));
    }

    #[test]
    fn parses_both_wire_states() {
        assert_eq!("stored".parse::<VehicleState>().expect("stored"), VehicleState::Stored);
        assert_eq!(
            "Checked-Out".parse::<VehicleState>().expect("checked-out"),
            VehicleState::CheckedOut
        );
    }

    #[test]
    fn rejects_unknown_state_value() {
        let error = "parked".parse::<VehicleState>().expect_err("parked is not a state");
        assert!(matches!(error, DomainError::InvalidState { ref given } if given == "parked"));
        assert!(error.to_string().contains("stored"));
        assert!(error.to_string().contains("checked-out"));
    }

    #[test]
    fn new_vehicles_start_stored_and_private() {
        let vehicle = vehicle();
        assert_eq!(vehicle.state, VehicleState::Stored);
        assert!(!vehicle.public);
        assert!(vehicle.updated_at.is_none());
        assert!(vehicle.updated_by.is_none());
    }

    #[test]
    fn state_change_stamps_audit_fields() {
        let mut vehicle = vehicle();
        let actor = ActorId("200".to_owned());
        let at = Utc::now();

        vehicle.set_state(VehicleState::CheckedOut, &actor, at);

        assert_eq!(vehicle.state, VehicleState::CheckedOut);
        assert_eq!(vehicle.updated_at, Some(at));
        assert_eq!(vehicle.updated_by, Some(actor));
    }
}
