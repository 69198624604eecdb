pub mod config;
pub mod domain;
pub mod errors;
pub mod policy;

pub use domain::vehicle::{ActorId, Plate, StateCounts, Vehicle, VehicleState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use policy::{check_registration, check_removal, check_state_change, check_visibility_toggle};
