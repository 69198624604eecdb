//! Access rules for the vehicle registry.
//!
//! Registering and removing vehicles is reserved for admins. Visibility
//! toggles belong to the admin or the owner. State changes follow the
//! published-registry rule: a public vehicle's state may be flipped by any
//! actor, a private one only by its owner or an admin.

use crate::domain::vehicle::{ActorId, Vehicle};
use crate::errors::DomainError;

pub fn check_registration(actor: &ActorId, is_admin: bool) -> Result<(), DomainError> {
    require_admin(actor, is_admin, "register a vehicle")
}

pub fn check_removal(actor: &ActorId, is_admin: bool) -> Result<(), DomainError> {
    require_admin(actor, is_admin, "remove a vehicle")
}

pub fn check_visibility_toggle(
    actor: &ActorId,
    is_admin: bool,
    vehicle: &Vehicle,
) -> Result<(), DomainError> {
    if is_admin || vehicle.is_owned_by(actor) {
        return Ok(());
    }

    Err(denied(actor, "change this vehicle's visibility"))
}

pub fn check_state_change(
    actor: &ActorId,
    is_admin: bool,
    vehicle: &Vehicle,
) -> Result<(), DomainError> {
    if vehicle.public || is_admin || vehicle.is_owned_by(actor) {
        return Ok(());
    }

    Err(denied(actor, "change this vehicle's state"))
}

fn require_admin(actor: &ActorId, is_admin: bool, action: &str) -> Result<(), DomainError> {
    if is_admin {
        return Ok(());
    }

    Err(denied(actor, action))
}

fn denied(actor: &ActorId, action: &str) -> DomainError {
    DomainError::PermissionDenied { actor: actor.0.clone(), action: action.to_owned() }
}
