use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use motorpool_core::domain::vehicle::{ActorId, Plate, Vehicle, VehicleState};
use motorpool_core::errors::{ApplicationError, DomainError};
use motorpool_core::policy;
use motorpool_db::repositories::{AdminRepository, RepositoryError, VehicleRepository};

use crate::api::ChatApi;
use crate::commands::{
    AddVehicleRequest, CommandEnvelope, CommandRouteError, GarageCommandService,
};
use crate::events::{
    ComponentInteractionEvent, ComponentInteractionService, EventContext, EventHandlerError,
};
use crate::flows::{FlowKey, FlowStore, SelectionEvent, SelectionFlow, SelectionFlowError};
use crate::listing::{ListingError, ListingRenderer, PageTurn};
use crate::messages::{
    self, MessageTemplate, PAGE_NEXT_ID, PAGE_PREV_ID, SELECT_STATE_ID, SELECT_VEHICLE_ID,
};
use crate::presence::presence_text;

/// Command and interaction handling against the real store: every operation
/// is permission check → mutation → listing re-render → presence update,
/// with failures answered privately to the requesting actor.
///
/// Cloning is cheap; clones share the same store handles and flow state, so
/// one instance can back both the command and the interaction handler.
#[derive(Clone)]
pub struct GarageService {
    vehicles: Arc<dyn VehicleRepository>,
    admins: Arc<dyn AdminRepository>,
    api: Arc<dyn ChatApi>,
    listing: Arc<ListingRenderer>,
    flows: Arc<FlowStore>,
}

impl GarageService {
    pub fn new(
        vehicles: Arc<dyn VehicleRepository>,
        admins: Arc<dyn AdminRepository>,
        api: Arc<dyn ChatApi>,
        listing: Arc<ListingRenderer>,
    ) -> Self {
        Self { vehicles, admins, api, listing, flows: Arc::new(FlowStore::new()) }
    }

    async fn is_admin(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        self.admins.is_admin(actor).await
    }

    /// Brings the rendered listing and the presence text in line with the
    /// store. Runs after the mutation committed; a failure here is logged and
    /// the next successful render catches up.
    async fn sync_view(&self, correlation_id: &str) {
        match self.vehicles.list_all().await {
            Ok(vehicles) => match self.listing.refresh(&vehicles).await {
                Ok(()) => {}
                Err(ListingError::Busy) => {
                    warn!(
                        event_name = "garage.listing.refresh_busy",
                        correlation_id,
                        "listing view busy during refresh; skipping"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "garage.listing.refresh_failed",
                        correlation_id,
                        error = %error,
                        "listing refresh failed after mutation"
                    );
                }
            },
            Err(error) => {
                warn!(
                    event_name = "garage.listing.snapshot_failed",
                    correlation_id,
                    error = %error,
                    "could not load vehicles for listing refresh"
                );
            }
        }

        match self.vehicles.state_counts().await {
            Ok(counts) => {
                if let Err(error) = self.api.set_presence(&presence_text(counts)).await {
                    warn!(
                        event_name = "garage.presence.update_failed",
                        correlation_id,
                        error = %error,
                        "presence update failed"
                    );
                }
            }
            Err(error) => {
                warn!(
                    event_name = "garage.presence.counts_failed",
                    correlation_id,
                    error = %error,
                    "could not count vehicle states"
                );
            }
        }
    }

    fn domain_reply(error: &DomainError, correlation_id: &str) -> MessageTemplate {
        match error {
            DomainError::PermissionDenied { action, .. } => {
                messages::permission_denied_message(action)
            }
            DomainError::InvalidState { given } => messages::invalid_state_message(given),
            other => messages::error_message(&other.to_string(), correlation_id),
        }
    }

    fn store_failure(error: &RepositoryError, correlation_id: &str) -> MessageTemplate {
        warn!(
            event_name = "garage.store.failure",
            correlation_id,
            error = %error,
            "vehicle store operation failed"
        );
        let interface =
            ApplicationError::Persistence(error.to_string()).into_interface(correlation_id);
        messages::error_message(interface.user_message(), correlation_id)
    }

    /// Shared state-change path for the slash command and the interactive
    /// flow. The reply is always for the requesting actor only.
    async fn change_state(
        &self,
        actor: &ActorId,
        plate: &Plate,
        state: VehicleState,
        correlation_id: &str,
    ) -> MessageTemplate {
        let is_admin = match self.is_admin(actor).await {
            Ok(is_admin) => is_admin,
            Err(error) => return Self::store_failure(&error, correlation_id),
        };

        let mut vehicle = match self.vehicles.find_by_plate(plate).await {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => {
                return Self::domain_reply(
                    &DomainError::PlateNotFound { plate: plate.to_string() },
                    correlation_id,
                )
            }
            Err(error) => return Self::store_failure(&error, correlation_id),
        };

        if let Err(error) = policy::check_state_change(actor, is_admin, &vehicle) {
            return Self::domain_reply(&error, correlation_id);
        }

        vehicle.set_state(state, actor, Utc::now());
        match self.vehicles.update(&vehicle).await {
            Ok(true) => {}
            Ok(false) => {
                return Self::domain_reply(
                    &DomainError::PlateNotFound { plate: plate.to_string() },
                    correlation_id,
                )
            }
            Err(error) => return Self::store_failure(&error, correlation_id),
        }

        info!(
            event_name = "garage.vehicle.state_changed",
            plate = %plate,
            state = state.as_str(),
            actor = %actor,
            correlation_id,
            "vehicle state changed"
        );
        self.sync_view(correlation_id).await;
        messages::success_message(&format!("Vehicle `{plate}` is now `{state}`."))
    }

    fn flow_key(event: &ComponentInteractionEvent) -> FlowKey {
        FlowKey { view: event.channel_id.clone(), actor: ActorId(event.user_id.clone()) }
    }
}

#[async_trait]
impl GarageCommandService for GarageService {
    async fn add_vehicle(
        &self,
        request: AddVehicleRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let correlation_id = envelope.request_id.as_str();

        let is_admin = match self.is_admin(&envelope.actor_id).await {
            Ok(is_admin) => is_admin,
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        };
        if let Err(error) = policy::check_registration(&envelope.actor_id, is_admin) {
            return Ok(Self::domain_reply(&error, correlation_id));
        }

        let mut vehicle = Vehicle::new(
            request.plate.clone(),
            request.owner_name.clone(),
            request.owner_id.clone(),
            Utc::now(),
        );
        vehicle.public = request.public;
        vehicle.shared = request.shared;

        match self.vehicles.insert(&vehicle).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                return Ok(Self::domain_reply(
                    &DomainError::DuplicatePlate { plate: request.plate.to_string() },
                    correlation_id,
                ))
            }
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        }

        info!(
            event_name = "garage.vehicle.added",
            plate = %request.plate,
            owner = %request.owner_id,
            actor = %envelope.actor_id,
            correlation_id,
            "vehicle registered"
        );
        self.sync_view(correlation_id).await;
        Ok(messages::success_message(&format!(
            "Vehicle `{}` registered for {}.",
            request.plate, request.owner_name
        )))
    }

    async fn remove_vehicle(
        &self,
        plate: Plate,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let correlation_id = envelope.request_id.as_str();

        let is_admin = match self.is_admin(&envelope.actor_id).await {
            Ok(is_admin) => is_admin,
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        };
        if let Err(error) = policy::check_removal(&envelope.actor_id, is_admin) {
            return Ok(Self::domain_reply(&error, correlation_id));
        }

        match self.vehicles.delete(&plate).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(Self::domain_reply(
                    &DomainError::PlateNotFound { plate: plate.to_string() },
                    correlation_id,
                ))
            }
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        }

        info!(
            event_name = "garage.vehicle.removed",
            plate = %plate,
            actor = %envelope.actor_id,
            correlation_id,
            "vehicle removed"
        );
        self.sync_view(correlation_id).await;
        Ok(messages::success_message(&format!("Vehicle `{plate}` removed.")))
    }

    async fn set_vehicle_state(
        &self,
        plate: Plate,
        state: String,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let correlation_id = envelope.request_id.as_str();

        let state = match state.parse::<VehicleState>() {
            Ok(state) => state,
            Err(error) => return Ok(Self::domain_reply(&error, correlation_id)),
        };

        Ok(self.change_state(&envelope.actor_id, &plate, state, correlation_id).await)
    }

    async fn set_vehicle_visibility(
        &self,
        plate: Plate,
        public: bool,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let correlation_id = envelope.request_id.as_str();

        let is_admin = match self.is_admin(&envelope.actor_id).await {
            Ok(is_admin) => is_admin,
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        };

        let mut vehicle = match self.vehicles.find_by_plate(&plate).await {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => {
                return Ok(Self::domain_reply(
                    &DomainError::PlateNotFound { plate: plate.to_string() },
                    correlation_id,
                ))
            }
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        };

        if let Err(error) = policy::check_visibility_toggle(&envelope.actor_id, is_admin, &vehicle)
        {
            return Ok(Self::domain_reply(&error, correlation_id));
        }

        vehicle.set_visibility(public, &envelope.actor_id, Utc::now());
        match self.vehicles.update(&vehicle).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(Self::domain_reply(
                    &DomainError::PlateNotFound { plate: plate.to_string() },
                    correlation_id,
                ))
            }
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        }

        self.sync_view(correlation_id).await;
        let visibility = if public { "public" } else { "private" };
        Ok(messages::success_message(&format!("Vehicle `{plate}` is now {visibility}.")))
    }

    async fn list_vehicles(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let correlation_id = envelope.request_id.as_str();

        let vehicles = match self.vehicles.list_all().await {
            Ok(vehicles) => vehicles,
            Err(error) => return Ok(Self::store_failure(&error, correlation_id)),
        };

        match self.listing.refresh(&vehicles).await {
            Ok(()) => {}
            Err(ListingError::Busy) => return Ok(messages::busy_message()),
            Err(error) => {
                warn!(
                    event_name = "garage.listing.post_failed",
                    correlation_id,
                    error = %error,
                    "could not post the garage listing"
                );
                let interface = ApplicationError::Integration(error.to_string())
                    .into_interface(correlation_id);
                return Ok(messages::error_message(interface.user_message(), correlation_id));
            }
        }

        match self.vehicles.state_counts().await {
            Ok(counts) => {
                let _ = self.api.set_presence(&presence_text(counts)).await;
            }
            Err(error) => {
                warn!(
                    event_name = "garage.presence.counts_failed",
                    correlation_id,
                    error = %error,
                    "could not count vehicle states"
                );
            }
        }

        Ok(messages::success_message("Garage listing is up to date."))
    }
}

#[async_trait]
impl ComponentInteractionService for GarageService {
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let correlation_id = event.request_id.as_deref().unwrap_or(&ctx.correlation_id);
        let actor = ActorId(event.user_id.clone());

        match event.custom_id.as_str() {
            SELECT_VEHICLE_ID => {
                let Some(raw_plate) = event.values.first() else {
                    return Ok(Some(messages::error_message(
                        "No vehicle was selected.",
                        correlation_id,
                    )));
                };
                let plate = Plate::new(raw_plate.as_str());

                match self.vehicles.find_by_plate(&plate).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        self.flows.clear(&Self::flow_key(event)).await;
                        return Ok(Some(Self::domain_reply(
                            &DomainError::PlateNotFound { plate: plate.to_string() },
                            correlation_id,
                        )));
                    }
                    Err(error) => {
                        return Ok(Some(Self::store_failure(&error, correlation_id)))
                    }
                }

                match self
                    .flows
                    .advance(
                        Self::flow_key(event),
                        SelectionEvent::TargetChosen { plate: plate.clone() },
                    )
                    .await
                {
                    Ok(_) => Ok(Some(messages::state_select_message(plate.as_str()))),
                    Err(error) => {
                        Ok(Some(messages::error_message(&error.to_string(), correlation_id)))
                    }
                }
            }
            SELECT_STATE_ID => {
                let Some(raw_state) = event.values.first() else {
                    return Ok(Some(messages::error_message(
                        "No state was selected.",
                        correlation_id,
                    )));
                };
                let state = match raw_state.parse::<VehicleState>() {
                    Ok(state) => state,
                    Err(error) => return Ok(Some(Self::domain_reply(&error, correlation_id))),
                };

                match self
                    .flows
                    .advance(Self::flow_key(event), SelectionEvent::StateChosen { state })
                    .await
                {
                    Ok(SelectionFlow::Applied { plate, state }) => Ok(Some(
                        self.change_state(&actor, &plate, state, correlation_id).await,
                    )),
                    Ok(_) => Ok(None),
                    Err(SelectionFlowError::NoTargetSelected) => {
                        Ok(Some(messages::error_message(
                            "Select a vehicle from the listing first.",
                            correlation_id,
                        )))
                    }
                }
            }
            PAGE_PREV_ID | PAGE_NEXT_ID => {
                let turn = if event.custom_id == PAGE_PREV_ID {
                    PageTurn::Prev
                } else {
                    PageTurn::Next
                };

                let vehicles = match self.vehicles.list_all().await {
                    Ok(vehicles) => vehicles,
                    Err(error) => {
                        return Ok(Some(Self::store_failure(&error, correlation_id)))
                    }
                };

                match self.listing.turn_page(&vehicles, turn).await {
                    Ok(()) => Ok(None),
                    Err(ListingError::Busy) => Ok(Some(messages::busy_message())),
                    Err(error) => Err(EventHandlerError::Interaction(error.to_string())),
                }
            }
            _ => Ok(None),
        }
    }
}
