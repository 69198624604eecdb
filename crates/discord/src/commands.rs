use async_trait::async_trait;
use thiserror::Error;

use motorpool_core::domain::vehicle::{ActorId, Plate};

use crate::messages::{self, MessageTemplate};

/// One resolved option of a slash command, already flattened to text the way
/// the interaction payload delivers it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOption {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub subcommand: Option<String>,
    pub options: Vec<CommandOption>,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub verb: String,
    pub options: Vec<CommandOption>,
    pub channel_id: String,
    pub actor_id: ActorId,
    pub actor_name: String,
    pub request_id: String,
}

impl CommandEnvelope {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| option.value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddVehicleRequest {
    pub plate: Plate,
    pub owner_id: ActorId,
    pub owner_name: String,
    pub public: bool,
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GarageCommand {
    Add(AddVehicleRequest),
    Remove { plate: Plate },
    /// State arrives raw so the reply can echo the bad value with the list
    /// of accepted ones.
    SetState { plate: Plate, state: String },
    SetVisibility { plate: Plate, public: bool },
    List,
    Help,
    Unknown { verb: String },
    Malformed { detail: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_garage_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != "/vehicle" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let verb = payload
        .subcommand
        .map(|verb| verb.trim().to_ascii_lowercase())
        .filter(|verb| !verb.is_empty())
        .unwrap_or_else(|| "help".to_owned());

    Ok(CommandEnvelope {
        command: "vehicle".to_owned(),
        verb,
        options: payload.options,
        channel_id: payload.channel_id,
        actor_id: ActorId(payload.user_id),
        actor_name: payload.user_name,
        request_id: payload.request_id,
    })
}

pub fn classify_garage_command(envelope: &CommandEnvelope) -> GarageCommand {
    match envelope.verb.as_str() {
        "add" => classify_add(envelope),
        "remove" => match require_plate(envelope) {
            Ok(plate) => GarageCommand::Remove { plate },
            Err(command) => command,
        },
        "state" => match (require_plate(envelope), envelope.option("state")) {
            (Ok(plate), Some(state)) => {
                GarageCommand::SetState { plate, state: state.to_owned() }
            }
            (Err(command), _) => command,
            (_, None) => missing("state"),
        },
        "visibility" => match (require_plate(envelope), envelope.option("visibility")) {
            (Ok(plate), Some("public")) => GarageCommand::SetVisibility { plate, public: true },
            (Ok(plate), Some("private")) => GarageCommand::SetVisibility { plate, public: false },
            (Ok(_), Some(other)) => GarageCommand::Malformed {
                detail: format!("`{other}` is not a visibility. Choose `public` or `private`."),
            },
            (Err(command), _) => command,
            (_, None) => missing("visibility"),
        },
        "list" => GarageCommand::List,
        "help" => GarageCommand::Help,
        other => GarageCommand::Unknown { verb: other.to_owned() },
    }
}

fn classify_add(envelope: &CommandEnvelope) -> GarageCommand {
    let plate = match require_plate(envelope) {
        Ok(plate) => plate,
        Err(command) => return command,
    };
    let Some(owner_id) = envelope.option("owner") else {
        return missing("owner");
    };
    let owner_name = envelope.option("owner_name").unwrap_or(owner_id).to_owned();

    let public = match parse_flag(envelope, "public") {
        Ok(flag) => flag,
        Err(command) => return command,
    };
    let shared = match parse_flag(envelope, "shared") {
        Ok(flag) => flag,
        Err(command) => return command,
    };

    GarageCommand::Add(AddVehicleRequest {
        plate,
        owner_id: ActorId(owner_id.to_owned()),
        owner_name,
        public,
        shared,
    })
}

fn require_plate(envelope: &CommandEnvelope) -> Result<Plate, GarageCommand> {
    match envelope.option("plate").map(Plate::new) {
        Some(plate) if !plate.as_str().is_empty() => Ok(plate),
        _ => Err(missing("plate")),
    }
}

fn parse_flag(envelope: &CommandEnvelope, name: &str) -> Result<bool, GarageCommand> {
    match envelope.option(name) {
        None => Ok(false),
        Some(value) => value.parse::<bool>().map_err(|_| GarageCommand::Malformed {
            detail: format!("`{value}` is not a valid `{name}` flag. Use `true` or `false`."),
        }),
    }
}

fn missing(option: &str) -> GarageCommand {
    GarageCommand::Malformed { detail: format!("Missing required option `{option}`.") }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: GarageCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match classify_garage_command(&envelope) {
            GarageCommand::Add(request) => self.service.add_vehicle(request, &envelope).await,
            GarageCommand::Remove { plate } => {
                self.service.remove_vehicle(plate, &envelope).await
            }
            GarageCommand::SetState { plate, state } => {
                self.service.set_vehicle_state(plate, state, &envelope).await
            }
            GarageCommand::SetVisibility { plate, public } => {
                self.service.set_vehicle_visibility(plate, public, &envelope).await
            }
            GarageCommand::List => self.service.list_vehicles(&envelope).await,
            GarageCommand::Help => Ok(messages::help_message()),
            GarageCommand::Unknown { verb } => Ok(messages::error_message(
                &format!("Unsupported command `/vehicle {verb}`. Try `/vehicle help`."),
                &envelope.request_id,
            )),
            GarageCommand::Malformed { detail } => {
                Ok(messages::error_message(&detail, &envelope.request_id))
            }
        }
    }
}

#[async_trait]
pub trait GarageCommandService: Send + Sync {
    async fn add_vehicle(
        &self,
        request: AddVehicleRequest,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn remove_vehicle(
        &self,
        plate: Plate,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn set_vehicle_state(
        &self,
        plate: Plate,
        state: String,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn set_vehicle_visibility(
        &self,
        plate: Plate,
        public: bool,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn list_vehicles(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

#[derive(Default)]
pub struct NoopGarageCommandService;

#[async_trait]
impl GarageCommandService for NoopGarageCommandService {
    async fn add_vehicle(
        &self,
        request: AddVehicleRequest,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::success_message(&format!(
            "Vehicle `{}` registered for {} (preview mode).",
            request.plate, request.owner_name
        )))
    }

    async fn remove_vehicle(
        &self,
        plate: Plate,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::success_message(&format!("Vehicle `{plate}` removed (preview mode).")))
    }

    async fn set_vehicle_state(
        &self,
        plate: Plate,
        state: String,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::success_message(&format!(
            "Vehicle `{plate}` set to `{state}` (preview mode)."
        )))
    }

    async fn set_vehicle_visibility(
        &self,
        plate: Plate,
        public: bool,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let visibility = if public { "public" } else { "private" };
        Ok(messages::success_message(&format!(
            "Vehicle `{plate}` is now {visibility} (preview mode)."
        )))
    }

    async fn list_vehicles(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::success_message("Listing refreshed (preview mode)."))
    }
}
