use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    commands::{
        normalize_garage_command, CommandParseError, CommandRouteError, CommandRouter,
        GarageCommandService, NoopGarageCommandService, SlashCommandPayload,
    },
    messages::{self, MessageTemplate},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEnvelope {
    pub envelope_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    SlashCommand(SlashCommandPayload),
    ComponentInteraction(ComponentInteractionEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::ComponentInteraction(_) => GatewayEventType::ComponentInteraction,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    SlashCommand,
    ComponentInteraction,
    Unsupported,
}

/// A click on a button or a pick from a select menu attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInteractionEvent {
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub custom_id: String,
    pub values: Vec<String>,
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("component interaction handler failure: {0}")]
    Interaction(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopGarageCommandService));
    dispatcher.register(ComponentInteractionHandler::new(NoopComponentInteractionService));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: GarageCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: GarageCommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_garage_command(payload.clone())?;
        let message = self.router.route(normalized).await?;
        Ok(HandlerResult::Responded(message))
    }
}

#[async_trait]
pub trait ComponentInteractionService: Send + Sync {
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError>;
}

pub struct ComponentInteractionHandler<S> {
    service: S,
}

impl<S> ComponentInteractionHandler<S>
where
    S: ComponentInteractionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ComponentInteractionHandler<S>
where
    S: ComponentInteractionService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::ComponentInteraction
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::ComponentInteraction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let message = self.service.handle_component(event, ctx).await?;
        Ok(match message {
            Some(message) => HandlerResult::Responded(message),
            None => HandlerResult::Processed,
        })
    }
}

pub struct NoopComponentInteractionService;

#[async_trait]
impl ComponentInteractionService for NoopComponentInteractionService {
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let request_id = event.request_id.as_deref().unwrap_or(&ctx.correlation_id);
        let detail = match event.values.first() {
            Some(value) => format!("interactive component `{}` chose `{value}`", event.custom_id),
            None => format!("interactive component `{}` pressed", event.custom_id),
        };

        Ok(Some(messages::error_message(
            &format!("{detail} (preview mode, nothing recorded)"),
            request_id,
        )))
    }
}
