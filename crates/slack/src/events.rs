use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    api::{ChatClient, NoopChatClient},
    blocks::{self, MessageTemplate},
    commands::{
        CommandRouteError, CommandRouter, NoopPraiseCommandService, PraiseCommandService,
        SlashCommandPayload,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    Unsupported,
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

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("reply delivery failed: {0}")]
    ReplyDelivery(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
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
        envelope: &SlackEnvelope,
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
    dispatcher
        .register(SlashCommandHandler::new(NoopPraiseCommandService, Arc::new(NoopChatClient)));
    dispatcher
}

/// Routes slash commands into the command service and delivers the reply
/// to the originating channel. A service failure is absorbed into a
/// generic apology so the user never sees a dead command.
pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
    chat: Arc<dyn ChatClient>,
}

impl<S> SlashCommandHandler<S>
where
    S: PraiseCommandService,
{
    pub fn new(service: S, chat: Arc<dyn ChatClient>) -> Self {
        Self { router: CommandRouter::new(service), chat }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: PraiseCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let channel_id = payload.channel_id.clone();
        let reply = match self.router.route(payload.clone()).await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(HandlerResult::Processed),
            Err(route_error) => {
                error!(
                    event_name = "command.aborted",
                    correlation_id = %ctx.correlation_id,
                    command = %payload.command,
                    error = %route_error,
                    "command failed mid-flight; replying with an apology"
                );
                blocks::apology_message(&payload.request_id)
            }
        };

        if let Err(delivery_error) = self.chat.post_message(&channel_id, &reply).await {
            warn!(
                event_name = "command.reply_failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %channel_id,
                error = %delivery_error,
                "reply delivery failed"
            );
            return Err(EventHandlerError::ReplyDelivery(delivery_error.to_string()));
        }

        Ok(HandlerResult::Responded(reply))
    }
}
