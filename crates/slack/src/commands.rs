use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

pub const PRAISE_COMMAND: &str = "/kudos";
pub const STATS_COMMAND: &str = "/stats";

/// One slash command invocation as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

/// The invocation context handed to the command service alongside the
/// parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: String,
    pub user_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `/kudos <free text>` - mentions plus the praise message.
    Praise { text: String },
    /// `/stats` - takes no arguments.
    Stats,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn classify_command(payload: &SlashCommandPayload) -> Result<BotCommand, CommandParseError> {
    match payload.command.as_str() {
        PRAISE_COMMAND => Ok(BotCommand::Praise { text: payload.text.trim().to_owned() }),
        STATS_COMMAND => Ok(BotCommand::Stats),
        other => Err(CommandParseError::UnsupportedCommand(other.to_owned())),
    }
}

/// Command surface behind the slash commands. A returned template is the
/// direct reply to the requester; `None` means the service already
/// dispatched its notifications to the channel.
#[async_trait]
pub trait PraiseCommandService: Send + Sync {
    async fn praise(
        &self,
        text: &str,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError>;

    async fn stats(&self, ctx: &CommandContext)
        -> Result<Option<MessageTemplate>, CommandRouteError>;
}

#[async_trait]
impl<S> PraiseCommandService for Arc<S>
where
    S: PraiseCommandService + ?Sized,
{
    async fn praise(
        &self,
        text: &str,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        self.as_ref().praise(text, ctx).await
    }

    async fn stats(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        self.as_ref().stats(ctx).await
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: PraiseCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        payload: SlashCommandPayload,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        let context = CommandContext {
            channel_id: payload.channel_id.clone(),
            user_id: payload.user_id.clone(),
            request_id: payload.request_id.clone(),
        };

        match classify_command(&payload) {
            Ok(BotCommand::Praise { text }) => self.service.praise(&text, &context).await,
            Ok(BotCommand::Stats) => self.service.stats(&context).await,
            Err(CommandParseError::UnsupportedCommand(command)) => Ok(Some(blocks::error_message(
                &format!("Unsupported command `{command}`. Try `/kudos` or `/stats`."),
                &context.request_id,
            ))),
        }
    }
}

/// Service double used by the default dispatcher: replies with usage for
/// praises and empty standings for stats, recording nothing.
#[derive(Default)]
pub struct NoopPraiseCommandService;

#[async_trait]
impl PraiseCommandService for NoopPraiseCommandService {
    async fn praise(
        &self,
        _text: &str,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        Ok(Some(blocks::usage_message()))
    }

    async fn stats(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        Ok(Some(blocks::standings_message(&[])))
    }
}
