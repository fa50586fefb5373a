use serde::Serialize;

use kudos_core::ledger::RankingRow;
use kudos_core::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

const USAGE_LINE: &str = "Format: `/kudos @Person1 @Person2 Your praise message`";

const STANDINGS_INTRO: &str = "Below you can see the statistics of praises in our team.\nEach person's score is calculated as the sum of praises received and given.";

const STANDINGS_EMPTY: &str = "_No praises have been given yet. Be the first to praise someone using_ `/kudos @username Your praise message`!";

/// Notification posted to the originating channel for one recorded praise.
pub fn praise_notification(
    from_user_id: &str,
    recipient_mention: &str,
    message: &str,
    recipient_total: usize,
    remaining: u32,
    persisted: bool,
) -> MessageTemplate {
    let mut builder =
        MessageBuilder::new(format!("🌟 <@{from_user_id}> praised {recipient_mention}: {message}"))
            .section("praise.alert.header.v1", |section| {
                section.mrkdwn("🌟 *New Praise Alert!*");
            })
            .section("praise.alert.body.v1", |section| {
                section.mrkdwn(format!(
                    "*<@{from_user_id}>* praised *{recipient_mention}*:\n>{message}"
                ));
            })
            .context("praise.alert.counters.v1", |context| {
                context.mrkdwn(format!(
                    "This is praise #{recipient_total} for {recipient_mention} (You have {remaining} praise(s) remaining this week)"
                ));
            });

    if !persisted {
        builder = builder.context("praise.alert.unpersisted.v1", |context| {
            context.mrkdwn(
                ":warning: This praise was recorded but could not be saved to storage yet; it may be lost if the bot restarts.",
            );
        });
    }

    builder.build()
}

/// The standings card used by `/stats` and the scheduled broadcast. Rows
/// arrive pre-sorted from the ledger ranking.
pub fn standings_message(rows: &[RankingRow]) -> MessageTemplate {
    let mut builder = MessageBuilder::new(format!("{STANDINGS_INTRO}\n🏆 Current Standings"))
        .section("praise.standings.intro.v1", |section| {
            section.mrkdwn(format!("{STANDINGS_INTRO}\n"));
        })
        .section("praise.standings.header.v1", |section| {
            section.mrkdwn("*🏆 Current Standings:*");
        });

    for (index, row) in rows.iter().enumerate() {
        builder = builder.section(format!("praise.standings.row.{}.v1", index + 1), |section| {
            section.mrkdwn(format!(
                "• <@{}>: {} received + {} given = {} total",
                row.user, row.received, row.given, row.total
            ));
        });
    }

    if rows.is_empty() {
        builder = builder.section("praise.standings.empty.v1", |section| {
            section.mrkdwn(STANDINGS_EMPTY);
        });
    }

    builder.build()
}

/// Reply for a `/kudos` invocation with no text at all.
pub fn usage_message() -> MessageTemplate {
    MessageBuilder::new("How to praise someone")
        .section("praise.usage.v1", |section| {
            section.mrkdwn(format!(
                "Please mention one or more people using @ and write your praise message.\n{USAGE_LINE}"
            ));
        })
        .build()
}

/// User-facing rejection for a praise request that failed validation. Each
/// reason keeps its own wording; none of these are errors worth a crash.
pub fn rejection_message(error: &ValidationError) -> MessageTemplate {
    let text = match error {
        ValidationError::EmptyCommand => format!(
            "Please mention one or more people using @ and write your praise message.\n{USAGE_LINE}"
        ),
        ValidationError::NoResolvableMentions => {
            "Could not find any valid users to praise. Please make sure you're mentioning active Slack users.".to_string()
        }
        ValidationError::EmptyMessage => format!(
            "Please provide a praise message after mentioning the people.\n{USAGE_LINE}"
        ),
        ValidationError::WeeklyLimitReached { limit, used } => format!(
            "You've reached your weekly limit of {limit} praises. Please wait until next week to give more praises! (Current count: {used})"
        ),
        ValidationError::TooManyMentions { remaining, .. } => format!(
            "You can only give {remaining} more praise(s) this week. Please mention fewer people or wait until next week."
        ),
    };

    MessageBuilder::new(text.clone())
        .section("praise.rejection.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

/// Posted when the in-loop quota guard stops a request partway through.
pub fn partial_limit_notice() -> MessageTemplate {
    MessageBuilder::new("Weekly praise limit reached. Some praises were not recorded.")
        .section("praise.partial.v1", |section| {
            section.mrkdwn("Weekly praise limit reached. Some praises were not recorded.");
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("praise.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("praise.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

/// Generic apology when a collaborator call failed mid-command.
pub fn apology_message(correlation_id: &str) -> MessageTemplate {
    error_message(
        "An error occurred while processing your praise. Please try again or contact support if the issue persists.",
        correlation_id,
    )
}
