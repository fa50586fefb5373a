use thiserror::Error;

/// Rejection reasons for a praise request. Each maps to a specific
/// user-facing message rendered at the chat boundary; none of these ever
/// crash the bot.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("praise command text is empty")]
    EmptyCommand,
    #[error("no resolvable mentions in praise command")]
    NoResolvableMentions,
    #[error("praise message after the last mention is empty")]
    EmptyMessage,
    #[error("weekly praise limit of {limit} reached (used {used})")]
    WeeklyLimitReached { limit: u32, used: u32 },
    #[error("{requested} mentions exceed the {remaining} praise(s) remaining this week")]
    TooManyMentions { requested: usize, remaining: u32 },
}
