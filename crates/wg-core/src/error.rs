use std::fmt;

/// Machine-readable error codes surfaced by the CLI and any chat front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    MissingBotToken,
    PersonNotFound,
    DuplicatePerson,
    InvalidAmount,
    EmptyParticipants,
    OpenDebts,
    NoActiveDialog,
    InvalidName,
    StorageFailure,
    DeliveryFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::MissingBotToken => "E1003",
            Self::PersonNotFound => "E2001",
            Self::DuplicatePerson => "E2002",
            Self::InvalidAmount => "E2003",
            Self::EmptyParticipants => "E2004",
            Self::OpenDebts => "E2005",
            Self::NoActiveDialog => "E2006",
            Self::InvalidName => "E2007",
            Self::StorageFailure => "E3001",
            Self::DeliveryFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "House not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingBotToken => "Chat bot token not configured",
            Self::PersonNotFound => "Person not found",
            Self::DuplicatePerson => "Person already registered",
            Self::InvalidAmount => "Invalid amount",
            Self::EmptyParticipants => "No participants to split with",
            Self::OpenDebts => "Person still has open debts",
            Self::NoActiveDialog => "No expense dialog in progress",
            Self::InvalidName => "Invalid person name",
            Self::StorageFailure => "Database operation failed",
            Self::DeliveryFailed => "Message delivery failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `wg init` in the house directory."),
            Self::ConfigParseError => Some("Fix .wg/config.toml or the WG_* environment and retry."),
            Self::MissingBotToken => Some("Set WG_BOT_TOKEN or [notify].bot_token, or use --dry-run."),
            Self::PersonNotFound => Some("Check the roster with `wg person list`."),
            Self::DuplicatePerson => Some("Names and identities must be unique."),
            Self::InvalidAmount => Some("Use a positive number such as 12.50."),
            Self::EmptyParticipants => Some("Add people with `wg person add` first."),
            Self::OpenDebts => Some("Settle the person's debts before removing them."),
            Self::NoActiveDialog => Some("Start with `/addexpense` (or `wg expense add`)."),
            Self::InvalidName => Some("Names must contain at least one visible character."),
            Self::StorageFailure => Some("Retry once. Nothing was partially applied."),
            Self::DeliveryFailed => Some("Check the bot token and network, then retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
