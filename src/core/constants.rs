//! Shared constants used across the application

/// Model selected when neither the command line nor the config names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Platform endpoint used when the config does not override it.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4100/v1";

/// Environment fallback for the session token.
pub const TOKEN_ENV_VAR: &str = "MONKEYKING_TOKEN";

/// Space reserved for the streaming indicator + margin in the input box.
/// Rendering and cursor placement must agree on it.
pub const INDICATOR_SPACE: u16 = 4;
