//! Capability interface to the hosted AI platform.
//!
//! Controllers never reach for a global client: they are handed an
//! `Arc<dyn Platform>` at construction time. [`crate::core::http_platform`]
//! provides the production implementation; tests substitute a scripted fake.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ListedModel, User};
use crate::core::keyring::KeyringAccessError;
use crate::core::message::Message;

/// One incremental piece of streamed assistant text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub type FragmentStream = BoxStream<'static, Result<Fragment, PlatformError>>;

/// Adapt the receiving half of a fragment channel into a [`FragmentStream`].
/// The stream ends once every sender is dropped.
pub fn stream_from_channel(
    rx: mpsc::UnboundedReceiver<Result<Fragment, PlatformError>>,
) -> FragmentStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOptions {
    pub model: String,
    pub stream: bool,
    pub test_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInOptions {
    pub attempt_temp_user_creation: bool,
    /// Pre-issued token supplied by the user, stored on success.
    pub token: Option<String>,
}

#[derive(Debug)]
pub enum PlatformError {
    /// The platform could not be reached at all.
    NotReady(String),
    /// Network-level failure while talking to the platform.
    Transport(reqwest::Error),
    /// The platform answered with a non-success status.
    Api { status: u16, message: String },
    /// The platform reported an error in the middle of a stream.
    Stream(String),
    /// Sign-in did not produce a user.
    Auth(String),
    Keyring(KeyringAccessError),
    Decode(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::NotReady(detail) => write!(f, "platform is not ready: {detail}"),
            PlatformError::Transport(err) => write!(f, "request failed: {err}"),
            PlatformError::Api { status, message } => {
                write!(f, "platform returned {status}: {message}")
            }
            PlatformError::Stream(message) => write!(f, "{message}"),
            PlatformError::Auth(message) => write!(f, "{message}"),
            PlatformError::Keyring(err) => write!(f, "keyring access failed: {err}"),
            PlatformError::Decode(message) => write!(f, "unexpected response: {message}"),
        }
    }
}

impl Error for PlatformError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlatformError::Transport(err) => Some(err),
            PlatformError::Keyring(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatformError::Decode(err.to_string())
        } else {
            PlatformError::Transport(err)
        }
    }
}

impl From<KeyringAccessError> for PlatformError {
    fn from(err: KeyringAccessError) -> Self {
        PlatformError::Keyring(err)
    }
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Check availability. Called repeatedly by the readiness step.
    async fn connect(&self) -> Result<(), PlatformError>;

    /// Open a streaming completion over `history`.
    ///
    /// Cancelling `cancel` terminates the underlying request; the returned
    /// stream then ends without further fragments.
    async fn chat(
        &self,
        history: Vec<Message>,
        options: ChatOptions,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, PlatformError>;

    async fn list_models(&self) -> Result<Vec<ListedModel>, PlatformError>;

    /// Sign in and return the signed-in user. This return value is the only
    /// source of identity the controllers consult after a sign-in.
    async fn sign_in(&self, options: SignInOptions) -> Result<User, PlatformError>;

    async fn sign_out(&self) -> Result<(), PlatformError>;

    /// User already signed in from an earlier session, if any.
    async fn current_user(&self) -> Result<Option<User>, PlatformError>;
}
