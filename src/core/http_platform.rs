//! [`Platform`] over an OpenAI-compatible HTTP API.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET whoami`: reachability check and current-user lookup
//! - `POST chat/completions`: server-sent-event completions
//! - `GET models`: model listing
//! - `POST auth/sign-in`, `POST auth/sign-out`: session management

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::models::fetch_models;
use crate::api::{ListedModel, SignInRequest, SignInResponse, User};
use crate::core::chat_stream::{spawn_stream, summarize_api_error, StreamParams};
use crate::core::constants::TOKEN_ENV_VAR;
use crate::core::keyring::{KeyringAccessError, TokenStore};
use crate::core::message::Message;
use crate::core::platform::{ChatOptions, FragmentStream, Platform, PlatformError, SignInOptions};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    env_token: Option<String>,
}

impl HttpPlatform {
    pub fn new(base_url: &str, tokens: TokenStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            tokens,
            env_token: None,
        }
    }

    /// Token used when neither an explicit nor a stored token exists.
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        self.env_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn token(&self) -> Result<Option<String>, PlatformError> {
        select_token(self.tokens.get(), self.env_token.as_deref())
    }

    async fn whoami(&self, token: Option<&str>) -> Result<Option<User>, PlatformError> {
        let request = self.client.get(construct_api_url(&self.base_url, "whoami"));
        let response = add_auth_headers(request, token).send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<User>().await?)),
            status => Err(api_error(status, response).await),
        }
    }
}

/// Stored token first, then the environment token. A keyring that is only
/// temporarily unreachable falls back to the environment token as well.
fn select_token(
    stored: Result<Option<String>, KeyringAccessError>,
    env_token: Option<&str>,
) -> Result<Option<String>, PlatformError> {
    match stored {
        Ok(Some(token)) => Ok(Some(token)),
        Ok(None) => Ok(env_token.map(str::to_string)),
        Err(err) if err.is_recoverable() => {
            warn!(
                error = %err,
                "unable to read the stored session token; falling back to {TOKEN_ENV_VAR} if set"
            );
            Ok(env_token.map(str::to_string))
        }
        Err(err) => Err(err.into()),
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> PlatformError {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    PlatformError::Api {
        status: status.as_u16(),
        message: summarize_api_error(&body),
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn connect(&self) -> Result<(), PlatformError> {
        // Any HTTP answer means the platform is reachable.
        self.client
            .get(construct_api_url(&self.base_url, "whoami"))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| PlatformError::NotReady(err.to_string()))
    }

    async fn chat(
        &self,
        history: Vec<Message>,
        options: ChatOptions,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, PlatformError> {
        debug!(model = %options.model, stream = options.stream, "starting chat request");
        Ok(spawn_stream(StreamParams {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: self.token()?,
            model: options.model,
            messages: history,
            test_mode: options.test_mode,
            cancel_token: cancel,
        }))
    }

    async fn list_models(&self) -> Result<Vec<ListedModel>, PlatformError> {
        let token = self.token()?;
        fetch_models(&self.client, &self.base_url, token.as_deref()).await
    }

    async fn sign_in(&self, options: SignInOptions) -> Result<User, PlatformError> {
        let token = match options.token.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => Some(explicit.to_string()),
            _ => self.token()?,
        };

        let request = self
            .client
            .post(construct_api_url(&self.base_url, "auth/sign-in"))
            .json(&SignInRequest {
                attempt_temp_user_creation: options.attempt_temp_user_creation,
            });
        let response = add_auth_headers(request, token.as_deref()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let body = response.json::<SignInResponse>().await?;

        let session_token = body.token.or(token);
        if let Some(session_token) = session_token.as_deref() {
            match self.tokens.store(session_token) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "session token kept for this run only; keyring unavailable");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let user = match body.user {
            Some(user) => Some(user),
            None => self.whoami(session_token.as_deref()).await?,
        };
        let user = user.ok_or_else(|| {
            PlatformError::Auth("sign-in completed without a user".to_string())
        })?;
        info!(account = %self.tokens.account(), username = %user.username, "session established");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        let token = self.token()?;
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "auth/sign-out"));
        let response = add_auth_headers(request, token.as_deref()).send().await?;
        let status = response.status();
        // An already expired session still counts as signed out.
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(api_error(status, response).await);
        }
        self.tokens.remove()?;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, PlatformError> {
        match self.token()? {
            Some(token) => self.whoami(Some(&token)).await,
            None => Ok(None),
        }
    }
}
