//! Chat session controller.
//!
//! Owns the message log, the loading flag, the readiness latch, the model
//! catalog and the selected model. State sits behind a plain mutex that is
//! never held across an await point, so views can read a snapshot at any
//! time while a send is streaming.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::catalog::{merge_discovered, preset_models, ModelDescriptor};
use crate::core::message::{Message, MessageContent, APOLOGY_TEXT};
use crate::core::notice::Notifier;
use crate::core::platform::{ChatOptions, Platform, PlatformError};
use crate::core::readiness::{wait_until_ready, Readiness, ReadinessLatch, ReadyPolicy};

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub default_model: String,
    pub test_mode: bool,
    pub ready_policy: ReadyPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_model: crate::core::constants::DEFAULT_MODEL.to_string(),
            test_mode: false,
            ready_policy: ReadyPolicy::default(),
        }
    }
}

/// Read-only copy of the controller state for rendering.
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_ready: bool,
    pub selected_model: String,
}

struct ActiveStream {
    id: u64,
    cancel: CancellationToken,
}

struct ChatState {
    messages: Vec<Message>,
    is_loading: bool,
    models: Vec<ModelDescriptor>,
    selected_model: String,
    last_stream_id: u64,
    active_stream: Option<ActiveStream>,
}

impl ChatState {
    fn is_current_stream(&self, stream_id: u64) -> bool {
        self.active_stream
            .as_ref()
            .is_some_and(|active| active.id == stream_id)
    }
}

pub struct ChatSession {
    platform: Arc<dyn Platform>,
    notifier: Notifier,
    settings: ChatSettings,
    presets: Vec<ModelDescriptor>,
    ready: ReadinessLatch,
    state: Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(platform: Arc<dyn Platform>, notifier: Notifier, settings: ChatSettings) -> Self {
        let presets = preset_models();
        let state = ChatState {
            messages: Vec::new(),
            is_loading: false,
            models: presets.clone(),
            selected_model: settings.default_model.clone(),
            last_stream_id: 0,
            active_stream: None,
        };
        Self {
            platform,
            notifier,
            settings,
            presets,
            ready: ReadinessLatch::new(),
            state: Mutex::new(state),
        }
    }

    /// Wait for the platform, latch readiness, then refresh the catalog.
    pub async fn initialize(&self) -> Readiness {
        let readiness = wait_until_ready(self.platform.as_ref(), self.settings.ready_policy).await;
        if readiness.is_ready() {
            self.ready.set();
            self.refresh_models().await;
        }
        readiness
    }

    /// Merge platform-listed models into the catalog. Failures only log;
    /// the catalog then stays as it was.
    pub async fn refresh_models(&self) {
        match self.platform.list_models().await {
            Ok(listed) if listed.is_empty() => {
                debug!("platform listed no models; keeping presets");
            }
            Ok(listed) => {
                let merged = merge_discovered(&self.presets, &listed);
                debug!(
                    discovered = merged.len() - self.presets.len(),
                    "merged discovered models into catalog"
                );
                self.lock_state().models = merged;
            }
            Err(err) => {
                warn!(error = %err, "failed to list models");
            }
        }
    }

    /// Send `text` and stream the assistant reply into a placeholder.
    ///
    /// Dropped silently when the text is blank, a send is already in
    /// flight, or the platform is not ready yet.
    pub async fn send_message(&self, text: &str) {
        let Some((history, options, cancel, stream_id)) = self.begin_send(text) else {
            return;
        };

        let outcome = self.stream_reply(history, options, cancel, stream_id).await;

        let mut state = self.lock_state();
        if let Err(err) = outcome {
            if state.is_current_stream(stream_id) {
                warn!(error = %err, stream_id, "send failed");
                Self::apply_apology(&mut state.messages);
                self.notifier.error(format!("Error: {err}"));
            } else {
                debug!(error = %err, stream_id, "ignoring failure from a cleared stream");
            }
        }
        state.is_loading = false;
        if state.is_current_stream(stream_id) {
            state.active_stream = None;
        }
    }

    fn begin_send(&self, text: &str) -> Option<(Vec<Message>, ChatOptions, CancellationToken, u64)> {
        if text.trim().is_empty() || !self.ready.is_set() {
            return None;
        }
        let mut state = self.lock_state();
        if state.is_loading {
            debug!("send dropped; another send is in flight");
            return None;
        }

        state.messages.push(Message::user(text));
        let history = state.messages.clone();
        state.messages.push(Message::assistant(""));
        state.is_loading = true;

        state.last_stream_id += 1;
        let stream_id = state.last_stream_id;
        let cancel = CancellationToken::new();
        state.active_stream = Some(ActiveStream {
            id: stream_id,
            cancel: cancel.clone(),
        });

        let options = ChatOptions {
            model: state.selected_model.clone(),
            stream: true,
            test_mode: self.settings.test_mode,
        };
        Some((history, options, cancel, stream_id))
    }

    async fn stream_reply(
        &self,
        history: Vec<Message>,
        options: ChatOptions,
        cancel: CancellationToken,
        stream_id: u64,
    ) -> Result<(), PlatformError> {
        debug!(stream_id, model = %options.model, messages = history.len(), "opening stream");
        let mut stream = tokio::select! {
            result = self.platform.chat(history, options, cancel.clone()) => result?,
            _ = cancel.cancelled() => return Ok(()),
        };

        let mut full_content = String::new();
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = cancel.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                    return Ok(());
                }
            };
            match next {
                Some(Ok(fragment)) => {
                    full_content.push_str(&fragment.text);
                    self.update_placeholder(stream_id, &full_content);
                }
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        debug!(stream_id, chars = full_content.len(), "stream finished");
        Ok(())
    }

    fn update_placeholder(&self, stream_id: u64, content: &str) {
        let mut state = self.lock_state();
        if !state.is_current_stream(stream_id) {
            return;
        }
        if let Some(last) = state.messages.last_mut() {
            last.content = MessageContent::Text(content.to_string());
        }
    }

    /// Replace an untouched placeholder with the apology, or append the
    /// apology after a partially streamed one.
    fn apply_apology(messages: &mut Vec<Message>) {
        match messages.last_mut() {
            Some(last) if last.is_assistant() && last.content.is_empty() => {
                last.content = MessageContent::Text(APOLOGY_TEXT.to_string());
            }
            _ => messages.push(Message::assistant(APOLOGY_TEXT)),
        }
    }

    /// Empty the log and cancel any in-flight stream.
    pub fn clear_chat(&self) {
        let mut state = self.lock_state();
        state.messages.clear();
        if let Some(active) = state.active_stream.take() {
            debug!(stream_id = active.id, "cancelling stream on clear");
            active.cancel.cancel();
        }
    }

    pub fn set_selected_model(&self, model_id: impl Into<String>) {
        self.lock_state().selected_model = model_id.into();
    }

    pub fn selected_model(&self) -> String {
        self.lock_state().selected_model.clone()
    }

    pub fn selected_descriptor(&self) -> ModelDescriptor {
        let state = self.lock_state();
        state
            .models
            .iter()
            .find(|model| model.id == state.selected_model)
            .cloned()
            .unwrap_or_else(|| ModelDescriptor::unknown(&state.selected_model))
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().messages.clone()
    }

    pub fn models(&self) -> Vec<ModelDescriptor> {
        self.lock_state().models.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock_state();
        ChatSnapshot {
            messages: state.messages.clone(),
            is_loading: state.is_loading,
            is_ready: self.ready.is_set(),
            selected_model: state.selected_model.clone(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ChatState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
