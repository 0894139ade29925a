use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ListedModel, User};
use crate::core::message::Message;
use crate::core::notice::{Notice, Notifier};
use crate::core::platform::{
    stream_from_channel, ChatOptions, Fragment, FragmentStream, Platform, PlatformError,
    SignInOptions,
};

/// Scripted response for one `chat` call.
#[derive(Debug, Clone)]
pub enum ChatScript {
    /// Stream every fragment, then end normally.
    Fragments(Vec<String>),
    /// `chat` itself fails before streaming anything.
    Refuse(String),
    /// Stream the fragments, then fail mid-stream.
    BreakAfter(Vec<String>, String),
    /// Stream the fragments, then stay open until released or cancelled.
    Held(Vec<String>),
}

impl ChatScript {
    pub fn fragments(parts: &[&str]) -> Self {
        ChatScript::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn held(parts: &[&str]) -> Self {
        ChatScript::Held(parts.iter().map(|p| p.to_string()).collect())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub history: Vec<Message>,
    pub options: ChatOptions,
}

/// In-memory [`Platform`] double driven by scripts.
pub struct FakePlatform {
    unavailable_for: AtomicU32,
    connect_calls: AtomicU32,
    chat_scripts: Mutex<VecDeque<ChatScript>>,
    chat_calls: Mutex<Vec<RecordedChat>>,
    models: Mutex<Result<Vec<ListedModel>, String>>,
    sign_in_result: Mutex<Result<User, String>>,
    sign_in_calls: Mutex<Vec<SignInOptions>>,
    signed_in: Mutex<Option<User>>,
    sign_out_fails: AtomicBool,
    release: CancellationToken,
    cancelled_streams: Arc<AtomicU32>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            unavailable_for: AtomicU32::new(0),
            connect_calls: AtomicU32::new(0),
            chat_scripts: Mutex::new(VecDeque::new()),
            chat_calls: Mutex::new(Vec::new()),
            models: Mutex::new(Ok(Vec::new())),
            sign_in_result: Mutex::new(Err("sign-in not scripted".to_string())),
            sign_in_calls: Mutex::new(Vec::new()),
            signed_in: Mutex::new(None),
            sign_out_fails: AtomicBool::new(false),
            release: CancellationToken::new(),
            cancelled_streams: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fail the first `attempts` connect attempts.
    pub fn unavailable_for(self, attempts: u32) -> Self {
        self.unavailable_for.store(attempts, Ordering::SeqCst);
        self
    }

    pub fn with_chat(self, script: ChatScript) -> Self {
        self.chat_scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn with_models(self, ids: &[&str]) -> Self {
        *self.models.lock().unwrap() =
            Ok(ids.iter().map(|id| ListedModel::Id(id.to_string())).collect());
        self
    }

    pub fn failing_models(self, message: &str) -> Self {
        *self.models.lock().unwrap() = Err(message.to_string());
        self
    }

    pub fn with_sign_in(self, user: User) -> Self {
        *self.sign_in_result.lock().unwrap() = Ok(user);
        self
    }

    pub fn failing_sign_in(self, message: &str) -> Self {
        *self.sign_in_result.lock().unwrap() = Err(message.to_string());
        self
    }

    pub fn already_signed_in(self, user: User) -> Self {
        *self.signed_in.lock().unwrap() = Some(user);
        self
    }

    pub fn failing_sign_out(self) -> Self {
        self.sign_out_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> Vec<RecordedChat> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn sign_in_calls(&self) -> Vec<SignInOptions> {
        self.sign_in_calls.lock().unwrap().clone()
    }

    /// Let every `Held` stream finish normally.
    pub fn release_held_streams(&self) {
        self.release.cancel();
    }

    /// Number of held streams that ended because their token was cancelled.
    pub fn cancelled_streams(&self) -> u32 {
        self.cancelled_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn connect(&self) -> Result<(), PlatformError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.unavailable_for.load(Ordering::SeqCst);
        if remaining > 0 {
            self.unavailable_for.store(remaining - 1, Ordering::SeqCst);
            return Err(PlatformError::NotReady("not loaded yet".to_string()));
        }
        Ok(())
    }

    async fn chat(
        &self,
        history: Vec<Message>,
        options: ChatOptions,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, PlatformError> {
        self.chat_calls
            .lock()
            .unwrap()
            .push(RecordedChat { history, options });
        let script = self
            .chat_scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PlatformError::Stream("no scripted chat response".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (parts, tail) = match script {
            ChatScript::Refuse(message) => return Err(PlatformError::Stream(message)),
            ChatScript::Fragments(parts) => (parts, None),
            ChatScript::BreakAfter(parts, message) => (parts, Some(Err(message))),
            ChatScript::Held(parts) => (parts, Some(Ok(()))),
        };
        let release = self.release.clone();
        let cancelled_streams = Arc::clone(&self.cancelled_streams);
        tokio::spawn(async move {
            for part in parts {
                let _ = tx.send(Ok(Fragment::new(part)));
            }
            match tail {
                None => {}
                Some(Err(message)) => {
                    let _ = tx.send(Err(PlatformError::Stream(message)));
                }
                Some(Ok(())) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            cancelled_streams.fetch_add(1, Ordering::SeqCst);
                        }
                        _ = release.cancelled() => {}
                    }
                }
            }
        });
        Ok(stream_from_channel(rx))
    }

    async fn list_models(&self) -> Result<Vec<ListedModel>, PlatformError> {
        self.models
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| PlatformError::Api {
                status: 500,
                message,
            })
    }

    async fn sign_in(&self, options: SignInOptions) -> Result<User, PlatformError> {
        self.sign_in_calls.lock().unwrap().push(options);
        let result = self.sign_in_result.lock().unwrap().clone();
        match result {
            Ok(user) => {
                *self.signed_in.lock().unwrap() = Some(user.clone());
                Ok(user)
            }
            Err(message) => Err(PlatformError::Auth(message)),
        }
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(PlatformError::Api {
                status: 503,
                message: "sign-out unavailable".to_string(),
            });
        }
        *self.signed_in.lock().unwrap() = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, PlatformError> {
        Ok(self.signed_in.lock().unwrap().clone())
    }
}

/// Drain every notice emitted so far.
pub fn drain_notices(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

pub fn test_notifier() -> (Notifier, mpsc::UnboundedReceiver<Notice>) {
    Notifier::new()
}

/// Poll `condition` until it holds, yielding to spawned tasks in between.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not met in time");
}
