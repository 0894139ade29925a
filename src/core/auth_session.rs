//! Auth session controller: signed-in state and the current user.
//!
//! Identity comes from exactly one place after a sign-in: the user the
//! platform returns. Ambient lookups happen only once, at startup, to adopt
//! a session the platform remembered.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::api::User;
use crate::core::notice::Notifier;
use crate::core::platform::{Platform, PlatformError, SignInOptions};
use crate::core::readiness::{wait_until_ready, Readiness, ReadinessLatch, ReadyPolicy};

#[derive(Debug, Clone, Default)]
struct AuthState {
    user: Option<User>,
    is_signed_in: bool,
}

pub struct AuthSession {
    platform: Arc<dyn Platform>,
    notifier: Notifier,
    ready_policy: ReadyPolicy,
    ready: ReadinessLatch,
    state: Mutex<AuthState>,
}

impl AuthSession {
    pub fn new(platform: Arc<dyn Platform>, notifier: Notifier, ready_policy: ReadyPolicy) -> Self {
        Self {
            platform,
            notifier,
            ready_policy,
            ready: ReadinessLatch::new(),
            state: Mutex::new(AuthState::default()),
        }
    }

    pub async fn initialize(&self) -> Readiness {
        let readiness = wait_until_ready(self.platform.as_ref(), self.ready_policy).await;
        if readiness.is_ready() {
            self.ready.set();
            match self.platform.current_user().await {
                Ok(Some(user)) => {
                    info!(username = %user.username, "resuming signed-in session");
                    self.store_user(user);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "could not look up the current user"),
            }
        }
        readiness
    }

    /// Sign in through the platform.
    ///
    /// Returns `Ok(None)` without contacting the platform when it is not
    /// ready. On failure the state is left untouched and the error is
    /// returned after an error notice.
    pub async fn sign_in(&self, options: SignInOptions) -> Result<Option<User>, PlatformError> {
        if !self.ready.is_set() {
            return Ok(None);
        }
        match self.platform.sign_in(options).await {
            Ok(user) => {
                info!(username = %user.username, "signed in");
                self.notifier
                    .success(format!("Welcome back, {}!", user.username));
                self.store_user(user.clone());
                Ok(Some(user))
            }
            Err(err) => {
                error!(error = %err, "sign in failed");
                self.notifier.error(format!("Sign in failed: {err}"));
                Err(err)
            }
        }
    }

    /// Sign out through the platform and forget the local user.
    /// A no-op while the platform is not ready.
    pub async fn sign_out(&self) -> Result<(), PlatformError> {
        if !self.ready.is_set() {
            return Ok(());
        }
        if let Err(err) = self.platform.sign_out().await {
            error!(error = %err, "sign out failed");
            self.notifier.error(format!("Sign out failed: {err}"));
            return Err(err);
        }
        {
            let mut state = self.lock_state();
            state.user = None;
            state.is_signed_in = false;
        }
        info!("signed out");
        self.notifier.info("Signed out successfully");
        Ok(())
    }

    pub fn is_auth_ready(&self) -> bool {
        self.ready.is_set()
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock_state().is_signed_in
    }

    pub fn user(&self) -> Option<User> {
        self.lock_state().user.clone()
    }

    fn store_user(&self, user: User) {
        let mut state = self.lock_state();
        state.user = Some(user);
        state.is_signed_in = true;
    }

    fn lock_state(&self) -> MutexGuard<'_, AuthState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notice::NoticeLevel;
    use crate::utils::test_utils::{drain_notices, test_notifier, FakePlatform};
    use std::time::Duration;

    fn policy() -> ReadyPolicy {
        ReadyPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 2,
        }
    }

    fn session_for(
        platform: FakePlatform,
    ) -> (
        AuthSession,
        Arc<FakePlatform>,
        tokio::sync::mpsc::UnboundedReceiver<crate::core::notice::Notice>,
    ) {
        let platform = Arc::new(platform);
        let (notifier, rx) = test_notifier();
        (
            AuthSession::new(platform.clone(), notifier, policy()),
            platform,
            rx,
        )
    }

    #[tokio::test]
    async fn sign_in_stores_user_and_welcomes() {
        let (auth, platform, mut rx) =
            session_for(FakePlatform::new().with_sign_in(User::new("wukong")));
        assert!(auth.initialize().await.is_ready());

        let options = SignInOptions {
            attempt_temp_user_creation: true,
            token: None,
        };
        let user = auth.sign_in(options.clone()).await.expect("sign in");

        assert_eq!(user.map(|u| u.username).as_deref(), Some("wukong"));
        assert!(auth.is_signed_in());
        assert_eq!(auth.user().unwrap().username, "wukong");
        assert_eq!(platform.sign_in_calls(), vec![options]);

        let notices = drain_notices(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].text, "Welcome back, wukong!");
    }

    #[tokio::test]
    async fn sign_in_failure_leaves_state_and_propagates() {
        let (auth, _platform, mut rx) =
            session_for(FakePlatform::new().failing_sign_in("popup closed"));
        auth.initialize().await;

        let result = auth.sign_in(SignInOptions::default()).await;

        assert!(matches!(result, Err(PlatformError::Auth(ref m)) if m == "popup closed"));
        assert!(!auth.is_signed_in());
        assert!(auth.user().is_none());
        let notices = drain_notices(&mut rx);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].text, "Sign in failed: popup closed");
    }

    #[tokio::test]
    async fn sign_in_failure_keeps_an_existing_user() {
        let (auth, _platform, _rx) = session_for(
            FakePlatform::new()
                .already_signed_in(User::new("bajie"))
                .failing_sign_in("rate limited"),
        );
        auth.initialize().await;
        assert_eq!(auth.user().unwrap().username, "bajie");

        assert!(auth.sign_in(SignInOptions::default()).await.is_err());

        assert!(auth.is_signed_in());
        assert_eq!(auth.user().unwrap().username, "bajie");
    }

    #[tokio::test]
    async fn initialize_adopts_remembered_user() {
        let (auth, _platform, mut rx) =
            session_for(FakePlatform::new().already_signed_in(User::new("sanzang")));

        assert!(auth.initialize().await.is_ready());

        assert!(auth.is_auth_ready());
        assert!(auth.is_signed_in());
        assert!(drain_notices(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_user() {
        let (auth, _platform, mut rx) =
            session_for(FakePlatform::new().already_signed_in(User::new("wujing")));
        auth.initialize().await;

        auth.sign_out().await.expect("sign out");

        assert!(!auth.is_signed_in());
        assert!(auth.user().is_none());
        let notices = drain_notices(&mut rx);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert_eq!(notices[0].text, "Signed out successfully");
    }

    #[tokio::test]
    async fn sign_out_failure_keeps_user() {
        let (auth, _platform, _rx) = session_for(
            FakePlatform::new()
                .already_signed_in(User::new("wujing"))
                .failing_sign_out(),
        );
        auth.initialize().await;

        assert!(auth.sign_out().await.is_err());
        assert!(auth.is_signed_in());
    }

    #[tokio::test]
    async fn operations_are_noops_until_ready() {
        let (auth, platform, mut rx) = session_for(
            FakePlatform::new()
                .unavailable_for(5)
                .with_sign_in(User::new("wukong")),
        );
        assert!(!auth.initialize().await.is_ready());

        assert_eq!(auth.sign_in(SignInOptions::default()).await.unwrap(), None);
        auth.sign_out().await.unwrap();

        assert!(platform.sign_in_calls().is_empty());
        assert!(!auth.is_signed_in());
        assert!(drain_notices(&mut rx).is_empty());
    }
}
