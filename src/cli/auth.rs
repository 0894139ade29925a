//! `login` and `logout` commands.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cli::print_notices;
use crate::core::auth_session::AuthSession;
use crate::core::config::Config;
use crate::core::notice::{Notice, Notifier};
use crate::core::platform::{Platform, SignInOptions};
use crate::core::readiness::Readiness;

async fn ready_session(
    platform: Arc<dyn Platform>,
    config: &Config,
) -> (AuthSession, mpsc::UnboundedReceiver<Notice>) {
    let (notifier, notices) = Notifier::new();
    let session = AuthSession::new(platform, notifier, config.ready_policy());
    if let Readiness::Failed(err) = session.initialize().await {
        eprintln!("❌ Platform not ready: {err}");
        std::process::exit(1);
    }
    (session, notices)
}

pub async fn run_login(
    platform: Arc<dyn Platform>,
    config: &Config,
    token: Option<String>,
    guest: bool,
) -> Result<(), Box<dyn Error>> {
    let (session, mut notices) = ready_session(platform, config).await;

    if token.is_none() {
        if let Some(user) = session.user() {
            println!("Already signed in as {}", user.username);
            return Ok(());
        }
    }

    let result = session
        .sign_in(SignInOptions {
            attempt_temp_user_creation: guest,
            token,
        })
        .await;
    print_notices(&mut notices);
    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn run_logout(platform: Arc<dyn Platform>, config: &Config) -> Result<(), Box<dyn Error>> {
    let (session, mut notices) = ready_session(platform, config).await;
    let result = session.sign_out().await;
    print_notices(&mut notices);
    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
