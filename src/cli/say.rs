//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::print_notices;
use crate::core::chat_session::ChatSession;
use crate::core::config::Config;
use crate::core::message::APOLOGY_TEXT;
use crate::core::notice::Notifier;
use crate::core::platform::Platform;
use crate::core::readiness::Readiness;

const POLL_INTERVAL: Duration = Duration::from_millis(30);

pub async fn run_say(
    platform: Arc<dyn Platform>,
    config: &Config,
    model: Option<&str>,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: monkeyking say <prompt>");
        std::process::exit(1);
    }

    let (notifier, mut notices) = Notifier::new();
    let session = Arc::new(ChatSession::new(
        platform,
        notifier,
        config.chat_settings(model),
    ));

    if let Readiness::Failed(err) = session.initialize().await {
        eprintln!("❌ Platform not ready: {err}");
        std::process::exit(1);
    }

    let sender = Arc::clone(&session);
    let send = tokio::spawn(async move { sender.send_message(&prompt).await });

    let mut printed = 0usize;
    loop {
        let finished = send.is_finished();
        printed = print_new_reply_text(&session, printed)?;
        if finished {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    send.await?;
    println!();

    print_notices(&mut notices);
    let failed = session
        .messages()
        .last()
        .is_some_and(|message| message.is_assistant() && message.text() == APOLOGY_TEXT);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Print whatever the reply placeholder gained since `printed` bytes.
fn print_new_reply_text(session: &ChatSession, printed: usize) -> io::Result<usize> {
    let messages = session.messages();
    let Some(reply) = messages.get(1).filter(|message| message.is_assistant()) else {
        return Ok(printed);
    };
    let text = reply.text();
    if text.len() > printed && text.is_char_boundary(printed) {
        print!("{}", &text[printed..]);
        io::stdout().flush()?;
        return Ok(text.len());
    }
    Ok(printed)
}
