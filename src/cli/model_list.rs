//! Model listing functionality
//!
//! Prints the catalog the chat view would offer: presets plus whatever the
//! platform lists once it is reachable.

use std::error::Error;
use std::sync::Arc;

use crate::core::catalog::{filter_models, ModelDescriptor};
use crate::core::chat_session::ChatSession;
use crate::core::config::Config;
use crate::core::notice::Notifier;
use crate::core::platform::Platform;
use crate::core::readiness::Readiness;

pub async fn list_models(
    platform: Arc<dyn Platform>,
    config: &Config,
    model: Option<&str>,
    search: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let (notifier, _notices) = Notifier::new();
    let session = ChatSession::new(platform, notifier, config.chat_settings(model));

    if let Readiness::Failed(err) = session.initialize().await {
        eprintln!("⚠️  Platform not reachable ({err}); showing built-in models only");
        eprintln!();
    }

    let models = session.models();
    let query = search.unwrap_or("");
    let matches = filter_models(&models, query);

    println!("🤖 Available Models");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("🎯 Selected model: {}", session.selected_model());
    println!();

    if matches.is_empty() {
        if query.trim().is_empty() {
            println!("No models found.");
        } else {
            println!("No models match '{}'.", query.trim());
        }
        return Ok(());
    }

    println!("Found {} models:", matches.len());
    println!();
    for model in matches {
        print_model(model, &session.selected_model());
    }
    Ok(())
}

fn print_model(model: &ModelDescriptor, selected: &str) {
    let marker = if model.id == selected { "▶" } else { "•" };
    println!("  {marker} {}", model.id);
    if model.name != model.id {
        println!("    Name: {}", model.name);
    }
    println!("    Provider: {}", model.provider);
    if let Some(cost) = model.cost_summary() {
        println!("    Cost: {cost}");
    }
    println!();
}
