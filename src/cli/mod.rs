//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod auth;
pub mod model_list;
pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use crate::cli::auth::{run_login, run_logout};
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::core::constants::TOKEN_ENV_VAR;
use crate::core::http_platform::HttpPlatform;
use crate::core::keyring::TokenStore;
use crate::core::notice::{Notice, NoticeLevel};
use crate::core::platform::Platform;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_logging;
use crate::utils::url::normalize_base_url;

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("VERGEN_GIT_SHA"),
        ", built ",
        env!("VERGEN_BUILD_DATE"),
        ")"
    )
}

#[derive(Parser)]
#[command(name = "monkeyking")]
#[command(version, long_version = long_version())]
#[command(about = "A terminal chat client for a hosted model platform")]
#[command(
    long_about = "Monkeyking is a full-screen terminal chat interface. Inference, sign-in and \
model listing are provided by a hosted platform reached over HTTP.\n\n\
Authentication:\n\
  Use 'monkeyking login' to start a session; the session token is kept in your system keyring.\n\n\
Environment Variables:\n\
  MONKEYKING_TOKEN  Session token used when none is stored in the keyring\n\
  RUST_LOG          Log filter (overrides the log-filter config key)\n\n\
Controls:\n\
  Enter             Send the message\n\
  Ctrl+L            Clear the conversation (cancels a streaming reply)\n\
  Ctrl+P            Pick a model\n\
  Ctrl+S            Sign in or sign out\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model id to chat with (overrides the default-model config key)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Platform base URL (overrides the base-url config key)
    #[arg(short = 'b', long = "base-url", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Write diagnostic logs to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single prompt and print the streamed reply
    Say {
        /// Prompt text; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the model catalog
    Models {
        /// Only show models whose name, provider or id contain this text
        #[arg(short = 's', long)]
        search: Option<String>,
    },
    /// Sign in to the platform
    Login {
        /// Use this session token instead of the stored one
        #[arg(long)]
        token: Option<String>,
        /// Ask the platform to create a temporary user when no session exists
        #[arg(long)]
        guest: bool,
    },
    /// Sign out and forget the stored session token
    Logout,
    /// Set a configuration value, or show the configuration when no value is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    let command = args.command.unwrap_or(Commands::Chat);
    if let Err(err) = init_logging(args.log.as_deref(), config.log_filter.as_deref()) {
        eprintln!("⚠️  Logging disabled: {err}");
    }

    let base_url = args
        .base_url
        .as_deref()
        .map(normalize_base_url)
        .unwrap_or_else(|| normalize_base_url(config.base_url()));

    match command {
        Commands::Chat => {
            let platform = build_platform(&base_url, &config);
            run_chat(platform, &config, args.model.as_deref()).await
        }
        Commands::Say { prompt } => {
            let platform = build_platform(&base_url, &config);
            run_say(platform, &config, args.model.as_deref(), prompt).await
        }
        Commands::Models { search } => {
            let platform = build_platform(&base_url, &config);
            list_models(platform, &config, args.model.as_deref(), search.as_deref()).await
        }
        Commands::Login { token, guest } => {
            let platform = build_platform(&base_url, &config);
            run_login(platform, &config, token, guest).await
        }
        Commands::Logout => {
            let platform = build_platform(&base_url, &config);
            run_logout(platform, &config).await
        }
        Commands::Set { key, value } => {
            let mut config = config;
            match key {
                Some(key) if !value.is_empty() => {
                    let value = value.join(" ");
                    if let Err(err) = config.set_value(&key, &value) {
                        eprintln!("❌ {err}");
                        std::process::exit(1);
                    }
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                _ => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = config;
            if let Err(err) = config.unset_value(&key) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
    }
}

fn build_platform(base_url: &str, config: &Config) -> Arc<dyn Platform> {
    let tokens = TokenStore::new(base_url, config.use_keyring());
    let platform =
        HttpPlatform::new(base_url, tokens).with_env_token(std::env::var(TOKEN_ENV_VAR).ok());
    Arc::new(platform)
}

/// Print every queued notice. Errors go to stderr.
pub(crate) fn print_notices(rx: &mut mpsc::UnboundedReceiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        match notice.level {
            NoticeLevel::Success => println!("✅ {}", notice.text),
            NoticeLevel::Info => println!("ℹ️  {}", notice.text),
            NoticeLevel::Error => eprintln!("❌ {}", notice.text),
        }
    }
}
