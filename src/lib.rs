//! Monkeyking is a terminal chat client whose inference, sign-in and model
//! listing are provided by a hosted platform.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the platform capability trait and its HTTP implementation,
//!   the chat and auth session controllers, the model catalog and readiness.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`api`] defines the wire payloads exchanged with the platform.
//! - [`cli`] parses arguments and dispatches the non-interactive commands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
