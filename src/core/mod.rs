pub mod auth_session;
pub mod catalog;
pub mod chat_session;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod http_platform;
pub mod keyring;
pub mod message;
pub mod notice;
pub mod platform;
pub mod readiness;
