//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: terminal setup and the event loop that feeds keys to the
//!   session controllers in [`crate::core`].
//! - [`renderer`] and [`title`]: frame composition from a controller snapshot.
//! - [`picker`]: the searchable model picker.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and platform coordination.

pub mod chat_loop;
pub mod picker;
pub mod renderer;
pub mod title;
