//! Discord platform adapter.
//!
//! `Rest` is the REST capability surface handed to every other component;
//! the connection supervisor owns the gateway session exclusively. Raw
//! serenity events never leave this crate — they are translated into
//! `mentor_core::events::GatewayEvent` first.

pub mod error;
pub mod handler;
pub mod rest;
pub mod session;
pub mod supervisor;

pub use error::{PlatformError, Result};
pub use rest::Rest;
pub use session::{SessionPhase, SessionState};
pub use supervisor::Supervisor;
