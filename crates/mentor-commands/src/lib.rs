//! Command resolution pipeline and event fan-out.
//!
//! The dispatcher turns raw message events into handler invocations behind a
//! series of gates (channel, role, in-flight, cooldown); the router fans
//! every other gateway event out to its subscribers. Both guarantee that a
//! failing handler can never take down the session.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod parse;
pub mod registry;
pub mod router;
pub mod suggest;

pub use context::CommandContext;
pub use dispatch::{CommandHook, DispatchOutcome, Dispatcher};
pub use error::{CommandError, Result};
pub use parse::{ArgKind, ArgSlot, ArgValue, ParsedArgs};
pub use registry::{CommandHandler, CommandSpec, Registry, RegistryError};
pub use router::{EventSubscriber, Router};
