//! Command registration. Each module is one subsystem contributing its
//! descriptors to the registry at startup; the registry is frozen right
//! after `register_all` returns.

use std::sync::Arc;

use mentor_commands::{Registry, RegistryError};

use crate::services::Services;

pub mod achievements;
pub mod ai;
pub mod education;
pub mod invites;
pub mod meta;
pub mod music;
pub mod staff;
pub mod study;

pub fn register_all(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    meta::register(registry, services)?;
    education::register(registry, services)?;
    study::register(registry, services)?;
    ai::register(registry, services)?;
    achievements::register(registry, services)?;
    invites::register(registry, services)?;
    staff::register(registry, services)?;
    music::register(registry, services)?;
    Ok(())
}
