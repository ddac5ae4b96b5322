use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use mentor_core::config::DEFAULT_LOCAL_COOLDOWN_SECS;

use crate::context::CommandContext;
use crate::error::Result;
use crate::parse::ArgSlot;
use crate::suggest;

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: CommandContext) -> Result<()>;
}

/// Immutable description of one command: gates, cooldown, argument grammar,
/// and the handler itself. Built once at startup, never mutated after.
pub struct CommandSpec {
    pub verb: &'static str,
    pub channel_allow_list: Option<Vec<u64>>,
    pub required_roles: Option<Vec<u64>>,
    pub admin_only: bool,
    pub local_cooldown: Duration,
    pub args: Vec<ArgSlot>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(verb: &'static str, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            verb,
            channel_allow_list: None,
            required_roles: None,
            admin_only: false,
            local_cooldown: Duration::from_secs(DEFAULT_LOCAL_COOLDOWN_SECS),
            args: Vec::new(),
            handler,
        }
    }

    /// Restrict to the given channels. An empty list means no restriction
    /// (unconfigured ids shouldn't lock a command out of every channel).
    pub fn channels(mut self, ids: Vec<u64>) -> Self {
        if !ids.is_empty() {
            self.channel_allow_list = Some(ids);
        }
        self
    }

    pub fn roles(mut self, ids: Vec<u64>) -> Self {
        if !ids.is_empty() {
            self.required_roles = Some(ids);
        }
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.local_cooldown = cooldown;
        self
    }

    pub fn args(mut self, slots: Vec<ArgSlot>) -> Self {
        self.args = slots;
        self
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate command registration: {0}")]
    DuplicateVerb(String),

    #[error("registry is frozen — commands register at startup only")]
    Frozen,
}

/// Verb → descriptor map. Append-only during startup; `freeze()` is called
/// once extension loading finishes and rejects anything after.
pub struct Registry {
    commands: RwLock<HashMap<&'static str, Arc<CommandSpec>>>,
    frozen: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn register(&self, spec: CommandSpec) -> std::result::Result<(), RegistryError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(RegistryError::Frozen);
        }
        let mut commands = self.commands.write().unwrap();
        if commands.contains_key(spec.verb) {
            return Err(RegistryError::DuplicateVerb(spec.verb.to_string()));
        }
        debug!(verb = spec.verb, "command registered");
        commands.insert(spec.verb, Arc::new(spec));
        Ok(())
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn resolve(&self, verb: &str) -> Option<Arc<CommandSpec>> {
        self.commands.read().unwrap().get(verb).cloned()
    }

    pub fn verbs(&self) -> Vec<&'static str> {
        let mut verbs: Vec<&'static str> =
            self.commands.read().unwrap().keys().copied().collect();
        verbs.sort_unstable();
        verbs
    }

    /// Closest registered verb to a typo, if any clears the cutoff.
    pub fn suggest(&self, verb: &str) -> Option<&'static str> {
        suggest::closest(verb, self.verbs())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn run(&self, _ctx: CommandContext) -> Result<()> {
            Ok(())
        }
    }

    fn spec(verb: &'static str) -> CommandSpec {
        CommandSpec::new(verb, Arc::new(NoopHandler))
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Registry::new();
        registry.register(spec("refresh")).unwrap();
        let err = registry.register(spec("refresh")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateVerb(v) if v == "refresh"));
    }

    #[test]
    fn frozen_registry_rejects_late_registration() {
        let registry = Registry::new();
        registry.register(spec("help")).unwrap();
        registry.freeze();
        assert!(matches!(
            registry.register(spec("late")),
            Err(RegistryError::Frozen)
        ));
        // Resolution still works after freezing.
        assert!(registry.resolve("help").is_some());
    }

    #[test]
    fn suggest_finds_near_miss() {
        let registry = Registry::new();
        registry.register(spec("invites")).unwrap();
        registry.register(spec("subjects")).unwrap();
        assert_eq!(registry.suggest("invties"), Some("invites"));
        assert_eq!(registry.suggest("qqq"), None);
    }

    #[test]
    fn empty_channel_list_means_open() {
        let s = spec("help").channels(vec![]);
        assert!(s.channel_allow_list.is_none());
        let s = spec("clear").channels(vec![42]);
        assert_eq!(s.channel_allow_list, Some(vec![42]));
    }
}
