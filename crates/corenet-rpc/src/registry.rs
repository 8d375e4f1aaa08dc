// Path: crates/corenet-rpc/src/registry.rs
//! The command table: a hash table keyed by command name, plus a
//! separate alias table keyed by alias name resolving to a base command
//! and an optional prefix argument list (§4.5). Effectively read-only
//! after startup, so lookups take a read lock and registration a write
//! lock, same split as `corenet-transport`'s registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::RpcError;
use crate::protocol::CommandResult;

pub type CommandHandler = Arc<dyn Fn(&[Value]) -> CommandResult + Send + Sync>;

#[derive(Clone)]
pub struct CommandEntry {
    pub docs: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone)]
struct AliasEntry {
    base: String,
    prefix: Vec<Value>,
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, CommandEntry>>,
    aliases: RwLock<HashMap<String, AliasEntry>>,
}

impl CommandRegistry {
    pub fn new() -> CommandRegistry {
        CommandRegistry::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        docs: &'static str,
        handler: CommandHandler,
    ) -> Result<(), RpcError> {
        let name = name.into();
        let mut commands = self.commands.write().unwrap_or_else(|e| e.into_inner());
        if commands.contains_key(&name) {
            return Err(RpcError::DuplicateCommand(name));
        }
        commands.insert(name, CommandEntry { docs, handler });
        Ok(())
    }

    /// Registers `alias` to resolve to `base` with `prefix` prepended to
    /// whatever `params` the caller sends.
    pub fn register_alias(
        &self,
        alias: impl Into<String>,
        base: impl Into<String>,
        prefix: Vec<Value>,
    ) -> Result<(), RpcError> {
        let alias = alias.into();
        let mut aliases = self.aliases.write().unwrap_or_else(|e| e.into_inner());
        if aliases.contains_key(&alias) {
            return Err(RpcError::DuplicateAlias(alias));
        }
        aliases.insert(alias, AliasEntry { base: base.into(), prefix });
        Ok(())
    }

    pub fn docs(&self, name: &str) -> Option<String> {
        self.commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map(|entry| entry.docs.to_string())
    }

    /// Resolves `method` to a base command name and its effective
    /// parameter list (the alias's prefix, if any, prepended to
    /// `params`). `None` means no command or alias matches.
    pub fn resolve(&self, method: &str, params: Vec<Value>) -> Option<(String, Vec<Value>)> {
        if self.commands.read().unwrap_or_else(|e| e.into_inner()).contains_key(method) {
            return Some((method.to_string(), params));
        }
        let aliases = self.aliases.read().unwrap_or_else(|e| e.into_inner());
        let alias = aliases.get(method)?;
        let mut full = alias.prefix.clone();
        full.extend(params);
        Some((alias.base.clone(), full))
    }

    pub fn handler(&self, base: &str) -> Option<CommandHandler> {
        self.commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(base)
            .map(|entry| entry.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseValue;

    fn echo_handler() -> CommandHandler {
        Arc::new(|params| Ok(ResponseValue::Json(Value::Array(params.to_vec()))))
    }

    #[test]
    fn direct_command_resolves_with_its_own_params() {
        let registry = CommandRegistry::new();
        registry.register("echo", "echoes params back", echo_handler()).unwrap();
        let (base, params) = registry.resolve("echo", vec![Value::from(1)]).unwrap();
        assert_eq!(base, "echo");
        assert_eq!(params, vec![Value::from(1)]);
    }

    #[test]
    fn alias_prepends_its_prefix_to_params() {
        let registry = CommandRegistry::new();
        registry.register("echo", "echoes params back", echo_handler()).unwrap();
        registry.register_alias("echo1", "echo", vec![Value::from("fixed")]).unwrap();
        let (base, params) = registry.resolve("echo1", vec![Value::from(2)]).unwrap();
        assert_eq!(base, "echo");
        assert_eq!(params, vec![Value::from("fixed"), Value::from(2)]);
    }

    #[test]
    fn unknown_method_resolves_to_nothing() {
        let registry = CommandRegistry::new();
        assert!(registry.resolve("nope", vec![]).is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = CommandRegistry::new();
        registry.register("echo", "d", echo_handler()).unwrap();
        let err = registry.register("echo", "d", echo_handler()).unwrap_err();
        assert!(matches!(err, RpcError::DuplicateCommand(_)));
    }
}
