use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    connection::{ClientIdentity, DeploymentMode},
    forms::FormError,
};

/// Primary per-connection execution path.
pub trait CommandBackend: Send + Sync {
    /// Executes a fully resolved command on behalf of `identity`.
    fn send_command(&self, identity: &ClientIdentity, command: &str) -> Result<(), FormError>;
}

/// Secondary command manager reachable in standalone deployments.
pub trait CommandManager: Send + Sync {
    /// Runs the command if the manager knows it. Returns `false` when not handled.
    fn run_command(&self, identity: &ClientIdentity, command: &str) -> bool;
}

/// Path a dispatched command took.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchRoute {
    /// Handled by the standalone command manager.
    Manager,
    /// Sent through the per-connection backend.
    Backend,
}

/// Routes resolved commands to the manager or the backend.
#[derive(Clone)]
pub struct CommandDispatcher {
    backend: Arc<dyn CommandBackend>,
    manager: Option<Arc<dyn CommandManager>>,
    mode: DeploymentMode,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("mode", &self.mode)
            .field("manager", &self.manager.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Creates a dispatcher using only the backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CommandBackend>) -> Self {
        Self {
            backend,
            manager: None,
            mode: DeploymentMode::default(),
        }
    }

    /// Attaches the standalone command manager.
    #[must_use]
    pub fn with_manager(mut self, manager: Arc<dyn CommandManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Sets the deployment mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Deployment mode in effect.
    #[must_use]
    pub const fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Hands `command` to the execution side.
    ///
    /// Only standalone deployments consult the manager; everything else, and
    /// anything the manager declines, goes to the backend.
    pub fn dispatch(
        &self,
        identity: &ClientIdentity,
        command: &str,
    ) -> Result<DispatchRoute, FormError> {
        if self.mode == DeploymentMode::Standalone {
            if let Some(manager) = &self.manager {
                if manager.run_command(identity, command) {
                    return Ok(DispatchRoute::Manager);
                }
            }
        }
        self.backend.send_command(identity, command)?;
        Ok(DispatchRoute::Backend)
    }
}

/// Backend recording every command it receives (tests and local tooling).
#[derive(Debug, Clone, Default)]
pub struct LoopbackBackend {
    sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl LoopbackBackend {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(username, command)` pairs in dispatch order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().clone()
    }

    /// Commands only, in dispatch order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.sent
            .read()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}

impl CommandBackend for LoopbackBackend {
    fn send_command(&self, identity: &ClientIdentity, command: &str) -> Result<(), FormError> {
        self.sent
            .write()
            .push((identity.username.clone(), command.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixManager(&'static str);

    impl CommandManager for PrefixManager {
        fn run_command(&self, _identity: &ClientIdentity, command: &str) -> bool {
            command.starts_with(self.0)
        }
    }

    fn dispatcher(mode: DeploymentMode) -> (CommandDispatcher, LoopbackBackend) {
        let backend = LoopbackBackend::new();
        let dispatcher = CommandDispatcher::new(Arc::new(backend.clone()))
            .with_manager(Arc::new(PrefixManager("geyser ")))
            .with_mode(mode);
        (dispatcher, backend)
    }

    #[test]
    fn standalone_prefers_manager_when_it_handles() {
        let (dispatcher, backend) = dispatcher(DeploymentMode::Standalone);
        let identity = ClientIdentity::new("alex");
        assert_eq!(
            dispatcher.dispatch(&identity, "geyser reload").unwrap(),
            DispatchRoute::Manager
        );
        assert!(backend.sent().is_empty());
    }

    #[test]
    fn standalone_falls_through_when_manager_declines() {
        let (dispatcher, backend) = dispatcher(DeploymentMode::Standalone);
        let identity = ClientIdentity::new("alex");
        assert_eq!(
            dispatcher.dispatch(&identity, "say hi").unwrap(),
            DispatchRoute::Backend
        );
        assert_eq!(backend.sent(), vec![("alex".into(), "say hi".into())]);
    }

    #[test]
    fn plugin_mode_never_consults_manager() {
        let (dispatcher, backend) = dispatcher(DeploymentMode::Plugin);
        let identity = ClientIdentity::new("alex");
        assert_eq!(
            dispatcher.dispatch(&identity, "geyser reload").unwrap(),
            DispatchRoute::Backend
        );
        assert_eq!(backend.commands(), vec!["geyser reload".to_string()]);
    }
}
