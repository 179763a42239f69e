use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the remote client a form is rendered for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    /// Per-connection identifier.
    pub connection_id: Uuid,
    /// Display username used for authorization checks.
    pub username: String,
    /// Optional platform account identifier.
    pub xuid: Option<String>,
}

impl ClientIdentity {
    /// Creates an identity with a fresh connection id.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            username: username.into(),
            xuid: None,
        }
    }

    /// Attaches the platform account identifier.
    #[must_use]
    pub fn with_xuid(mut self, xuid: impl Into<String>) -> Self {
        self.xuid = Some(xuid.into());
        self
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.connection_id)
    }
}

/// How the host process is deployed; selects the dispatch route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Runs as its own proxy process with a local command manager.
    Standalone,
    /// Runs embedded in a host server.
    #[default]
    Plugin,
}

impl DeploymentMode {
    /// Returns a short human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Plugin => "plugin",
        }
    }
}
