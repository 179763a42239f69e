use crate::connection::ClientIdentity;

/// Resolves non-directive placeholders in display text and command templates.
///
/// Implementations must be side-effect free and leave `!%...%` directives intact.
pub trait DisplayTemplater: Send + Sync {
    /// Returns `text` with identity placeholders filled in.
    fn resolve(&self, identity: &ClientIdentity, text: &str) -> String;
}

/// Replaces `%username%` and `%xuid%`; anything else passes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTemplater;

impl DisplayTemplater for PlaceholderTemplater {
    fn resolve(&self, identity: &ClientIdentity, text: &str) -> String {
        if !text.contains('%') {
            return text.to_owned();
        }
        text.replace("%username%", &identity.username)
            .replace("%xuid%", identity.xuid.as_deref().unwrap_or_default())
    }
}
