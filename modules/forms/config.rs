use std::{fmt, fs, path::Path};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{access::AccessList, connection::DeploymentMode, forms::FormError};

/// Top-level TOML document describing menus and their commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuDocument {
    /// Keeps debug-level telemetry.
    #[serde(default)]
    pub debug: bool,
    /// Deployment mode selecting the dispatch route.
    #[serde(default)]
    pub mode: DeploymentMode,
    /// Menu opened when none is named.
    #[serde(default)]
    pub default_menu: Option<String>,
    /// Menus keyed by id, in declaration order.
    #[serde(default)]
    pub menus: IndexMap<String, MenuDefinition>,
}

impl MenuDocument {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading menu config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let document: Self = toml::from_str(raw)?;
        document.validate()?;
        Ok(document)
    }

    /// Checks cross references between menus.
    pub fn validate(&self) -> Result<()> {
        if let Some(default) = &self.default_menu {
            if !self.menus.contains_key(default) {
                bail!("default_menu `{default}` is not defined");
            }
        }
        for (id, menu) in &self.menus {
            for button in &menu.buttons {
                match &button.open_menu {
                    Some(target) if !self.menus.contains_key(target) => {
                        bail!(
                            "button `{}` in menu `{id}` opens undefined menu `{target}`",
                            button.name
                        );
                    }
                    None if button.commands.is_empty() => {
                        bail!(
                            "button `{}` in menu `{id}` has neither commands nor open_menu",
                            button.name
                        );
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Looks up a menu by id.
    pub fn menu(&self, id: &str) -> Result<&MenuDefinition, FormError> {
        self.menus
            .get(id)
            .ok_or_else(|| FormError::UnknownMenu(id.to_owned()))
    }

    /// Id of the menu to open when none is named: `default_menu`, else the first declared.
    #[must_use]
    pub fn entry_menu(&self) -> Option<&str> {
        self.default_menu
            .as_deref()
            .or_else(|| self.menus.keys().next().map(String::as_str))
    }
}

/// A menu rendered as a button list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuDefinition {
    /// Title, templated per identity.
    pub title: String,
    /// Body text, templated per identity; omitted when empty.
    #[serde(default)]
    pub description: Option<String>,
    /// Buttons in display order.
    #[serde(default)]
    pub buttons: Vec<ButtonDefinition>,
}

/// One selectable menu entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonDefinition {
    /// Label, templated per identity.
    pub name: String,
    /// Optional image URL; blank means label-only.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Who sees the button.
    #[serde(flatten)]
    pub access: AccessList,
    /// Commands run in order when clicked.
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    /// Menu opened when clicked, instead of running commands.
    #[serde(default)]
    pub open_menu: Option<String>,
}

impl ButtonDefinition {
    /// Button running the given commands, open to everyone.
    #[must_use]
    pub fn running(name: impl Into<String>, commands: Vec<CommandDefinition>) -> Self {
        Self {
            name: name.into(),
            image_url: None,
            access: AccessList::everyone(),
            commands,
            open_menu: None,
        }
    }

    /// Restricts the button.
    #[must_use]
    pub fn with_access(mut self, access: AccessList) -> Self {
        self.access = access;
        self
    }

    /// Attaches an image URL.
    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// A templated command and who may run it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Display name, used as the command form title.
    #[serde(default)]
    pub name: Option<String>,
    /// Command template, possibly containing directives.
    #[serde(default)]
    pub command: String,
    /// Who may run the command.
    #[serde(flatten)]
    pub access: AccessList,
}

impl CommandDefinition {
    /// Command open to everyone.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            command: command.into(),
            access: AccessList::everyone(),
        }
    }

    /// Restricts the command.
    #[must_use]
    pub fn with_access(mut self, access: AccessList) -> Self {
        self.access = access;
        self
    }
}

impl fmt::Display for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "command `{name}`"),
            None => write!(f, "command `{}`", self.command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
debug = true
mode = "standalone"
default_menu = "main"

[menus.main]
title = "Hello %username%"
description = "Pick one"

[[menus.main.buttons]]
name = "Give"
image_url = "https://example.com/give.png"
allowed_users = ["alex"]

[[menus.main.buttons.commands]]
name = "Give item"
command = "give !%target:input:Player, Steve% diamond"

[[menus.main.buttons]]
name = "Warps"
open_menu = "warps"

[menus.warps]
title = "Warps"

[[menus.warps.buttons]]
name = "Spawn"
commands = [{ command = "spawn" }]
"#;

    #[test]
    fn loads_menus_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("menus.toml");
        fs::write(&path, SAMPLE).unwrap();

        let document = MenuDocument::load(&path).unwrap();
        assert!(document.debug);
        assert_eq!(document.mode, DeploymentMode::Standalone);
        assert_eq!(document.entry_menu(), Some("main"));

        let main = document.menu("main").unwrap();
        assert_eq!(main.buttons.len(), 2);
        assert!(main.buttons[0].access.allowed.contains("alex"));
        assert_eq!(main.buttons[0].commands[0].name.as_deref(), Some("Give item"));
        assert_eq!(main.buttons[1].open_menu.as_deref(), Some("warps"));
        assert!(document.menu("warps").unwrap().buttons[0].access.is_open());
    }

    #[test]
    fn rejects_dangling_menu_reference() {
        let raw = r#"
[menus.main]
title = "Main"

[[menus.main.buttons]]
name = "Broken"
open_menu = "missing"
"#;
        let err = MenuDocument::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rejects_button_without_behaviour() {
        let raw = r#"
[menus.main]
title = "Main"

[[menus.main.buttons]]
name = "Nothing"
"#;
        assert!(MenuDocument::from_toml_str(raw).is_err());
    }

    #[test]
    fn unknown_menu_is_a_form_error() {
        let document = MenuDocument::default();
        assert_eq!(
            document.menu("nope").unwrap_err(),
            FormError::UnknownMenu("nope".into())
        );
        assert_eq!(document.entry_menu(), None);
    }
}
