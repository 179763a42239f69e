use std::sync::Arc;

use crate::{
    config::{CommandDefinition, MenuDocument},
    connection::ClientIdentity,
    formcommander::FormCommander,
    forms::{CommandOutcome, FormError},
};

/// Walks a [`MenuDocument`] for one client: menu, nested menus, then commands.
#[derive(Clone)]
pub struct MenuSession {
    commander: FormCommander,
    document: Arc<MenuDocument>,
}

impl MenuSession {
    /// Binds a commander to a loaded document.
    #[must_use]
    pub fn new(commander: FormCommander, document: impl Into<Arc<MenuDocument>>) -> Self {
        Self {
            commander,
            document: document.into(),
        }
    }

    /// Loaded document.
    #[must_use]
    pub fn document(&self) -> &MenuDocument {
        &self.document
    }

    /// Opens `menu_id` and follows the client's selections to a terminal outcome.
    ///
    /// Closing any menu yields `Cancelled`. Commands of the chosen button run in
    /// order and stop at the first outcome that is not `Success`.
    pub async fn open(
        &self,
        identity: &ClientIdentity,
        menu_id: &str,
    ) -> Result<CommandOutcome, FormError> {
        let mut menu = self.document.menu(menu_id)?;
        loop {
            let Ok(button) = self.commander.send_menu(identity, menu).outcome().await else {
                return Ok(CommandOutcome::Cancelled);
            };
            match &button.open_menu {
                Some(target) => menu = self.document.menu(target)?,
                None => return Ok(self.run_all(identity, &button.commands).await),
            }
        }
    }

    /// Opens the document's entry menu.
    pub async fn open_entry(&self, identity: &ClientIdentity) -> Result<CommandOutcome, FormError> {
        let entry = self
            .document
            .entry_menu()
            .ok_or_else(|| FormError::UnknownMenu(String::new()))?;
        self.open(identity, entry).await
    }

    async fn run_all(
        &self,
        identity: &ClientIdentity,
        commands: &[CommandDefinition],
    ) -> CommandOutcome {
        let mut outcome = CommandOutcome::Cancelled;
        for definition in commands {
            outcome = self.commander.run_command(identity, definition).await;
            if outcome != CommandOutcome::Success {
                break;
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::LoopbackBackend,
        forms::{FormResponse, ResponseValue},
        resolver::LoopbackTransport,
    };

    const MENUS: &str = r#"
default_menu = "main"

[menus.main]
title = "Main"

[[menus.main.buttons]]
name = "Kits"
open_menu = "kits"

[[menus.main.buttons]]
name = "Greet"
commands = [
    { command = "say hello" },
    { name = "Whisper", command = "msg !%who:input:Who, Steve% hi" },
    { command = "say done" },
]

[menus.kits]
title = "Kits"

[[menus.kits.buttons]]
name = "PvP"
commands = [{ command = "kit pvp %username%" }]
"#;

    fn session() -> (MenuSession, LoopbackTransport, LoopbackBackend) {
        let transport = LoopbackTransport::new();
        let backend = LoopbackBackend::new();
        let commander =
            FormCommander::builder(Arc::new(transport.clone()), Arc::new(backend.clone())).build();
        let document = MenuDocument::from_toml_str(MENUS).unwrap();
        (MenuSession::new(commander, document), transport, backend)
    }

    #[tokio::test]
    async fn follows_nested_menu_to_command() {
        let (session, transport, backend) = session();
        let driver = tokio::spawn(async move {
            transport
                .recv_form()
                .await
                .submit(FormResponse::Menu("Kits".into()));
            transport
                .recv_form()
                .await
                .submit(FormResponse::Menu("PvP".into()));
        });

        let outcome = session.open_entry(&ClientIdentity::new("alex")).await;
        driver.await.unwrap();
        assert_eq!(outcome, Ok(CommandOutcome::Success));
        assert_eq!(backend.commands(), vec!["kit pvp alex".to_string()]);
    }

    #[tokio::test]
    async fn runs_commands_in_order_through_forms() {
        let (session, transport, backend) = session();
        let driver = tokio::spawn(async move {
            transport
                .recv_form()
                .await
                .submit(FormResponse::Menu("Greet".into()));
            let form = transport.recv_form().await;
            assert_eq!(form.form.title(), "Whisper");
            form.submit(FormResponse::Command(vec![Some(ResponseValue::Text(
                "Alex".into(),
            ))]));
        });

        let outcome = session.open(&ClientIdentity::new("steve"), "main").await;
        driver.await.unwrap();
        assert_eq!(outcome, Ok(CommandOutcome::Success));
        assert_eq!(
            backend.commands(),
            vec!["say hello", "msg Alex hi", "say done"]
        );
    }

    #[tokio::test]
    async fn stops_at_first_cancelled_command() {
        let (session, transport, backend) = session();
        let driver = tokio::spawn(async move {
            transport
                .recv_form()
                .await
                .submit(FormResponse::Menu("Greet".into()));
            transport.recv_form().await.close();
        });

        let outcome = session.open(&ClientIdentity::new("steve"), "main").await;
        driver.await.unwrap();
        assert_eq!(outcome, Ok(CommandOutcome::Cancelled));
        assert_eq!(backend.commands(), vec!["say hello".to_string()]);
    }

    #[tokio::test]
    async fn closing_menu_cancels_and_unknown_menu_errors() {
        let (session, transport, backend) = session();
        let driver = tokio::spawn(async move {
            transport.recv_form().await.close();
        });
        let alex = ClientIdentity::new("alex");
        assert_eq!(
            session.open(&alex, "main").await,
            Ok(CommandOutcome::Cancelled)
        );
        driver.await.unwrap();
        assert_eq!(
            session.open(&alex, "missing").await,
            Err(FormError::UnknownMenu("missing".into()))
        );
        assert!(backend.sent().is_empty());
    }
}
