use std::sync::Arc;

use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::{
    access::{AccessPolicy, ListAccessPolicy},
    assembly::{CommandForm, MenuForm},
    config::{ButtonDefinition, CommandDefinition, MenuDefinition},
    connection::{ClientIdentity, DeploymentMode},
    directives::contains_directives,
    dispatch::{CommandBackend, CommandDispatcher, CommandManager},
    forms::{CommandOutcome, FormError, FormResponse},
    resolver::{pending, FormCallback, FormTransport, PendingResult, Submission},
    telemetry::FormTelemetry,
    templating::{DisplayTemplater, PlaceholderTemplater},
};

/// Builder used to configure a [`FormCommander`].
pub struct FormCommanderBuilder {
    transport: Arc<dyn FormTransport>,
    dispatcher: CommandDispatcher,
    access: Arc<dyn AccessPolicy>,
    templater: Arc<dyn DisplayTemplater>,
    telemetry: Option<FormTelemetry>,
}

impl FormCommanderBuilder {
    /// Starts from the two collaborators that have no sensible default.
    #[must_use]
    pub fn new(transport: Arc<dyn FormTransport>, backend: Arc<dyn CommandBackend>) -> Self {
        Self {
            transport,
            dispatcher: CommandDispatcher::new(backend),
            access: Arc::new(ListAccessPolicy),
            templater: Arc::new(PlaceholderTemplater),
            telemetry: None,
        }
    }

    /// Overrides the authorization predicate.
    #[must_use]
    pub fn access(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    /// Overrides the display templater.
    #[must_use]
    pub fn templater(mut self, templater: Arc<dyn DisplayTemplater>) -> Self {
        self.templater = templater;
        self
    }

    /// Attaches the standalone command manager.
    #[must_use]
    pub fn manager(mut self, manager: Arc<dyn CommandManager>) -> Self {
        self.dispatcher = self.dispatcher.with_manager(manager);
        self
    }

    /// Sets the deployment mode.
    #[must_use]
    pub fn mode(mut self, mode: DeploymentMode) -> Self {
        self.dispatcher = self.dispatcher.with_mode(mode);
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn telemetry(mut self, telemetry: FormTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Finalizes the builder returning a [`FormCommander`].
    #[must_use]
    pub fn build(self) -> FormCommander {
        FormCommander {
            transport: self.transport,
            dispatcher: self.dispatcher,
            access: self.access,
            templater: self.templater,
            telemetry: self.telemetry,
        }
    }
}

/// Renders menus and command forms, then resolves and dispatches the answers.
#[derive(Clone)]
pub struct FormCommander {
    transport: Arc<dyn FormTransport>,
    dispatcher: CommandDispatcher,
    access: Arc<dyn AccessPolicy>,
    templater: Arc<dyn DisplayTemplater>,
    telemetry: Option<FormTelemetry>,
}

impl FormCommander {
    /// Creates a builder.
    #[must_use]
    pub fn builder(
        transport: Arc<dyn FormTransport>,
        backend: Arc<dyn CommandBackend>,
    ) -> FormCommanderBuilder {
        FormCommanderBuilder::new(transport, backend)
    }

    /// Sends a permission-filtered menu and returns the pending selection.
    ///
    /// Resolves with the clicked button, or [`crate::forms::Cancelled`] when the
    /// menu is closed or answered with an unknown label.
    pub fn send_menu(
        &self,
        identity: &ClientIdentity,
        menu: &MenuDefinition,
    ) -> PendingResult<ButtonDefinition> {
        let title = self.templater.resolve(identity, &menu.title);
        let content = menu
            .description
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| self.templater.resolve(identity, text));

        let mut form = MenuForm::new(title.clone(), content);
        for button in &menu.buttons {
            if !self.access.is_allowed(&button.access, identity) {
                continue;
            }
            let label = self.templater.resolve(identity, &button.name);
            let image = button
                .image_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| self.templater.resolve(identity, url));
            form.push(button.clone(), label, image);
        }

        let request = form.request();
        let offered = request.len();
        let mut arena = form.into_arena();
        let (responder, pending) = pending();
        let telemetry = self.telemetry.clone();
        let username = identity.username.clone();
        let form_title = title.clone();

        let callback = FormCallback::new(move |submission| {
            let clicked = match submission {
                Submission::Submitted(FormResponse::Menu(label)) => arena
                    .resolve(&label)
                    .map(|button| (label, button)),
                Submission::Submitted(FormResponse::Command(_)) | Submission::Closed => None,
            };
            arena.clear();

            if let Some((label, button)) = clicked {
                emit(
                    telemetry.as_ref(),
                    LogLevel::Debug,
                    "forms.menu.resolved",
                    json!({ "form": form_title, "button": label, "user": username }),
                );
                responder.resolve(button);
            } else {
                emit(
                    telemetry.as_ref(),
                    LogLevel::Debug,
                    "forms.menu.cancelled",
                    json!({ "form": form_title, "user": username }),
                );
                responder.cancel();
            }
        });

        self.emit(
            LogLevel::Debug,
            "forms.menu.sent",
            json!({ "form": title, "buttons": offered, "user": identity.username }),
        );
        self.transport.send_form(identity, request, callback);
        pending
    }

    /// Resolves a command definition: renders a form for its directives, waits
    /// for the client, substitutes, and dispatches.
    ///
    /// Literal commands and validation failures resolve immediately; nothing is
    /// sent to the client in either case.
    pub fn execute_command(
        &self,
        identity: &ClientIdentity,
        definition: &CommandDefinition,
    ) -> PendingResult<CommandOutcome> {
        match self.prepare(identity, definition) {
            Ok(Prepared::Literal(command)) => PendingResult::ready(dispatch_resolved(
                &self.dispatcher,
                self.telemetry.as_ref(),
                identity,
                &command,
            )),
            Ok(Prepared::Form(form)) => self.render_command_form(identity, form),
            Err(err) => {
                self.emit(
                    LogLevel::Error,
                    "forms.command.rejected",
                    json!({
                        "definition": definition.to_string(),
                        "user": identity.username,
                        "error": err.to_string(),
                    }),
                );
                let outcome = err.outcome();
                if outcome == CommandOutcome::Failure {
                    self.event(
                        "forms.command.failed",
                        json!({ "error": err.to_string() }),
                    );
                }
                PendingResult::ready(outcome)
            }
        }
    }

    /// Awaits [`Self::execute_command`], collapsing an abandoned render into `Cancelled`.
    pub async fn run_command(
        &self,
        identity: &ClientIdentity,
        definition: &CommandDefinition,
    ) -> CommandOutcome {
        self.execute_command(identity, definition)
            .outcome()
            .await
            .into()
    }

    fn prepare(
        &self,
        identity: &ClientIdentity,
        definition: &CommandDefinition,
    ) -> Result<Prepared, FormError> {
        if definition.command.is_empty() {
            return Err(FormError::EmptyCommand {
                name: definition.name.clone().unwrap_or_default(),
            });
        }
        if !self.access.is_allowed(&definition.access, identity) {
            return Err(FormError::NotPermitted {
                subject: definition.to_string(),
                username: identity.username.clone(),
            });
        }

        let command = self.templater.resolve(identity, &definition.command);
        if !contains_directives(&command) {
            return Ok(Prepared::Literal(command));
        }

        let title = self
            .templater
            .resolve(identity, definition.name.as_deref().unwrap_or_default());
        let Some(form) = CommandForm::assemble(title, command.as_str())? else {
            return Ok(Prepared::Literal(command));
        };
        for miss in form.lookup_misses() {
            self.emit(
                LogLevel::Warn,
                "forms.directive.default_missing",
                json!({
                    "directive": miss.directive,
                    "default": miss.default,
                    "choices": miss.choices,
                }),
            );
        }
        Ok(Prepared::Form(form))
    }

    fn render_command_form(
        &self,
        identity: &ClientIdentity,
        form: CommandForm,
    ) -> PendingResult<CommandOutcome> {
        let request = form.request();
        let (responder, pending) = pending();
        let dispatcher = self.dispatcher.clone();
        let telemetry = self.telemetry.clone();
        let recipient = identity.clone();

        self.emit(
            LogLevel::Debug,
            "forms.command.sent",
            json!({
                "form": form.title(),
                "widgets": form.widgets().len(),
                "user": identity.username,
            }),
        );

        let callback = FormCallback::new(move |submission| {
            let resolved = match submission {
                Submission::Submitted(FormResponse::Command(values)) => form
                    .resolve(&values)
                    .map_err(|err| err.to_string()),
                Submission::Submitted(FormResponse::Menu(_)) => {
                    Err("menu answer for a command form".to_owned())
                }
                Submission::Closed => Err("closed".to_owned()),
            };

            let outcome = match resolved {
                Ok(values) => {
                    for entry in values.entries() {
                        emit(
                            telemetry.as_ref(),
                            LogLevel::Debug,
                            "forms.directive.replaced",
                            json!({
                                "token": entry.token,
                                "value": entry.value,
                                "source": entry.source,
                            }),
                        );
                    }
                    let command = values.apply(form.template());
                    dispatch_resolved(&dispatcher, telemetry.as_ref(), &recipient, &command)
                }
                Err(reason) => {
                    emit(
                        telemetry.as_ref(),
                        LogLevel::Debug,
                        "forms.command.cancelled",
                        json!({
                            "template": form.template(),
                            "user": recipient.username,
                            "reason": reason,
                        }),
                    );
                    CommandOutcome::Cancelled
                }
            };
            responder.resolve(outcome);
        });

        self.transport.send_form(identity, request, callback);
        pending
    }

    fn emit(&self, level: LogLevel, message: &str, metadata: Value) {
        emit(self.telemetry.as_ref(), level, message, metadata);
    }

    fn event(&self, event_type: &str, payload: Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.event(event_type, payload);
        }
    }
}

enum Prepared {
    Literal(String),
    Form(CommandForm),
}

/// Logs and mirrors the message as a bus event.
fn emit(telemetry: Option<&FormTelemetry>, level: LogLevel, message: &str, metadata: Value) {
    if let Some(tel) = telemetry {
        if level == LogLevel::Debug && !tel.debug_enabled() {
            return;
        }
        let _ = tel.log(level, message, metadata.clone());
        let _ = tel.event(message, metadata);
    }
}

fn dispatch_resolved(
    dispatcher: &CommandDispatcher,
    telemetry: Option<&FormTelemetry>,
    identity: &ClientIdentity,
    command: &str,
) -> CommandOutcome {
    match dispatcher.dispatch(identity, command) {
        Ok(route) => {
            emit(
                telemetry,
                LogLevel::Debug,
                "forms.command.dispatched",
                json!({ "command": command, "route": route, "user": identity.username }),
            );
            CommandOutcome::Success
        }
        Err(err) => {
            emit(
                telemetry,
                LogLevel::Error,
                "forms.command.failed",
                json!({ "command": command, "error": err.to_string() }),
            );
            CommandOutcome::Failure
        }
    }
}
