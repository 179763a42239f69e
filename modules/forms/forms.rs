use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interactive element rendered inside a command form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormComponent {
    /// Free text field.
    Input {
        /// Label shown above the field.
        text: String,
        /// Greyed-out hint, also the fallback value.
        placeholder: String,
    },
    /// On/off switch.
    Toggle {
        /// Label shown next to the switch.
        text: String,
        /// Initial state.
        default: bool,
    },
    /// Single choice list.
    Dropdown {
        /// Label shown above the list.
        text: String,
        /// Selectable entries.
        options: Vec<String>,
        /// Entry selected when the form opens.
        default_index: usize,
    },
    /// Continuous numeric slider.
    Slider {
        /// Label shown above the slider.
        text: String,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Increment.
        step: f32,
        /// Initial position.
        default: f32,
    },
    /// Slider over a fixed list of labelled steps.
    StepSlider {
        /// Label shown above the slider.
        text: String,
        /// Step labels.
        steps: Vec<String>,
        /// Step selected when the form opens.
        default_index: usize,
    },
}

/// Button rendered inside a menu form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuButton {
    /// Rendered label, also the lookup key when clicked.
    pub text: String,
    /// Optional image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Request handed to a form transport. Sent once, never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum FormRequest {
    /// Form built from the directives of a command template.
    Command {
        /// Form title.
        title: String,
        /// One component per directive, in encounter order.
        components: Vec<FormComponent>,
    },
    /// Button list built from a menu definition.
    Menu {
        /// Form title.
        title: String,
        /// Optional body text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Permitted buttons in configured order.
        buttons: Vec<MenuButton>,
    },
}

impl FormRequest {
    /// Returns the form title.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Command { title, .. } | Self::Menu { title, .. } => title,
        }
    }

    /// Number of components or buttons carried by the form.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Command { components, .. } => components.len(),
            Self::Menu { buttons, .. } => buttons.len(),
        }
    }

    /// Whether the form carries no components or buttons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw value a client returned for one command form component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Input text.
    Text(String),
    /// Toggle state.
    Toggle(bool),
    /// Selected dropdown entry or step-slider step.
    Index(usize),
    /// Slider position.
    Number(f32),
}

impl ResponseValue {
    /// Whether the value counts as "left empty" by the client.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

/// Submission delivered by a transport for a rendered form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FormResponse {
    /// Values of a command form, indexed like its components.
    Command(Vec<Option<ResponseValue>>),
    /// Label of the clicked menu button.
    Menu(String),
}

/// Terminal outcome of a command resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandOutcome {
    /// The resolved command was dispatched.
    Success,
    /// Validation or dispatch failed; nothing was dispatched.
    Failure,
    /// Nothing to do or the client backed out; nothing was dispatched.
    Cancelled,
}

impl CommandOutcome {
    /// Returns a short human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Result<Self, Cancelled>> for CommandOutcome {
    fn from(result: Result<Self, Cancelled>) -> Self {
        result.unwrap_or(Self::Cancelled)
    }
}

/// The form was closed, answered invalidly, or abandoned by the transport.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
#[error("form closed or answered with an invalid response")]
pub struct Cancelled;

/// Errors surfaced while preparing or dispatching a form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    /// A command definition carries no command text.
    #[error("command definition {name:?} has no command defined")]
    EmptyCommand {
        /// Display name of the definition.
        name: String,
    },
    /// The identity may not run something it was offered.
    #[error("{subject} cannot be run by {username}")]
    NotPermitted {
        /// What was refused.
        subject: String,
        /// Who was refused.
        username: String,
    },
    /// A directive is malformed or lacks options for its kind.
    #[error("invalid directive `{directive}`: {reason}")]
    InvalidDirective {
        /// Raw directive capture.
        directive: String,
        /// Human readable detail.
        reason: String,
    },
    /// The execution backend refused the command.
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    /// A menu id does not exist in the loaded document.
    #[error("unknown menu `{0}`")]
    UnknownMenu(String),
}

impl FormError {
    /// Builds an [`FormError::InvalidDirective`].
    #[must_use]
    pub fn invalid_directive(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDirective {
            directive: directive.into(),
            reason: reason.into(),
        }
    }

    /// Outcome reported to the caller when this error ends a resolution.
    #[must_use]
    pub fn outcome(&self) -> CommandOutcome {
        match self {
            Self::EmptyCommand { .. } | Self::NotPermitted { .. } => CommandOutcome::Cancelled,
            Self::InvalidDirective { .. } | Self::Dispatch(_) | Self::UnknownMenu(_) => {
                CommandOutcome::Failure
            }
        }
    }
}
