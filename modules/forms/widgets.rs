use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    directives::{DirectiveKind, DirectiveSpec},
    forms::{FormComponent, FormError, ResponseValue},
};

/// Typed widget decoded from a directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Widget {
    /// Free text field.
    Input {
        /// Label shown above the field.
        label: String,
        /// Placeholder and fallback value.
        default: String,
    },
    /// Boolean switch.
    Toggle {
        /// Label shown next to the switch.
        label: String,
        /// Initial state.
        default: bool,
    },
    /// Single choice list.
    Dropdown {
        /// Label shown above the list.
        label: String,
        /// Selectable entries.
        choices: Vec<String>,
        /// Entry preselected when the form opens.
        default_index: usize,
    },
    /// Continuous numeric slider.
    Slider {
        /// Label shown above the slider.
        label: String,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Increment.
        step: f32,
        /// Initial position.
        default: f32,
    },
    /// Slider over labelled steps.
    StepSlider {
        /// Label shown above the slider.
        label: String,
        /// Step labels.
        steps: Vec<String>,
        /// Step preselected when the form opens.
        default_index: usize,
    },
}

/// Default text of a dropdown or step-slider that is not among its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupMiss {
    /// Raw directive capture.
    pub directive: String,
    /// Default text that was looked up.
    pub default: String,
    /// Choices that were searched.
    pub choices: Vec<String>,
}

/// A response value that does not fit the widget it was submitted for.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid value for `{directive}`: {reason}")]
pub struct InvalidValue {
    /// Raw directive capture.
    pub directive: String,
    /// Human readable detail.
    pub reason: String,
}

/// Directive paired with its widget and precomputed default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    directive: DirectiveSpec,
    widget: Widget,
    default_value: String,
    lookup_miss: Option<LookupMiss>,
}

impl WidgetSpec {
    /// Builds the widget for a decoded directive.
    ///
    /// Arity was checked by [`DirectiveSpec::parse`]; slider bounds that do not
    /// parse as numbers are rejected here.
    pub fn build(directive: DirectiveSpec) -> Result<Self, FormError> {
        let options = &directive.options;
        if options.len() < directive.kind.min_options() {
            return Err(FormError::invalid_directive(
                directive.capture(),
                format!(
                    "{} needs at least {} options, found {}",
                    directive.kind,
                    directive.kind.min_options(),
                    options.len()
                ),
            ));
        }

        let label = options[0].clone();
        let mut lookup_miss = None;
        let (widget, default_value) = match directive.kind {
            DirectiveKind::Input => {
                let default = options[1].clone();
                (
                    Widget::Input {
                        label,
                        default: default.clone(),
                    },
                    default,
                )
            }
            DirectiveKind::Toggle => {
                let default = options[1].eq_ignore_ascii_case("true");
                (Widget::Toggle { label, default }, default.to_string())
            }
            DirectiveKind::Dropdown => {
                let default = options[1].clone();
                let choices = options[2..].to_vec();
                let (default_index, miss) = default_index(&directive, &default, &choices);
                lookup_miss = miss;
                (
                    Widget::Dropdown {
                        label,
                        choices,
                        default_index,
                    },
                    default,
                )
            }
            DirectiveKind::Slider => {
                let stripped: Vec<String> = options[1..]
                    .iter()
                    .map(|option| option.replace(' ', ""))
                    .collect();
                let min = parse_number(&directive, &stripped[0])?;
                let max = parse_number(&directive, &stripped[1])?;
                let step = parse_number(&directive, &stripped[2])?;
                let default = parse_number(&directive, &stripped[3])?;
                (
                    Widget::Slider {
                        label,
                        min,
                        max,
                        step,
                        default,
                    },
                    stripped[3].clone(),
                )
            }
            DirectiveKind::StepSlider => {
                let default = options[1].clone();
                let steps = options[2..].to_vec();
                let (default_index, miss) = default_index(&directive, &default, &steps);
                lookup_miss = miss;
                (
                    Widget::StepSlider {
                        label,
                        steps,
                        default_index,
                    },
                    default,
                )
            }
        };

        Ok(Self {
            directive,
            widget,
            default_value,
            lookup_miss,
        })
    }

    /// Directive this widget was built from.
    #[must_use]
    pub const fn directive(&self) -> &DirectiveSpec {
        &self.directive
    }

    /// Decoded widget.
    #[must_use]
    pub const fn widget(&self) -> &Widget {
        &self.widget
    }

    /// Value substituted when the client leaves the widget untouched.
    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    /// Set when the default text was not found among the choices.
    #[must_use]
    pub const fn lookup_miss(&self) -> Option<&LookupMiss> {
        self.lookup_miss.as_ref()
    }

    /// Component sent to the client.
    #[must_use]
    pub fn component(&self) -> FormComponent {
        match &self.widget {
            Widget::Input { label, default } => FormComponent::Input {
                text: label.clone(),
                placeholder: default.clone(),
            },
            Widget::Toggle { label, default } => FormComponent::Toggle {
                text: label.clone(),
                default: *default,
            },
            Widget::Dropdown {
                label,
                choices,
                default_index,
            } => FormComponent::Dropdown {
                text: label.clone(),
                options: choices.clone(),
                default_index: *default_index,
            },
            Widget::Slider {
                label,
                min,
                max,
                step,
                default,
            } => FormComponent::Slider {
                text: label.clone(),
                min: *min,
                max: *max,
                step: *step,
                default: *default,
            },
            Widget::StepSlider {
                label,
                steps,
                default_index,
            } => FormComponent::StepSlider {
                text: label.clone(),
                steps: steps.clone(),
                default_index: *default_index,
            },
        }
    }

    /// Turns a client value into substitution text.
    ///
    /// Absent or empty values fall back to the default. Choice widgets yield
    /// the selected text, never the index.
    pub fn extract(&self, value: Option<&ResponseValue>) -> Result<String, InvalidValue> {
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            return Ok(self.default_value.clone());
        };

        match (&self.widget, value) {
            (Widget::Input { .. }, ResponseValue::Text(text)) => Ok(text.clone()),
            (Widget::Toggle { .. }, ResponseValue::Toggle(state)) => Ok(state.to_string()),
            (Widget::Dropdown { choices, .. }, ResponseValue::Index(index)) => {
                self.pick(choices, *index)
            }
            (Widget::StepSlider { steps, .. }, ResponseValue::Index(index)) => {
                self.pick(steps, *index)
            }
            (Widget::Slider { .. }, ResponseValue::Number(number)) if number.is_finite() => {
                Ok(format_slider_value(*number))
            }
            // Whole slider positions decode as indices off the wire.
            (Widget::Slider { .. }, ResponseValue::Index(whole)) => Ok(whole.to_string()),
            (_, other) => Err(self.invalid(format!(
                "{} cannot take {other:?}",
                self.directive.kind
            ))),
        }
    }

    fn pick(&self, entries: &[String], index: usize) -> Result<String, InvalidValue> {
        entries.get(index).cloned().ok_or_else(|| {
            self.invalid(format!(
                "index {index} out of range for {} entries",
                entries.len()
            ))
        })
    }

    fn invalid(&self, reason: String) -> InvalidValue {
        InvalidValue {
            directive: self.directive.capture().to_owned(),
            reason,
        }
    }
}

/// Renders a slider value, dropping a trailing `.0` so whole numbers read as integers.
#[must_use]
pub fn format_slider_value(value: f32) -> String {
    let text = value.to_string();
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_owned(),
        None => text,
    }
}

fn default_index(
    directive: &DirectiveSpec,
    default: &str,
    choices: &[String],
) -> (usize, Option<LookupMiss>) {
    choices.iter().position(|choice| choice == default).map_or_else(
        || {
            (
                0,
                Some(LookupMiss {
                    directive: directive.capture().to_owned(),
                    default: default.to_owned(),
                    choices: choices.to_vec(),
                }),
            )
        },
        |index| (index, None),
    )
}

fn parse_number(directive: &DirectiveSpec, raw: &str) -> Result<f32, FormError> {
    raw.parse::<f32>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| {
            FormError::invalid_directive(
                directive.capture(),
                format!("slider option `{raw}` is not a number"),
            )
        })
}
