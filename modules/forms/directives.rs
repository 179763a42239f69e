use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::forms::FormError;

/// Marker opening every directive token.
pub const DIRECTIVE_OPEN: &str = "!%";

/// Separator between directive options. Exactly one comma and one space.
pub const OPTION_SEPARATOR: &str = ", ";

static DIRECTIVE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!%(.*?)%").expect("directive pattern is valid"));

/// Raw capture of one `!%...%` token, in template order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectiveToken {
    capture: String,
}

impl DirectiveToken {
    /// Text between the opening `!%` and the closing `%`.
    #[must_use]
    pub fn capture(&self) -> &str {
        &self.capture
    }

    /// Full token exactly as it appears in the template.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{DIRECTIVE_OPEN}{}%", self.capture)
    }
}

/// Cheap pre-check used to skip form rendering for literal commands.
#[must_use]
pub fn contains_directives(template: &str) -> bool {
    template.contains(DIRECTIVE_OPEN)
}

/// Returns every directive capture in encounter order.
///
/// Matching is lazy, so `!%a%!%b%` yields two tokens. Empty captures are
/// returned as-is and rejected later by [`DirectiveSpec::parse`].
#[must_use]
pub fn scan_directives(template: &str) -> Vec<DirectiveToken> {
    DIRECTIVE_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|capture| DirectiveToken {
            capture: capture.as_str().to_owned(),
        })
        .collect()
}

/// Widget kind requested by a directive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    /// Free text field.
    Input,
    /// Boolean switch.
    Toggle,
    /// Single choice list.
    Dropdown,
    /// Continuous numeric slider.
    Slider,
    /// Slider over labelled steps.
    StepSlider,
}

impl DirectiveKind {
    /// Returns the label used in directive syntax.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Toggle => "toggle",
            Self::Dropdown => "dropdown",
            Self::Slider => "slider",
            Self::StepSlider => "step-slider",
        }
    }

    /// Parses a directive-syntax label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "input" => Some(Self::Input),
            "toggle" => Some(Self::Toggle),
            "dropdown" => Some(Self::Dropdown),
            "slider" => Some(Self::Slider),
            "step-slider" => Some(Self::StepSlider),
            _ => None,
        }
    }

    /// Minimum number of options a directive of this kind must carry.
    #[must_use]
    pub const fn min_options(self) -> usize {
        match self {
            Self::Input | Self::Toggle | Self::StepSlider => 2,
            Self::Dropdown => 4,
            Self::Slider => 5,
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decoded `name:kind:options` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveSpec {
    /// Author-facing name of the directive.
    pub name: String,
    /// Widget kind.
    pub kind: DirectiveKind,
    /// Options split on `", "`, in order.
    pub options: Vec<String>,
    capture: String,
}

impl DirectiveSpec {
    /// Decodes a raw capture, enforcing the kind's minimum arity.
    pub fn parse(capture: &str) -> Result<Self, FormError> {
        let mut parts = capture.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(FormError::invalid_directive(capture, "missing directive name"));
        }

        let label = parts
            .next()
            .ok_or_else(|| FormError::invalid_directive(capture, "missing widget kind"))?;
        let kind = DirectiveKind::from_label(label).ok_or_else(|| {
            FormError::invalid_directive(capture, format!("unknown widget kind `{label}`"))
        })?;

        let tail = parts
            .next()
            .ok_or_else(|| FormError::invalid_directive(capture, "missing options"))?;
        let mut options: Vec<String> = tail.split(OPTION_SEPARATOR).map(str::to_owned).collect();
        // Trailing empty options do not count towards arity.
        while options.last().is_some_and(String::is_empty) {
            options.pop();
        }

        if options.len() < kind.min_options() {
            return Err(FormError::invalid_directive(
                capture,
                format!(
                    "{kind} needs at least {} options, found {}",
                    kind.min_options(),
                    options.len()
                ),
            ));
        }

        Ok(Self {
            name: name.to_owned(),
            kind,
            options,
            capture: capture.to_owned(),
        })
    }

    /// Raw capture this directive was decoded from.
    #[must_use]
    pub fn capture(&self) -> &str {
        &self.capture
    }

    /// Full token to replace in the template.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{DIRECTIVE_OPEN}{}%", self.capture)
    }
}

/// Scans and decodes every directive, failing on the first invalid one.
pub fn parse_directives(template: &str) -> Result<Vec<DirectiveSpec>, FormError> {
    scan_directives(template)
        .iter()
        .map(|token| DirectiveSpec::parse(token.capture()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_tokens_lazily_in_order() {
        let tokens = scan_directives("give !%target:input:p, Steve% !%amt:input:a, 1%");
        let captures: Vec<_> = tokens.iter().map(DirectiveToken::capture).collect();
        assert_eq!(captures, vec!["target:input:p, Steve", "amt:input:a, 1"]);
        assert_eq!(tokens[0].token(), "!%target:input:p, Steve%");
    }

    #[test]
    fn literal_template_has_no_tokens() {
        assert!(scan_directives("say hello").is_empty());
        assert!(!contains_directives("say 100%"));
    }

    #[test]
    fn empty_capture_is_scanned_but_rejected_on_parse() {
        let tokens = scan_directives("run !%%");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].capture(), "");
        assert!(matches!(
            DirectiveSpec::parse(tokens[0].capture()),
            Err(FormError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn decodes_name_kind_and_options() {
        let spec = DirectiveSpec::parse("color:dropdown:Color, red, red, green, blue").unwrap();
        assert_eq!(spec.name, "color");
        assert_eq!(spec.kind, DirectiveKind::Dropdown);
        assert_eq!(spec.options, vec!["Color", "red", "red", "green", "blue"]);
        assert_eq!(spec.token(), "!%color:dropdown:Color, red, red, green, blue%");
    }

    #[test]
    fn option_tail_keeps_colons() {
        let spec = DirectiveSpec::parse("at:input:Time (hh:mm), 12:00").unwrap();
        assert_eq!(spec.options, vec!["Time (hh:mm)", "12:00"]);
    }

    #[test]
    fn separator_requires_comma_space() {
        let spec = DirectiveSpec::parse("x:input:a,b, c").unwrap();
        assert_eq!(spec.options, vec!["a,b", "c"]);
    }

    #[test]
    fn enforces_minimum_arity_per_kind() {
        for (capture, ok) in [
            ("a:input:only", false),
            ("a:input:label, value", true),
            ("a:toggle:label", false),
            ("a:toggle:label, true", true),
            ("a:dropdown:label, x, x", false),
            ("a:dropdown:label, x, x, y", true),
            ("a:slider:label, 0, 10, 1", false),
            ("a:slider:label, 0, 10, 1, 5", true),
            ("a:step-slider:label", false),
            ("a:step-slider:label, low", true),
        ] {
            assert_eq!(DirectiveSpec::parse(capture).is_ok(), ok, "{capture}");
        }
    }

    #[test]
    fn trailing_empty_options_do_not_count() {
        assert!(DirectiveSpec::parse("a:input:label, ").is_err());
    }

    #[test]
    fn rejects_unknown_kind_and_missing_parts() {
        for capture in ["a:checkbox:x, y", "a", "a:input", ":input:x, y"] {
            assert!(DirectiveSpec::parse(capture).is_err(), "{capture}");
        }
    }

    #[test]
    fn one_bad_directive_fails_the_whole_template() {
        let result = parse_directives("!%a:input:x, y% !%b:dropdown:l, d%");
        match result {
            Err(FormError::InvalidDirective { directive, .. }) => {
                assert_eq!(directive, "b:dropdown:l, d");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
