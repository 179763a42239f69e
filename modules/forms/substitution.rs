use serde::{Deserialize, Serialize};

/// Where a substituted value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// The client supplied a non-empty value.
    Client,
    /// The widget was left untouched; the directive default applies.
    Default,
}

/// One directive occurrence and the value replacing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Substitution {
    /// Full `!%...%` token.
    pub token: String,
    /// Replacement text.
    pub value: String,
    /// Origin of the value.
    pub source: ValueSource,
}

/// Values resolved for a command form, in directive order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedValues {
    entries: Vec<Substitution>,
}

impl ResolvedValues {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the value for the next directive.
    pub fn push(&mut self, substitution: Substitution) {
        self.entries.push(substitution);
    }

    /// Resolved entries in directive order.
    #[must_use]
    pub fn entries(&self) -> &[Substitution] {
        &self.entries
    }

    /// Applies the values to a template. See [`substitute`].
    #[must_use]
    pub fn apply(&self, template: &str) -> String {
        substitute(
            template,
            self.entries
                .iter()
                .map(|entry| (entry.token.as_str(), entry.value.as_str())),
        )
    }
}

/// Replaces the first remaining occurrence of each token, in order.
///
/// A token repeated in the template is only replaced as many times as it
/// appears in `replacements`; extra occurrences stay verbatim. Values are
/// inserted literally.
#[must_use]
pub fn substitute<'a>(
    template: &str,
    replacements: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    replacements
        .into_iter()
        .fold(template.to_owned(), |command, (token, value)| {
            command.replacen(token, value, 1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_each_token_once_in_order() {
        let command = substitute(
            "give !%t:input:p, Steve% !%a:input:a, 1%",
            [("!%t:input:p, Steve%", "Alex"), ("!%a:input:a, 1%", "1")],
        );
        assert_eq!(command, "give Alex 1");
    }

    #[test]
    fn repeated_token_keeps_later_occurrences() {
        // Each directive index only consumes the first remaining occurrence.
        let command = substitute("tp !%p:input:p, me% !%p:input:p, me%", [("!%p:input:p, me%", "Alex")]);
        assert_eq!(command, "tp Alex !%p:input:p, me%");
    }

    #[test]
    fn values_are_inserted_literally() {
        let command = substitute("say !%m:input:m, hi%", [("!%m:input:m, hi%", "$1 \\o/")]);
        assert_eq!(command, "say $1 \\o/");
    }

    #[test]
    fn resolved_values_apply_in_directive_order() {
        let mut values = ResolvedValues::new();
        values.push(Substitution {
            token: "!%x:input:x, 1%".into(),
            value: "a".into(),
            source: ValueSource::Client,
        });
        values.push(Substitution {
            token: "!%x:input:x, 1%".into(),
            value: "b".into(),
            source: ValueSource::Default,
        });
        assert_eq!(values.apply("!%x:input:x, 1%-!%x:input:x, 1%"), "a-b");
    }
}
