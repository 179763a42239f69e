use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    directives::{parse_directives, scan_directives},
    forms::{FormError, FormRequest, MenuButton, ResponseValue},
    substitution::{ResolvedValues, Substitution, ValueSource},
    widgets::{InvalidValue, LookupMiss, WidgetSpec},
};

/// A submission that cannot be mapped onto the rendered form.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidSubmission {
    /// A value does not fit its widget.
    #[error(transparent)]
    Value(#[from] InvalidValue),
    /// More values than widgets.
    #[error("expected at most {expected} values, got {actual}")]
    TooManyValues {
        /// Widgets on the form.
        expected: usize,
        /// Values submitted.
        actual: usize,
    },
}

/// Command form assembled from a template's directives.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandForm {
    title: String,
    template: String,
    widgets: Vec<WidgetSpec>,
}

impl CommandForm {
    /// Parses the template and builds one widget per directive.
    ///
    /// Returns `Ok(None)` for literal templates. Any invalid directive aborts the
    /// whole form.
    pub fn assemble(
        title: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<Option<Self>, FormError> {
        let template = template.into();
        if scan_directives(&template).is_empty() {
            return Ok(None);
        }
        let widgets = parse_directives(&template)?
            .into_iter()
            .map(WidgetSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Self {
            title: title.into(),
            template,
            widgets,
        }))
    }

    /// Form title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Template the form was built from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Widgets in directive order.
    #[must_use]
    pub fn widgets(&self) -> &[WidgetSpec] {
        &self.widgets
    }

    /// Defaults that were not found among their choices.
    pub fn lookup_misses(&self) -> impl Iterator<Item = &LookupMiss> {
        self.widgets.iter().filter_map(WidgetSpec::lookup_miss)
    }

    /// Request sent to the client.
    #[must_use]
    pub fn request(&self) -> FormRequest {
        FormRequest::Command {
            title: self.title.clone(),
            components: self.widgets.iter().map(WidgetSpec::component).collect(),
        }
    }

    /// Maps submitted values onto the directives; index `i` answers widget `i`.
    pub fn resolve(
        &self,
        values: &[Option<ResponseValue>],
    ) -> Result<ResolvedValues, InvalidSubmission> {
        if values.len() > self.widgets.len() {
            return Err(InvalidSubmission::TooManyValues {
                expected: self.widgets.len(),
                actual: values.len(),
            });
        }

        let mut resolved = ResolvedValues::new();
        for (index, widget) in self.widgets.iter().enumerate() {
            let value = values.get(index).and_then(Option::as_ref);
            let source = match value {
                Some(value) if !value.is_empty() => ValueSource::Client,
                _ => ValueSource::Default,
            };
            resolved.push(Substitution {
                token: widget.directive().token(),
                value: widget.extract(value)?,
                source,
            });
        }
        Ok(resolved)
    }

    /// Convenience: resolve and substitute in one step.
    pub fn render_command(
        &self,
        values: &[Option<ResponseValue>],
    ) -> Result<String, InvalidSubmission> {
        Ok(self.resolve(values)?.apply(&self.template))
    }
}

/// Button offered on a menu, with the action it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEntry<A> {
    /// Action returned when the button is clicked.
    pub action: A,
    /// Rendered label.
    pub label: String,
    /// Rendered image URL.
    pub image_url: Option<String>,
}

/// Menu form under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuForm<A> {
    title: String,
    content: Option<String>,
    entries: Vec<ButtonEntry<A>>,
}

impl<A> MenuForm<A> {
    /// Starts a menu; blank content is dropped.
    #[must_use]
    pub fn new(title: impl Into<String>, content: Option<String>) -> Self {
        Self {
            title: title.into(),
            content: content.filter(|text| !text.is_empty()),
            entries: Vec::new(),
        }
    }

    /// Adds a permitted button; a blank image renders label-only.
    pub fn push(&mut self, action: A, label: impl Into<String>, image_url: Option<String>) {
        self.entries.push(ButtonEntry {
            action,
            label: label.into(),
            image_url: image_url.filter(|url| !url.is_empty()),
        });
    }

    /// Buttons in display order.
    #[must_use]
    pub fn entries(&self) -> &[ButtonEntry<A>] {
        &self.entries
    }

    /// Request sent to the client.
    #[must_use]
    pub fn request(&self) -> FormRequest {
        FormRequest::Menu {
            title: self.title.clone(),
            content: self.content.clone(),
            buttons: self
                .entries
                .iter()
                .map(|entry| MenuButton {
                    text: entry.label.clone(),
                    image_url: entry.image_url.clone(),
                })
                .collect(),
        }
    }

    /// Moves the actions into a label lookup owned by one render.
    ///
    /// Later buttons with a duplicate label shadow earlier ones.
    #[must_use]
    pub fn into_arena(self) -> ButtonArena<A> {
        ButtonArena {
            by_label: self
                .entries
                .into_iter()
                .map(|entry| (entry.label, entry.action))
                .collect(),
        }
    }
}

/// Label to action lookup scoped to a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonArena<A> {
    by_label: IndexMap<String, A>,
}

impl<A> ButtonArena<A> {
    /// Looks up the clicked label and empties the arena.
    pub fn resolve(&mut self, label: &str) -> Option<A> {
        let action = self.by_label.swap_remove(label);
        self.clear();
        action
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.by_label.clear();
    }

    /// Entries still held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Whether the arena has been spent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_template_needs_no_form() {
        assert_eq!(CommandForm::assemble("t", "say hi").unwrap(), None);
    }

    #[test]
    fn resolves_example_with_default_fallback() {
        let form = CommandForm::assemble("Give", "give !%target:input:p, Steve% !%amt:input:a, 1%")
            .unwrap()
            .unwrap();
        let command = form
            .render_command(&[
                Some(ResponseValue::Text("Alex".into())),
                Some(ResponseValue::Text(String::new())),
            ])
            .unwrap();
        assert_eq!(command, "give Alex 1");
    }

    #[test]
    fn missing_trailing_values_use_defaults() {
        let form = CommandForm::assemble("t", "tp !%x:input:x, 0% !%y:input:y, 64%")
            .unwrap()
            .unwrap();
        let resolved = form
            .resolve(&[Some(ResponseValue::Text("5".into()))])
            .unwrap();
        let sources: Vec<_> = resolved.entries().iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![ValueSource::Client, ValueSource::Default]);
        assert_eq!(resolved.apply(form.template()), "tp 5 64");
    }

    #[test]
    fn extra_values_are_invalid() {
        let form = CommandForm::assemble("t", "say !%m:input:m, hi%")
            .unwrap()
            .unwrap();
        assert!(matches!(
            form.resolve(&[None, None]),
            Err(InvalidSubmission::TooManyValues { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn one_bad_directive_aborts_assembly() {
        let result = CommandForm::assemble(
            "t",
            "give !%target:input:p, Steve% !%amt:slider:Amount, 1, 64%",
        );
        assert!(matches!(result, Err(FormError::InvalidDirective { .. })));
    }

    #[test]
    fn duplicate_tokens_render_twice_and_fill_in_order() {
        let form = CommandForm::assemble("t", "msg !%p:input:p, me% !%p:input:p, me%")
            .unwrap()
            .unwrap();
        assert_eq!(form.widgets().len(), 2);
        let command = form
            .render_command(&[
                Some(ResponseValue::Text("a".into())),
                Some(ResponseValue::Text("b".into())),
            ])
            .unwrap();
        assert_eq!(command, "msg a b");
    }

    #[test]
    fn request_lists_components_in_order() {
        let form = CommandForm::assemble(
            "Kit",
            "kit !%k:dropdown:Kit, pvp, pvp, build% !%f:toggle:Fly, false%",
        )
        .unwrap()
        .unwrap();
        let request = form.request();
        assert_eq!(request.title(), "Kit");
        assert_eq!(request.len(), 2);
        assert_eq!(form.lookup_misses().count(), 0);
    }

    #[test]
    fn menu_form_drops_blank_content_and_images() {
        let mut menu = MenuForm::new("Main", Some(String::new()));
        menu.push(1, "One", Some(String::new()));
        menu.push(2, "Two", Some("https://example.com/two.png".into()));
        match menu.request() {
            FormRequest::Menu {
                content, buttons, ..
            } => {
                assert_eq!(content, None);
                assert_eq!(buttons[0].image_url, None);
                assert!(buttons[1].image_url.is_some());
            }
            other @ FormRequest::Command { .. } => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arena_resolves_once_then_empties() {
        let mut menu = MenuForm::new("Main", None);
        menu.push("first", "One", None);
        menu.push("second", "Two", None);
        let mut arena = menu.into_arena();
        assert_eq!(arena.resolve("Two"), Some("second"));
        assert!(arena.is_empty());
        assert_eq!(arena.resolve("One"), None);
    }
}
