//! Prompt templating.
//!
//! Templates use `{{name}}` placeholders and `{{#name}}…{{/name}}` optional
//! sections. A section whose variable is absent or empty removes every line
//! it touches. Outside sections, a missing variable is an error unless the
//! caller lists it as optional, in which case it renders empty and a line
//! left blank by it is dropped. Runs of blank lines collapse to one.

mod templates;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::Error;
use super::llm::ChatMessage;

pub use templates::{
    PromptTemplate, PromptTemplates, RECIPE_OPTIONAL, RECIPE_REQUIRED, SHOPPING_OPTIONAL,
    SHOPPING_REQUIRED, StaticPromptTemplates, TemplateKind,
};

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .unwrap_or_else(|error| panic!("placeholder regex failed to compile: {error}"))
    })
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVariables(BTreeMap<String, String>);

impl PromptVariables {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    /// Bind `name` when `value` is present.
    #[must_use]
    pub fn with_optional(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Non-blank value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// A `{{#name}}` opener located in a template.
struct Section<'a> {
    name: &'a str,
    open_start: usize,
    body_start: usize,
    body_end: usize,
    close_end: usize,
}

fn next_section(template: &str, from: usize) -> Result<Option<Section<'_>>, Error> {
    let Some(offset) = template[from..].find("{{#") else {
        return Ok(None);
    };
    let open_start = from + offset;
    let name_start = open_start + 3;
    let name_len = template[name_start..]
        .find("}}")
        .ok_or_else(|| malformed("unterminated section opener"))?;
    let name = template[name_start..name_start + name_len].trim();
    let body_start = name_start + name_len + 2;
    let closer = format!("{{{{/{name}}}}}");
    let body_len = template[body_start..]
        .find(&closer)
        .ok_or_else(|| malformed(format!("section `{name}` is never closed")))?;
    let body_end = body_start + body_len;
    Ok(Some(Section {
        name,
        open_start,
        body_start,
        body_end,
        close_end: body_end + closer.len(),
    }))
}

fn malformed(message: impl Into<String>) -> Error {
    Error::invalid_request(format!("malformed prompt template: {}", message.into()))
}

/// Resolve optional sections, keeping bodies whose variable is set and
/// dropping the lines of those whose variable is not.
fn expand_sections(template: &str, variables: &PromptVariables) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    while let Some(section) = next_section(template, cursor)? {
        out.push_str(&template[cursor..section.open_start]);
        if variables.get(section.name).is_some() {
            let body = &template[section.body_start..section.body_end];
            out.push_str(&expand_sections(body, variables)?);
            cursor = section.close_end;
        } else {
            let line_start = out.rfind('\n').map_or(0, |index| index + 1);
            out.truncate(line_start);
            cursor = template[section.close_end..]
                .find('\n')
                .map_or(template.len(), |index| section.close_end + index + 1);
        }
    }
    out.push_str(&template[cursor..]);
    Ok(out)
}

/// Render `template` with `variables`.
///
/// Names in `optional` may be omitted. Any other unresolved placeholder
/// yields `INVALID_REQUEST` listing every missing name.
///
/// # Examples
/// ```
/// use pantry_backend::domain::prompt::{PromptVariables, render};
///
/// let vars = PromptVariables::new().with("dish", "soup");
/// let text = render("Cook {{dish}}.\n{{#side}}With {{side}}.{{/side}}\nEnjoy.", &vars, &[])
///     .expect("renders");
/// assert_eq!(text, "Cook soup.\nEnjoy.");
/// ```
pub fn render(
    template: &str,
    variables: &PromptVariables,
    optional: &[&str],
) -> Result<String, Error> {
    let expanded = expand_sections(template, variables)?;
    let mut missing = BTreeSet::new();
    let mut lines = Vec::new();
    for line in expanded.split('\n') {
        let mut elided_optional = false;
        let rendered = placeholder_regex().replace_all(line, |captures: &regex::Captures<'_>| {
            let name = captures.get(1).map_or("", |found| found.as_str());
            if let Some(value) = variables.get(name) {
                return value.to_owned();
            }
            if optional.contains(&name) {
                elided_optional = true;
            } else {
                missing.insert(name.to_owned());
            }
            String::new()
        });
        let follows_blank = lines
            .last()
            .is_some_and(|prev: &String| prev.trim().is_empty());
        if rendered.trim().is_empty() && (elided_optional || follows_blank) {
            continue;
        }
        lines.push(rendered.into_owned());
    }
    if !missing.is_empty() {
        let names: Vec<String> = missing.into_iter().collect();
        return Err(Error::invalid_request(format!(
            "missing prompt variables: {}",
            names.join(", ")
        ))
        .with_details(json!({ "missing": names })));
    }
    Ok(lines.join("\n").trim().to_owned())
}

/// Placeholder and section names used by `template`.
#[must_use]
pub fn variable_names(template: &str) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = placeholder_regex()
        .captures_iter(template)
        .filter_map(|captures| captures.get(1))
        .map(|found| found.as_str().to_owned())
        .collect();
    let mut cursor = 0;
    while let Ok(Some(section)) = next_section(template, cursor) {
        names.insert(section.name.to_owned());
        cursor = section.body_start;
    }
    names
}

/// Check that every name in `required` appears in `template` and that its
/// sections are balanced.
pub fn validate_template(template: &str, required: &[&str]) -> Result<(), Error> {
    let mut cursor = 0;
    while let Some(section) = next_section(template, cursor)? {
        cursor = section.body_start;
    }
    let present = variable_names(template);
    let absent: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.contains(*name))
        .collect();
    if absent.is_empty() {
        return Ok(());
    }
    Err(Error::invalid_request(format!(
        "prompt template is missing required variables: {}",
        absent.join(", ")
    ))
    .with_details(json!({ "missing": absent })))
}

/// System then user message, omitting either when blank.
#[must_use]
pub fn build_messages(system: &str, user: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if !system.trim().is_empty() {
        messages.push(ChatMessage::system(system));
    }
    if !user.trim().is_empty() {
        messages.push(ChatMessage::user(user));
    }
    messages
}
