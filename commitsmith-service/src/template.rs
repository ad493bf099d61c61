// Template compiler
// Substitutes resolved field values into `{name}` placeholders

use crate::form::{Field, FieldValues, FormDefinition};
use crate::resolution;

use std::collections::HashMap;

/// A `{name}` occurrence in template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder<'a> {
    name: &'a str,
    /// Byte offset of the opening brace
    start: usize,
    /// Byte offset one past the closing brace
    end: usize,
}

/// Find every `{name}` in `text`, left to right. A name never contains braces.
fn scan_placeholders(text: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(open) = text[offset..].find('{') {
        let start = offset + open;
        let rest = &text[start + 1..];
        let Some(close) = rest.find(['{', '}']) else {
            break;
        };

        if rest.as_bytes()[close] == b'}' {
            let end = start + 1 + close + 1;
            found.push(Placeholder {
                name: &rest[..close],
                start,
                end,
            });
            offset = end;
        } else {
            // restart at the inner brace
            offset = start + 1 + close;
        }
    }

    found
}

/// Placeholder names in `text`, in order of appearance
pub fn placeholder_names(text: &str) -> Vec<&str> {
    scan_placeholders(text).into_iter().map(|p| p.name).collect()
}

/// Collapse runs of three or more newlines to two and strip trailing newlines
pub fn reduce_empty_lines(text: &str) -> String {
    let mut reduced = String::with_capacity(text.len());
    let mut run = 0;

    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                reduced.push(ch);
            }
        } else {
            run = 0;
            reduced.push(ch);
        }
    }

    let trimmed = reduced.trim_end_matches('\n').len();
    reduced.truncate(trimmed);
    reduced
}

/// Compiles a commit message from template lines, fields and their values
#[derive(Debug, Clone)]
pub struct TemplateCompiler<'a> {
    template: String,
    fields: &'a [Field],
    values: &'a FieldValues,
    reduce_empty_lines: bool,
}

impl<'a> TemplateCompiler<'a> {
    pub fn new<S: AsRef<str>>(template: &[S], fields: &'a [Field], values: &'a FieldValues) -> Self {
        let template = template
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            template,
            fields,
            values,
            reduce_empty_lines: true,
        }
    }

    /// Compiler for a whole form definition, honouring its `reduceEmptyLines`
    pub fn for_form(form: &'a FormDefinition, values: &'a FieldValues) -> Self {
        let lines = form.template.lines();
        Self::new(lines.as_slice(), &form.tokens, values)
            .with_reduce_empty_lines(form.reduce_empty_lines)
    }

    pub fn set_reduce_empty_lines(&mut self, reduce: bool) {
        self.reduce_empty_lines = reduce;
    }

    pub fn with_reduce_empty_lines(mut self, reduce: bool) -> Self {
        self.reduce_empty_lines = reduce;
        self
    }

    /// Template text after joining lines, before substitution
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute every known placeholder in one pass.
    ///
    /// Substituted text is never rescanned, so a value containing `{other}`
    /// is emitted literally. Unknown placeholders are left as written.
    pub fn compile(&self) -> String {
        let resolved: HashMap<&str, String> = self
            .fields
            .iter()
            .map(|field| {
                let resolution = resolution::resolve(field, self.values);
                (field.name.as_str(), resolution.value)
            })
            .collect();

        let mut compiled = String::with_capacity(self.template.len());
        let mut cursor = 0;

        for placeholder in scan_placeholders(&self.template) {
            if let Some(value) = resolved.get(placeholder.name) {
                compiled.push_str(&self.template[cursor..placeholder.start]);
                compiled.push_str(value);
                cursor = placeholder.end;
            }
        }
        compiled.push_str(&self.template[cursor..]);

        tracing::trace!(
            fields = self.fields.len(),
            reduce = self.reduce_empty_lines,
            "compiled template"
        );

        if self.reduce_empty_lines {
            reduce_empty_lines(&compiled)
        } else {
            compiled
        }
    }
}
