// Form error types
// Location-aware parse errors with source context, plus semantic validation errors

use std::fmt;

/// Parse error with location and surrounding source
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
    /// A few source lines around the error
    pub context: String,
    pub suggestion: Option<String>,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// YAML/JSON syntax error
    Syntax,
    /// Wrong types or missing fields
    InvalidSchema,
    /// File could not be read
    Io,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            context: String::new(),
            suggestion: None,
            kind: ParseErrorKind::InvalidSchema,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Render `context_lines` lines either side of the error line
    pub fn with_source_context(mut self, source: &str, context_lines: usize) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        let start = self.line.saturating_sub(context_lines + 1);
        let end = (self.line + context_lines).min(lines.len());

        let mut context = String::new();
        for (i, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = i + 1;
            let marker = if line_num == self.line { ">" } else { " " };
            context.push_str(&format!("{} {:4} | {}\n", marker, line_num, line));

            if line_num == self.line && self.column > 0 {
                let caret = " ".repeat(self.column.saturating_sub(1)) + "^";
                context.push_str(&format!("       | {}\n", caret));
            }
        }

        self.context = context;
        self
    }

    pub fn from_yaml_error(err: &serde_yaml::Error, source: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let message = format_yaml_error_message(err);
        let kind = if message.starts_with("missing required field")
            || message.starts_with("unknown variant")
            || message.starts_with("expected ")
        {
            ParseErrorKind::InvalidSchema
        } else {
            ParseErrorKind::Syntax
        };

        let mut parsed = ParseError::new(message, line, column)
            .with_kind(kind)
            .with_source_context(source, 2);
        parsed.suggestion = suggest_form_fix(err, source, line);
        parsed
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;
        if self.line > 0 {
            writeln!(f, "  --> line {}:{}", self.line, self.column)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.context)?;
        }

        if let Some(suggestion) = &self.suggestion {
            writeln!(f)?;
            writeln!(f, "help: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

fn format_yaml_error_message(err: &serde_yaml::Error) -> String {
    let msg = err.to_string();

    if msg.contains("missing field") {
        if let Some(field) = extract_between(&msg, "missing field `", "`") {
            return format!("missing required field '{}'", field);
        }
    }

    if msg.contains("unknown variant") {
        if let Some(variant) = extract_between(&msg, "unknown variant `", "`") {
            return format!("unknown variant '{}'", variant);
        }
    }

    if msg.contains("invalid type") {
        if let (Some(found), Some(expected)) = (
            extract_between(&msg, "invalid type: ", ","),
            extract_between(&msg, "expected ", " at"),
        ) {
            return format!("expected {}, but found {}", expected, found);
        }
    }

    msg
}

fn extract_between(msg: &str, prefix: &str, suffix: &str) -> Option<String> {
    let start = msg.find(prefix)? + prefix.len();
    let end = msg[start..].find(suffix)? + start;
    Some(msg[start..end].to_string())
}

fn suggest_form_fix(err: &serde_yaml::Error, source: &str, line: usize) -> Option<String> {
    let msg = err.to_string();
    let error_line = source
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default();

    if msg.contains("missing field `name`") {
        return Some("every token needs a 'name' matching its {placeholder}".to_string());
    }

    if msg.contains("unknown variant") && msg.contains("dynamic-enum") {
        return Some("token type must be one of: text, enum, boolean, dynamic-enum".to_string());
    }

    if error_line.starts_with('\t') {
        return Some(
            "YAML prefers spaces over tabs for indentation. Replace tabs with spaces.".to_string(),
        );
    }

    let typo_suggestions = [
        ("dependson", "dependsOn"),
        ("linkedtoken", "dependsOn"),
        ("matchvalue", "matchExpression"),
        ("showif", "shown"),
        ("reduceemptylines", "reduceEmptyLines"),
        ("maxlinelength", "maxLineLength"),
    ];

    let lower_line = error_line.to_lowercase();
    typo_suggestions
        .iter()
        .find(|(typo, _)| lower_line.contains(typo))
        .map(|(_, correct)| format!("did you mean '{}'?", correct))
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Semantic problem found in an otherwise well-formed definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    /// Location such as `tokens[2].match`
    pub path: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error at '{}': {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("missing required field 'name'", 4, 3)
            .with_suggestion("every token needs a 'name'");

        let output = format!("{}", err);
        assert!(output.contains("missing required field"));
        assert!(output.contains("line 4:3"));
        assert!(output.contains("help:"));
    }

    #[test]
    fn test_io_error_display_omits_location() {
        let err = ParseError::new("failed to read file", 0, 0).with_kind(ParseErrorKind::Io);
        assert!(!format!("{}", err).contains("-->"));
    }

    #[test]
    fn test_source_context_marks_error_line() {
        let source = "template:\n  - '{type}'\ntokens:\n  - label: Type\n    type: enum";
        let err = ParseError::new("missing required field 'name'", 4, 5).with_source_context(source, 1);

        assert!(err.context.contains(">    4 |   - label: Type"));
        assert!(err.context.contains("    ^"));
        assert!(!err.context.contains("template:"));
    }

    #[test]
    fn test_extract_between() {
        assert_eq!(
            extract_between("missing field `name` at line 3", "missing field `", "`"),
            Some("name".to_string())
        );
        assert_eq!(extract_between("nothing here", "missing field `", "`"), None);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("unknown dependency 'kind'", "tokens[1].dependsOn")
            .with_suggestion("declare a token named 'kind'");
        assert_eq!(
            err.to_string(),
            "validation error at 'tokens[1].dependsOn': unknown dependency 'kind' (declare a token named 'kind')"
        );
    }
}
