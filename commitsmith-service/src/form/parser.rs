// Form definition parser
// Loads a form from YAML or JSON text or from a file on disk

use crate::error::ServiceResult;
use crate::form::error::{ParseError, ParseErrorKind, ParseResult, ValidationError};
use crate::form::models::FormDefinition;
use crate::form::validate::FormValidator;

use std::fs;
use std::path::Path;

pub struct FormParser;

impl FormParser {
    /// Parse a form definition from YAML (JSON documents are accepted too)
    pub fn parse(content: &str) -> ParseResult<FormDefinition> {
        let form: FormDefinition =
            serde_yaml::from_str(content).map_err(|e| ParseError::from_yaml_error(&e, content))?;

        tracing::debug!(tokens = form.tokens.len(), "parsed form definition");
        Ok(form)
    }

    /// Parse a strict JSON form definition
    pub fn parse_json(content: &str) -> ParseResult<FormDefinition> {
        serde_json::from_str(content).map_err(|e| {
            ParseError::new(e.to_string(), e.line(), e.column())
                .with_kind(if e.is_syntax() || e.is_eof() {
                    ParseErrorKind::Syntax
                } else {
                    ParseErrorKind::InvalidSchema
                })
                .with_source_context(content, 2)
        })
    }

    /// Parse a form definition file, choosing JSON for `.json` files
    pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<FormDefinition> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::new(
                format!("failed to read file '{}': {}", path.display(), e),
                0,
                0,
            )
            .with_kind(ParseErrorKind::Io)
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parse a form file and reject it if validation finds any problem
    pub fn load<P: AsRef<Path>>(path: P) -> ServiceResult<FormDefinition> {
        let form = Self::parse_file(path)?;
        FormValidator::validate(&form)?;
        Ok(form)
    }

    /// Parse a form file, returning validation problems alongside it.
    ///
    /// Only unreadable or malformed files fail. A field whose dependency
    /// has no usable match expression is still a valid form; it stays hidden.
    pub fn load_lenient<P: AsRef<Path>>(
        path: P,
    ) -> ParseResult<(FormDefinition, Vec<ValidationError>)> {
        let path = path.as_ref();
        let form = Self::parse_file(path)?;
        let problems = FormValidator::validate(&form).err().unwrap_or_default();

        for problem in &problems {
            tracing::warn!(
                form = %path.display(),
                path = %problem.path,
                "{}",
                problem.message
            );
        }

        Ok((form, problems))
    }
}
