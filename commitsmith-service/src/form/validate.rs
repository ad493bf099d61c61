// Semantic validation of form definitions

use crate::expression::WhenClause;
use crate::form::error::ValidationError;
use crate::form::models::{Field, FieldKind, FormDefinition};
use crate::template::placeholder_names;

use std::collections::HashSet;

pub struct FormValidator;

impl FormValidator {
    /// Check a parsed form for problems the schema cannot express.
    ///
    /// Every problem is reported; validation does not stop at the first one.
    pub fn validate(form: &FormDefinition) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for (i, field) in form.tokens.iter().enumerate() {
            let path = format!("tokens[{}]", i);

            if field.name.trim().is_empty() {
                errors.push(
                    ValidationError::new("token name must not be empty", format!("{}.name", path))
                        .with_suggestion("the name is used as {name} in the template"),
                );
            } else if !seen.insert(field.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("duplicate token name '{}'", field.name),
                    format!("{}.name", path),
                ));
            }

            Self::validate_field(field, &path, &mut errors);
        }

        Self::validate_dependencies(&form.tokens, &mut errors);
        Self::validate_template(form, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(count = errors.len(), "form failed validation");
            Err(errors)
        }
    }

    fn validate_field(field: &Field, path: &str, errors: &mut Vec<ValidationError>) {
        match field.kind {
            FieldKind::Enum if field.options.is_empty() && !field.combobox => {
                errors.push(
                    ValidationError::new("enum token has no options", format!("{}.options", path))
                        .with_suggestion("add options, or set 'combobox: true' to allow free text"),
                );
            }
            FieldKind::DynamicEnum
                if field.provider.as_deref().map_or(true, |p| p.trim().is_empty()) =>
            {
                errors.push(
                    ValidationError::new(
                        "dynamic-enum token has no provider",
                        format!("{}.provider", path),
                    )
                    .with_suggestion("set 'provider' to the id of a registered options provider"),
                );
            }
            _ => {}
        }
    }

    fn validate_dependencies(fields: &[Field], errors: &mut Vec<ValidationError>) {
        let names: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();

        for (i, field) in fields.iter().enumerate() {
            let dependencies = field.dependency_names();
            if dependencies.is_empty() {
                continue;
            }

            for dependency in &dependencies {
                if *dependency == field.name {
                    errors.push(ValidationError::new(
                        format!("token '{}' depends on itself", field.name),
                        format!("tokens[{}].dependsOn", i),
                    ));
                } else if !names.contains(dependency) {
                    errors.push(
                        ValidationError::new(
                            format!("unknown dependency '{}'", dependency),
                            format!("tokens[{}].dependsOn", i),
                        )
                        .with_suggestion(format!("declare a token named '{}'", dependency)),
                    );
                }
            }

            let path = format!("tokens[{}].matchExpression", i);
            let expression = match field.match_expression.as_deref() {
                Some(expression) if !expression.trim().is_empty() => expression,
                _ => {
                    errors.push(
                        ValidationError::new(
                            format!(
                                "token '{}' declares dependencies but no match expression, so it is never shown",
                                field.name
                            ),
                            path,
                        )
                        .with_suggestion("add a when-clause such as \"issue_type == 'bug'\""),
                    );
                    continue;
                }
            };

            let clause = match WhenClause::parse(expression) {
                Ok(clause) => clause,
                Err(err) => {
                    errors.push(ValidationError::new(
                        format!("invalid match expression: {}", err),
                        path,
                    ));
                    continue;
                }
            };

            let mut reported = HashSet::new();
            for identifier in clause.identifiers() {
                if !dependencies.contains(&identifier) && reported.insert(identifier) {
                    errors.push(
                        ValidationError::new(
                            format!(
                                "match expression reads '{}', which is not a declared dependency",
                                identifier
                            ),
                            path.clone(),
                        )
                        .with_suggestion(format!(
                            "add '{}' to dependsOn; undeclared names are always undefined",
                            identifier
                        )),
                    );
                }
            }
        }
    }

    fn validate_template(form: &FormDefinition, errors: &mut Vec<ValidationError>) {
        for (i, line) in form.template.lines().iter().enumerate() {
            for name in placeholder_names(line) {
                if form.field(name).is_none() {
                    errors.push(ValidationError::new(
                        format!("placeholder '{{{}}}' does not name a token", name),
                        format!("template[{}]", i),
                    ));
                }
            }
        }
    }
}
