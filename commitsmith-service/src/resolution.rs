// Conditional field resolution
// Decides whether a field is shown and what it contributes to the message

use crate::expression::{evaluate_when_clause, ExpressionContext};
use crate::form::{Field, FieldValues};

/// Outcome of resolving one field against the current values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Field is rendered in the form
    pub visible: bool,
    /// Text substituted for the field's placeholder
    pub value: String,
}

/// Context holding exactly the declared dependencies of `field`.
///
/// Multi-valued fields appear as arrays; missing values as the empty string.
pub fn dependency_context(field: &Field, values: &FieldValues) -> ExpressionContext {
    field
        .dependency_names()
        .into_iter()
        .map(|name| (name, values.get(name).cloned().unwrap_or_default()))
        .collect()
}

/// Whether `field` is active given the current values.
///
/// Fields without dependencies are always active. A field with dependencies
/// but no expression is never active. Otherwise the expression decides, and
/// any failure to evaluate it counts as inactive.
pub fn gate(field: &Field, values: &FieldValues) -> bool {
    if !field.is_conditional() {
        return true;
    }

    let expression = match field.match_expression.as_deref() {
        Some(expression) if !expression.is_empty() => expression,
        _ => return false,
    };

    let context = dependency_context(field, values);
    let active = evaluate_when_clause(expression, &context);
    tracing::trace!(field = %field.name, expression, active, "gated conditional field");
    active
}

/// Resolve visibility and substitution text for `field`
pub fn resolve(field: &Field, values: &FieldValues) -> Resolution {
    let visible = gate(field, values);
    let raw = values
        .get(&field.name)
        .map(|value| value.raw(field.separator.as_deref().unwrap_or_default()))
        .unwrap_or_default();

    let value = if visible && !raw.is_empty() {
        format!(
            "{}{}{}",
            field.prefix.as_deref().unwrap_or_default(),
            raw,
            field.suffix.as_deref().unwrap_or_default()
        )
    } else {
        String::new()
    };

    Resolution { visible, value }
}

/// Fields the form should render, in declaration order
pub fn visible_fields<'a>(fields: &'a [Field], values: &FieldValues) -> Vec<&'a Field> {
    fields.iter().filter(|field| gate(field, values)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{DependsOn, FieldKind};

    fn root_cause(expression: Option<&str>) -> Field {
        let mut field = Field::new("root_cause", FieldKind::Text).with_prefix("Root cause: ");
        field.depends_on = Some(DependsOn::One("issue_type".to_string()));
        field.match_expression = expression.map(str::to_string);
        field
    }

    fn values(issue_type: &str) -> FieldValues {
        FieldValues::new()
            .with("issue_type", issue_type)
            .with("root_cause", "typo")
    }

    #[test]
    fn test_unconditional_field_always_active() {
        let field = Field::new("body", FieldKind::Text).with_suffix(".");
        let resolution = resolve(&field, &FieldValues::new().with("body", "text"));

        assert!(resolution.visible);
        assert_eq!(resolution.value, "text.");
    }

    #[test]
    fn test_empty_value_contributes_nothing() {
        let field = Field::new("scope", FieldKind::Text).with_prefix("(").with_suffix(")");

        let resolution = resolve(&field, &FieldValues::new());
        assert!(resolution.visible);
        assert_eq!(resolution.value, "");
    }

    #[test]
    fn test_matching_condition() {
        let resolution = resolve(&root_cause(Some("issue_type == 'bug'")), &values("bug"));
        assert_eq!(
            resolution,
            Resolution {
                visible: true,
                value: "Root cause: typo".to_string()
            }
        );
    }

    #[test]
    fn test_failing_condition() {
        let resolution = resolve(&root_cause(Some("issue_type == 'bug'")), &values("story"));
        assert_eq!(resolution, Resolution::default());
    }

    #[test]
    fn test_missing_or_empty_expression_fails_closed() {
        assert_eq!(resolve(&root_cause(None), &values("bug")), Resolution::default());
        assert_eq!(
            resolve(&root_cause(Some("")), &values("bug")),
            Resolution::default()
        );
    }

    #[test]
    fn test_malformed_expression_fails_closed() {
        let resolution = resolve(&root_cause(Some("issue_type ==")), &values("bug"));
        assert!(!resolution.visible);
        assert_eq!(resolution.value, "");
    }

    #[test]
    fn test_context_holds_only_declared_dependencies() {
        // `body` is set but undeclared, so it reads as undefined
        let field = root_cause(Some("body == 'x'"));
        let values = values("bug").with("body", "x");
        assert!(!gate(&field, &values));

        let context = dependency_context(&field, &values);
        assert_eq!(context.len(), 1);
        assert!(context.get("body").is_none());
    }

    #[test]
    fn test_missing_dependency_value_is_empty_string() {
        let field = root_cause(Some("issue_type == ''"));
        assert!(gate(&field, &FieldValues::new()));
    }

    #[test]
    fn test_multiple_dependencies_present_together() {
        let field = Field::new("follow_up", FieldKind::Text).depending_on(
            DependsOn::Many(vec!["issue".to_string(), "type".to_string()]),
            "issue =~ /客户反馈/ && type == 'fix'",
        );

        let matching = FieldValues::new()
            .with("issue", "客户反馈")
            .with("type", "fix")
            .with("follow_up", "call back");
        let failing = FieldValues::new()
            .with("issue", "客户反馈")
            .with("type", "feat")
            .with("follow_up", "call back");

        assert_eq!(resolve(&field, &matching).value, "call back");
        assert_eq!(resolve(&field, &failing).value, "");
    }

    #[test]
    fn test_multi_valued_dependency_is_array() {
        let field = Field::new("ui_notes", FieldKind::Text)
            .depending_on(DependsOn::One("labels".to_string()), "'ui' in labels");
        let values = FieldValues::new().with("labels", vec!["ui".to_string(), "api".to_string()]);

        assert!(gate(&field, &values));
    }

    #[test]
    fn test_visible_fields_agree_with_resolve() {
        let fields = vec![
            Field::new("issue_type", FieldKind::Enum),
            root_cause(Some("issue_type == 'bug'")),
            root_cause(None),
        ];
        let values = values("bug");

        let visible: Vec<bool> = fields
            .iter()
            .map(|field| visible_fields(&fields, &values).contains(&field))
            .collect();
        let resolved: Vec<bool> = fields
            .iter()
            .map(|field| resolve(field, &values).visible)
            .collect();

        assert_eq!(visible, resolved);
        assert_eq!(visible, vec![true, true, false]);
    }
}
