// Expression Engine Evaluator
// Walks a when-clause AST against a context of field values

use crate::expression::parser::{BinaryOp, Expr, Literal, UnaryOp};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Evaluation error
#[derive(Debug, Clone, PartialEq, Error)]
#[error("evaluation error: {message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A value bound to a name in the evaluation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for ContextValue {
    fn default() -> Self {
        ContextValue::Single(String::new())
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Single(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Single(s)
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(items: Vec<String>) -> Self {
        ContextValue::Multiple(items)
    }
}

impl From<&[&str]> for ContextValue {
    fn from(items: &[&str]) -> Self {
        ContextValue::Multiple(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Context for expression evaluation: field name to current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionContext {
    values: HashMap<String, ContextValue>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<ContextValue>> FromIterator<(K, V)> for ExpressionContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (name, value) in iter {
            ctx.insert(name, value);
        }
        ctx
    }
}

/// A resolved operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Name absent from the context
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
}

impl From<&ContextValue> for Value {
    fn from(value: &ContextValue) -> Self {
        match value {
            ContextValue::Single(s) => Value::String(s.clone()),
            ContextValue::Multiple(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
        }
    }

    /// Strict equality: no coercion between kinds
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            _ => false,
        }
    }

    /// Numeric view used by ordering comparisons; NaN when not convertible
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.as_string()),
        }
    }

    /// String view used by regex matching and array flattening
    pub fn as_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined => String::new(),
                    other => other.as_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            other => write!(f, "{}", other.as_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Numeric value of a string, following JavaScript's `Number()`: trimmed
/// decimal literals, unsigned `0x`/`0o`/`0b` integers and `Infinity`.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return radix_to_number(digits, radix);
        }
    }

    // Reject forms Rust accepts but decimal literals do not ("inf", "nan")
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn radix_to_number(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }

    digits
        .chars()
        .try_fold(0.0, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Expression evaluator
pub struct Evaluator<'a> {
    context: &'a ExpressionContext,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a ExpressionContext) -> Self {
        Self { context }
    }

    /// Evaluate an expression as a boolean predicate
    pub fn evaluate(&self, expr: &Expr) -> Result<bool, EvalError> {
        match expr {
            Expr::Binary { op, left, right } => match op {
                // Short-circuit, operands evaluated as predicates
                BinaryOp::And => Ok(self.evaluate(left)? && self.evaluate(right)?),
                BinaryOp::Or => Ok(self.evaluate(left)? || self.evaluate(right)?),
                BinaryOp::Match => self.eval_match(left, right),
                BinaryOp::In => {
                    let needle = self.evaluate_value(left)?;
                    match self.evaluate_value(right)? {
                        Value::Array(items) => Ok(items.iter().any(|item| item.strict_eq(&needle))),
                        other => Err(EvalError::new(format!(
                            "right operand of 'in' must be an array, found {}",
                            other
                        ))),
                    }
                }
                _ => {
                    let left_val = self.evaluate_value(left)?;
                    let right_val = self.evaluate_value(right)?;
                    Ok(self.eval_comparison(*op, &left_val, &right_val))
                }
            },

            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(!self.evaluate(operand)?),

            other => Ok(self.evaluate_value(other)?.is_truthy()),
        }
    }

    /// Resolve an operand to a value
    pub fn evaluate_value(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
            Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),

            Expr::Identifier(name) => Ok(self
                .context
                .get(name)
                .map(Value::from)
                .unwrap_or(Value::Undefined)),

            Expr::Array(items) => {
                let values: Result<Vec<Value>, EvalError> =
                    items.iter().map(|e| self.evaluate_value(e)).collect();
                Ok(Value::Array(values?))
            }

            Expr::Binary { .. } | Expr::Unary { .. } => Ok(Value::Bool(self.evaluate(expr)?)),

            Expr::Regex { pattern, flags } => Err(EvalError::new(format!(
                "regular expression /{}/{} is only valid as the right operand of '=~'",
                pattern, flags
            ))),
        }
    }

    fn eval_match(&self, left: &Expr, right: &Expr) -> Result<bool, EvalError> {
        let Expr::Regex { pattern, flags } = right else {
            return Err(EvalError::new(
                "right operand of '=~' must be a regular expression literal",
            ));
        };

        let subject = self.evaluate_value(left)?.as_string();
        let regex = build_regex(pattern, flags)?;
        Ok(regex.is_match(&subject))
    }

    fn eval_comparison(&self, op: BinaryOp, left: &Value, right: &Value) -> bool {
        match op {
            BinaryOp::Eq => left.strict_eq(right),
            BinaryOp::Ne => !left.strict_eq(right),
            BinaryOp::Lt => matches!(compare(left, right), Some(Ordering::Less)),
            BinaryOp::Le => matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            BinaryOp::Gt => matches!(compare(left, right), Some(Ordering::Greater)),
            BinaryOp::Ge => matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            // Dispatched in evaluate()
            BinaryOp::And | BinaryOp::Or | BinaryOp::In | BinaryOp::Match => {
                unreachable!("handled in evaluate()")
            }
        }
    }
}

/// Relational ordering: strings compare lexicographically, everything else numerically.
/// `None` means the operands are unordered (a NaN was involved).
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let flatten = |v: &Value| match v {
        Value::Array(_) => Value::String(v.as_string()),
        other => other.clone(),
    };

    match (flatten(left), flatten(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Build a regex from a literal's pattern and flag characters
fn build_regex(pattern: &str, flags: &str) -> Result<Regex, EvalError> {
    let mut seen = String::new();
    for flag in flags.chars() {
        if seen.contains(flag) {
            return Err(EvalError::new(format!("duplicate regex flag '{}'", flag)));
        }
        seen.push(flag);
    }

    if seen.contains('u') && seen.contains('v') {
        return Err(EvalError::new("regex flags 'u' and 'v' are mutually exclusive"));
    }

    // Sticky matching starts at the beginning of the subject
    let source = if seen.contains('y') {
        format!(r"\A(?:{})", pattern)
    } else {
        pattern.to_string()
    };

    RegexBuilder::new(&source)
        .case_insensitive(seen.contains('i'))
        .multi_line(seen.contains('m'))
        .dot_matches_new_line(seen.contains('s'))
        .build()
        .map_err(|e| EvalError::new(format!("invalid regular expression /{}/: {}", pattern, e)))
}
