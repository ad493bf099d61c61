// Expression Engine Module
// When-clause support: comparisons, &&, ||, !, `in` membership and `=~` regex matches

pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use evaluator::{ContextValue, EvalError, Evaluator, ExpressionContext, Value};
pub use lexer::{LexError, Lexer, Token};
pub use parser::{BinaryOp, Expr, ExprParser, Literal, ParseExprError, SourceError, UnaryOp};

use thiserror::Error;

/// Any failure while lexing, parsing or evaluating a when-clause
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseExprError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<SourceError> for ExpressionError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Lex(e) => ExpressionError::Lex(e),
            SourceError::Parse(e) => ExpressionError::Parse(e),
        }
    }
}

/// A parsed when-clause.
///
/// Used by validation tooling to inspect an expression without evaluating it.
/// Gating decisions go through [`evaluate_when_clause`], which parses afresh on
/// every call.
#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    source: String,
    ast: Expr,
}

impl WhenClause {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let ast = ExprParser::parse_str(source)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Names the expression looks up in its context
    pub fn identifiers(&self) -> Vec<&str> {
        self.ast.identifiers()
    }

    pub fn evaluate(&self, context: &ExpressionContext) -> Result<bool, ExpressionError> {
        Ok(Evaluator::new(context).evaluate(&self.ast)?)
    }
}

/// Lex, parse and evaluate `expression`, reporting the first failure
pub fn try_evaluate_when_clause(
    expression: &str,
    context: &ExpressionContext,
) -> Result<bool, ExpressionError> {
    let tokens = Lexer::new(expression).tokenize()?;
    let ast = ExprParser::new(tokens).parse()?;
    Ok(Evaluator::new(context).evaluate(&ast)?)
}

/// Evaluate a when-clause, failing closed.
///
/// Every lexical, syntactic or semantic error yields `false`; nothing is ever
/// propagated to the caller. Empty and malformed expressions are therefore
/// indistinguishable from ones that evaluate to `false`.
pub fn evaluate_when_clause(expression: &str, context: &ExpressionContext) -> bool {
    try_evaluate_when_clause(expression, context).unwrap_or_else(|err| {
        tracing::debug!(expression, error = %err, "when-clause failed closed");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_and_logic() {
        let ctx = ExpressionContext::new().with("a", "x");
        assert!(evaluate_when_clause("a == 'x' && a != 'y'", &ctx));
    }

    #[test]
    fn test_in_operator() {
        assert!(evaluate_when_clause(
            "a in ['x','y']",
            &ExpressionContext::new().with("a", "y")
        ));
        assert!(!evaluate_when_clause(
            "a in ['x','y']",
            &ExpressionContext::new().with("a", "z")
        ));
    }

    #[test]
    fn test_case_insensitive_regex() {
        let ctx = ExpressionContext::new().with("a", "HotFix");
        assert!(evaluate_when_clause("a =~ /fix/i", &ctx));
    }

    #[test]
    fn test_malformed_expression_fails_closed() {
        let ctx = ExpressionContext::new().with("a", "x");

        assert!(!evaluate_when_clause("a ==", &ctx));
        assert!(matches!(
            try_evaluate_when_clause("a ==", &ctx),
            Err(ExpressionError::Parse(_))
        ));
    }

    #[test]
    fn test_deeply_nested_expression_fails_closed() {
        let ctx = ExpressionContext::new().with("a", "x");

        let negations = format!("{}a", "!".repeat(100_000));
        assert!(!evaluate_when_clause(&negations, &ctx));

        let parens = format!("{}a == 'x'{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(!evaluate_when_clause(&parens, &ctx));

        let chain = vec!["a == 'x'"; 50_000].join(" && ");
        assert!(!evaluate_when_clause(&chain, &ctx));
        assert!(matches!(
            try_evaluate_when_clause(&chain, &ctx),
            Err(ExpressionError::Parse(_))
        ));
    }

    #[test]
    fn test_every_error_class_fails_closed() {
        let ctx = ExpressionContext::new().with("a", "x");

        // lexical
        assert!(!evaluate_when_clause("a == @", &ctx));
        assert!(matches!(
            try_evaluate_when_clause("a == @", &ctx),
            Err(ExpressionError::Lex(_))
        ));

        // syntactic
        assert!(!evaluate_when_clause("(a == 'x'", &ctx));

        // semantic
        assert!(!evaluate_when_clause("a in 'x'", &ctx));
        assert!(matches!(
            try_evaluate_when_clause("a =~ 'x'", &ctx),
            Err(ExpressionError::Eval(_))
        ));
    }

    #[test]
    fn test_empty_expression_is_false() {
        let ctx = ExpressionContext::new().with("a", "x");

        assert!(!evaluate_when_clause("", &ctx));
        assert!(!evaluate_when_clause("   ", &ctx));
    }

    #[test]
    fn test_negated_error_still_fails_closed() {
        // A broken operand must not flip to true through negation
        let ctx = ExpressionContext::new().with("a", "x");
        assert!(!evaluate_when_clause("!(a in 'x')", &ctx));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let ctx = ExpressionContext::new().with("a", "HotFix");
        let first = evaluate_when_clause("a =~ /fix/i || a == 'x'", &ctx);
        for _ in 0..10 {
            assert_eq!(evaluate_when_clause("a =~ /fix/i || a == 'x'", &ctx), first);
        }
    }

    #[test]
    fn test_when_clause_exposes_identifiers() {
        let clause = WhenClause::parse("issue =~ /feedback/ && type == 'fix'").unwrap();

        assert_eq!(clause.source(), "issue =~ /feedback/ && type == 'fix'");
        assert_eq!(clause.identifiers(), vec!["issue", "type"]);

        let ctx = ExpressionContext::new()
            .with("issue", "customer feedback")
            .with("type", "fix");
        assert_eq!(clause.evaluate(&ctx), Ok(true));
    }

    #[test]
    fn test_when_clause_parse_errors() {
        assert!(matches!(
            WhenClause::parse("a == #"),
            Err(ExpressionError::Lex(_))
        ));
        assert!(matches!(
            WhenClause::parse("a =="),
            Err(ExpressionError::Parse(_))
        ));
    }
}
