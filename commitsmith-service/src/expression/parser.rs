// Expression Engine Parser
// Parses tokens into an AST for when-clause expressions

use crate::expression::lexer::{LexError, Lexer, Token};

use std::fmt;

use thiserror::Error;

/// Abstract Syntax Tree node for expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary operation: a == b, a && b, a in [..], a =~ /re/
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation: !expr
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// String or number literal
    Literal(Literal),

    /// Context lookup by field name
    Identifier(String),

    /// Array literal: ['a', 'b']
    Array(Vec<Expr>),

    /// Regular expression literal: /pattern/flags
    Regex { pattern: String, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not, // !
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Comparison
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=

    // Membership and matching
    In,    // in
    Match, // =~

    // Logical
    And, // &&
    Or,  // ||
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::In => write!(f, "in"),
            BinaryOp::Match => write!(f, "=~"),
            BinaryOp::And => write!(f, "&&"),
            BinaryOp::Or => write!(f, "||"),
        }
    }
}

impl Expr {
    /// Collect every identifier referenced by this expression, in source order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Binary { left, right, .. } => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            }
            Expr::Unary { operand, .. } => operand.collect_identifiers(names),
            Expr::Identifier(name) => names.push(name),
            Expr::Array(items) => items.iter().for_each(|e| e.collect_identifiers(names)),
            Expr::Literal(_) | Expr::Regex { .. } => {}
        }
    }
}

/// Parser error
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at token {position}: {message}")]
pub struct ParseExprError {
    pub message: String,
    /// Index of the offending token
    pub position: usize,
}

/// Deepest AST, and deepest `!`/`(`/`[` nesting, the parser accepts
pub const MAX_DEPTH: usize = 128;

/// A parsed subtree with the height of its AST
type Parsed = Result<(Expr, usize), ParseExprError>;

/// Recursive descent parser for when-clause expressions
pub struct ExprParser {
    tokens: Vec<Token>,
    position: usize,
    nesting: usize,
}

impl ExprParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            nesting: 0,
        }
    }

    /// Lex and parse an expression from source text
    pub fn parse_str(input: &str) -> Result<Expr, SourceError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self::new(tokens).parse()?)
    }

    /// Parse the token stream into an expression
    ///
    /// Input nested deeper than [`MAX_DEPTH`] is rejected so that parsing,
    /// evaluation and drop stay within a bounded stack.
    pub fn parse(&mut self) -> Result<Expr, ParseExprError> {
        let (expr, _) = self.parse_or()?;

        if !self.is_at_end() {
            return Err(self.error(&format!("unexpected token: {}", self.peek())));
        }

        Ok(expr)
    }

    // Precedence (lowest to highest):
    // 1. Or: ||
    // 2. And: &&
    // 3. Comparison, membership, match: == != < <= > >= in =~
    // 4. Unary: !
    // 5. Primary: ( ) [ ] literals identifiers

    fn parse_or(&mut self) -> Parsed {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right)?;
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Parsed {
        let mut left = self.parse_comparison()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_comparison()?;
            left = self.binary(BinaryOp::And, left, right)?;
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Parsed {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::In => BinaryOp::In,
                Token::Match => BinaryOp::Match,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Parsed {
        if self.check(&Token::Not) {
            self.advance();
            self.descend()?;
            let (operand, height) = self.parse_unary()?;
            self.nesting -= 1;

            let height = self.height(height + 1)?;
            return Ok((
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                height,
            ));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Parsed {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                self.descend()?;
                let expr = self.parse_or()?;
                self.nesting -= 1;
                self.expect(&Token::RParen, "expected ')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                self.descend()?;
                let mut items = Vec::new();
                let mut height = 0;

                if !self.check(&Token::RBracket) {
                    let (item, h) = self.parse_primary()?;
                    items.push(item);
                    height = h;

                    while self.check(&Token::Comma) {
                        self.advance();
                        let (item, h) = self.parse_primary()?;
                        items.push(item);
                        height = height.max(h);
                    }
                }

                self.nesting -= 1;
                self.expect(&Token::RBracket, "expected ']'")?;
                let height = self.height(height + 1)?;
                Ok((Expr::Array(items), height))
            }
            Token::Regex(literal) => {
                let (pattern, flags) = split_regex_literal(&literal)
                    .ok_or_else(|| self.error(&format!("invalid regex literal: {}", literal)))?;
                self.advance();
                Ok((Expr::Regex { pattern, flags }, 1))
            }
            Token::String(s) => {
                self.advance();
                Ok((Expr::Literal(Literal::String(s)), 1))
            }
            Token::Number(n) => {
                self.advance();
                Ok((Expr::Literal(Literal::Number(n)), 1))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok((Expr::Identifier(name), 1))
            }
            Token::Eof => Err(self.error("unexpected end of expression")),
            token => Err(self.error(&format!("unexpected token: {}", token))),
        }
    }

    fn binary(&self, op: BinaryOp, left: (Expr, usize), right: (Expr, usize)) -> Parsed {
        let height = self.height(left.1.max(right.1) + 1)?;
        Ok((
            Expr::Binary {
                op,
                left: Box::new(left.0),
                right: Box::new(right.0),
            },
            height,
        ))
    }

    fn descend(&mut self) -> Result<(), ParseExprError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.nesting += 1;
        Ok(())
    }

    fn height(&self, height: usize) -> Result<usize, ParseExprError> {
        if height > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(height)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let token = self.tokens.get(self.position).unwrap_or(&Token::Eof);
        self.position += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token, msg: &str) -> Result<(), ParseExprError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn error(&self, message: &str) -> ParseExprError {
        ParseExprError {
            message: message.to_string(),
            position: self.position,
        }
    }
}

/// Split `/pattern/flags` into its parts; the pattern must be non-empty
fn split_regex_literal(literal: &str) -> Option<(String, String)> {
    let body = literal.strip_prefix('/')?;
    let close = body.rfind('/')?;
    let (pattern, flags) = (&body[..close], &body[close + 1..]);

    if pattern.is_empty() {
        return None;
    }

    Some((pattern.to_string(), flags.to_string()))
}

/// Failure while turning source text into an AST
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseExprError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    fn string(value: &str) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::String(value.to_string())))
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            ExprParser::parse_str("'hello'").unwrap(),
            Expr::Literal(Literal::String("hello".to_string()))
        );
        assert_eq!(
            ExprParser::parse_str("42").unwrap(),
            Expr::Literal(Literal::Number(42.0))
        );
        assert_eq!(
            ExprParser::parse_str("type").unwrap(),
            Expr::Identifier("type".to_string())
        );
    }

    #[test]
    fn test_parse_equality() {
        assert_eq!(
            ExprParser::parse_str("type == 'fix'").unwrap(),
            Expr::Binary {
                op: BinaryOp::Eq,
                left: ident("type"),
                right: string("fix"),
            }
        );
    }

    #[test]
    fn test_parse_operator_precedence() {
        // && should bind tighter than ||
        let expr = ExprParser::parse_str("a || b && c").unwrap();

        if let Expr::Binary {
            op: BinaryOp::Or,
            right,
            ..
        } = expr
        {
            assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::And,
                    ..
                }
            ));
        } else {
            panic!("expected or expression");
        }
    }

    #[test]
    fn test_parse_comparison_binds_tighter_than_and() {
        let expr = ExprParser::parse_str("a == 'x' && b != 'y'").unwrap();

        let Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } = expr
        else {
            panic!("expected and expression");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Eq, .. }));
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Ne, .. }));
    }

    #[test]
    fn test_parse_logical_chains_are_left_associative() {
        let expr = ExprParser::parse_str("a || b || c").unwrap();

        let Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } = expr
        else {
            panic!("expected or expression");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Or, .. }));
        assert_eq!(right, ident("c"));
    }

    #[test]
    fn test_parse_chained_comparison() {
        let expr = ExprParser::parse_str("a < b < c").unwrap();

        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Lt,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Lt,
                    left: ident("a"),
                    right: ident("b"),
                }),
                right: ident("c"),
            }
        );
    }

    #[test]
    fn test_parse_unary_not() {
        let expr = ExprParser::parse_str("!!done").unwrap();

        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: ident("done"),
                }),
            }
        );
    }

    #[test]
    fn test_parse_not_binds_tighter_than_comparison() {
        let expr = ExprParser::parse_str("!a == b").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn test_parse_parentheses() {
        let expr = ExprParser::parse_str("(a || b) && c").unwrap();

        let Expr::Binary {
            op: BinaryOp::And,
            left,
            ..
        } = expr
        else {
            panic!("expected and expression");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Or, .. }));
    }

    #[test]
    fn test_parse_in_array() {
        let expr = ExprParser::parse_str("type in ['feat', 'fix', 1]").unwrap();

        let Expr::Binary {
            op: BinaryOp::In,
            right,
            ..
        } = expr
        else {
            panic!("expected in expression");
        };
        assert_eq!(
            *right,
            Expr::Array(vec![
                Expr::Literal(Literal::String("feat".to_string())),
                Expr::Literal(Literal::String("fix".to_string())),
                Expr::Literal(Literal::Number(1.0)),
            ])
        );
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(
            ExprParser::parse_str("[]").unwrap(),
            Expr::Array(Vec::new())
        );
    }

    #[test]
    fn test_parse_regex_match() {
        let expr = ExprParser::parse_str("issue =~ /fix/i").unwrap();

        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Match,
                left: ident("issue"),
                right: Box::new(Expr::Regex {
                    pattern: "fix".to_string(),
                    flags: "i".to_string(),
                }),
            }
        );
    }

    #[test]
    fn test_parse_empty_regex_is_rejected() {
        assert!(matches!(
            ExprParser::parse_str("a =~ //"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_missing_operand() {
        let err = ExprParser::parse_str("a ==").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert!(err.to_string().contains("unexpected end of expression"));
    }

    #[test]
    fn test_parse_unbalanced_parentheses() {
        assert!(ExprParser::parse_str("(a == 'x'").is_err());
        assert!(ExprParser::parse_str("a == 'x')").is_err());
    }

    #[test]
    fn test_parse_unterminated_array() {
        assert!(ExprParser::parse_str("a in ['x', 'y'").is_err());
        assert!(ExprParser::parse_str("a in ['x',]").is_err());
        assert!(ExprParser::parse_str("a in ['x' 'y']").is_err());
    }

    #[test]
    fn test_parse_array_elements_are_primaries() {
        assert!(ExprParser::parse_str("a in [!b]").is_err());
        assert!(ExprParser::parse_str("a in [(b == c), ['x']]").is_ok());
    }

    #[test]
    fn test_parse_trailing_tokens_are_rejected() {
        assert!(ExprParser::parse_str("a b").is_err());
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(ExprParser::parse_str("").is_err());
    }

    #[test]
    fn test_parse_lex_error_is_reported() {
        assert!(matches!(
            ExprParser::parse_str("a == #"),
            Err(SourceError::Lex(_))
        ));
    }

    #[test]
    fn test_identifiers_in_source_order() {
        let expr = ExprParser::parse_str("issue =~ /x/ && (type == 'fix' || !scope)").unwrap();
        assert_eq!(expr.identifiers(), vec!["issue", "type", "scope"]);
    }

    #[test]
    fn test_parse_rejects_deep_negation() {
        let input = format!("{}a", "!".repeat(100_000));
        let err = ExprParser::parse_str(&input).unwrap_err();
        assert!(
            matches!(&err, SourceError::Parse(e) if e.message == "expression nested too deeply"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_parse_rejects_deep_parentheses_and_arrays() {
        let parens = format!("{}a{}", "(".repeat(50_000), ")".repeat(50_000));
        assert!(ExprParser::parse_str(&parens).is_err());

        let arrays = format!("a in {}'x'{}", "[".repeat(50_000), "]".repeat(50_000));
        assert!(ExprParser::parse_str(&arrays).is_err());
    }

    #[test]
    fn test_parse_rejects_long_operator_chain() {
        let input = vec!["a == 'x'"; 10_000].join(" && ");
        assert!(ExprParser::parse_str(&input).is_err());
    }

    #[test]
    fn test_parse_accepts_nesting_within_limit() {
        let input = format!("{}a", "!".repeat(MAX_DEPTH - 1));
        assert!(ExprParser::parse_str(&input).is_ok());

        let parens = format!("{}a{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(ExprParser::parse_str(&parens).is_ok());
    }
}
