// Expression Engine Lexer
// Tokenizes when-clause expressions: comparisons, logic, membership and regex matches

use std::fmt;

use thiserror::Error;

/// Regex flag characters accepted after the closing delimiter
const REGEX_FLAGS: &str = "gimsuvy";

/// Token types for when-clause expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    /// Full regex literal text, delimiters and flags included: /pattern/flags
    Regex(String),

    // Identifiers
    Identifier(String),

    // Operators
    Eq,    // ==
    Ne,    // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=
    And,   // &&
    Or,    // ||
    Not,   // !
    In,    // in
    Match, // =~

    // Delimiters
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,

    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "'{}'", s),
            Token::Regex(s) => write!(f, "{}", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::In => write!(f, "in"),
            Token::Match => write!(f, "=~"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer error
#[derive(Debug, Clone, PartialEq, Error)]
#[error("lex error at position {position}: {message}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

impl LexError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Lexer for when-clause expressions
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
    /// Last character consumed, whitespace included
    previous: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            position: 0,
            previous: None,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        self.position = pos;

        match ch {
            // A slash only opens a regex when something other than a slash precedes it
            '/' => match self.previous {
                Some(prev) if prev != '/' => self.read_regex(),
                _ => Err(LexError::new("unexpected character: '/'", pos)),
            },

            '"' | '\'' => self.read_string(ch),

            '0'..='9' => Ok(self.read_number()),

            // Two-character operators first
            '=' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::Eq)
                    }
                    Some('~') => {
                        self.advance();
                        Ok(Token::Match)
                    }
                    _ => Err(LexError::new("expected '==' or '=~' operator", pos)),
                }
            }
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Ok(Token::Ne)
                } else {
                    Ok(Token::Not)
                }
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Ok(Token::Le)
                } else {
                    Ok(Token::Lt)
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    Ok(Token::And)
                } else {
                    Err(LexError::new("expected '&&' operator", pos))
                }
            }
            '|' => {
                self.advance();
                if self.peek_char() == Some('|') {
                    self.advance();
                    Ok(Token::Or)
                } else {
                    Err(LexError::new("expected '||' operator", pos))
                }
            }

            // Punctuation
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            ']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }

            'a'..='z' | 'A'..='Z' | '_' => Ok(self.read_identifier()),

            _ => Err(LexError::new(
                format!("unexpected character: '{}'", ch),
                pos,
            )),
        }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, ch)) = next {
            self.previous = Some(ch);
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_regex(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut literal = String::from('/');
        self.advance(); // consume opening slash

        loop {
            match self.advance() {
                Some((_, '\\')) => {
                    literal.push('\\');
                    match self.advance() {
                        Some((_, escaped)) => literal.push(escaped),
                        None => break,
                    }
                }
                Some((_, '/')) => {
                    literal.push('/');
                    while let Some(flag) = self.peek_char().filter(|c| REGEX_FLAGS.contains(*c)) {
                        literal.push(flag);
                        self.advance();
                    }
                    return Ok(Token::Regex(literal));
                }
                Some((_, ch)) => literal.push(ch),
                None => break,
            }
        }

        Err(LexError::new("unterminated regular expression", start))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // consume opening quote

        let mut value = String::new();

        loop {
            match self.advance() {
                // The escaped character cannot close the string; both are kept.
                Some((_, '\\')) => match self.advance() {
                    Some((_, escaped)) => {
                        value.push('\\');
                        value.push(escaped);
                    }
                    None => break,
                },
                Some((_, ch)) if ch == quote => return Ok(Token::String(value)),
                Some((_, ch)) => value.push(ch),
                None => break,
            }
        }

        Err(LexError::new("unterminated string", start))
    }

    fn read_number(&mut self) -> Token {
        let mut digits = String::new();

        while let Some(ch) = self.peek_char().filter(char::is_ascii_digit) {
            digits.push(ch);
            self.advance();
        }

        // A run of ASCII digits always parses; overly long runs saturate to infinity
        Token::Number(digits.parse::<f64>().unwrap_or(f64::INFINITY))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self
            .peek_char()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            ident.push(ch);
            self.advance();
        }

        if ident == "in" {
            Token::In
        } else {
            Token::Identifier(ident)
        }
    }
}
