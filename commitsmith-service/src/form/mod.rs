// Form module
// Field definitions, YAML/JSON loading and semantic validation

pub mod error;
pub mod models;
pub mod parser;
pub mod validate;

pub use error::{ParseError, ParseErrorKind, ParseResult, ValidationError};
pub use models::*;
pub use parser::FormParser;
pub use validate::FormValidator;
