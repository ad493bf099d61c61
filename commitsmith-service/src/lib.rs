// Commitsmith Service Library
// When-clause evaluation, conditional field resolution and commit message compilation

pub mod config;
pub mod error;
pub mod expression;
pub mod form;
pub mod options;
pub mod resolution;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};

pub use config::{LogLevel, Settings, SettingsError};

// Re-export expression types
pub use expression::{
    evaluate_when_clause, try_evaluate_when_clause, ContextValue, ExpressionContext,
    ExpressionError, WhenClause,
};

// Re-export form types
pub use form::{
    DependsOn, EnumOption, Field, FieldKind, FieldValue, FieldValues, FormDefinition, FormParser,
    FormValidator, ParseError, ParseErrorKind, RawInput, ValidationError,
};

pub use options::{
    LoadOptionsRequest, LoadOptionsResponse, OptionsContext, OptionsLoader, OptionsProvider,
    ProviderError, ProviderRegistry,
};
pub use resolution::{gate, resolve, visible_fields, Resolution};
pub use template::TemplateCompiler;
