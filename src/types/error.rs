use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;

/// Source position of an offending expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Failures while statically evaluating style expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("{location}: expression is not statically analyzable: {reason}")]
    UnresolvableExpression { location: Location, reason: String },

    #[error("cannot load module '{specifier}' imported from {}: {message}", importer.display())]
    ModuleLoad {
        specifier: String,
        importer: PathBuf,
        message: String,
    },

    #[error("in {}: {error}", file.display())]
    Parse { file: PathBuf, error: ParseError },
}

impl ResolveError {
    /// The reported location, when the error points at an expression.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            ResolveError::UnresolvableExpression { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Failures while flattening a resolved style object into declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("style must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("value of '{property}' must be a string or number, found {found}")]
    InvalidValue {
        property: String,
        found: &'static str,
    },

    #[error("empty selector in nested key '{key}'")]
    EmptySelector { key: String },
}

/// A declaration reached rule generation in a non-canonical shape. Always an
/// internal bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("declaration property '{0}' is not canonical")]
    NonCanonicalProperty(String),

    #[error("declaration value '{value}' of '{property}' is not canonical")]
    NonCanonicalValue { property: String, value: String },

    #[error("selector '{0}' does not reference the rule's class")]
    SelectorWithoutClass(String),

    #[error("at-rule '{0}' does not start with '@'")]
    InvalidAtRule(String),

    #[error("rule for class '{class_name}' does not match its declaration")]
    RuleMismatch { class_name: String },
}

/// Failures of the extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error(
        "'{}' is not inside the configured source directory '{}'",
        file.display(),
        source_dir.display()
    )]
    OutsideSourceDirectory { file: PathBuf, source_dir: PathBuf },

    #[error("{location}: style sheet reference '{name}' cannot be traced to a removable binding")]
    UntraceableSheet { location: Location, name: String },

    #[error("{location}: style island {detail}")]
    MalformedIsland {
        location: Location,
        detail: &'static str,
    },
}

/// Invalid or conflicting options, raised before any file is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("styleSheetPath and extractStylesToDirectory cannot both be set")]
    ConflictingEmission,

    #[error("extractStylesToDirectory.{field} must not be empty")]
    EmptyDirectory { field: &'static str },

    #[error("importSources must list at least one module")]
    NoImportSources,

    #[error("runtime module '{0}' cannot also be an import source")]
    RuntimeIsImportSource(String),

    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
}
