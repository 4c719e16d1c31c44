//! Error taxonomy shared by loaders and generators.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A position in a notation source file (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Option<Arc<str>>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: Option<Arc<str>>, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

fn at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!("{}: ", loc),
        None => String::new(),
    }
}

/// Malformed token or grammar in notation source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct SyntaxError {
    pub location: Location,
    pub message: String,
}

impl SyntaxError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Violations of the model's structural invariants or unresolvable references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("{}duplicate {kind} name `{name}` in {scope}", at(.location))]
    DuplicateName {
        kind: &'static str,
        name: String,
        scope: String,
        location: Option<Location>,
    },

    #[error("{}duplicate {kind} number {number} in {scope}", at(.location))]
    DuplicateNumber {
        kind: &'static str,
        number: u32,
        scope: String,
        location: Option<Location>,
    },

    #[error("{}{kind} `{name}` must have a positive number", at(.location))]
    NonPositiveNumber {
        kind: &'static str,
        name: String,
        location: Option<Location>,
    },

    #[error("{}unresolved type reference `{reference}` in {scope}", at(.location))]
    UnresolvedType {
        reference: String,
        scope: String,
        location: Option<Location>,
    },

    #[error("{}unresolved error reference `{reference}` in {scope}", at(.location))]
    UnresolvedError {
        reference: String,
        scope: String,
        location: Option<Location>,
    },

    #[error("{}composite `{composite}` has an inconsistent discriminant: {reason}", at(.location))]
    InconsistentDiscriminant {
        composite: String,
        reason: String,
        location: Option<Location>,
    },

    #[error("{}{kind} `{name}` cannot be declared in {scope}", at(.location))]
    MisplacedType {
        kind: &'static str,
        name: String,
        scope: String,
        location: Option<Location>,
    },

    #[error("{}invalid reference `{reference}`: {reason}", at(.location))]
    InvalidReference {
        reference: String,
        reason: String,
        location: Option<Location>,
    },
}

impl SemanticError {
    pub fn location(&self) -> Option<&Location> {
        match self {
            SemanticError::DuplicateName { location, .. }
            | SemanticError::DuplicateNumber { location, .. }
            | SemanticError::NonPositiveNumber { location, .. }
            | SemanticError::UnresolvedType { location, .. }
            | SemanticError::UnresolvedError { location, .. }
            | SemanticError::InconsistentDiscriminant { location, .. }
            | SemanticError::MisplacedType { location, .. }
            | SemanticError::InvalidReference { location, .. } => location.as_ref(),
        }
    }
}

/// Failure of the notation front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at {0}")]
    Syntax(#[from] SyntaxError),

    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
}

impl ParseError {
    pub fn location(&self) -> Option<&Location> {
        match self {
            ParseError::Syntax(err) => Some(&err.location),
            ParseError::Semantic(err) => err.location(),
        }
    }
}

/// A referenced type cannot be mapped during schema synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot map type `{reference}` used by {context}: not declared in the compilation unit")]
pub struct SchemaMappingError {
    pub reference: String,
    pub context: String,
}

/// Canonical-format decode/encode failure.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed canonical document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonical document violates model invariants: {0}")]
    Invalid(#[from] SemanticError),
}

#[derive(Debug, Error)]
pub enum MosdlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    SchemaMapping(#[from] SchemaMappingError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no loader found for the supplied input")]
    NoLoader,
}

impl From<SyntaxError> for MosdlError {
    fn from(err: SyntaxError) -> Self {
        MosdlError::Parse(err.into())
    }
}

impl From<SemanticError> for MosdlError {
    fn from(err: SemanticError) -> Self {
        MosdlError::Parse(err.into())
    }
}

pub type Result<T, E = MosdlError> = std::result::Result<T, E>;
