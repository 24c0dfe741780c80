//! FM-000: Crate-wide error taxonomy.

use std::fmt;
use thiserror::Error;

/// What kind of declared item a lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Query,
    Action,
    DataTable,
    Form,
    Mapping,
    /// A section of a mock bundle (backend info, frontend elements, mapping list).
    MockEntry,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Action => write!(f, "action"),
            Self::DataTable => write!(f, "data table"),
            Self::Form => write!(f, "form"),
            Self::Mapping => write!(f, "mapping"),
            Self::MockEntry => write!(f, "mock entry"),
        }
    }
}

/// All errors surfaced by the compiler, the runtime and the gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed root, unreadable markup, or a strict-mode violation.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reference to an unknown id. Rendering-time lookups return `None` instead.
    #[error("{kind} '{id}' not found")]
    Lookup { kind: LookupKind, id: String },

    /// A failed backend call.
    #[error("backend error: {0}")]
    Backend(String),

    /// Invalid runtime configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn lookup(kind: LookupKind, id: impl Into<String>) -> Self {
        Self::Lookup {
            kind,
            id: id.into(),
        }
    }

    /// Stable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "ERR_PARSE",
            Self::Lookup { .. } => "ERR_LOOKUP",
            Self::Backend(_) => "ERR_BACKEND",
            Self::Config(_) => "ERR_CONFIG",
            Self::Io(_) => "ERR_IO",
            Self::Yaml(_) => "ERR_YAML",
            Self::Json(_) => "ERR_JSON",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
