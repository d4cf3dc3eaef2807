//! Errores del modelo de datos neutral.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("unknown data type tag: {0}")]
    UnknownDataType(String),
    #[error("node {0} has no port named {1}")]
    UnknownPort(String, String),
    #[error("graph document is missing a start node")]
    NoStartNode,
    #[error("malformed graph document: {0}")]
    MalformedGraph(String),
}
