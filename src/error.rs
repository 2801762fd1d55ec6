use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::xmlrpc::protocol::Fault;
use crate::xmlrpc::value::Value;

/// Fault code reported for documents that could not be parsed.
pub const PARSE_ERROR_CODE: i32 = -32700;

/// Fault code reported for transport failures.
pub const TRANSPORT_ERROR_CODE: i32 = -32000;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The bytes were not a valid XML-RPC document, or a parser limit was hit.
    #[error("XML-RPC protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the underlying stream (or HTTP exchange) failed.
    #[error("XML-RPC transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A value could not be coerced into the requested Rust type.
    #[error("cannot bind {source_type} to {target_type}: {reason}")]
    Binding {
        source_type: &'static str,
        target_type: &'static str,
        reason: String,
    },

    /// The server answered with a well-formed fault.
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl Error {
    pub fn transport<E>(message: impl Into<String>, source: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn binding(source: &Value, target_type: &'static str, reason: impl Into<String>) -> Error {
        Error::Binding {
            source_type: source.type_name(),
            target_type,
            reason: reason.into(),
        }
    }

    /// Scalar coercion failure.
    pub fn cast<T>(source: &Value) -> Error {
        Error::binding(source, std::any::type_name::<T>(), "value cannot be cast")
    }

    pub fn is_binding(&self) -> bool {
        matches!(*self, Error::Binding { .. })
    }

    /// Code to report when this error is turned into a fault response.
    pub fn fault_code(&self) -> i32 {
        match *self {
            Error::Protocol(_) | Error::Binding { .. } => PARSE_ERROR_CODE,
            Error::Transport { .. } => TRANSPORT_ERROR_CODE,
            Error::Fault(ref fault) => fault.code,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::transport("stream I/O failed", err)
    }
}

impl From<xml::writer::Error> for Error {
    fn from(err: xml::writer::Error) -> Error {
        Error::transport("writing XML failed", err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::transport("HTTP exchange failed", err)
    }
}

/// Which configured limit a document breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Depth,
    NodeCount,
    DocumentChars,
    EntityChars,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Limit::Depth => "element depth",
            Limit::NodeCount => "node count",
            Limit::DocumentChars => "document size",
            Limit::EntityChars => "entity expansion size",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed XML: {0}")]
    Xml(#[from] xml::reader::Error),

    #[error("{0}")]
    Grammar(String),

    #[error("{limit} exceeded maximum of {max}")]
    LimitExceeded { limit: Limit, max: u64 },

    #[error("DTD processing is prohibited")]
    DtdProhibited,
}

impl ProtocolError {
    pub fn grammar(message: impl Into<String>) -> ProtocolError {
        ProtocolError::Grammar(message.into())
    }

    pub fn limit(limit: Limit, max: u64) -> ProtocolError {
        ProtocolError::LimitExceeded { limit, max }
    }
}
