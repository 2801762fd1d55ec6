//! XML-RPC protocol engine.
//!
//! Encodes and decodes `methodCall` / `methodResponse` documents, maps the
//! resulting [`Value`] trees onto application types and batches calls into
//! `system.multiCall` boxcars.
//!
//! ```
//! use xmlrpc_core::{Codec, Request, Value};
//!
//! let codec = Codec::default();
//! let xml = codec.encode_request(&Request::new("examples.getStateName").argument(&41)).unwrap();
//!
//! let request = codec.decode_request(xml.as_bytes()).unwrap();
//! assert_eq!("examples.getStateName", request.method_name);
//! assert_eq!(vec![Value::Integer(41)], request.params);
//! ```
//!
//! Parsing is bounded by [`Settings`]: element depth, node count, document
//! size and entity expansion are all capped, and DTDs are refused unless
//! explicitly allowed.

pub mod config;
pub mod error;
pub mod logging;
pub mod xmlrpc;

pub use crate::config::Settings;
pub use crate::error::{Error, Limit, ProtocolError, Result};
pub use crate::logging::{LogFacade, LogSink, NullSink};
pub use crate::xmlrpc::{
    map_from, map_to, Bind, BoxcarRequest, Bytes, CaseInsensitiveMap, Client, Codec, Deserializer,
    Fault, FromValue, HttpTransport, MethodCall, Name, Request, Response, Serializer, ToValue,
    Transport, TypeBinding, Value,
};
