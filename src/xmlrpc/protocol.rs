// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::error::{self, ProtocolError, Result};
use crate::xmlrpc::binding::{FromValue, ToValue};
use crate::xmlrpc::value::{Struct, Value};

pub const MULTICALL_METHOD: &str = "system.multiCall";

/// Anything that serializes as a `<methodCall>`.
pub trait MethodCall {
    fn method_name(&self) -> &str;

    fn params(&self) -> Cow<'_, [Value]>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(method: &str) -> Request {
        Request::with_params(method, Vec::new())
    }

    pub fn with_params(method: &str, params: Vec<Value>) -> Request {
        Request {
            method_name: method.to_string(),
            params,
        }
    }

    /// Appends a parameter, mapping it through the binder.
    pub fn argument<T: ToValue + ?Sized>(mut self, object: &T) -> Request {
        self.params.push(object.to_value());
        self
    }

    /// Binds parameter `idx`; a missing parameter binds from `Null`.
    pub fn param<T: FromValue>(&self, idx: usize) -> Result<T> {
        T::from_value(self.params.get(idx).unwrap_or(&Value::Null))
    }

    /// `"examples.getStateName"` splits into `("examples", "getStateName")`;
    /// a name without a dot is returned for both halves.
    pub fn split_name(&self) -> (&str, &str) {
        match self.method_name.split_once('.') {
            Some((object, method)) => (object, method),
            None => (&self.method_name, &self.method_name),
        }
    }

    pub fn object_name(&self) -> &str {
        self.split_name().0
    }

    pub fn method(&self) -> &str {
        self.split_name().1
    }
}

impl MethodCall for Request {
    fn method_name(&self) -> &str {
        &self.method_name
    }

    fn params(&self) -> Cow<'_, [Value]> {
        Cow::Borrowed(&self.params)
    }
}

/// Batches several calls into one `system.multiCall`.
///
/// The parameter list is rebuilt from the children on every read, so calls
/// appended after a read show up on the next one.
#[derive(Default)]
pub struct BoxcarRequest {
    calls: Vec<Box<dyn MethodCall + Send + Sync>>,
}

impl BoxcarRequest {
    pub fn new() -> BoxcarRequest {
        BoxcarRequest::default()
    }

    pub fn push<C>(&mut self, call: C)
    where
        C: MethodCall + Send + Sync + 'static,
    {
        self.calls.push(Box::new(call));
    }

    pub fn call<C>(mut self, call: C) -> BoxcarRequest
    where
        C: MethodCall + Send + Sync + 'static,
    {
        self.push(call);
        self
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl MethodCall for BoxcarRequest {
    fn method_name(&self) -> &str {
        MULTICALL_METHOD
    }

    fn params(&self) -> Cow<'_, [Value]> {
        let calls = self
            .calls
            .iter()
            .map(|call| {
                let mut entry = Struct::new();
                entry.insert("methodName".to_string(), Value::from(call.method_name()));
                entry.insert("params".to_string(), Value::Array(call.params().into_owned()));
                Value::Struct(entry)
            })
            .collect();
        Cow::Owned(calls)
    }
}

impl fmt::Debug for BoxcarRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self.calls.iter().map(|c| c.method_name()).collect();
        f.debug_struct("BoxcarRequest").field("calls", &names).finish()
    }
}

/// An XML-RPC fault: `{faultCode, faultString}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("XML-RPC fault {code}: {message}")]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    pub fn new(code: i32, message: impl Into<String>) -> Fault {
        Fault {
            code,
            message: message.into(),
        }
    }

    /// Fault describing a local failure, coded as [`error::Error::fault_code`] does.
    pub fn from_error(err: &error::Error) -> Fault {
        match *err {
            error::Error::Fault(ref fault) => fault.clone(),
            ref other => Fault::new(other.fault_code(), other.to_string()),
        }
    }

    /// Reads the `<fault>` payload.
    pub fn from_value(value: &Value) -> ::std::result::Result<Fault, ProtocolError> {
        let map = value.as_struct().ok_or_else(|| {
            ProtocolError::grammar(format!("fault value is a {}, not a struct", value.type_name()))
        })?;

        let code = match map.get("faultCode") {
            Some(Value::Integer(code)) => *code,
            Some(Value::String(text)) => text.trim().parse().map_err(|_| {
                ProtocolError::grammar(format!("faultCode {:?} is not an integer", text))
            })?,
            Some(other) => {
                return Err(ProtocolError::grammar(format!(
                    "faultCode is a {}, not an int",
                    other.type_name()
                )))
            }
            None => return Err(ProtocolError::grammar("fault without faultCode")),
        };
        let message = match map.get("faultString") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(Fault { code, message })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Struct::new();
        map.insert("faultCode".to_string(), Value::Integer(self.code));
        map.insert("faultString".to_string(), Value::from(self.message.as_str()));
        Value::Struct(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Fault(Fault),
}

impl Response {
    pub fn success<T: ToValue + ?Sized>(object: &T) -> Response {
        Response::Success(object.to_value())
    }

    pub fn fault(code: i32, message: impl Into<String>) -> Response {
        Response::Fault(Fault::new(code, message))
    }

    pub fn is_fault(&self) -> bool {
        matches!(*self, Response::Fault(_))
    }

    pub fn fault_code(&self) -> Option<i32> {
        match *self {
            Response::Fault(ref fault) => Some(fault.code),
            Response::Success(_) => None,
        }
    }

    pub fn fault_string(&self) -> Option<&str> {
        match *self {
            Response::Fault(ref fault) => Some(&fault.message),
            Response::Success(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match *self {
            Response::Success(ref value) => Some(value),
            Response::Fault(_) => None,
        }
    }

    /// Binds the result value, or returns the fault as an error.
    pub fn result<T: FromValue>(&self) -> Result<T> {
        match *self {
            Response::Success(ref value) => T::from_value(value),
            Response::Fault(ref fault) => Err(fault.clone().into()),
        }
    }
}
