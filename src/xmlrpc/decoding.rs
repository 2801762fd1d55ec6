// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Wire deserializer.
//!
//! The parser is a flat state machine driven token by token: opening an
//! `<array>` or `<struct>` pushes the enclosing container and pending member
//! name on an explicit stack, closing it pops them again. Nesting in the input
//! therefore never grows the native call stack, and the depth limit is exact.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::Settings;
use crate::error::{Limit, ProtocolError, Result};
use crate::logging::{self, LogSink};
use crate::xmlrpc::protocol::{Fault, Request, Response};
use crate::xmlrpc::reader::{BoundedReader, Token};
use crate::xmlrpc::value::{self, Array, Struct, Value};

/// Elements of the XML-RPC grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tag {
    MethodCall,
    MethodResponse,
    MethodName,
    Params,
    Param,
    Fault,
    Value,
    Array,
    Data,
    Struct,
    Member,
    Name,
    String,
    Int,
    I4,
    Boolean,
    Double,
    DateTime,
    Base64,
    Nil,
}

impl Tag {
    pub(crate) fn from_name(name: &str) -> Option<Tag> {
        let tag = match name {
            "methodCall" => Tag::MethodCall,
            "methodResponse" => Tag::MethodResponse,
            "methodName" => Tag::MethodName,
            "params" => Tag::Params,
            "param" => Tag::Param,
            "fault" => Tag::Fault,
            "value" => Tag::Value,
            "array" => Tag::Array,
            "data" => Tag::Data,
            "struct" => Tag::Struct,
            "member" => Tag::Member,
            "name" => Tag::Name,
            "string" => Tag::String,
            "int" => Tag::Int,
            "i4" => Tag::I4,
            "boolean" => Tag::Boolean,
            "double" => Tag::Double,
            "dateTime.iso8601" => Tag::DateTime,
            "base64" => Tag::Base64,
            "nil" => Tag::Nil,
            _ => return None,
        };
        Some(tag)
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Tag::MethodCall => "methodCall",
            Tag::MethodResponse => "methodResponse",
            Tag::MethodName => "methodName",
            Tag::Params => "params",
            Tag::Param => "param",
            Tag::Fault => "fault",
            Tag::Value => "value",
            Tag::Array => "array",
            Tag::Data => "data",
            Tag::Struct => "struct",
            Tag::Member => "member",
            Tag::Name => "name",
            Tag::String => "string",
            Tag::Int => "int",
            Tag::I4 => "i4",
            Tag::Boolean => "boolean",
            Tag::Double => "double",
            Tag::DateTime => "dateTime.iso8601",
            Tag::Base64 => "base64",
            Tag::Nil => "nil",
        }
    }

    fn is_typed(self) -> bool {
        matches!(
            self,
            Tag::String
                | Tag::Int
                | Tag::I4
                | Tag::Boolean
                | Tag::Double
                | Tag::DateTime
                | Tag::Base64
                | Tag::Nil
                | Tag::Array
                | Tag::Struct
        )
    }

    fn holds_text(self) -> bool {
        matches!(self, Tag::MethodName | Tag::Name | Tag::Value)
            || (self.is_typed() && !self.is_container())
    }

    fn is_container(self) -> bool {
        matches!(self, Tag::Array | Tag::Struct)
    }

    fn allowed_in(self, parent: Option<Tag>) -> bool {
        match self {
            Tag::MethodCall | Tag::MethodResponse => parent.is_none(),
            Tag::MethodName => parent == Some(Tag::MethodCall),
            Tag::Params => matches!(parent, Some(Tag::MethodCall) | Some(Tag::MethodResponse)),
            Tag::Fault => parent == Some(Tag::MethodResponse),
            Tag::Param => parent == Some(Tag::Params),
            // Some toolkits leave out <data> inside <array>.
            Tag::Value => matches!(
                parent,
                Some(Tag::Param)
                    | Some(Tag::Data)
                    | Some(Tag::Array)
                    | Some(Tag::Member)
                    | Some(Tag::Fault)
            ),
            Tag::Data => parent == Some(Tag::Array),
            Tag::Member => parent == Some(Tag::Struct),
            Tag::Name => parent == Some(Tag::Member),
            _ => parent == Some(Tag::Value),
        }
    }
}

enum Container {
    Array(Array),
    Struct(Struct),
}

impl Container {
    fn into_value(self) -> Value {
        match self {
            Container::Array(list) => Value::Array(list),
            Container::Struct(map) => Value::Struct(map),
        }
    }
}

/// Saved context of the enclosing array or struct.
struct Frame {
    container: Option<Container>,
    name: Option<String>,
}

fn is_blank(text: &Option<String>) -> bool {
    text.as_ref().map_or(true, |t| t.trim().is_empty())
}

fn reject<T>(message: String) -> ::std::result::Result<T, ProtocolError> {
    Err(ProtocolError::Grammar(message))
}

/// Per-document parse state.
#[derive(Default)]
struct Machine {
    max_depth: usize,
    path: Vec<Tag>,
    container: Option<Container>,
    stack: Vec<Frame>,
    name: Option<String>,
    text: Option<String>,
    value: Option<Value>,
}

type Step<T> = ::std::result::Result<T, ProtocolError>;

impl Machine {
    fn new(max_depth: usize) -> Machine {
        Machine {
            max_depth,
            ..Machine::default()
        }
    }

    fn depth(&self) -> usize {
        self.path.len()
    }

    fn take_text(&mut self) -> String {
        self.text.take().unwrap_or_default()
    }

    fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    fn open(&mut self, name: &str) -> Step<Tag> {
        let tag = match Tag::from_name(name) {
            Some(tag) => tag,
            None => return reject(format!("unexpected element <{}>", name)),
        };
        let parent = self.path.last().copied();
        if !tag.allowed_in(parent) {
            return match parent {
                Some(parent) => {
                    reject(format!("<{}> is not allowed inside <{}>", name, parent.name()))
                }
                None => reject(format!("<{}> cannot be the document root", name)),
            };
        }

        if tag.is_typed() {
            if self.value.is_some() {
                return reject(format!("<value> holds more than one element (found <{}>)", name));
            }
            if !is_blank(&self.text) {
                return reject("<value> mixes text and elements".to_string());
            }
        }

        if tag == Tag::Value && self.value.is_some() {
            let parent = parent.map_or("document", Tag::name);
            return reject(format!("<{}> holds more than one <value>", parent));
        }

        match tag {
            Tag::Array => self.push(Container::Array(Array::new()))?,
            Tag::Struct => self.push(Container::Struct(Struct::new()))?,
            _ => {}
        }
        self.text = None;
        self.path.push(tag);
        Ok(tag)
    }

    /// Opens `name`, requiring `root` when it is the document element.
    fn open_in(&mut self, name: &str, root: Tag) -> Step<Tag> {
        let tag = self.open(name)?;
        if self.depth() == 1 && tag != root {
            return reject(format!("expected <{}> but found <{}>", root.name(), name));
        }
        Ok(tag)
    }

    fn push(&mut self, container: Container) -> Step<()> {
        if self.stack.len() >= self.max_depth {
            return Err(ProtocolError::limit(Limit::Depth, self.max_depth as u64));
        }
        self.stack.push(Frame {
            container: self.container.take(),
            name: self.name.take(),
        });
        self.container = Some(container);
        Ok(())
    }

    fn pop(&mut self) -> Step<Value> {
        let finished = match self.container.take() {
            Some(container) => container.into_value(),
            None => return reject("container closed before it was opened".to_string()),
        };
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return reject("container stack underflow".to_string()),
        };
        self.container = frame.container;
        self.name = frame.name;
        Ok(finished)
    }

    fn text(&mut self, chunk: String) -> Step<()> {
        match self.path.last() {
            Some(tag) if tag.holds_text() => {
                match self.text {
                    Some(ref mut text) => text.push_str(&chunk),
                    None => self.text = Some(chunk),
                }
                Ok(())
            }
            Some(tag) if !chunk.trim().is_empty() => {
                reject(format!("unexpected text inside <{}>", tag.name()))
            }
            _ => Ok(()),
        }
    }

    fn scalar(&mut self, tag: Tag) -> Step<Value> {
        let text = self.take_text();
        let value = match tag {
            Tag::String => Value::String(text),
            Tag::Int | Tag::I4 => match text.trim().parse::<i32>() {
                Ok(n) => Value::Integer(n),
                Err(_) => return reject(format!("invalid <{}> value {:?}", tag.name(), text)),
            },
            Tag::Boolean => Value::Boolean(text.trim() == "1"),
            Tag::Double => match text.trim().parse::<f64>() {
                Ok(n) => Value::Double(n),
                Err(_) => return reject(format!("invalid <double> value {:?}", text)),
            },
            Tag::DateTime => match value::parse_datetime(&text) {
                Some(dt) => Value::DateTime(dt),
                None => return reject(format!("invalid <dateTime.iso8601> value {:?}", text)),
            },
            Tag::Base64 => {
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                match STANDARD.decode(compact.as_bytes()) {
                    Ok(bytes) => Value::Binary(bytes),
                    Err(err) => return reject(format!("invalid <base64> value: {}", err)),
                }
            }
            _ => Value::Null,
        };
        Ok(value)
    }

    fn close(&mut self, name: &str) -> Step<Tag> {
        let tag = match self.path.pop() {
            Some(tag) if tag.name() == name => tag,
            _ => return reject(format!("unbalanced closing element </{}>", name)),
        };

        match tag {
            Tag::String
            | Tag::Int
            | Tag::I4
            | Tag::Boolean
            | Tag::Double
            | Tag::DateTime
            | Tag::Base64
            | Tag::Nil => {
                self.value = Some(self.scalar(tag)?);
            }
            Tag::Array | Tag::Struct => {
                self.value = Some(self.pop()?);
                self.text = None;
            }
            Tag::Name => {
                self.name = Some(self.take_text());
            }
            Tag::Value => self.finish_value()?,
            Tag::Member => {
                if let Some(name) = self.name.take() {
                    return reject(format!("struct member {:?} has no <value>", name));
                }
            }
            _ => {}
        }
        Ok(tag)
    }

    fn finish_value(&mut self) -> Step<()> {
        let value = match self.value.take() {
            Some(value) => {
                if !is_blank(&self.text) {
                    return reject("<value> mixes text and elements".to_string());
                }
                value
            }
            // untyped <value>text</value> is a string
            None => Value::String(self.take_text()),
        };
        self.text = None;

        match self.path.last().copied() {
            Some(Tag::Data) | Some(Tag::Array) => match self.container {
                Some(Container::Array(ref mut list)) => list.push(value),
                _ => return reject("array element outside of an array".to_string()),
            },
            Some(Tag::Member) => {
                let key = match self.name.take() {
                    Some(key) => key,
                    None => return reject("struct member without <name>".to_string()),
                };
                match self.container {
                    // a repeated member name overwrites the earlier one
                    Some(Container::Struct(ref mut map)) => {
                        map.insert(key, value);
                    }
                    _ => return reject("struct member outside of a struct".to_string()),
                }
            }
            _ => self.value = Some(value),
        }
        Ok(())
    }
}

/// Turns XML-RPC documents into envelopes.
///
/// An instance parses one document at a time; state is reset at the start of
/// every call.
pub struct Deserializer {
    settings: Settings,
    sink: Arc<dyn LogSink>,
    machine: Machine,
}

impl Deserializer {
    pub fn new(settings: Settings) -> Deserializer {
        Deserializer::with_sink(settings, logging::default_sink())
    }

    pub fn with_sink(settings: Settings, sink: Arc<dyn LogSink>) -> Deserializer {
        Deserializer {
            machine: Machine::new(settings.max_depth),
            settings,
            sink,
        }
    }

    fn reset(&mut self) {
        self.machine = Machine::new(self.settings.max_depth);
    }

    pub fn deserialize_request(&mut self, input: &[u8]) -> Result<Request> {
        self.reset();
        let mut reader = BoundedReader::new(input, &self.settings, self.sink.as_ref())?;

        let mut method_name = None;
        let mut params = Vec::new();

        while let Some(token) = reader.next_token()? {
            match token {
                Token::Open(name) => {
                    self.machine.open_in(&name, Tag::MethodCall)?;
                }
                Token::Text(text) => self.machine.text(text)?,
                Token::Close(name) => match self.machine.close(&name)? {
                    Tag::MethodName => method_name = Some(self.machine.take_text()),
                    Tag::Param => match self.machine.take_value() {
                        Some(value) => params.push(value),
                        None => {
                            return Err(ProtocolError::grammar("<param> without <value>").into())
                        }
                    },
                    _ => {}
                },
            }
        }

        match method_name {
            Some(ref name) if !name.trim().is_empty() => {
                Ok(Request::with_params(name.trim(), params))
            }
            _ => Err(ProtocolError::grammar("<methodCall> without a <methodName>").into()),
        }
    }

    pub fn deserialize_response(&mut self, input: &[u8]) -> Result<Response> {
        self.reset();
        let mut reader = BoundedReader::new(input, &self.settings, self.sink.as_ref())?;

        let mut in_fault = false;
        let mut fault = None;
        let mut saw_params = false;
        let mut result = None;
        let mut param_count = 0usize;

        while let Some(token) = reader.next_token()? {
            match token {
                Token::Open(name) => {
                    if self.machine.open_in(&name, Tag::MethodResponse)? == Tag::Fault {
                        in_fault = true;
                    }
                }
                Token::Text(text) => self.machine.text(text)?,
                Token::Close(name) => match self.machine.close(&name)? {
                    Tag::Fault => match self.machine.take_value() {
                        Some(value) => fault = Some(Fault::from_value(&value)?),
                        None => {
                            return Err(ProtocolError::grammar("<fault> without <value>").into())
                        }
                    },
                    Tag::Param => {
                        param_count += 1;
                        if param_count > 1 {
                            let message = "response carries more than one <param>";
                            return Err(ProtocolError::grammar(message).into());
                        }
                        result = self.machine.take_value();
                    }
                    Tag::Params => saw_params = true,
                    _ => {}
                },
            }
        }

        match (in_fault, fault, saw_params) {
            (true, Some(_), true) => {
                Err(ProtocolError::grammar("response carries both <params> and <fault>").into())
            }
            (true, Some(fault), false) => Ok(Response::Fault(fault)),
            (false, None, true) => Ok(Response::Success(result.unwrap_or(Value::Null))),
            _ => Err(ProtocolError::grammar("<methodResponse> without <params> or <fault>").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use time::macros::datetime;

    fn request(xml: &str) -> Result<Request> {
        Deserializer::new(Settings::default()).deserialize_request(xml.as_bytes())
    }

    fn response(xml: &str) -> Result<Response> {
        Deserializer::new(Settings::default()).deserialize_response(xml.as_bytes())
    }

    /// A call to `m` whose only parameter holds `value_xml`.
    fn call_with(value_xml: &str) -> String {
        format!(
            "<methodCall><methodName>m</methodName><params>\
             <param><value>{}</value></param>\
             </params></methodCall>",
            value_xml
        )
    }

    fn param(value_xml: &str) -> Value {
        let mut req = request(&call_with(value_xml)).unwrap();
        req.params.remove(0)
    }

    fn is_grammar_error(result: Result<Request>) -> bool {
        matches!(result, Err(Error::Protocol(ProtocolError::Grammar(_))))
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(Value::Integer(-12), param("<i4>-12</i4>"));
        assert_eq!(Value::Integer(42), param("<int> 42 </int>"));
        assert_eq!(Value::Boolean(true), param("<boolean>1</boolean>"));
        assert_eq!(Value::Boolean(false), param("<boolean>true</boolean>"));
        assert_eq!(Value::Double(4.2), param("<double>4.2</double>"));
        assert_eq!(Value::from("a < b"), param("<string>a &lt; b</string>"));
        assert_eq!(Value::from(""), param("<string/>"));
        assert_eq!(Value::Binary(b"hello".to_vec()), param("<base64>aGVs\nbG8=</base64>"));
        assert_eq!(Value::Null, param("<nil/>"));
        assert_eq!(
            Value::DateTime(datetime!(1998-07-17 14:08:55)),
            param("<dateTime.iso8601>19980717T14:08:55</dateTime.iso8601>")
        );
    }

    #[test]
    fn untyped_value_is_a_string() {
        assert_eq!(Value::from("plain"), param("plain"));
        assert_eq!(Value::from(""), param(""));
    }

    #[test]
    fn decodes_nested_containers() {
        let value = param(
            "<struct>\
               <member><name>list</name><value><array><data>\
                 <value><int>1</int></value>\
                 <value><array><data><value>x</value></data></array></value>\
               </data></array></value></member>\
               <member><name>empty</name><value><struct/></value></member>\
             </struct>",
        );
        let list = value["list"].as_array().unwrap();
        assert_eq!(Value::Integer(1), list[0]);
        assert_eq!(Value::Array(vec![Value::from("x")]), list[1]);
        assert_eq!(Some(&Struct::new()), value["empty"].as_struct());
    }

    #[test]
    fn keeps_member_order_and_last_duplicate() {
        let value = param(
            "<struct>\
               <member><name>b</name><value>1</value></member>\
               <member><name>a</name><value>2</value></member>\
               <member><name>b</name><value>3</value></member>\
             </struct>",
        );
        let map = value.as_struct().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(vec!["b", "a"], keys);
        assert_eq!(Value::from("3"), map["b"]);
    }

    #[test]
    fn request_collects_method_and_params() {
        let req = request(
            "<?xml version=\"1.0\"?>\n\
             <methodCall>\n  <methodName>examples.getStateName</methodName>\n  <params>\n\
               <param><value><i4>41</i4></value></param>\n\
               <param><value><string>x</string></value></param>\n\
             </params>\n</methodCall>",
        )
        .unwrap();
        assert_eq!("examples.getStateName", req.method_name);
        assert_eq!(vec![Value::Integer(41), Value::from("x")], req.params);
    }

    #[test]
    fn request_without_params_is_valid() {
        let xml = "<methodCall><methodName>system.listMethods</methodName></methodCall>";
        let req = request(xml).unwrap();
        assert!(req.params.is_empty());
    }

    #[test]
    fn rejects_grammar_violations() {
        assert!(is_grammar_error(request("<methodResponse><params/></methodResponse>")));
        assert!(is_grammar_error(request("<methodCall><params/></methodCall>")));
        assert!(is_grammar_error(request(&call_with("<bogus/>"))));
        assert!(is_grammar_error(request(&call_with("<int>x</int>"))));
        assert!(is_grammar_error(request(&call_with("<int>1</int><int>2</int>"))));
        assert!(is_grammar_error(request(&call_with(
            "<struct><member><value>1</value></member></struct>"
        ))));
        assert!(is_grammar_error(request(
            "<methodCall><methodName>m</methodName>\
             <params>junk<param><value>1</value></param></params>\
             </methodCall>"
        )));
    }

    #[test]
    fn malformed_xml_is_a_protocol_error() {
        match request("<methodCall><methodName>m</methodCall>") {
            Err(Error::Protocol(ProtocolError::Xml(_))) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn response_success_and_fault() {
        let ok = response(
            "<methodResponse><params>\
             <param><value><string>South Dakota</string></value></param>\
             </params></methodResponse>",
        )
        .unwrap();
        assert!(!ok.is_fault());
        assert_eq!(Some(&Value::from("South Dakota")), ok.value());

        let fault = response(
            "<methodResponse><fault><value><struct>\
               <member><name>faultCode</name><value><int>4</int></value></member>\
               <member><name>faultString</name>\
                 <value><string>Too many parameters.</string></value></member>\
             </struct></value></fault></methodResponse>",
        )
        .unwrap();
        assert!(fault.is_fault());
        assert_eq!(Some(4), fault.fault_code());
        assert_eq!(Some("Too many parameters."), fault.fault_string());
    }

    #[test]
    fn response_without_value_is_null() {
        let ok = response("<methodResponse><params/></methodResponse>").unwrap();
        assert_eq!(Some(&Value::Null), ok.value());
    }

    #[test]
    fn response_rejects_two_params_and_bad_faults() {
        assert!(response(
            "<methodResponse><params>\
             <param><value>1</value></param><param><value>2</value></param>\
             </params></methodResponse>"
        )
        .is_err());
        assert!(
            response("<methodResponse><fault><value>oops</value></fault></methodResponse>").is_err()
        );
        assert!(response("<methodResponse></methodResponse>").is_err());
    }

    #[test]
    fn repeated_value_in_param_or_fault_is_rejected() {
        let twice = "<methodCall><methodName>m</methodName><params>\
                     <param><value>1</value><value>2</value></param>\
                     </params></methodCall>";
        assert!(is_grammar_error(request(twice)));

        let fault = response(
            "<methodResponse><fault>\
               <value><struct><member>\
                 <name>faultCode</name><value><int>1</int></value>\
               </member></struct></value>\
               <value><struct><member>\
                 <name>faultCode</name><value><int>2</int></value>\
               </member></struct></value>\
             </fault></methodResponse>",
        );
        assert!(matches!(fault, Err(Error::Protocol(ProtocolError::Grammar(_)))), "{:?}", fault);

        // array items are siblings too, and stay legal
        let items = param("<array><data><value>1</value><value>2</value></data></array>");
        assert_eq!(2, items.as_array().unwrap().len());
    }

    #[test]
    fn instance_is_reusable_after_failure() {
        let mut deserializer = Deserializer::new(Settings::default());
        let truncated = "<methodCall><methodName>m</methodName><params><param><value><array><data>";
        assert!(deserializer.deserialize_request(truncated.as_bytes()).is_err());
        let req = deserializer.deserialize_request(call_with("1").as_bytes()).unwrap();
        assert_eq!(vec![Value::from("1")], req.params);
    }
}
