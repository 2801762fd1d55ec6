// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::io::Write;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::Level;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::logging::{self, LogSink};
use crate::xmlrpc::decoding::Tag;
use crate::xmlrpc::protocol::{Fault, MethodCall, Response};
use crate::xmlrpc::value::{self, Value};

/// Renders a single `<value>` element without an XML declaration.
pub fn value_fragment(value: &Value) -> Result<String> {
    let config = EmitterConfig::new().write_document_declaration(false);
    let mut emitter = Emitter::new(Vec::new(), config);
    emitter.value(value)?;
    utf8(emitter.into_inner())
}

fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|err| Error::transport("serializer produced invalid UTF-8", err))
}

struct Emitter<W: Write> {
    writer: EventWriter<W>,
}

impl<W: Write> Emitter<W> {
    fn new(out: W, config: EmitterConfig) -> Emitter<W> {
        Emitter {
            writer: config.create_writer(out),
        }
    }

    fn start(&mut self, tag: Tag) -> Result<()> {
        self.writer.write(XmlEvent::start_element(tag.name()))?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.writer.write(XmlEvent::end_element())?;
        Ok(())
    }

    fn element(&mut self, tag: Tag, text: &str) -> Result<()> {
        self.start(tag)?;
        if !text.is_empty() {
            self.writer.write(XmlEvent::characters(text))?;
        }
        self.end()
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        self.start(Tag::Value)?;
        match *value {
            // XML-RPC has no null; it travels as an empty string
            Value::Null => self.element(Tag::String, "")?,
            Value::String(ref s) => self.element(Tag::String, s)?,
            Value::Integer(n) => self.element(Tag::Int, &n.to_string())?,
            Value::Double(n) => self.element(Tag::Double, &n.to_string())?,
            Value::Boolean(b) => self.element(Tag::Boolean, if b { "1" } else { "0" })?,
            Value::DateTime(ref dt) => match value::format_datetime(dt) {
                Some(text) => self.element(Tag::DateTime, &text)?,
                None => {
                    return Err(Error::binding(
                        value,
                        "dateTime.iso8601",
                        "year must lie within 0000..=9999",
                    ))
                }
            },
            Value::Binary(ref bytes) => self.element(Tag::Base64, &STANDARD.encode(bytes))?,
            Value::Array(ref items) => {
                self.start(Tag::Array)?;
                self.start(Tag::Data)?;
                for item in items {
                    self.value(item)?;
                }
                self.end()?;
                self.end()?;
            }
            Value::Struct(ref members) => {
                self.start(Tag::Struct)?;
                for (name, member) in members {
                    self.start(Tag::Member)?;
                    self.element(Tag::Name, name)?;
                    self.value(member)?;
                    self.end()?;
                }
                self.end()?;
            }
        }
        self.end()
    }

    fn params(&mut self, params: &[Value]) -> Result<()> {
        self.start(Tag::Params)?;
        for param in params {
            self.start(Tag::Param)?;
            self.value(param)?;
            self.end()?;
        }
        self.end()
    }

    fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Writes envelopes as XML-RPC documents.
pub struct Serializer {
    settings: Settings,
    sink: Arc<dyn LogSink>,
}

impl Serializer {
    pub fn new(settings: Settings) -> Serializer {
        Serializer::with_sink(settings, logging::default_sink())
    }

    pub fn with_sink(settings: Settings, sink: Arc<dyn LogSink>) -> Serializer {
        Serializer { settings, sink }
    }

    fn emitter<W: Write>(&self, out: W) -> Emitter<W> {
        let config = EmitterConfig::new()
            .write_document_declaration(true)
            .perform_indent(self.settings.indent);
        Emitter::new(out, config)
    }

    fn debug(&self, message: impl FnOnce() -> String) {
        if self.sink.enabled(Level::Debug) {
            self.sink.log(Level::Debug, &message());
        }
    }

    pub fn write_request<C, W>(&self, call: &C, out: W) -> Result<W>
    where
        C: MethodCall + ?Sized,
        W: Write,
    {
        let params = call.params();
        self.debug(|| {
            format!("serializing call {} with {} params", call.method_name(), params.len())
        });

        let mut emitter = self.emitter(out);
        emitter.start(Tag::MethodCall)?;
        emitter.element(Tag::MethodName, call.method_name())?;
        emitter.params(&params)?;
        emitter.end()?;
        Ok(emitter.into_inner())
    }

    pub fn write_response<W: Write>(&self, response: &Response, out: W) -> Result<W> {
        let mut emitter = self.emitter(out);
        emitter.start(Tag::MethodResponse)?;
        match *response {
            Response::Success(ref value) => {
                self.debug(|| format!("serializing {} response", value.type_name()));
                emitter.params(std::slice::from_ref(value))?;
            }
            Response::Fault(ref fault) => {
                self.debug(|| format!("serializing fault {}", fault.code));
                emitter.start(Tag::Fault)?;
                emitter.value(&fault.to_value())?;
                emitter.end()?;
            }
        }
        emitter.end()?;
        Ok(emitter.into_inner())
    }

    pub fn serialize_request<C: MethodCall + ?Sized>(&self, call: &C) -> Result<String> {
        let bytes = self.write_request(call, Vec::new())?;
        utf8(bytes)
    }

    pub fn serialize_response(&self, response: &Response) -> Result<String> {
        let bytes = self.write_response(response, Vec::new())?;
        utf8(bytes)
    }

    pub fn serialize_fault(&self, fault: &Fault) -> Result<String> {
        self.serialize_response(&Response::Fault(fault.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::protocol::Request;
    use crate::xmlrpc::value::Struct;
    use time::macros::datetime;

    fn compact() -> Serializer {
        Serializer::new(Settings::default())
    }

    #[test]
    fn fragments_cover_every_scalar() {
        assert_eq!("<value><int>-3</int></value>", value_fragment(&Value::Integer(-3)).unwrap());
        assert_eq!(
            "<value><boolean>0</boolean></value>",
            value_fragment(&Value::Boolean(false)).unwrap()
        );
        assert_eq!(
            "<value><double>0.5</double></value>",
            value_fragment(&Value::Double(0.5)).unwrap()
        );
        assert_eq!(
            "<value><dateTime.iso8601>19980717T14:08:55</dateTime.iso8601></value>",
            value_fragment(&Value::DateTime(datetime!(1998-07-17 14:08:55))).unwrap()
        );
        assert_eq!(
            "<value><base64>aGVsbG8=</base64></value>",
            value_fragment(&Value::Binary(b"hello".to_vec())).unwrap()
        );
    }

    #[test]
    fn dates_before_year_zero_are_refused() {
        let err = compact()
            .serialize_response(&Response::Success(Value::DateTime(datetime!(-0001-01-01 0:00))))
            .unwrap_err();
        assert!(err.is_binding(), "{:?}", err);
        assert!(err.to_string().contains("0000..=9999"), "{}", err);
    }

    #[test]
    fn null_is_an_empty_string() {
        let xml = value_fragment(&Value::Null).unwrap();
        assert!(xml.starts_with("<value><string"), "{}", xml);
        assert!(!xml.contains("nil"), "{}", xml);
    }

    #[test]
    fn text_is_escaped() {
        let xml = Value::from("a < b & c").to_string();
        assert!(xml.contains("a &lt; b &amp; c"), "{}", xml);
    }

    #[test]
    fn containers_nest() {
        let mut members = Struct::new();
        members.insert("list".to_string(), Value::Array(vec![Value::Integer(1)]));
        let xml = value_fragment(&Value::Struct(members)).unwrap();
        assert_eq!(
            "<value><struct><member><name>list</name><value><array><data>\
             <value><int>1</int></value></data></array></value></member></struct></value>",
            xml
        );
    }

    #[test]
    fn request_has_declaration_and_envelope() {
        let xml = compact()
            .serialize_request(&Request::new("examples.getStateName").argument(&41))
            .unwrap();
        assert!(xml.starts_with("<?xml"), "{}", xml);
        assert!(xml.contains(
            "<methodCall><methodName>examples.getStateName</methodName>\
             <params><param><value><int>41</int></value></param></params></methodCall>"
        ), "{}", xml);
    }

    #[test]
    fn fault_is_a_struct_in_fault() {
        let xml = compact().serialize_fault(&Fault::new(4, "Too <many>")).unwrap();
        assert!(xml.contains(
            "<methodResponse><fault><value><struct>\
             <member><name>faultCode</name><value><int>4</int></value></member>\
             <member><name>faultString</name><value><string>Too &lt;many"
        ), "{}", xml);
    }

    #[test]
    fn indentation_is_optional() {
        let indented = Serializer::new(Settings::default().indent(true))
            .serialize_response(&Response::Success(Value::Integer(1)))
            .unwrap();
        assert!(indented.contains("\n  <params>"), "{}", indented);

        let flat = compact().serialize_response(&Response::Success(Value::Integer(1))).unwrap();
        assert!(flat.contains("<methodResponse><params><param>"), "{}", flat);
    }
}
