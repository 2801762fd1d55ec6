// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Byte-stream entry points.
//!
//! Streams are buffered in full before parsing; the synchronous core then
//! runs on the buffer. Async variants only await the underlying stream.

use std::io::{Read, Write};
use std::sync::Arc;

use log::Level;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Settings;
use crate::error::Result;
use crate::logging::{self, LogSink};
use crate::xmlrpc::decoding::Deserializer;
use crate::xmlrpc::encoding::Serializer;
use crate::xmlrpc::protocol::{MethodCall, Request, Response};

/// Holds the settings and log sink; every call gets a fresh serializer or
/// deserializer, so one `Codec` can be shared between threads.
#[derive(Clone)]
pub struct Codec {
    settings: Settings,
    sink: Arc<dyn LogSink>,
}

impl Default for Codec {
    fn default() -> Codec {
        Codec::new(Settings::default())
    }
}

impl Codec {
    pub fn new(settings: Settings) -> Codec {
        Codec::with_sink(settings, logging::default_sink())
    }

    pub fn with_sink(settings: Settings, sink: Arc<dyn LogSink>) -> Codec {
        Codec { settings, sink }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn serializer(&self) -> Serializer {
        Serializer::with_sink(self.settings.clone(), self.sink.clone())
    }

    pub fn deserializer(&self) -> Deserializer {
        Deserializer::with_sink(self.settings.clone(), self.sink.clone())
    }

    /// Bytes worth reading before the document is certainly over the size limit.
    fn read_limit(&self) -> u64 {
        self.settings.max_document_chars.saturating_mul(4).saturating_add(1)
    }

    pub(crate) fn log(&self, level: Level, message: impl FnOnce() -> String) {
        if self.sink.enabled(level) {
            self.sink.log(level, &message());
        }
    }

    pub fn encode_request<C: MethodCall + ?Sized>(&self, call: &C) -> Result<String> {
        self.serializer().serialize_request(call)
    }

    pub fn encode_response(&self, response: &Response) -> Result<String> {
        self.serializer().serialize_response(response)
    }

    pub fn decode_request(&self, input: &[u8]) -> Result<Request> {
        let request = self.deserializer().deserialize_request(input)?;
        self.log(Level::Debug, || {
            format!("decoded call {} with {} params", request.method_name, request.params.len())
        });
        Ok(request)
    }

    pub fn decode_response(&self, input: &[u8]) -> Result<Response> {
        let response = self.deserializer().deserialize_response(input)?;
        if let Response::Fault(ref fault) = response {
            self.log(Level::Debug, || format!("decoded fault {}: {}", fault.code, fault.message));
        }
        Ok(response)
    }

    fn read_all<R: Read>(&self, reader: R) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader.take(self.read_limit()).read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn read_request<R: Read>(&self, reader: R) -> Result<Request> {
        let buf = self.read_all(reader)?;
        self.decode_request(&buf)
    }

    pub fn read_response<R: Read>(&self, reader: R) -> Result<Response> {
        let buf = self.read_all(reader)?;
        self.decode_response(&buf)
    }

    pub fn write_request<C, W>(&self, call: &C, mut writer: W) -> Result<()>
    where
        C: MethodCall + ?Sized,
        W: Write,
    {
        let buf = self.serializer().write_request(call, Vec::new())?;
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_response<W: Write>(&self, response: &Response, mut writer: W) -> Result<()> {
        let buf = self.serializer().write_response(response, Vec::new())?;
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    async fn read_all_async<R: AsyncRead + Unpin>(&self, reader: R) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader.take(self.read_limit()).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    pub async fn read_request_async<R: AsyncRead + Unpin>(&self, reader: R) -> Result<Request> {
        let buf = self.read_all_async(reader).await?;
        self.decode_request(&buf)
    }

    pub async fn read_response_async<R: AsyncRead + Unpin>(&self, reader: R) -> Result<Response> {
        let buf = self.read_all_async(reader).await?;
        self.decode_response(&buf)
    }

    pub async fn write_request_async<C, W>(&self, call: &C, mut writer: W) -> Result<()>
    where
        C: MethodCall + ?Sized,
        W: AsyncWrite + Unpin,
    {
        let buf = self.serializer().write_request(call, Vec::new())?;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn write_response_async<W: AsyncWrite + Unpin>(
        &self,
        response: &Response,
        mut writer: W,
    ) -> Result<()> {
        let buf = self.serializer().write_response(response, Vec::new())?;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Limit, ProtocolError};
    use crate::xmlrpc::value::Value;
    use std::io::{self, Cursor};

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn request_survives_a_stream_round_trip() {
        let codec = Codec::default();
        let request = Request::new("zone.list").argument(&7).argument("a & b");

        let mut out = Vec::new();
        codec.write_request(&request, &mut out).unwrap();
        let back = codec.read_request(Cursor::new(out)).unwrap();

        assert_eq!(request, back);
    }

    #[test]
    fn read_failures_are_transport_errors() {
        match Codec::default().read_response(Broken) {
            Err(Error::Transport { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_streams_stop_reading_early() {
        let codec = Codec::new(Settings::default().with_max_document_chars(16));
        let body = format!("<methodResponse>{}</methodResponse>", " ".repeat(1000));
        match codec.read_response(body.as_bytes()) {
            Err(Error::Protocol(ProtocolError::LimitExceeded {
                limit: Limit::DocumentChars,
                ..
            })) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn broken_sinks_do_not_fail_decoding() {
        let sink: Arc<dyn LogSink> = Arc::new(|_: Level, _: &str| panic!("sink is gone"));
        let codec = Codec::with_sink(Settings::default(), sink);
        let xml = codec.encode_request(&Request::new("zone.list").argument(&1)).unwrap();

        let request = codec.decode_request(xml.as_bytes()).unwrap();

        assert_eq!("zone.list", request.method_name);
    }

    #[tokio::test]
    async fn async_entry_points_match_sync_ones() {
        let codec = Codec::default();
        let response = Response::Success(Value::Array(vec![Value::Integer(1), Value::Null]));

        let mut out = Vec::new();
        codec.write_response_async(&response, &mut out).await.unwrap();
        let back = codec.read_response_async(&out[..]).await.unwrap();

        // null comes back as the empty string
        assert_eq!(Response::Success(Value::Array(vec![Value::Integer(1), Value::from("")])), back);
    }
}
