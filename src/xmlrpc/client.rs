// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::future::Future;

use log::Level;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::error::{Error, Result};
use crate::xmlrpc::binding::FromValue;
use crate::xmlrpc::protocol::{MethodCall, Response};
use crate::xmlrpc::stream::Codec;
use crate::xmlrpc::value::Value;

const DEFAULT_USER_AGENT: &str = concat!("rust-xmlrpc/", env!("CARGO_PKG_VERSION"));

/// Carries one serialized call to the server and returns the raw reply.
pub trait Transport: Send + Sync {
    fn post(&self, endpoint: &str, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// HTTP POST with `Content-Type: text/xml`. Non-success statuses are
/// transport errors.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    user_agent: String,
}

impl Default for HttpTransport {
    fn default() -> HttpTransport {
        HttpTransport::new(reqwest::Client::new())
    }
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> HttpTransport {
        HttpTransport {
            http,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn user_agent(mut self, user_agent: &str) -> HttpTransport {
        self.user_agent = user_agent.to_string();
        self
    }
}

impl Transport for HttpTransport {
    fn post(&self, endpoint: &str, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let request = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, self.user_agent.as_str())
            .body(body);
        async move {
            let response = request.send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
    }
}

pub struct Client<T = HttpTransport> {
    url: String,
    transport: T,
    codec: Codec,
}

impl Client<HttpTransport> {
    pub fn new(url: &str) -> Client {
        Client::with_transport(url, HttpTransport::default())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(url: &str, transport: T) -> Client<T> {
        Client {
            url: url.to_string(),
            transport,
            codec: Codec::default(),
        }
    }

    /// Replaces the codec, e.g. to change parser limits or the log sink.
    pub fn codec(mut self, codec: Codec) -> Client<T> {
        self.codec = codec;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `call` and returns the decoded response, fault or not.
    pub async fn send<C: MethodCall + ?Sized>(&self, call: &C) -> Result<Response> {
        let body = self.codec.encode_request(call)?;
        self.codec.log(Level::Debug, || format!("Send XMLRPC request to: {}", self.url));
        self.codec.log(Level::Trace, || format!("XMLRPC body: {}", body));

        let reply = self.transport.post(&self.url, body.into_bytes()).await?;
        self.codec
            .log(Level::Trace, || format!("Response body: {}", String::from_utf8_lossy(&reply)));

        self.codec.decode_response(&reply)
    }

    /// Like [`Client::send`], but a fault comes back as [`Error::Fault`].
    pub async fn call<C: MethodCall + ?Sized>(&self, call: &C) -> Result<Value> {
        match self.send(call).await? {
            Response::Success(value) => Ok(value),
            Response::Fault(fault) => {
                self.codec.log(Level::Warn, || {
                    format!(
                        "{} answered {} with fault {}: {}",
                        self.url,
                        call.method_name(),
                        fault.code,
                        fault.message
                    )
                });
                Err(Error::Fault(fault))
            }
        }
    }

    /// Calls and binds the result to `R`.
    pub async fn call_as<R: FromValue, C: MethodCall + ?Sized>(&self, call: &C) -> Result<R> {
        let value = self.call(call).await?;
        R::from_value(&value)
    }
}
