// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![forbid(non_camel_case_types)]

//! XML-RPC library, including both serialization and remote procedure calling
//!
//! # What is XML-RPC?
//!
//! A remote procedure call protocol: a call is a `<methodCall>` document
//! carrying a method name and positional parameters, the answer is a
//! `<methodResponse>` carrying either one value or a fault. Values are
//! integers, doubles, booleans, strings, dates, base64 binary, arrays and
//! structs.
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! # Layout
//!
//! * [`value`]: the [`Value`] tree.
//! * [`decoding`] / [`encoding`]: documents to envelopes and back.
//! * [`protocol`]: [`Request`], [`BoxcarRequest`], [`Response`] and [`Fault`].
//! * [`binding`]: values to application types and back.
//! * [`stream`]: the [`Codec`] with string, `std::io` and tokio entry points.
//! * [`client`]: calling a server through a [`Transport`].

pub mod binding;
pub mod client;
pub mod decoding;
pub mod encoding;
pub mod protocol;
mod reader;
pub mod stream;
pub mod value;

pub use self::binding::{
    map_from, map_to, Bind, Bytes, CaseInsensitiveMap, FromValue, Name, ToValue, TypeBinding,
};
pub use self::client::{Client, HttpTransport, Transport};
pub use self::decoding::Deserializer;
pub use self::encoding::Serializer;
pub use self::protocol::{BoxcarRequest, Fault, MethodCall, Request, Response};
pub use self::stream::Codec;
pub use self::value::Value;
