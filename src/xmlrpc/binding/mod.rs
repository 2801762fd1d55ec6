// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Mapping between [`Value`] trees and application types.
//!
//! Scalars, sequences, tuples, maps and `Option` are covered out of the box.
//! Application structs describe themselves once with a [`TypeBinding`] and
//! the [`bind_type!`](crate::bind_type) macro; plain enums use
//! [`bind_enum!`](crate::bind_enum).
//!
//! ```
//! use xmlrpc_core::{bind_type, map_from, map_to, Value};
//!
//! #[derive(Debug, PartialEq)]
//! struct Zone {
//!     name: String,
//!     version: i32,
//! }
//!
//! bind_type!(Zone, |b| b
//!     .constructor(["name", "version"], |args| Ok(Zone {
//!         name: args.get(0)?,
//!         version: args.get(1)?,
//!     }))
//!     .getter("name", |z: &Zone| z.name.clone())
//!     .getter("version", |z: &Zone| z.version));
//!
//! let zone = Zone { name: "example.com".into(), version: 3 };
//! let value = map_from(&zone);
//! assert_eq!(Value::Integer(3), value["version"]);
//! assert_eq!(zone, map_to::<Zone>(&value).unwrap());
//! ```

use crate::error::Result;
use crate::xmlrpc::value::Value;

mod object;
mod scalar;

pub use self::object::{Args, Bind, Name, TypeBinding};
pub use self::scalar::{Bytes, CaseInsensitiveMap};

/// A trait for converting values to XML-RPC
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// A trait for building values from XML-RPC
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

/// Binds `value` to `T`.
pub fn map_to<T: FromValue>(value: &Value) -> Result<T> {
    T::from_value(value)
}

/// Maps `object` to its wire value.
pub fn map_from<T: ToValue + ?Sized>(object: &T) -> Value {
    object.to_value()
}

/// Implements [`Bind`], [`FromValue`] and [`ToValue`] for a struct from a
/// [`TypeBinding`] built by the closure body.
#[macro_export]
macro_rules! bind_type {
    ($t:ty, |$b:ident| $body:expr) => {
        impl $crate::xmlrpc::binding::Bind for $t {
            fn binding() -> &'static $crate::xmlrpc::binding::TypeBinding<$t> {
                static BINDING: ::std::sync::OnceLock<$crate::xmlrpc::binding::TypeBinding<$t>> =
                    ::std::sync::OnceLock::new();
                BINDING.get_or_init(|| {
                    let $b = $crate::xmlrpc::binding::TypeBinding::<$t>::new(stringify!($t));
                    $body
                })
            }
        }

        impl $crate::xmlrpc::binding::FromValue for $t {
            fn from_value(value: &$crate::xmlrpc::value::Value) -> $crate::error::Result<$t> {
                <$t as $crate::xmlrpc::binding::Bind>::binding().bind(value)
            }
        }

        impl $crate::xmlrpc::binding::ToValue for $t {
            fn to_value(&self) -> $crate::xmlrpc::value::Value {
                <$t as $crate::xmlrpc::binding::Bind>::binding().unbind(self)
            }
        }
    };
}

/// Binds a fieldless enum by variant name, compared case-insensitively.
#[macro_export]
macro_rules! bind_enum {
    ($t:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::xmlrpc::binding::FromValue for $t {
            fn from_value(value: &$crate::xmlrpc::value::Value) -> $crate::error::Result<$t> {
                let name = match value.as_str() {
                    Some(name) => name.trim(),
                    None => {
                        return Err($crate::error::Error::binding(
                            value,
                            stringify!($t),
                            "expected a variant name",
                        ))
                    }
                };
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant)) {
                        return Ok($t::$variant);
                    }
                )+
                Err($crate::error::Error::binding(
                    value,
                    stringify!($t),
                    format!("unknown variant {:?}", name),
                ))
            }
        }

        impl $crate::xmlrpc::binding::ToValue for $t {
            fn to_value(&self) -> $crate::xmlrpc::value::Value {
                let name = match *self {
                    $($t::$variant => stringify!($variant)),+
                };
                $crate::xmlrpc::value::Value::from(name)
            }
        }
    };
}
