// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::any;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use time::PrimitiveDateTime;

use super::{FromValue, ToValue};
use crate::error::{Error, Result};
use crate::xmlrpc::value::{self, Struct, Value};

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

impl<'a, T: ToValue + ?Sized> ToValue for &'a T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: &Value) -> Result<Box<T>> {
        T::from_value(value).map(Box::new)
    }
}

// Integers outside the i32 range are sent as their decimal text.
macro_rules! bind_integer {
    ($($t:ty), +) => (
        $(impl ToValue for $t {
            fn to_value(&self) -> Value {
                match num::cast::<$t, i32>(*self) {
                    Some(n) => Value::Integer(n),
                    None => Value::String(self.to_string()),
                }
            }
        }

        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<$t> {
                let cast = match *value {
                    Value::Integer(n) => num::cast(n),
                    Value::Double(n) if n.fract() == 0.0 => num::cast(n),
                    Value::Boolean(b) => num::cast(u8::from(b)),
                    Value::String(ref s) => s.trim().parse().ok(),
                    _ => None,
                };
                cast.ok_or_else(|| Error::cast::<$t>(value))
            }
        })+
    )
}

bind_integer! { isize, i8, i16, i32, i64 }
bind_integer! { usize, u8, u16, u32, u64 }

macro_rules! bind_float {
    ($($t:ty), +) => (
        $(impl ToValue for $t {
            fn to_value(&self) -> Value {
                num::cast::<$t, f64>(*self).map_or(Value::Null, Value::Double)
            }
        }

        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<$t> {
                let cast = match *value {
                    Value::Integer(n) => num::cast(n),
                    Value::Double(n) => num::cast(n),
                    Value::String(ref s) => s.trim().parse().ok(),
                    _ => None,
                };
                cast.ok_or_else(|| Error::cast::<$t>(value))
            }
        })+
    )
}

bind_float! { f32, f64 }

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<bool> {
        match *value {
            Value::Boolean(b) => Ok(b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::String(ref s) => match s.trim() {
                "1" => Ok(true),
                "0" => Ok(false),
                other if other.eq_ignore_ascii_case("true") => Ok(true),
                other if other.eq_ignore_ascii_case("false") => Ok(false),
                _ => Err(Error::cast::<bool>(value)),
            },
            _ => Err(Error::cast::<bool>(value)),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FromValue for String {
    /// Every scalar has a textual form; containers and binary do not.
    fn from_value(value: &Value) -> Result<String> {
        match *value {
            Value::String(ref s) => Ok(s.clone()),
            Value::Integer(n) => Ok(n.to_string()),
            Value::Double(n) => Ok(n.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::DateTime(ref dt) => {
                value::format_datetime(dt).ok_or_else(|| Error::cast::<String>(value))
            }
            _ => Err(Error::cast::<String>(value)),
        }
    }
}

impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<char> {
        let text = value.as_str().ok_or_else(|| Error::cast::<char>(value))?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::binding(value, "char", "expected exactly one character")),
        }
    }
}

impl ToValue for PrimitiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for PrimitiveDateTime {
    fn from_value(value: &Value) -> Result<PrimitiveDateTime> {
        match *value {
            Value::DateTime(dt) => Ok(dt),
            Value::String(ref s) => value::parse_datetime(s).ok_or_else(|| {
                Error::binding(value, "PrimitiveDateTime", "expected yyyyMMddTHH:mm:ss")
            }),
            _ => Err(Error::cast::<PrimitiveDateTime>(value)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match *self {
            None => Value::Null,
            Some(ref value) => value.to_value(),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    /// `Null` is `None`. So is an empty string that `T` cannot bind, since
    /// that is how `Null` comes back off the wire.
    fn from_value(value: &Value) -> Result<Option<T>> {
        match *value {
            Value::Null => Ok(None),
            Value::String(ref s) if s.is_empty() => Ok(T::from_value(value).ok()),
            ref other => T::from_value(other).map(Some),
        }
    }
}

/// Binary payload; maps to `<base64>` rather than an array of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Bytes {
        Bytes(bytes)
    }
}

impl ToValue for Bytes {
    fn to_value(&self) -> Value {
        Value::Binary(self.0.clone())
    }
}

impl FromValue for Bytes {
    fn from_value(value: &Value) -> Result<Bytes> {
        match *value {
            Value::Binary(ref bytes) => Ok(Bytes(bytes.clone())),
            Value::String(ref text) => STANDARD
                .decode(text.trim())
                .map(Bytes)
                .map_err(|err| Error::binding(value, "Bytes", err.to_string())),
            Value::Array(_) => Vec::<u8>::from_value(value).map(Bytes),
            _ => Err(Error::cast::<Bytes>(value)),
        }
    }
}

fn elements(value: &Value) -> Option<Vec<Value>> {
    match *value {
        Value::Array(ref items) => Some(items.clone()),
        Value::Binary(ref bytes) => {
            Some(bytes.iter().map(|b| Value::Integer(i32::from(*b))).collect())
        }
        _ => None,
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(|elt| elt.to_value()).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(|elt| elt.to_value()).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Vec<T>> {
        match *value {
            Value::Array(ref items) => items.iter().map(T::from_value).collect(),
            _ => match elements(value) {
                Some(items) => items.iter().map(T::from_value).collect(),
                None => Err(Error::cast::<Vec<T>>(value)),
            },
        }
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        self[..].to_value()
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: &Value) -> Result<[T; N]> {
        let items = Vec::<T>::from_value(value)?;
        let len = items.len();
        <[T; N]>::try_from(items).map_err(|_| {
            let reason = format!("expected {} elements, found {}", N, len);
            Error::binding(value, any::type_name::<[T; N]>(), reason)
        })
    }
}

macro_rules! tuple_impl {
    // use variables to indicate the arity of the tuple
    ($len:expr => $($tyvar:ident $idx:tt),+) => {
        // the trailing commas are for the 1 tuple
        impl<$($tyvar: ToValue),+> ToValue for ($($tyvar,)+) {
            fn to_value(&self) -> Value {
                Value::Array(vec![$(self.$idx.to_value()),+])
            }
        }

        impl<$($tyvar: FromValue),+> FromValue for ($($tyvar,)+) {
            fn from_value(value: &Value) -> Result<Self> {
                match elements(value) {
                    Some(ref items) if items.len() == $len => {
                        Ok(($($tyvar::from_value(&items[$idx])?,)+))
                    }
                    _ => Err(Error::binding(
                        value,
                        any::type_name::<Self>(),
                        concat!("expected an array of ", stringify!($len), " elements"),
                    )),
                }
            }
        }
    }
}

tuple_impl!{1 => A 0}
tuple_impl!{2 => A 0, B 1}
tuple_impl!{3 => A 0, B 1, C 2}
tuple_impl!{4 => A 0, B 1, C 2, D 3}
tuple_impl!{5 => A 0, B 1, C 2, D 3, E 4}
tuple_impl!{6 => A 0, B 1, C 2, D 3, E 4, F 5}
tuple_impl!{7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6}
tuple_impl!{8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7}

fn members<'v>(value: &'v Value, target: &'static str) -> Result<&'v Struct> {
    value
        .as_struct()
        .ok_or_else(|| Error::binding(value, target, "expected a struct"))
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Struct(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: &Value) -> Result<IndexMap<String, T>> {
        members(value, "IndexMap")?
            .iter()
            .map(|(k, v)| Ok::<_, Error>((k.clone(), T::from_value(v)?)))
            .collect()
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Struct(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Result<BTreeMap<String, T>> {
        members(value, "BTreeMap")?
            .iter()
            .map(|(k, v)| Ok::<_, Error>((k.clone(), T::from_value(v)?)))
            .collect()
    }
}

impl<T: ToValue, S> ToValue for HashMap<String, T, S> {
    fn to_value(&self) -> Value {
        Value::Struct(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue, S: BuildHasher + Default> FromValue for HashMap<String, T, S> {
    fn from_value(value: &Value) -> Result<HashMap<String, T, S>> {
        members(value, "HashMap")?
            .iter()
            .map(|(k, v)| Ok::<_, Error>((k.clone(), T::from_value(v)?)))
            .collect()
    }
}

/// String-keyed map whose lookups ignore case. Keys are stored lowercased,
/// so a later member that differs only in case replaces the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseInsensitiveMap<V> {
    inner: IndexMap<String, V>,
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> CaseInsensitiveMap<V> {
        CaseInsensitiveMap { inner: IndexMap::new() }
    }
}

impl<V> CaseInsensitiveMap<V> {
    pub fn new() -> CaseInsensitiveMap<V> {
        CaseInsensitiveMap::default()
    }

    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        self.inner.insert(key.to_lowercase(), value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.inner.get(&key.to_lowercase())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, V> {
        self.inner.iter()
    }
}

impl<V: ToValue> ToValue for CaseInsensitiveMap<V> {
    fn to_value(&self) -> Value {
        self.inner.to_value()
    }
}

impl<V: FromValue> FromValue for CaseInsensitiveMap<V> {
    fn from_value(value: &Value) -> Result<CaseInsensitiveMap<V>> {
        let mut map = CaseInsensitiveMap::new();
        for (k, v) in members(value, "CaseInsensitiveMap")? {
            map.insert(k, V::from_value(v)?);
        }
        Ok(map)
    }
}
