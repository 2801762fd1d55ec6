// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use time::macros::format_description;
use time::PrimitiveDateTime;

/// Represents an XML-RPC data value
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Null,
    String(String),
    Integer(i32),
    Double(f64),
    Boolean(bool),
    DateTime(PrimitiveDateTime),
    Binary(Vec<u8>),
    Array(self::Array),
    Struct(self::Struct),
}

pub type Array = Vec<Value>;

/// Struct members in document order. Keys are case-sensitive here; the binder
/// compares them case-insensitively.
pub type Struct = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Parses the `yyyyMMddTHH:mm:ss` profile used by `dateTime.iso8601`.
pub fn parse_datetime(text: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!("[year][month][day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(text.trim(), format).ok()
}

/// Formats a date in the `dateTime.iso8601` profile; sub-second precision is dropped.
///
/// The profile has exactly four year digits, so years before 0000 yield `None`.
pub fn format_datetime(datetime: &PrimitiveDateTime) -> Option<String> {
    if !(0..=9999).contains(&datetime.year()) {
        return None;
    }
    Some(format!(
        "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
        datetime.year(),
        u8::from(datetime.month()),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    ))
}

impl Value {
    /// Short wire-level name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Null => "nil",
            Value::String(_) => "string",
            Value::Integer(_) => "int",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Binary(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// If the value is a Struct, returns the member stored under `key`.
    pub fn find<'a>(&'a self, key: &str) -> Option<&'a Value> {
        match *self {
            Value::Struct(ref map) => map.get(key),
            _ => None,
        }
    }

    /// Follows `keys` through nested structs.
    pub fn find_path<'a>(&'a self, keys: &[&str]) -> Option<&'a Value> {
        let mut target = self;
        for key in keys {
            target = target.find(key)?;
        }
        Some(target)
    }

    /// Depth-first search through nested structs for `key`.
    pub fn search<'a>(&'a self, key: &str) -> Option<&'a Value> {
        match *self {
            Value::Struct(ref map) => match map.get(key) {
                Some(value) => Some(value),
                None => map.values().find_map(|v| v.search(key)),
            },
            _ => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        self.as_struct().is_some()
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match *self {
            Value::Struct(ref map) => Some(map),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.as_array().is_some()
    }

    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Value::Array(ref array) => Some(array),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        self.as_str().is_some()
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(*self, Value::Integer(_) | Value::Double(_))
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// Integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(n) => num::cast(n),
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Binary(ref bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(*self, Value::Null)
    }
}

impl<'a> Index<&'a str> for Value {
    type Output = Value;

    /// Missing members and non-struct values index to `Null`.
    fn index(&self, key: &str) -> &Value {
        self.find(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        match *self {
            Value::Array(ref v) => v.get(idx).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

macro_rules! from_integer {
    ($($t:ty),+) => (
        $(impl From<$t> for Value {
            fn from(v: $t) -> Value { Value::Integer(i32::from(v)) }
        })+
    )
}

from_integer! { i8, i16, i32, u8, u16 }

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Boolean(v)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(v: PrimitiveDateTime) -> Value {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Binary(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Value {
        Value::Array(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Value {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    /// Renders the `<value>` XML fragment.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let xml = super::encoding::value_fragment(self).map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn nested() -> Value {
        let mut inner = Struct::new();
        inner.insert("zone".to_string(), Value::Integer(7));
        let mut outer = Struct::new();
        outer.insert("name".to_string(), Value::from("example.com"));
        outer.insert("info".to_string(), Value::Struct(inner));
        Value::Struct(outer)
    }

    #[test]
    fn find_path_walks_structs() {
        let value = nested();
        assert_eq!(Some(&Value::Integer(7)), value.find_path(&["info", "zone"]));
        assert_eq!(None, value.find_path(&["info", "missing"]));
    }

    #[test]
    fn search_is_depth_first() {
        assert_eq!(Some(7), nested().search("zone").and_then(Value::as_i32));
    }

    #[test]
    fn indexing_misses_yield_null() {
        let value = nested();
        assert!(value["nope"].is_null());
        assert!(value[3].is_null());
        assert_eq!(Some("example.com"), value["name"].as_str());
    }

    #[test]
    fn integers_widen_to_f64() {
        assert_eq!(Some(4.0), Value::Integer(4).as_f64());
        assert_eq!(None, Value::from("4").as_f64());
    }

    #[test]
    fn datetime_profile_round_trips() {
        let dt = datetime!(1998-07-17 14:08:55);
        let text = format_datetime(&dt).unwrap();
        assert_eq!("19980717T14:08:55", text);
        assert_eq!(Some(dt), parse_datetime(&text));
        assert_eq!(None, parse_datetime("1998-07-17T14:08:55"));
    }

    #[test]
    fn datetime_profile_has_four_year_digits() {
        assert_eq!(None, format_datetime(&datetime!(-0001-01-01 0:00)));
        assert_eq!(
            Some("00000101T00:00:00".to_string()),
            format_datetime(&datetime!(0000-01-01 0:00))
        );
    }
}
