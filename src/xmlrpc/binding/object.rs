// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Struct binding registry.
//!
//! Binding a struct value tries, in order:
//!
//! 1. every registered constructor with at least one parameter, in
//!    registration order; the first whose parameter names are all present
//!    and whose arguments all bind wins,
//! 2. the default constructor followed by assignment of every settable
//!    member present in the struct,
//! 3. otherwise a binding error naming the type.
//!
//! Member and parameter names resolve to their override when one was given
//! and are matched against struct keys ignoring case.

use std::fmt;

use super::{FromValue, ToValue};
use crate::error::{Error, Result};
use crate::xmlrpc::value::{Struct, Value};

/// Declared name of a member or constructor parameter, with an optional
/// wire-name override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name {
    declared: &'static str,
    renamed: Option<&'static str>,
}

impl Name {
    pub const fn new(declared: &'static str) -> Name {
        Name { declared, renamed: None }
    }

    /// Uses `wire` instead of the declared name, both when binding and when
    /// mapping back.
    pub const fn renamed(self, wire: &'static str) -> Name {
        Name {
            declared: self.declared,
            renamed: Some(wire),
        }
    }

    pub fn declared(&self) -> &'static str {
        self.declared
    }

    pub fn resolved(&self) -> &'static str {
        self.renamed.unwrap_or(self.declared)
    }
}

impl From<&'static str> for Name {
    fn from(declared: &'static str) -> Name {
        Name::new(declared)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.resolved())
    }
}

/// Finds `name` among the struct keys. An exact match beats a
/// case-insensitive one.
fn lookup<'a>(source: &'a Struct, name: &str) -> Option<&'a Value> {
    if let Some(value) = source.get(name) {
        return Some(value);
    }
    let folded = name.to_lowercase();
    source
        .iter()
        .find(|(key, _)| key.to_lowercase() == folded)
        .map(|(_, value)| value)
}

/// Arguments matched to a constructor's parameters, in parameter order.
pub struct Args<'a> {
    values: Vec<&'a Value>,
}

impl<'a> Args<'a> {
    pub fn get<T: FromValue>(&self, idx: usize) -> Result<T> {
        match self.values.get(idx) {
            Some(value) => T::from_value(value),
            None => Err(Error::binding(
                &Value::Null,
                std::any::type_name::<T>(),
                format!("constructor has no parameter {}", idx),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Build<T> = Box<dyn Fn(&Args<'_>) -> Result<T> + Send + Sync>;
type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, &Value) -> Result<()> + Send + Sync>;

struct Constructor<T> {
    params: Vec<Name>,
    build: Build<T>,
}

struct Member<T> {
    name: Name,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

/// How one application type maps to and from a struct value.
pub struct TypeBinding<T> {
    type_name: &'static str,
    constructors: Vec<Constructor<T>>,
    default: Option<Box<dyn Fn() -> T + Send + Sync>>,
    members: Vec<Member<T>>,
}

impl<T: 'static> TypeBinding<T> {
    pub fn new(type_name: &'static str) -> TypeBinding<T> {
        TypeBinding {
            type_name,
            constructors: Vec::new(),
            default: None,
            members: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registers a constructor taking the named parameters. `build` receives
    /// the matching struct members in parameter order.
    ///
    /// Constructors without parameters are never picked; register them with
    /// [`TypeBinding::default`].
    pub fn constructor<N, I, F>(mut self, params: I, build: F) -> TypeBinding<T>
    where
        N: Into<Name>,
        I: IntoIterator<Item = N>,
        F: Fn(&Args<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: params.into_iter().map(Into::into).collect(),
            build: Box::new(build),
        });
        self
    }

    pub fn default<F>(mut self, make: F) -> TypeBinding<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Box::new(make));
        self
    }

    /// A read-write member.
    pub fn field<V, G, S>(mut self, name: impl Into<Name>, get: G, set: S) -> TypeBinding<T>
    where
        V: ToValue + FromValue,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.members.push(Member {
            name: name.into(),
            get: Box::new(move |object: &T| get(object).to_value()),
            set: Some(Box::new(move |object: &mut T, value: &Value| {
                set(object, V::from_value(value)?);
                Ok(())
            })),
        });
        self
    }

    /// A member that is only mapped out, never assigned.
    pub fn getter<V, G>(mut self, name: impl Into<Name>, get: G) -> TypeBinding<T>
    where
        V: ToValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.members.push(Member {
            name: name.into(),
            get: Box::new(move |object: &T| get(object).to_value()),
            set: None,
        });
        self
    }

    /// Builds a `T` from a struct value.
    pub fn bind(&self, value: &Value) -> Result<T> {
        let source = match value.as_struct() {
            Some(source) => source,
            None => return Err(Error::binding(value, self.type_name, "expected a struct")),
        };

        for ctor in self.constructors.iter().filter(|c| !c.params.is_empty()) {
            let values: Option<Vec<&Value>> = ctor
                .params
                .iter()
                .map(|name| lookup(source, name.resolved()))
                .collect();
            let args = match values {
                Some(values) => Args { values },
                None => continue,
            };
            match (ctor.build)(&args) {
                Ok(object) => return Ok(object),
                // an argument that does not bind rules this constructor out
                Err(ref err) if err.is_binding() => continue,
                Err(err) => return Err(err),
            }
        }

        if let Some(ref make) = self.default {
            let mut object = make();
            for member in &self.members {
                let found = lookup(source, member.name.resolved());
                if let (Some(set), Some(found)) = (&member.set, found) {
                    set(&mut object, found)?;
                }
            }
            return Ok(object);
        }

        Err(Error::binding(
            value,
            self.type_name,
            "no constructor matches the struct members and no default constructor is registered",
        ))
    }

    /// Maps `object` to a struct with one member per registered member, in
    /// registration order.
    pub fn unbind(&self, object: &T) -> Value {
        let members = self
            .members
            .iter()
            .map(|member| (member.name.resolved().to_string(), (member.get)(object)))
            .collect();
        Value::Struct(members)
    }
}

/// Types with a registered [`TypeBinding`]; implemented by
/// [`bind_type!`](crate::bind_type).
pub trait Bind: Sized + 'static {
    fn binding() -> &'static TypeBinding<Self>;
}
