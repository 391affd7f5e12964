//! Runtime value type system for Bruter
//!
//! Every value lives in exactly one slot of the [`ValuePool`]. A [`Value`]
//! carries its own variant, so the tag can never disagree with the payload;
//! [`ValueKind`] is the bare tag, used for type queries and `TypeMismatch`
//! reporting.
//!
//! [`ValuePool`]: crate::runtime::memory::ValuePool

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::runtime::extfunc::NativeFunction;
use crate::runtime::memory::Slot;
use crate::vm::{VMError, VMResult};

/// Value type enumeration for type queries and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Untyped variable, created by `new_var`
    Nil,
    /// Floating point number
    Number,
    /// Signed integer
    Integer,
    /// Owned string
    String,
    /// Sequence of slots
    List,
    /// Native function
    Builtin,
    /// Unresolved identifier produced by the parser
    Symbol,
    /// Host-defined opaque value
    Host,
}

impl ValueKind {
    /// Lower-case name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Builtin => "builtin",
            ValueKind::Symbol => "symbol",
            ValueKind::Host => "host",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Destructor called on an owned host payload when its slot is released
pub type HostDestructor = fn(Box<dyn Any>);

/// Host value whose lifetime is managed by the pool.
///
/// The destructor (if any) runs exactly once: when the slot is released with
/// `unuse_var`, or when the VM is dropped while the slot is still live.
pub struct OwnedHost {
    value: Option<Box<dyn Any>>,
    destructor: Option<HostDestructor>,
}

impl OwnedHost {
    /// Wrap a boxed host payload
    pub fn new(
        value: Box<dyn Any>,
        destructor: Option<HostDestructor>,
    ) -> Self {
        Self {
            value: Some(value),
            destructor,
        }
    }

    /// Borrow the payload
    pub fn get(&self) -> Option<&dyn Any> {
        self.value.as_deref()
    }

    /// Mutably borrow the payload
    pub fn get_mut(&mut self) -> Option<&mut dyn Any> {
        self.value.as_deref_mut()
    }
}

impl Drop for OwnedHost {
    fn drop(&mut self) {
        if let (Some(value), Some(destructor)) = (self.value.take(), self.destructor) {
            destructor(value);
        }
    }
}

/// Opaque value injected by the host.
///
/// `Borrowed` shares an `Rc` with the host: the pool only drops its own
/// reference and never destroys the object. `Owned` hands the object to the
/// pool, which destroys it on release.
pub enum HostValue {
    Borrowed(Rc<dyn Any>),
    Owned(OwnedHost),
}

impl HostValue {
    /// Downcast the payload to a concrete host type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            HostValue::Borrowed(rc) => (**rc).downcast_ref::<T>(),
            HostValue::Owned(owned) => owned.get()?.downcast_ref::<T>(),
        }
    }

    /// Mutable downcast; only owned payloads can be mutated through the pool
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            HostValue::Borrowed(_) => None,
            HostValue::Owned(owned) => owned.get_mut()?.downcast_mut::<T>(),
        }
    }

    /// Whether the pool owns the payload
    pub fn is_owned(&self) -> bool {
        matches!(self, HostValue::Owned(_))
    }
}

impl fmt::Debug for HostValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            HostValue::Borrowed(_) => f.write_str("HostValue::Borrowed(..)"),
            HostValue::Owned(_) => f.write_str("HostValue::Owned(..)"),
        }
    }
}

/// Runtime value stored in a pool slot
#[derive(Debug)]
pub enum Value {
    Nil,
    Number(f64),
    Integer(i64),
    String(String),
    /// Nested sequence of slots (arrays, argument bundles, sub-expressions)
    List(Vec<Slot>),
    Builtin(NativeFunction),
    /// Identifier left unresolved by the parser
    Symbol(String),
    Host(HostValue),
}

impl Value {
    /// Get the tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Number(_) => ValueKind::Number,
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Builtin(_) => ValueKind::Builtin,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::Host(_) => ValueKind::Host,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Slot]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostValue> {
        match self {
            Value::Host(host) => Some(host),
            _ => None,
        }
    }
}

/// Copy a value so it can be stored in a new slot without sharing ownership.
///
/// Strings get a fresh buffer, lists get a fresh index vector (the elements
/// themselves are shared), borrowed host values share the host's `Rc`.
/// Owned host payloads cannot be duplicated.
pub fn value_duplicate(value: &Value) -> VMResult<Value> {
    Ok(match value {
        Value::Nil => Value::Nil,
        Value::Number(n) => Value::Number(*n),
        Value::Integer(i) => Value::Integer(*i),
        Value::String(s) => Value::String(s.clone()),
        Value::List(items) => Value::List(items.clone()),
        Value::Builtin(native) => Value::Builtin(native.clone()),
        Value::Symbol(name) => Value::Symbol(name.clone()),
        Value::Host(HostValue::Borrowed(rc)) => Value::Host(HostValue::Borrowed(Rc::clone(rc))),
        Value::Host(HostValue::Owned(_)) => {
            return Err(VMError::Runtime(
                "owned host values cannot be duplicated".to_string(),
            ))
        }
    })
}
