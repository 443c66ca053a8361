//! Runtime values.
//!
//! Values are immutable except for [`BoxCell`]. Scalars live inline; closures,
//! boxes and host objects are reference counted and compare by identity.
//!
//! # Thread Safety
//!
//! Everything here is `Rc`-based. A call chain runs on one thread, so values
//! are deliberately `!Send`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kiln_ir::Name;

use crate::errors::{type_mismatch, EvalResult};
use crate::function::Closure;

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// 64-bit two's complement integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// The unit marker returned by writes, empty `begin` and `println`.
    #[default]
    Unit,
    /// Interned symbol.
    Symbol(Name),
    /// Callable value.
    Closure(Closure),
    /// Mutable cell shared by reference.
    Box(BoxCell),
    /// Opaque value owned by the embedding host.
    Host(HostObject),
}

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an interned symbol.
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Name::intern(name))
    }

    /// Wrap `value` in a fresh mutable cell.
    pub fn boxed(value: Value) -> Self {
        Value::Box(BoxCell::new(value))
    }

    /// Wrap a host-owned object.
    pub fn host<T: Any>(object: T) -> Self {
        Value::Host(HostObject::new(object))
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Unit => "unit",
            Value::Symbol(_) => "symbol",
            Value::Closure(_) => "closure",
            Value::Box(_) => "box",
            Value::Host(_) => "host",
        }
    }

    /// Extract an integer, or fail with `TypeMismatch`.
    #[inline]
    pub fn as_int(&self) -> EvalResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(type_mismatch("int", other.type_name())),
        }
    }

    /// Extract a boolean, or fail with `TypeMismatch`.
    #[inline]
    pub fn as_bool(&self) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_mismatch("bool", other.type_name())),
        }
    }

    /// Borrow a closure, or fail with `TypeMismatch`.
    #[inline]
    pub fn as_closure(&self) -> EvalResult<&Closure> {
        match self {
            Value::Closure(c) => Ok(c),
            other => Err(type_mismatch("closure", other.type_name())),
        }
    }

    /// Borrow a box, or fail with `TypeMismatch`.
    #[inline]
    pub fn as_box(&self) -> EvalResult<&BoxCell> {
        match self {
            Value::Box(b) => Ok(b),
            other => Err(type_mismatch("box", other.type_name())),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => a.ptr_eq(b),
            (Value::Box(a), Value::Box(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Closure> for Value {
    fn from(c: Closure) -> Self {
        Value::Closure(c)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(true) => f.write_str("#t"),
            Value::Bool(false) => f.write_str("#f"),
            Value::Unit => f.write_str("#<unit>"),
            Value::Symbol(name) => write!(f, "'{name}"),
            Value::Closure(c) => {
                if c.name().is_empty() {
                    f.write_str("#<closure>")
                } else {
                    write!(f, "#<closure {}>", c.name())
                }
            }
            // A box may (indirectly) contain itself, so only one level is shown.
            Value::Box(b) => match &*b.0.borrow() {
                Value::Box(_) => f.write_str("#<box #<box>>"),
                inner => write!(f, "#<box {inner}>"),
            },
            Value::Host(h) => write!(f, "#<host {}>", h.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A single mutable cell.
///
/// Cloning shares the cell; every holder observes every write.
#[derive(Clone, Default)]
pub struct BoxCell(Rc<RefCell<Value>>);

impl BoxCell {
    pub fn new(value: Value) -> Self {
        BoxCell(Rc::new(RefCell::new(value)))
    }

    /// Current contents.
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Replace the contents, returning the previous value.
    pub fn set(&self, value: Value) -> Value {
        self.0.replace(value)
    }

    pub fn ptr_eq(&self, other: &BoxCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Opaque host object, compared by identity.
#[derive(Clone)]
pub struct HostObject {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl HostObject {
    pub fn new<T: Any>(object: T) -> Self {
        Self {
            inner: Rc::new(object),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the object as `T`, if that is its type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

#[cfg(test)]
mod tests;
