use std::fmt;

use crate::error::{LispError, LispResult};
use crate::eval::Machine;

/// Index into the object arena. This is the GC handle.
/// Stable for the whole lifetime of the object it names.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32);

impl ObjId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({})", self.0)
    }
}

/// Native implementation of a builtin. Receives the number of pending
/// operand stack entries and must consume exactly that many.
pub type NativeFn = fn(&mut Machine, usize) -> LispResult<ObjId>;

/// Variant tag, used for diagnostics and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Void,
    Integer,
    Bool,
    Cons,
    Symbol,
    Function,
    Syntax,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Nil => "Nil",
            Kind::Void => "Void",
            Kind::Integer => "Integer",
            Kind::Bool => "Bool",
            Kind::Cons => "Cons",
            Kind::Symbol => "Symbol",
            Kind::Function => "Function",
            Kind::Syntax => "Syntax",
        };
        f.write_str(name)
    }
}

/// Every value the runtime manipulates. Objects live in arena slots and
/// refer to each other through `ObjId`.
#[derive(Clone, Debug)]
pub enum Object {
    Nil,
    Void,
    Integer(i64),
    Bool(bool),
    Cons { car: ObjId, cdr: ObjId },
    Symbol(String),
    /// Callable whose arguments are evaluated before the call.
    Function { name: String, op: NativeFn },
    /// Callable that receives its argument expressions unevaluated.
    Syntax { name: String, op: NativeFn },
}

impl Object {
    pub fn kind(&self) -> Kind {
        match self {
            Object::Nil => Kind::Nil,
            Object::Void => Kind::Void,
            Object::Integer(_) => Kind::Integer,
            Object::Bool(_) => Kind::Bool,
            Object::Cons { .. } => Kind::Cons,
            Object::Symbol(_) => Kind::Symbol,
            Object::Function { .. } => Kind::Function,
            Object::Syntax { .. } => Kind::Syntax,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Object::Cons { .. })
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Object::Function { .. } | Object::Syntax { .. })
    }

    /// Nil and Void both terminate an argument list.
    pub fn is_list_end(&self) -> bool {
        matches!(self, Object::Nil | Object::Void)
    }

    /// Falsy values for the conditional: `F`, nil and void.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Bool(false) | Object::Nil | Object::Void)
    }

    /// The error every mismatched accessor reports.
    pub fn unsupported(&self, op: &'static str) -> LispError {
        LispError::UnsupportedOperation {
            op,
            kind: self.kind(),
        }
    }

    pub fn car(&self) -> LispResult<ObjId> {
        match self {
            Object::Cons { car, .. } => Ok(*car),
            _ => Err(self.unsupported("car")),
        }
    }

    pub fn cdr(&self) -> LispResult<ObjId> {
        match self {
            Object::Cons { cdr, .. } => Ok(*cdr),
            _ => Err(self.unsupported("cdr")),
        }
    }

    pub fn as_integer(&self) -> LispResult<i64> {
        match self {
            Object::Integer(n) => Ok(*n),
            _ => Err(self.unsupported("integer value")),
        }
    }

    pub fn as_string(&self) -> LispResult<&str> {
        match self {
            Object::Symbol(name) => Ok(name),
            _ => Err(self.unsupported("string value")),
        }
    }

    pub fn as_bool(&self) -> LispResult<bool> {
        match self {
            Object::Bool(b) => Ok(*b),
            _ => Err(self.unsupported("bool value")),
        }
    }

    /// Name and implementation of a callable, plus whether its arguments
    /// are evaluated eagerly.
    pub fn native(&self) -> Option<(&str, NativeFn, bool)> {
        match self {
            Object::Function { name, op } => Some((name, *op, true)),
            Object::Syntax { name, op } => Some((name, *op, false)),
            _ => None,
        }
    }

    /// Handles directly held by this object (the edges the collector follows).
    pub fn children(&self) -> Option<(ObjId, ObjId)> {
        match self {
            Object::Cons { car, cdr } => Some((*car, *cdr)),
            _ => None,
        }
    }
}
